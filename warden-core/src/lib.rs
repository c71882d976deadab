// ABOUTME: Platform-agnostic orchestration logic for live-chat moderation
// ABOUTME: Provides collaborator traits, throttling, trigger filtering, and backoff state

pub mod backoff;
pub mod error;
pub mod throttle;
pub mod traits;
pub mod trigger;

// Re-export core types for convenient access
pub use backoff::BackoffState;
pub use error::{PlatformError, Refusal, SendOutcome};
pub use throttle::{ResponseKind, ThrottleGate};
pub use traits::{
    // Collaborator contracts
    GamificationSink, PlatformClient, ResponseGenerator, TriggerChannel,
    // Data types
    ChatPage, ModerationAction, ModerationEvent, NormalizedMessage, RawMessage, StreamHandle,
    StreamMetadata,
};
pub use trigger::TriggerFilter;
