// ABOUTME: Collaborator contracts for the moderation loop (platform, generators, trigger, gamification)
// ABOUTME: Everything outside the orchestration core lives behind these traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlatformError;

// =============================================================================
// Data Types
// =============================================================================

/// A resolved live stream and its attached chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    /// Platform identifier for the live stream (video id or equivalent)
    pub stream_id: String,
    /// Identifier of the live chat attached to the stream
    pub chat_id: String,
}

/// Metadata snapshot for a live stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamMetadata {
    /// Stream title
    pub title: String,
    /// Current concurrent viewer count
    #[serde(default)]
    pub viewer_count: u64,
    /// Chat id if a live chat is currently attached, None otherwise
    pub active_chat_id: Option<String>,
}

/// A chat message as the platform delivers it. Fields are optional because
/// upstream payloads are occasionally incomplete; normalization decides what
/// to do with the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    /// Platform-assigned message id
    #[serde(default)]
    pub id: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub text: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Canonical inbound message after normalization.
///
/// `malformed` marks messages built from incomplete payloads; they carry
/// empty text and never produce a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
    /// True when the author is one of the bot's own channel ids
    pub self_message: bool,
    /// True when the raw payload was missing required fields
    pub malformed: bool,
}

/// One page of chat messages plus the platform's polling hint.
#[derive(Debug, Clone, Default)]
pub struct ChatPage {
    pub messages: Vec<RawMessage>,
    /// Suggested wait before the next fetch, when the platform provides one
    pub polling_interval: Option<Duration>,
}

/// Moderation actions tracked for the gamification layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Timeout,
    Ban,
    Unban,
    Slowmode,
}

impl ModerationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Slowmode => "slowmode",
        }
    }
}

/// A single moderator action, recorded fire-and-forget.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationEvent {
    pub action: ModerationAction,
    /// Display name of the moderator who acted
    pub moderator: String,
    /// Target of the action (user handle, or setting value for slowmode)
    pub target: String,
    /// Duration in seconds for timed actions
    pub duration_secs: Option<u64>,
}

// =============================================================================
// Platform Client
// =============================================================================

/// The platform API surface the orchestration loop depends on.
///
/// One live platform per process. The two invalidation hooks exist because
/// the acquisition loop must be able to discard cached credentials and any
/// resolver-side cache when forcing a full reconnect.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Look for an active live stream on the configured channel.
    /// `Ok(None)` means no stream right now, which is not an error.
    async fn resolve_stream(&self) -> Result<Option<StreamHandle>, PlatformError>;

    /// Fetch the next page of chat messages for a live chat.
    async fn fetch_chat(&self, chat_id: &str) -> Result<ChatPage, PlatformError>;

    /// Post a message into a live chat. Returns the platform message id.
    async fn post_message(&self, chat_id: &str, text: &str) -> Result<String, PlatformError>;

    /// Fetch a metadata snapshot for a stream (title, viewers, chat id).
    async fn stream_metadata(&self, stream_id: &str) -> Result<StreamMetadata, PlatformError>;

    /// Discard cached credentials or session tokens so the next call
    /// re-authenticates from scratch.
    async fn invalidate_credentials(&self);

    /// Drop any cached stream-resolution result so a brand-new stream is not
    /// masked by stale data.
    async fn clear_stream_cache(&self);
}

// =============================================================================
// Response Generation
// =============================================================================

/// Opaque text-in/text-out response generation.
///
/// `Ok(None)` and empty strings both mean "nothing useful"; the processor
/// falls through to the next generator in that case.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, text: &str, author: &str) -> anyhow::Result<Option<String>>;

    /// Short name for log lines.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Manual Trigger Channel
// =============================================================================

/// Out-of-band "check for a stream right now" signal.
#[async_trait]
pub trait TriggerChannel: Send + Sync {
    /// True if the signal is raised. Must not consume the signal.
    async fn check(&self) -> bool;

    /// Lower the signal after it has been honored.
    async fn reset(&self);
}

// =============================================================================
// Gamification Sink
// =============================================================================

/// Receives moderator actions for the scoring layer. Fire-and-forget:
/// implementations swallow and log their own failures.
#[async_trait]
pub trait GamificationSink: Send + Sync {
    async fn record_moderation_event(&self, event: ModerationEvent);
}
