// ABOUTME: Root library module exposing all public modules
// ABOUTME: Wiring and adapters live here; pure orchestration logic lives in warden-core

pub mod acquire;
pub mod commands;
pub mod config;
pub mod gamify;
pub mod generator;
pub mod metrics;
pub mod platform;
pub mod processor;
pub mod sender;
pub mod session;
pub mod trigger_file;

// Re-export platform-agnostic modules from warden-core
pub use warden_core::backoff;
pub use warden_core::error;
pub use warden_core::throttle;
pub use warden_core::traits;
pub use warden_core::trigger;
