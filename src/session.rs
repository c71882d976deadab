// ABOUTME: Lifecycle state for one monitored live session.
// ABOUTME: Resolves chat metadata, paces the greeting like a human joining, classifies auth failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use warden_core::error::PlatformError;
use warden_core::traits::PlatformClient;

/// Session lifecycle. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Active,
    Ended,
}

/// One monitored live stream: resolved metadata plus the lifecycle flag.
///
/// Exclusively owned by the acquisition loop; the sender only reads the chat
/// id for addressing.
#[derive(Debug)]
pub struct SessionState {
    phase: SessionPhase,
    stream_id: String,
    chat_id: Option<String>,
    title: String,
    viewer_count: u64,
}

impl SessionState {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            stream_id: stream_id.into(),
            chat_id: None,
            title: String::new(),
            viewer_count: 0,
        }
    }

    /// Resolve chat id and title via the platform client.
    ///
    /// Returns false (and stays Uninitialized) when the stream has no active
    /// chat attached or the metadata fetch fails.
    pub async fn initialize(&mut self, client: &dyn PlatformClient) -> bool {
        match client.stream_metadata(&self.stream_id).await {
            Ok(meta) => match meta.active_chat_id {
                Some(chat_id) => {
                    tracing::info!(
                        stream_id = %self.stream_id,
                        chat_id = %chat_id,
                        title = %meta.title,
                        viewers = meta.viewer_count,
                        "Session initialized"
                    );
                    self.chat_id = Some(chat_id);
                    self.title = meta.title;
                    self.viewer_count = meta.viewer_count;
                    self.phase = SessionPhase::Active;
                    true
                }
                None => {
                    tracing::warn!(stream_id = %self.stream_id, "Stream has no active chat");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(stream_id = %self.stream_id, error = %e, "Metadata fetch failed");
                false
            }
        }
    }

    /// Send the greeting with humanized pre/post delays.
    ///
    /// Sleeps 1-3s before invoking `send`, and 1-2s after a successful send.
    /// A failed send is logged; it does not transition the session.
    pub async fn send_greeting<F, Fut>(&self, send: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let pre = rand::thread_rng().gen_range(1.0..=3.0);
        tokio::time::sleep(Duration::from_secs_f64(pre)).await;

        if send().await {
            let post = rand::thread_rng().gen_range(1.0..=2.0);
            tokio::time::sleep(Duration::from_secs_f64(post)).await;
        } else {
            tracing::warn!(stream_id = %self.stream_id, "Greeting send failed");
        }
    }

    /// Best-effort viewer count refresh. Failures are logged and change nothing.
    pub async fn poll_viewer_count(&mut self, client: &dyn PlatformClient) {
        match client.stream_metadata(&self.stream_id).await {
            Ok(meta) => {
                self.viewer_count = meta.viewer_count;
                tracing::debug!(
                    stream_id = %self.stream_id,
                    viewers = meta.viewer_count,
                    "Viewer count refreshed"
                );
            }
            Err(e) => {
                tracing::debug!(stream_id = %self.stream_id, error = %e, "Viewer poll failed");
            }
        }
    }

    /// Classify an auth-shaped failure from the chat feed.
    ///
    /// Returns whether monitoring can continue. Expired credentials (401) and
    /// permission problems (403) cannot continue but do NOT end the session
    /// here; the caller decides. A vanished chat or stream (404) is the
    /// normal end-of-stream path and transitions to Ended.
    pub fn handle_auth_error(&mut self, error: &PlatformError) -> bool {
        match error {
            PlatformError::Unauthorized => {
                tracing::warn!(stream_id = %self.stream_id, "Credentials expired");
                false
            }
            PlatformError::Forbidden(reason) => {
                tracing::warn!(
                    stream_id = %self.stream_id,
                    reason = %reason,
                    "Permissions problem; check bot configuration"
                );
                false
            }
            PlatformError::NotFound(reason) => {
                tracing::info!(stream_id = %self.stream_id, reason = %reason, "Stream or chat gone");
                self.end();
                false
            }
            other => {
                tracing::warn!(stream_id = %self.stream_id, error = %other, "Unclassified chat error");
                false
            }
        }
    }

    /// Idempotent terminal transition. Clears the chat id.
    pub fn end(&mut self) {
        if self.phase == SessionPhase::Ended {
            return;
        }
        tracing::info!(stream_id = %self.stream_id, title = %self.title, "Session ended");
        self.phase = SessionPhase::Ended;
        self.chat_id = None;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn viewer_count(&self) -> u64 {
        self.viewer_count
    }
}
