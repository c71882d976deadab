// ABOUTME: Outbound message dispatch with adaptive pacing and humanization jitter.
// ABOUTME: Priority kinds skip every delay; only Unauthorized escapes to the caller.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use warden_core::error::{PlatformError, Refusal, SendOutcome};
use warden_core::throttle::{ResponseKind, ThrottleGate};
use warden_core::traits::PlatformClient;

use crate::metrics;

/// Fixed spacing after every successful send, to avoid burst-posting.
const BASE_SPACING: Duration = Duration::from_secs(2);

/// Humanization jitter bounds for non-priority sends.
const JITTER_MIN_SECS: f64 = 0.5;
const JITTER_MAX_SECS: f64 = 3.0;

/// Dispatches messages through the platform client, paced by the throttle gate.
pub struct OutboundSender {
    client: Arc<dyn PlatformClient>,
}

impl OutboundSender {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self { client }
    }

    /// Send `text` to `chat_id` as a response of `kind`.
    ///
    /// Refusals and soft failures come back as [`SendOutcome`] values; the
    /// only hard error is `Unauthorized`, which the acquisition loop needs
    /// to see so it can force a reconnect.
    pub async fn send(
        &self,
        gate: &mut ThrottleGate,
        chat_id: &str,
        text: &str,
        kind: ResponseKind,
        now: Instant,
    ) -> Result<SendOutcome, PlatformError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Refused(Refusal::EmptyText));
        }

        if kind.is_priority() {
            // Deliberate policy, not an oversight: time-critical kinds skip
            // the throttle check, the adaptive delay, and the jitter.
            tracing::debug!(kind = kind.as_str(), "Priority send, skipping pacing delays");
        } else {
            if !gate.should_respond(kind, now) {
                metrics::record_response_refused(kind);
                return Ok(SendOutcome::Refused(Refusal::Throttled));
            }

            let delay = gate.adaptive_delay(now);
            tracing::debug!(
                kind = kind.as_str(),
                delay_secs = delay.as_secs_f64(),
                "Pacing before send"
            );
            tokio::time::sleep(delay).await;

            let jitter = rand::thread_rng().gen_range(JITTER_MIN_SECS..=JITTER_MAX_SECS);
            tokio::time::sleep(Duration::from_secs_f64(jitter)).await;
        }

        match self.client.post_message(chat_id, text).await {
            Ok(message_id) => {
                gate.record_response(kind, Instant::now());
                metrics::record_response_sent(kind);
                tracing::info!(
                    kind = kind.as_str(),
                    message_id = %message_id,
                    chars = text.len(),
                    "Response sent"
                );
                tokio::time::sleep(BASE_SPACING).await;
                Ok(SendOutcome::Sent { message_id })
            }
            Err(PlatformError::Unauthorized) => {
                // The one failure the caller must act on.
                Err(PlatformError::Unauthorized)
            }
            Err(e) => {
                match &e {
                    PlatformError::QuotaExceeded => {
                        tracing::warn!(kind = kind.as_str(), "Send failed: quota exceeded")
                    }
                    PlatformError::Forbidden(reason) => {
                        tracing::warn!(kind = kind.as_str(), reason = %reason, "Send forbidden")
                    }
                    other => {
                        tracing::warn!(kind = kind.as_str(), error = %other, "Send failed")
                    }
                }
                Ok(SendOutcome::Failed(e))
            }
        }
    }
}
