// ABOUTME: Typed error taxonomy for platform API failures and soft send outcomes.
// ABOUTME: Maps HTTP-style status codes to the handful of cases the control loop distinguishes.

use thiserror::Error;

/// Classified failure from the platform API.
///
/// Only `Unauthorized` crosses component boundaries as a signal (it forces a
/// credential reset in the acquisition loop). Everything else is absorbed
/// close to where it happens and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// Daily API quota is exhausted; backoff reduces call volume naturally.
    #[error("platform quota exceeded")]
    QuotaExceeded,

    /// Permissions problem (likely configuration, not token expiry).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Credentials rejected; caller must invalidate and reconnect.
    #[error("unauthorized: credentials rejected")]
    Unauthorized,

    /// Chat or stream is gone. The expected "stream ended" path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or other retriable failure.
    #[error("transient platform error: {0}")]
    Transient(String),
}

impl PlatformError {
    /// Classify an HTTP-style status code plus the response body/reason text.
    ///
    /// The quota case hides behind 403 on some platforms, distinguished only
    /// by the error reason, so the body is consulted for 403s.
    pub fn from_status(status: u16, reason: &str) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 if reason.to_lowercase().contains("quota") => Self::QuotaExceeded,
            403 => Self::Forbidden(truncate(reason)),
            404 => Self::NotFound(truncate(reason)),
            429 => Self::QuotaExceeded,
            _ => Self::Transient(format!("status {}: {}", status, truncate(reason))),
        }
    }
}

fn truncate(reason: &str) -> String {
    let trimmed = reason.trim();
    if trimmed.chars().count() > 200 {
        let cut: String = trimmed.chars().take(200).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}

/// Result of an outbound send attempt.
///
/// Refusals and classified failures are expected outcomes, not errors, so
/// callers never need error handling for the common cases. The one failure
/// that escapes as a real `Err` is `PlatformError::Unauthorized`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Message dispatched; platform-assigned message id.
    Sent { message_id: String },
    /// Send was refused before any dispatch attempt (no side effect).
    Refused(Refusal),
    /// Dispatch was attempted and failed softly.
    Failed(PlatformError),
}

/// Why a send was refused before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// Empty or whitespace-only text.
    EmptyText,
    /// The throttle gate said no (cooldown or general floor).
    Throttled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(PlatformError::from_status(401, ""), PlatformError::Unauthorized);
        assert!(matches!(
            PlatformError::from_status(403, "insufficient permissions"),
            PlatformError::Forbidden(_)
        ));
        assert_eq!(
            PlatformError::from_status(403, "dailyLimitExceeded: quotaExceeded"),
            PlatformError::QuotaExceeded
        );
        assert_eq!(PlatformError::from_status(429, ""), PlatformError::QuotaExceeded);
        assert!(matches!(
            PlatformError::from_status(404, "liveChatNotFound"),
            PlatformError::NotFound(_)
        ));
        assert!(matches!(
            PlatformError::from_status(500, "boom"),
            PlatformError::Transient(_)
        ));
    }

    #[test]
    fn test_long_reason_truncated() {
        let long = "x".repeat(500);
        if let PlatformError::Forbidden(reason) = PlatformError::from_status(403, &long) {
            assert!(reason.len() <= 203);
        } else {
            panic!("expected Forbidden");
        }
    }
}
