// ABOUTME: JSONL gamification sink for moderator actions.
// ABOUTME: Appends one timestamped JSON object per event; failures are logged, never surfaced.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use warden_core::traits::{GamificationSink, ModerationEvent};

/// Append-only JSONL store for moderation events. The scoring layer that
/// consumes this file lives elsewhere.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn append(&self, event: &ModerationEvent) -> anyhow::Result<()> {
        let record = serde_json::json!({
            "recorded_at": Utc::now().to_rfc3339(),
            "action": event.action.as_str(),
            "moderator": event.moderator,
            "target": event.target,
            "duration_secs": event.duration_secs,
        });
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl GamificationSink for JsonlSink {
    async fn record_moderation_event(&self, event: ModerationEvent) {
        if let Err(e) = self.append(&event).await {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to record moderation event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::traits::ModerationAction;

    #[tokio::test]
    async fn test_events_append_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let sink = JsonlSink::new(&path);

        sink.record_moderation_event(ModerationEvent {
            action: ModerationAction::Timeout,
            moderator: "mod1".into(),
            target: "spammer".into(),
            duration_secs: Some(300),
        })
        .await;
        sink.record_moderation_event(ModerationEvent {
            action: ModerationAction::Ban,
            moderator: "mod2".into(),
            target: "troll".into(),
            duration_secs: None,
        })
        .await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["action"], "timeout");
        assert_eq!(first["duration_secs"], 300);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["action"], "ban");
        assert!(second["duration_secs"].is_null());
    }
}
