// ABOUTME: Flag-file manual trigger channel.
// ABOUTME: Touching the file means "check for a stream right now"; reset removes it.

use std::path::PathBuf;

use async_trait::async_trait;
use warden_core::traits::TriggerChannel;

/// Filesystem-backed [`TriggerChannel`]: the signal is raised while the flag
/// file exists.
pub struct FileTrigger {
    path: PathBuf,
}

impl FileTrigger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TriggerChannel for FileTrigger {
    async fn check(&self) -> bool {
        tokio::fs::metadata(&self.path).await.is_ok()
    }

    async fn reset(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to reset trigger file");
            }
        }
    }
}
