// ABOUTME: Tests for session initialization, greeting pacing, and viewer polling.
// ABOUTME: Drives a configurable metadata stub under a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use chatwarden::error::PlatformError;
use chatwarden::session::{SessionPhase, SessionState};
use chatwarden::traits::{ChatPage, PlatformClient, StreamHandle, StreamMetadata};

struct MetaClient {
    meta: std::sync::Mutex<Result<StreamMetadata, PlatformError>>,
}

impl MetaClient {
    fn new(meta: Result<StreamMetadata, PlatformError>) -> Arc<Self> {
        Arc::new(Self {
            meta: std::sync::Mutex::new(meta),
        })
    }

    fn set(&self, meta: Result<StreamMetadata, PlatformError>) {
        *self.meta.lock().unwrap() = meta;
    }

    fn live(viewer_count: u64) -> Result<StreamMetadata, PlatformError> {
        Ok(StreamMetadata {
            title: "Launch Day".to_string(),
            viewer_count,
            active_chat_id: Some("chat-1".to_string()),
        })
    }
}

#[async_trait]
impl PlatformClient for MetaClient {
    async fn resolve_stream(&self) -> Result<Option<StreamHandle>, PlatformError> {
        Ok(None)
    }

    async fn fetch_chat(&self, _chat_id: &str) -> Result<ChatPage, PlatformError> {
        Ok(ChatPage::default())
    }

    async fn post_message(&self, _chat_id: &str, _text: &str) -> Result<String, PlatformError> {
        Ok("id".to_string())
    }

    async fn stream_metadata(&self, _stream_id: &str) -> Result<StreamMetadata, PlatformError> {
        self.meta.lock().unwrap().clone()
    }

    async fn invalidate_credentials(&self) {}

    async fn clear_stream_cache(&self) {}
}

#[tokio::test]
async fn test_initialize_resolves_chat_metadata() {
    let client = MetaClient::new(MetaClient::live(120));
    let mut session = SessionState::new("stream-1");

    assert!(session.initialize(client.as_ref()).await);
    assert_eq!(session.phase(), SessionPhase::Active);
    assert_eq!(session.chat_id(), Some("chat-1"));
    assert_eq!(session.title(), "Launch Day");
    assert_eq!(session.viewer_count(), 120);
}

#[tokio::test]
async fn test_initialize_fails_without_active_chat() {
    let client = MetaClient::new(Ok(StreamMetadata {
        title: "VOD".to_string(),
        viewer_count: 0,
        active_chat_id: None,
    }));
    let mut session = SessionState::new("stream-1");

    assert!(!session.initialize(client.as_ref()).await);
    assert_eq!(session.phase(), SessionPhase::Uninitialized);
    assert!(session.chat_id().is_none());
}

#[tokio::test]
async fn test_initialize_fails_soft_on_error() {
    let client = MetaClient::new(Err(PlatformError::Transient("down".to_string())));
    let mut session = SessionState::new("stream-1");

    assert!(!session.initialize(client.as_ref()).await);
    assert_eq!(session.phase(), SessionPhase::Uninitialized);
}

#[tokio::test(start_paused = true)]
async fn test_greeting_delays_bracket_the_send() {
    let session = SessionState::new("stream-1");

    let start = Instant::now();
    session.send_greeting(|| async { true }).await;
    let elapsed = start.elapsed();

    // 1-3s pre-delay plus 1-2s post-delay on success.
    assert!(
        elapsed >= Duration::from_secs(2) && elapsed <= Duration::from_secs(5),
        "greeting pacing out of range: {:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_greeting_skips_post_delay() {
    let session = SessionState::new("stream-1");

    let start = Instant::now();
    session.send_greeting(|| async { false }).await;
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_secs(1) && elapsed <= Duration::from_secs(3),
        "failed greeting should only pay the pre-delay: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_viewer_poll_is_best_effort() {
    let client = MetaClient::new(MetaClient::live(100));
    let mut session = SessionState::new("stream-1");
    assert!(session.initialize(client.as_ref()).await);

    client.set(MetaClient::live(250));
    session.poll_viewer_count(client.as_ref()).await;
    assert_eq!(session.viewer_count(), 250);

    // A failing poll keeps the previous value and the session alive.
    client.set(Err(PlatformError::Transient("blip".to_string())));
    session.poll_viewer_count(client.as_ref()).await;
    assert_eq!(session.viewer_count(), 250);
    assert!(session.is_active());
}
