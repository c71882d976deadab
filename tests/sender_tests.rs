// ABOUTME: Tests for outbound send pacing, refusals, and failure classification.
// ABOUTME: Runs under a paused tokio clock so the pacing sleeps are measured, not waited.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use chatwarden::error::{PlatformError, Refusal, SendOutcome};
use chatwarden::sender::OutboundSender;
use chatwarden::throttle::{ResponseKind, ThrottleGate};
use chatwarden::traits::{ChatPage, PlatformClient, StreamHandle, StreamMetadata};

struct FakeClient {
    post_result: std::sync::Mutex<Result<String, PlatformError>>,
    posts: std::sync::Mutex<Vec<String>>,
}

impl FakeClient {
    fn new(post_result: Result<String, PlatformError>) -> Arc<Self> {
        Arc::new(Self {
            post_result: std::sync::Mutex::new(post_result),
            posts: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformClient for FakeClient {
    async fn resolve_stream(&self) -> Result<Option<StreamHandle>, PlatformError> {
        Ok(None)
    }

    async fn fetch_chat(&self, _chat_id: &str) -> Result<ChatPage, PlatformError> {
        Ok(ChatPage::default())
    }

    async fn post_message(&self, _chat_id: &str, text: &str) -> Result<String, PlatformError> {
        self.posts.lock().unwrap().push(text.to_string());
        self.post_result.lock().unwrap().clone()
    }

    async fn stream_metadata(&self, _stream_id: &str) -> Result<StreamMetadata, PlatformError> {
        Err(PlatformError::Transient("not scripted".to_string()))
    }

    async fn invalidate_credentials(&self) {}

    async fn clear_stream_cache(&self) {}
}

#[tokio::test(start_paused = true)]
async fn test_empty_text_is_rejected_outright() {
    let client = FakeClient::new(Ok("id".to_string()));
    let sender = OutboundSender::new(client.clone());
    let mut gate = ThrottleGate::new();

    let outcome = sender
        .send(&mut gate, "chat-1", "   ", ResponseKind::General, Instant::now())
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Refused(Refusal::EmptyText));
    assert!(client.posts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_throttled_refusal_has_no_side_effect() {
    let client = FakeClient::new(Ok("id".to_string()));
    let sender = OutboundSender::new(client.clone());
    let mut gate = ThrottleGate::new();

    let now = Instant::now();
    gate.record_response(ResponseKind::General, now);

    // Inside the 2s general floor: refused before any dispatch.
    let outcome = sender
        .send(
            &mut gate,
            "chat-1",
            "too soon",
            ResponseKind::Moderation,
            now + Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Refused(Refusal::Throttled));
    assert!(client.posts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_priority_kind_skips_all_pacing() {
    let client = FakeClient::new(Ok("id".to_string()));
    let sender = OutboundSender::new(client.clone());
    let mut gate = ThrottleGate::new();

    // Empty chat would mean a 120s adaptive delay for a normal kind.
    let start = Instant::now();
    let outcome = sender
        .send(
            &mut gate,
            "chat-1",
            "mod notice",
            ResponseKind::ModerationAnnouncement,
            start,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Sent { .. }));

    // Only the fixed post-send spacing elapsed: no adaptive delay, no jitter.
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2500),
        "priority send should only pay the 2s spacing, took {:?}",
        elapsed
    );
    assert_eq!(client.posts(), vec!["mod notice".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_normal_send_pays_adaptive_delay_and_jitter() {
    let client = FakeClient::new(Ok("id".to_string()));
    let sender = OutboundSender::new(client.clone());
    let mut gate = ThrottleGate::new();

    // Empty chat: 120s adaptive delay, plus 0.5-3.0s jitter, plus 2s spacing.
    let start = Instant::now();
    let outcome = sender
        .send(&mut gate, "chat-1", "hello chat", ResponseKind::General, start)
        .await
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Sent { .. }));

    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(122_500) && elapsed <= Duration::from_millis(125_100),
        "expected 120s + jitter + spacing, took {:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_propagates_to_caller() {
    let client = FakeClient::new(Err(PlatformError::Unauthorized));
    let sender = OutboundSender::new(client.clone());
    let mut gate = ThrottleGate::new();

    let result = sender
        .send(
            &mut gate,
            "chat-1",
            "mod notice",
            ResponseKind::ModerationAnnouncement,
            Instant::now(),
        )
        .await;
    assert_eq!(result, Err(PlatformError::Unauthorized));
    // The attempt was made; the classification happened on the response.
    assert_eq!(client.posts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_quota_failure_is_soft() {
    let client = FakeClient::new(Err(PlatformError::QuotaExceeded));
    let sender = OutboundSender::new(client.clone());
    let mut gate = ThrottleGate::new();

    let outcome = sender
        .send(
            &mut gate,
            "chat-1",
            "mod notice",
            ResponseKind::ModerationAnnouncement,
            Instant::now(),
        )
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Failed(PlatformError::QuotaExceeded));
}

#[tokio::test(start_paused = true)]
async fn test_success_starts_cooldowns() {
    let client = FakeClient::new(Ok("id".to_string()));
    let sender = OutboundSender::new(client.clone());
    let mut gate = ThrottleGate::new();

    let outcome = sender
        .send(
            &mut gate,
            "chat-1",
            "mod notice",
            ResponseKind::ModerationAnnouncement,
            Instant::now(),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Sent { .. }));

    // Inside the spacing window the general floor was active for normal
    // kinds, while priority kinds remained exempt.
    let inside_floor = Instant::now() - Duration::from_secs(1);
    assert!(!gate.should_respond(ResponseKind::General, inside_floor));
    assert!(gate.should_respond(ResponseKind::ConsciousnessTrigger, inside_floor));
}

#[tokio::test(start_paused = true)]
async fn test_failed_send_does_not_start_cooldowns() {
    let client = FakeClient::new(Err(PlatformError::QuotaExceeded));
    let sender = OutboundSender::new(client.clone());
    let mut gate = ThrottleGate::new();

    let _ = sender
        .send(
            &mut gate,
            "chat-1",
            "mod notice",
            ResponseKind::ModerationAnnouncement,
            Instant::now(),
        )
        .await
        .unwrap();

    // Nothing was recorded: a fresh General send passes the gate check.
    assert!(gate.should_respond(ResponseKind::General, Instant::now()));
}
