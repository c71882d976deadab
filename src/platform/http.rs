// ABOUTME: Thin HTTP adapter for the live platform API.
// ABOUTME: Maps JSON endpoints onto the PlatformClient trait and status codes onto the error taxonomy.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use warden_core::error::PlatformError;
use warden_core::traits::{ChatPage, PlatformClient, RawMessage, StreamHandle, StreamMetadata};

/// JSON/HTTP implementation of [`PlatformClient`].
///
/// Keeps a one-slot resolver cache: once a stream is resolved it is returned
/// without a network call until the cache is cleared, which the acquisition
/// loop does whenever a session ends or a reconnect is forced.
pub struct HttpPlatformClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    channel_id: String,
    resolved: Mutex<Option<StreamHandle>>,
}

#[derive(Debug, Deserialize)]
struct LiveSearchResponse {
    streams: Vec<LiveSearchItem>,
}

#[derive(Debug, Deserialize)]
struct LiveSearchItem {
    stream_id: String,
    chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatPageResponse {
    #[serde(default)]
    messages: Vec<RawMessage>,
    polling_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    id: String,
}

impl HttpPlatformClient {
    pub fn new(api_base: &str, api_key: &str, channel_id: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            channel_id: channel_id.to_string(),
            resolved: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Turn a non-success response into a classified error.
    async fn classify(resp: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(PlatformError::from_status(status.as_u16(), &body))
    }

    fn transport(e: reqwest::Error) -> PlatformError {
        PlatformError::Transient(e.to_string())
    }

    fn cached_stream(&self) -> Option<StreamHandle> {
        self.resolved.lock().ok().and_then(|slot| slot.clone())
    }

    fn cache_stream(&self, handle: &StreamHandle) {
        if let Ok(mut slot) = self.resolved.lock() {
            *slot = Some(handle.clone());
        }
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn resolve_stream(&self) -> Result<Option<StreamHandle>, PlatformError> {
        if let Some(cached) = self.cached_stream() {
            tracing::debug!(stream_id = %cached.stream_id, "Resolver cache hit");
            return Ok(Some(cached));
        }

        let resp = self
            .http
            .get(self.url("/v1/live"))
            .query(&[("channel_id", self.channel_id.as_str())])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::transport)?;
        let resp = Self::classify(resp).await?;
        let parsed: LiveSearchResponse = resp.json().await.map_err(Self::transport)?;

        let handle = parsed.streams.into_iter().find_map(|item| {
            let chat_id = item.chat_id?;
            Some(StreamHandle {
                stream_id: item.stream_id,
                chat_id,
            })
        });

        if let Some(handle) = &handle {
            self.cache_stream(handle);
        }
        Ok(handle)
    }

    async fn fetch_chat(&self, chat_id: &str) -> Result<ChatPage, PlatformError> {
        let resp = self
            .http
            .get(self.url(&format!("/v1/chats/{}/messages", chat_id)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::transport)?;
        let resp = Self::classify(resp).await?;
        let parsed: ChatPageResponse = resp.json().await.map_err(Self::transport)?;

        Ok(ChatPage {
            messages: parsed.messages,
            polling_interval: parsed.polling_interval_ms.map(Duration::from_millis),
        })
    }

    async fn post_message(&self, chat_id: &str, text: &str) -> Result<String, PlatformError> {
        let resp = self
            .http
            .post(self.url(&format!("/v1/chats/{}/messages", chat_id)))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(Self::transport)?;
        let resp = Self::classify(resp).await?;
        let parsed: PostMessageResponse = resp.json().await.map_err(Self::transport)?;
        Ok(parsed.id)
    }

    async fn stream_metadata(&self, stream_id: &str) -> Result<StreamMetadata, PlatformError> {
        let resp = self
            .http
            .get(self.url(&format!("/v1/streams/{}", stream_id)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::transport)?;
        let resp = Self::classify(resp).await?;
        resp.json().await.map_err(Self::transport)
    }

    async fn invalidate_credentials(&self) {
        // Bearer-key auth has no session to discard; dropping the cached
        // resolution forces the next calls to start from scratch.
        tracing::info!("Discarding cached platform session state");
        self.clear_stream_cache().await;
    }

    async fn clear_stream_cache(&self) {
        if let Ok(mut slot) = self.resolved.lock() {
            if slot.take().is_some() {
                tracing::debug!("Resolver cache cleared");
            }
        }
    }
}
