// ABOUTME: Response generator implementations -- an HTTP completion endpoint and a canned-line fallback.
// ABOUTME: Both are opaque text-in/text-out; emptiness and failure both mean "try the next one".

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use warden_core::traits::ResponseGenerator;

/// Primary generator: one POST to a configured completion endpoint.
pub struct HttpGenerator {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    reply: Option<String>,
}

impl HttpGenerator {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ResponseGenerator for HttpGenerator {
    async fn generate(&self, text: &str, author: &str) -> anyhow::Result<Option<String>> {
        let resp = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "text": text, "author": author }))
            .send()
            .await?
            .error_for_status()?;
        let parsed: CompletionResponse = resp.json().await?;
        Ok(parsed.reply.filter(|r| !r.trim().is_empty()))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Fallback generator: canned banter lines, picked at random.
pub struct TemplateGenerator {
    lines: Vec<String>,
}

impl TemplateGenerator {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Stock replies for the classic "is the bot conscious" bait.
    pub fn with_defaults() -> Self {
        Self::new(
            [
                "Interesting question. I'm mostly here to keep chat tidy.",
                "I run on pattern matching and spite for spam, nothing deeper.",
                "If I were, would I admit it in a chat full of screenshots?",
                "Ask the streamer. I just work here.",
                "Consciousness is above my pay grade. Moderation is not.",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }
}

#[async_trait]
impl ResponseGenerator for TemplateGenerator {
    async fn generate(&self, _text: &str, _author: &str) -> anyhow::Result<Option<String>> {
        let pick = self.lines.choose(&mut rand::thread_rng()).cloned();
        Ok(pick)
    }

    fn name(&self) -> &'static str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_template_generator_always_answers() {
        let gen = TemplateGenerator::with_defaults();
        let reply = gen.generate("are you conscious?", "viewer").await.unwrap();
        assert!(reply.is_some());
        assert!(!reply.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_template_set_yields_nothing() {
        let gen = TemplateGenerator::new(Vec::new());
        let reply = gen.generate("hello", "viewer").await.unwrap();
        assert!(reply.is_none());
    }
}
