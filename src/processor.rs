// ABOUTME: Turns one inbound chat message into zero-or-one outbound reply.
// ABOUTME: Normalization, self-message drop, command routing, trigger detection, generator fallback chain.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use warden_core::throttle::ResponseKind;
use warden_core::traits::{NormalizedMessage, RawMessage, ResponseGenerator};
use warden_core::trigger::TriggerFilter;

use crate::commands::CommandHandler;
use crate::metrics;

/// A reply the processor wants sent, tagged with its throttle kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub text: String,
    pub kind: ResponseKind,
}

/// Composes trigger filtering with response generation.
///
/// Single-writer by construction: the acquisition loop owns the processor
/// and feeds it messages one at a time.
pub struct MessageProcessor {
    filter: TriggerFilter,
    bot_channel_ids: HashSet<String>,
    primary: Arc<dyn ResponseGenerator>,
    fallback: Arc<dyn ResponseGenerator>,
    commands: CommandHandler,
}

impl MessageProcessor {
    pub fn new(
        filter: TriggerFilter,
        bot_channel_ids: HashSet<String>,
        primary: Arc<dyn ResponseGenerator>,
        fallback: Arc<dyn ResponseGenerator>,
        commands: CommandHandler,
    ) -> Self {
        Self {
            filter,
            bot_channel_ids,
            primary,
            fallback,
            commands,
        }
    }

    /// Normalize a raw platform message.
    ///
    /// Incomplete payloads become a safe default (empty text, `malformed`
    /// marker) instead of an error; malformed messages never trigger.
    pub fn ingest(&self, raw: &RawMessage) -> NormalizedMessage {
        let (Some(author_id), Some(text)) = (raw.author_id.as_ref(), raw.text.as_ref()) else {
            tracing::debug!(msg_id = %raw.id, "Malformed message payload");
            return NormalizedMessage {
                author_id: String::new(),
                author_name: String::new(),
                text: String::new(),
                published_at: raw.published_at.unwrap_or_else(Utc::now),
                self_message: false,
                malformed: true,
            };
        };

        NormalizedMessage {
            author_id: author_id.clone(),
            author_name: raw
                .author_name
                .clone()
                .unwrap_or_else(|| author_id.clone()),
            text: text.clone(),
            published_at: raw.published_at.unwrap_or_else(Utc::now),
            self_message: self.bot_channel_ids.contains(author_id),
            malformed: false,
        }
    }

    /// Process one inbound message end to end.
    pub async fn process(&mut self, raw: &RawMessage, now: Instant) -> Option<OutboundReply> {
        metrics::record_message_processed();
        let msg = self.ingest(raw);

        if msg.self_message {
            tracing::debug!(msg_id = %raw.id, "Dropping own message");
            return None;
        }
        if msg.malformed {
            return None;
        }

        // Command-class messages bypass trigger detection and rate limiting;
        // their replies go out as a priority kind.
        if msg.text.starts_with('!') {
            return self.commands.handle(&msg).await.map(|text| OutboundReply {
                text,
                kind: ResponseKind::ModerationAnnouncement,
            });
        }

        if !self.filter.detect(&msg.text) {
            return None;
        }

        if self.filter.is_rate_limited(&msg.author_id, now) {
            // Suppressed triggers must not refresh the cooldown window.
            tracing::debug!(
                author = %msg.author_name,
                "Trigger suppressed by user cooldown"
            );
            return None;
        }
        self.filter.mark_triggered(&msg.author_id, now);

        let text = self.generate(&msg).await?;
        Some(OutboundReply {
            text,
            kind: ResponseKind::ConsciousnessTrigger,
        })
    }

    /// Primary generator, then fallback; personalize whichever answers.
    /// Both failing resolves to None, never an error.
    async fn generate(&self, msg: &NormalizedMessage) -> Option<String> {
        for generator in [&self.primary, &self.fallback] {
            match generator.generate(&msg.text, &msg.author_name).await {
                Ok(Some(reply)) if !reply.trim().is_empty() => {
                    tracing::debug!(generator = generator.name(), "Generator produced a reply");
                    return Some(format!("@{} {}", msg.author_name, reply.trim()));
                }
                Ok(_) => {
                    tracing::debug!(generator = generator.name(), "Generator returned nothing");
                }
                Err(e) => {
                    tracing::warn!(
                        generator = generator.name(),
                        error = %e,
                        "Generator failed"
                    );
                }
            }
        }
        tracing::warn!(author = %msg.author_name, "All generators failed; staying silent");
        None
    }
}
