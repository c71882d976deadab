// ABOUTME: Per-message trigger detection and per-user trigger cooldowns.
// ABOUTME: Phrases match on a single occurrence; keywords only count toward an occurrence threshold.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::time::Instant;

/// Total keyword occurrences (repeats included) needed to trigger.
pub const KEYWORD_THRESHOLD: usize = 3;

/// Default per-user trigger cooldown.
pub const USER_COOLDOWN: Duration = Duration::from_secs(60);

/// Detects trigger patterns in chat text and rate-limits triggering users.
///
/// Two pattern classes:
/// - **phrases**: case-insensitive substrings, any single occurrence triggers
/// - **keywords**: word-boundary matches counted across the whole set; the
///   message triggers once the total reaches [`KEYWORD_THRESHOLD`], and three
///   copies of the same keyword count
pub struct TriggerFilter {
    phrases: Vec<String>,
    keywords: Vec<Regex>,
    /// Last accepted trigger per user id. Entries are never removed; growth
    /// is bounded by the process lifetime.
    last_trigger: HashMap<String, Instant>,
    cooldown: Duration,
}

impl TriggerFilter {
    pub fn new(phrases: &[String], keywords: &[String], cooldown: Duration) -> Result<Self> {
        let phrases = phrases
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        let keywords = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(|k| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(k)))
                    .with_context(|| format!("invalid trigger keyword: {:?}", k))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            phrases,
            keywords,
            last_trigger: HashMap::new(),
            cooldown,
        })
    }

    /// True if the text should provoke an automated reply.
    pub fn detect(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        if self.phrases.iter().any(|p| lowered.contains(p.as_str())) {
            return true;
        }
        let total: usize = self
            .keywords
            .iter()
            .map(|re| re.find_iter(text).count())
            .sum();
        total >= KEYWORD_THRESHOLD
    }

    /// True if the user triggered inside their cooldown window.
    pub fn is_rate_limited(&self, author_id: &str, now: Instant) -> bool {
        match self.last_trigger.get(author_id) {
            Some(last) => now.duration_since(*last) < self.cooldown,
            None => false,
        }
    }

    /// Record an accepted trigger. Callers must NOT invoke this for
    /// suppressed (rate-limited) triggers: the cooldown window is anchored
    /// to the last accepted trigger, not the last attempt.
    pub fn mark_triggered(&mut self, author_id: &str, now: Instant) {
        self.last_trigger.insert(author_id.to_string(), now);
    }
}
