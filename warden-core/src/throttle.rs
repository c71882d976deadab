// ABOUTME: Adaptive response pacing driven by recent chat velocity.
// ABOUTME: Quiet chats get long delays so the bot never dominates; busy chats get fast pacing.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// How far back arrivals count toward the chat velocity.
pub const ACTIVITY_WINDOW: Duration = Duration::from_secs(60);

/// Hard floor between any two non-priority responses.
pub const MIN_DELAY: Duration = Duration::from_secs(2);

/// Categories of outbound responses.
///
/// Priority kinds (`ConsciousnessTrigger`, `ModerationAnnouncement`) are
/// time-critical: they skip the per-kind cooldown, the general floor, and
/// the sender's pacing sleeps entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    General,
    ConsciousnessTrigger,
    FactCheck,
    Moderation,
    ModerationAnnouncement,
}

impl ResponseKind {
    pub fn is_priority(self) -> bool {
        matches!(self, Self::ConsciousnessTrigger | Self::ModerationAnnouncement)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::ConsciousnessTrigger => "consciousness_trigger",
            Self::FactCheck => "fact_check",
            Self::Moderation => "moderation",
            Self::ModerationAnnouncement => "moderation_announcement",
        }
    }

    /// Multiplier applied to the adaptive delay for the per-kind cooldown.
    fn cooldown_factor(self) -> f64 {
        match self {
            Self::General => 1.0,
            Self::FactCheck => 1.5,
            Self::Moderation => 0.5,
            // Never consulted: priority kinds bypass the cooldown check.
            Self::ConsciousnessTrigger | Self::ModerationAnnouncement => 0.0,
        }
    }
}

/// Tracks inbound message velocity and paces outbound responses.
///
/// Pure state: every method takes the current instant, so tests drive it
/// with constructed timestamps and no clock mocking.
#[derive(Debug, Default)]
pub struct ThrottleGate {
    /// Arrival instants, sorted ascending. Append-only with prefix trims.
    arrivals: Vec<Instant>,
    /// Last response time per kind.
    cooldowns: HashMap<ResponseKind, Instant>,
    /// Last response of any kind, for the general floor.
    last_response: Option<Instant>,
}

impl ThrottleGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one inbound chat message.
    pub fn record_arrival(&mut self, now: Instant) {
        self.arrivals.push(now);
    }

    /// Messages currently inside the activity window.
    pub fn current_rate(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.arrivals.len()
    }

    /// Compute the pacing delay from the current chat velocity.
    ///
    /// The mapping is inverse: an empty chat means the bot waits a long time
    /// before speaking, a flooded chat means it keeps pace.
    pub fn adaptive_delay(&mut self, now: Instant) -> Duration {
        let rate = self.current_rate(now);
        let secs = match rate {
            0 => 120,
            1 => 60,
            2..=4 => 30,
            5..=9 => 15,
            10..=19 => 8,
            20..=49 => 5,
            _ => 2,
        };
        Duration::from_secs(secs)
    }

    /// Decide whether a response of `kind` may go out right now.
    pub fn should_respond(&mut self, kind: ResponseKind, now: Instant) -> bool {
        if kind.is_priority() {
            tracing::debug!(kind = kind.as_str(), "priority kind bypasses throttle");
            return true;
        }

        // General floor: refuse if anything went out in the last MIN_DELAY.
        if let Some(last) = self.last_response {
            if now.duration_since(last) < MIN_DELAY {
                tracing::debug!(kind = kind.as_str(), "refused by general response floor");
                return false;
            }
        }

        let required = self.adaptive_delay(now).mul_f64(kind.cooldown_factor());
        match self.cooldowns.get(&kind) {
            Some(last) => {
                let elapsed = now.duration_since(*last);
                if elapsed < required {
                    tracing::debug!(
                        kind = kind.as_str(),
                        elapsed_secs = elapsed.as_secs_f64(),
                        required_secs = required.as_secs_f64(),
                        "refused by per-kind cooldown"
                    );
                    false
                } else {
                    true
                }
            }
            None => true,
        }
    }

    /// Record a sent response of `kind`. Cooldowns only move forward.
    pub fn record_response(&mut self, kind: ResponseKind, now: Instant) {
        let entry = self.cooldowns.entry(kind).or_insert(now);
        if now > *entry {
            *entry = now;
        }
        match self.last_response {
            Some(prev) if prev >= now => {}
            _ => self.last_response = Some(now),
        }
    }

    /// Trim arrivals older than the window. Prefix-only: the vec stays sorted.
    fn prune(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(ACTIVITY_WINDOW) else {
            return;
        };
        let keep_from = self.arrivals.partition_point(|t| *t <= cutoff);
        if keep_from > 0 {
            self.arrivals.drain(..keep_from);
        }
    }
}
