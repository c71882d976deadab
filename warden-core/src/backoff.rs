// ABOUTME: Backoff state for the stream acquisition loop.
// ABOUTME: Three delay ladders: quick-check after a stream ends, and two idle ladders with/without a manual trigger.

use std::time::Duration;

/// Consecutive hard errors (not empty results) before a full reconnect is forced.
pub const RECONNECT_ERROR_THRESHOLD: u32 = 5;

/// Tracks acquisition failures and computes the wait before the next attempt.
///
/// Two counters: `consecutive_failures` drives the delay ladders and grows on
/// every unsuccessful attempt, empty result or error alike.
/// `consecutive_errors` counts only hard errors and trips the forced
/// reconnect. Both reset when a stream is found.
#[derive(Debug, Default)]
pub struct BackoffState {
    consecutive_failures: u32,
    consecutive_errors: u32,
    previous_delay: Option<Duration>,
    quick_check: bool,
}

impl BackoffState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an empty attempt (no active stream) and return the wait before
    /// the next one. The delay reflects the failure count before this one, so
    /// the first miss waits the ladder's base rung.
    pub fn record_failure(&mut self, has_manual_trigger: bool) -> Duration {
        let delay = self.compute_delay(has_manual_trigger);
        self.consecutive_failures += 1;
        delay
    }

    /// Record a hard failure (API error, network) and return the wait.
    pub fn record_error(&mut self, has_manual_trigger: bool) -> Duration {
        self.consecutive_errors += 1;
        self.record_failure(has_manual_trigger)
    }

    /// A stream was found: clear everything, including quick-check mode.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.consecutive_errors = 0;
        self.previous_delay = None;
        self.quick_check = false;
    }

    /// A manual trigger fired: retry immediately on a fresh ladder.
    pub fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Enter the aggressive re-poll ladder used right after a monitored
    /// stream ends, to catch a near-immediate restream.
    pub fn arm_quick_check(&mut self) {
        self.quick_check = true;
    }

    pub fn quick_check(&self) -> bool {
        self.quick_check
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// True once enough consecutive hard errors have piled up that cached
    /// credentials and resolver state must be discarded.
    pub fn needs_reconnect(&self) -> bool {
        self.consecutive_errors >= RECONNECT_ERROR_THRESHOLD
    }

    /// Clear the error counter after the reconnect has been performed.
    pub fn acknowledge_reconnect(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Wait for the current failure count.
    ///
    /// Quick-check mode climbs 5s, 10s, 15s and stays capped there. The
    /// manual-trigger ladder can afford long idle waits (up to 30 minutes)
    /// because a trigger poll can cut them short; without a trigger the
    /// ladder grows slower and caps at 10 minutes.
    fn compute_delay(&mut self, has_manual_trigger: bool) -> Duration {
        let f = self.consecutive_failures;
        let secs: f64 = if self.quick_check {
            (5.0 * (f as f64 + 1.0)).min(15.0)
        } else if has_manual_trigger {
            match f {
                0 => 30.0,
                1..=3 => (30.0 * 2f64.powi(f as i32)).min(120.0),
                4..=6 => (180.0 * (f as f64 - 2.0)).min(600.0),
                _ => 1800.0,
            }
        } else {
            match f {
                0 => 30.0,
                1..=5 => (30.0 * 2f64.powf(f as f64 * 0.7)).min(160.0),
                6..=10 => (160.0 + 30.0 * (f as f64 - 5.0)).min(300.0),
                _ => (300.0 + 60.0 * (f as f64 - 10.0)).min(600.0),
            }
        };
        let delay = Duration::from_secs_f64(secs);
        if self.previous_delay != Some(delay) {
            tracing::debug!(
                failures = f,
                quick_check = self.quick_check,
                delay_secs = secs,
                "backoff delay changed"
            );
        }
        self.previous_delay = Some(delay);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_delays(state: &mut BackoffState, has_trigger: bool, n: u32) -> Vec<f64> {
        (0..n)
            .map(|_| state.record_failure(has_trigger).as_secs_f64())
            .collect()
    }

    #[test]
    fn test_quick_check_ladder() {
        let mut state = BackoffState::new();
        state.arm_quick_check();
        // Failure counts 0,1,2,3 at computation time.
        assert_eq!(failure_delays(&mut state, true, 4), vec![5.0, 10.0, 15.0, 15.0]);
    }

    #[test]
    fn test_trigger_ladder_literal() {
        let mut state = BackoffState::new();
        let seq = failure_delays(&mut state, true, 8);
        assert_eq!(seq, vec![30.0, 60.0, 120.0, 120.0, 360.0, 540.0, 600.0, 1800.0]);
    }

    #[test]
    fn test_trigger_ladder_monotone_and_capped() {
        let mut state = BackoffState::new();
        let seq = failure_delays(&mut state, true, 25);
        for pair in seq.windows(2) {
            assert!(pair[1] >= pair[0], "ladder must be non-decreasing: {:?}", seq);
        }
        assert!(seq.iter().all(|&d| d <= 1800.0));
        assert_eq!(*seq.last().unwrap(), 1800.0);
    }

    #[test]
    fn test_no_trigger_ladder_caps() {
        let mut state = BackoffState::new();
        let seq = failure_delays(&mut state, false, 25);
        assert_eq!(seq[0], 30.0);
        // Exponential segment caps at 160s from failure 4 on.
        assert_eq!(seq[4], 160.0);
        assert_eq!(seq[5], 160.0);
        // Linear segment caps at 300s by failure 10.
        assert_eq!(seq[10], 300.0);
        // Tail caps at 600s.
        assert_eq!(seq[15], 600.0);
        assert_eq!(*seq.last().unwrap(), 600.0);
        for pair in seq.windows(2) {
            assert!(pair[1] >= pair[0], "ladder must be non-decreasing: {:?}", seq);
        }
    }

    #[test]
    fn test_success_clears_everything() {
        let mut state = BackoffState::new();
        state.arm_quick_check();
        state.record_error(true);
        state.record_failure(true);
        assert!(state.quick_check());
        assert_eq!(state.consecutive_failures(), 2);

        state.record_success();
        assert!(!state.quick_check());
        assert_eq!(state.consecutive_failures(), 0);
        assert!(!state.needs_reconnect());
        // Fresh ladder starts at the base rung again.
        assert_eq!(state.record_failure(true), Duration::from_secs(30));
    }

    #[test]
    fn test_manual_trigger_resets_failures_only() {
        let mut state = BackoffState::new();
        for _ in 0..3 {
            state.record_error(true);
        }
        state.reset_failures();
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.record_failure(true), Duration::from_secs(30));
        // Error history toward the forced reconnect survives a manual retry.
        state.record_error(true);
        state.record_error(true);
        assert!(state.needs_reconnect());
    }

    #[test]
    fn test_reconnect_threshold() {
        let mut state = BackoffState::new();
        for _ in 0..4 {
            state.record_error(false);
        }
        assert!(!state.needs_reconnect());
        state.record_error(false);
        assert!(state.needs_reconnect());
        state.acknowledge_reconnect();
        assert!(!state.needs_reconnect());
        // Failure count (and thus the delay ladder) is unaffected.
        assert_eq!(state.consecutive_failures(), 5);
    }

    #[test]
    fn test_empty_results_do_not_trip_reconnect() {
        let mut state = BackoffState::new();
        for _ in 0..20 {
            state.record_failure(false);
        }
        assert!(!state.needs_reconnect());
    }
}
