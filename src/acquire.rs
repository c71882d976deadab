// ABOUTME: Top-level control loop -- find a stream, monitor its chat, back off between attempts.
// ABOUTME: Backoff waits are sliced into trigger-poll ticks so a manual signal cuts even a 30-minute idle short.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use warden_core::backoff::BackoffState;
use warden_core::error::{PlatformError, SendOutcome};
use warden_core::throttle::{ResponseKind, ThrottleGate};
use warden_core::traits::{PlatformClient, TriggerChannel};

use crate::metrics;
use crate::processor::MessageProcessor;
use crate::sender::OutboundSender;
use crate::session::SessionState;

/// Consecutive permission failures tolerated on the chat feed before the
/// session is abandoned.
const FORBIDDEN_STRIKE_LIMIT: u32 = 3;

/// Timing knobs for the acquisition loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Cadence of manual-trigger polls while backing off
    pub trigger_poll: Duration,
    /// Settle delay between a session ending and the next search
    pub settle_delay: Duration,
    /// Chat poll interval when the platform gives no hint
    pub chat_poll_default: Duration,
    /// Floor applied to the platform's polling hint
    pub chat_poll_floor: Duration,
    /// Viewer-count refresh cadence while monitoring
    pub viewer_poll: Duration,
    /// Greeting posted when monitoring starts
    pub greeting: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            trigger_poll: Duration::from_secs(5),
            settle_delay: Duration::from_secs(5),
            chat_poll_default: Duration::from_secs(5),
            chat_poll_floor: Duration::from_secs(2),
            viewer_poll: Duration::from_secs(60),
            greeting: String::new(),
        }
    }
}

/// The acquisition loop owns every piece of mutable state in the system:
/// throttle gate, backoff, trigger filter (inside the processor), and the
/// current session. One logical task, no locks -- suspension only happens at
/// the explicit sleep points.
pub struct StreamAcquisitionLoop {
    client: Arc<dyn PlatformClient>,
    trigger: Option<Arc<dyn TriggerChannel>>,
    processor: MessageProcessor,
    sender: OutboundSender,
    gate: ThrottleGate,
    backoff: BackoffState,
    cfg: LoopConfig,
    stop: watch::Receiver<bool>,
}

impl StreamAcquisitionLoop {
    pub fn new(
        client: Arc<dyn PlatformClient>,
        trigger: Option<Arc<dyn TriggerChannel>>,
        processor: MessageProcessor,
        sender: OutboundSender,
        cfg: LoopConfig,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            trigger,
            processor,
            sender,
            gate: ThrottleGate::new(),
            backoff: BackoffState::new(),
            cfg,
            stop,
        }
    }

    /// Run until the stop signal fires. Never returns an error: every
    /// failure mode folds into backoff and retry.
    pub async fn run(mut self) {
        tracing::info!("Stream acquisition loop starting");
        loop {
            if self.stopped() {
                break;
            }

            let Some(handle) = self.acquire().await else {
                break;
            };

            let mut session = SessionState::new(handle.stream_id.as_str());
            if !session.initialize(self.client.as_ref()).await {
                // Resolved a stream that has no usable chat; drop it from the
                // resolver cache and treat it as a failed attempt.
                self.client.clear_stream_cache().await;
                metrics::record_acquisition_failure();
                let delay = self.backoff.record_failure(self.trigger.is_some());
                if !self.wait_with_trigger_poll(delay).await {
                    break;
                }
                continue;
            }

            self.monitor(&mut session).await;

            // Session over: arm the quick-check ladder and clear the resolver
            // cache so an immediate restream is not masked by stale results.
            metrics::record_session_ended();
            self.backoff.arm_quick_check();
            self.client.clear_stream_cache().await;
            tracing::info!(
                settle_secs = self.cfg.settle_delay.as_secs_f64(),
                "Settling before re-search"
            );
            if !self.pause(self.cfg.settle_delay).await {
                break;
            }
        }
        tracing::info!("Stream acquisition loop stopped");
    }

    /// Repeatedly resolve until a stream appears. Returns None when stopped.
    async fn acquire(&mut self) -> Option<warden_core::traits::StreamHandle> {
        tracing::info!("Searching for an active stream");
        loop {
            if self.stopped() {
                return None;
            }

            if self.backoff.needs_reconnect() {
                tracing::warn!("Repeated acquisition errors; forcing full reconnect");
                metrics::record_forced_reconnect();
                self.client.invalidate_credentials().await;
                self.client.clear_stream_cache().await;
                self.backoff.acknowledge_reconnect();
            }

            let has_trigger = self.trigger.is_some();
            let delay = match self.client.resolve_stream().await {
                Ok(Some(handle)) => {
                    tracing::info!(
                        stream_id = %handle.stream_id,
                        chat_id = %handle.chat_id,
                        "Stream found"
                    );
                    metrics::record_stream_found();
                    self.backoff.record_success();
                    return Some(handle);
                }
                Ok(None) => {
                    tracing::debug!(
                        failures = self.backoff.consecutive_failures(),
                        "No active stream"
                    );
                    self.backoff.record_failure(has_trigger)
                }
                Err(PlatformError::Unauthorized) => {
                    tracing::warn!("Resolver rejected credentials; invalidating");
                    self.client.invalidate_credentials().await;
                    let _ = self.backoff.record_error(has_trigger);
                    // Auth failures cost one extra backoff cycle: wait at the
                    // next rung up.
                    self.backoff.record_failure(has_trigger)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Acquisition attempt failed");
                    self.backoff.record_error(has_trigger)
                }
            };
            metrics::record_acquisition_failure();

            if !self.wait_with_trigger_poll(delay).await {
                return None;
            }
        }
    }

    /// Monitor an active session's chat until it ends.
    async fn monitor(&mut self, session: &mut SessionState) {
        let Some(chat_id) = session.chat_id().map(str::to_string) else {
            session.end();
            return;
        };
        tracing::info!(
            stream_id = %session.stream_id(),
            title = %session.title(),
            viewers = session.viewer_count(),
            "Monitoring chat"
        );

        // Greeting goes out as a General response, subject to normal pacing.
        {
            let gate = &mut self.gate;
            let sender = &self.sender;
            let greeting = self.cfg.greeting.clone();
            let chat = chat_id.clone();
            session
                .send_greeting(move || async move {
                    matches!(
                        sender
                            .send(gate, &chat, &greeting, ResponseKind::General, Instant::now())
                            .await,
                        Ok(SendOutcome::Sent { .. })
                    )
                })
                .await;
        }

        let mut last_viewer_poll = Instant::now();
        let mut forbidden_strikes: u32 = 0;

        while session.is_active() {
            if self.stopped() {
                session.end();
                return;
            }

            match self.client.fetch_chat(&chat_id).await {
                Ok(page) => {
                    forbidden_strikes = 0;

                    'messages: for raw in &page.messages {
                        self.gate.record_arrival(Instant::now());
                        let Some(reply) = self.processor.process(raw, Instant::now()).await
                        else {
                            continue;
                        };

                        match self
                            .sender
                            .send(&mut self.gate, &chat_id, &reply.text, reply.kind, Instant::now())
                            .await
                        {
                            Ok(SendOutcome::Sent { .. }) => {}
                            Ok(SendOutcome::Refused(refusal)) => {
                                tracing::debug!(refusal = ?refusal, "Reply refused");
                            }
                            Ok(SendOutcome::Failed(e)) => {
                                if matches!(e, PlatformError::NotFound(_)) {
                                    // Chat vanished mid-send: the stream ended.
                                    session.handle_auth_error(&e);
                                    break 'messages;
                                }
                            }
                            Err(_) => {
                                // Unauthorized is the only error that escapes
                                // the sender.
                                tracing::warn!("Send unauthorized; ending session for reconnect");
                                self.client.invalidate_credentials().await;
                                self.backoff.record_failure(self.trigger.is_some());
                                session.end();
                                break 'messages;
                            }
                        }
                    }
                    if !session.is_active() {
                        return;
                    }

                    if last_viewer_poll.elapsed() >= self.cfg.viewer_poll {
                        session.poll_viewer_count(self.client.as_ref()).await;
                        last_viewer_poll = Instant::now();
                    }

                    let wait = page
                        .polling_interval
                        .unwrap_or(self.cfg.chat_poll_default)
                        .max(self.cfg.chat_poll_floor);
                    if !self.pause(wait).await {
                        session.end();
                        return;
                    }
                }
                Err(e) => {
                    session.handle_auth_error(&e);
                    match e {
                        // handle_auth_error already transitioned to Ended;
                        // this is the normal stream-ended path.
                        PlatformError::NotFound(_) => return,
                        PlatformError::Unauthorized => {
                            self.client.invalidate_credentials().await;
                            self.backoff.record_failure(self.trigger.is_some());
                            session.end();
                            return;
                        }
                        PlatformError::Forbidden(_) => {
                            forbidden_strikes += 1;
                            if forbidden_strikes >= FORBIDDEN_STRIKE_LIMIT {
                                tracing::error!("Repeated permission failures; ending session");
                                session.end();
                                return;
                            }
                            if !self.pause(self.cfg.chat_poll_default).await {
                                session.end();
                                return;
                            }
                        }
                        _ => {
                            // Quota and transient failures: absorbed, retry
                            // on the normal cadence.
                            if !self.pause(self.cfg.chat_poll_default).await {
                                session.end();
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Sleep `total`, waking every trigger-poll tick to check the manual
    /// signal. A raised signal resets the failure ladder and aborts the wait.
    /// Returns false when the stop signal fired.
    async fn wait_with_trigger_poll(&mut self, total: Duration) -> bool {
        tracing::debug!(wait_secs = total.as_secs_f64(), "Backing off");
        let mut remaining = total;
        while !remaining.is_zero() {
            let chunk = remaining.min(self.cfg.trigger_poll);
            if !self.pause(chunk).await {
                return false;
            }
            remaining = remaining.saturating_sub(chunk);

            if let Some(trigger) = &self.trigger {
                if trigger.check().await {
                    tracing::info!("Manual trigger fired; aborting backoff");
                    trigger.reset().await;
                    self.backoff.reset_failures();
                    return true;
                }
            }
        }
        true
    }

    /// Cooperative sleep: returns false if the stop signal fired during it.
    async fn pause(&mut self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.stopped();
        }
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = self.stop.changed() => {
                    if changed.is_err() || *self.stop.borrow() {
                        return false;
                    }
                }
            }
        }
    }

    fn stopped(&self) -> bool {
        *self.stop.borrow()
    }
}
