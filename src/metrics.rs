// ABOUTME: Counter helpers for the metrics facade.
// ABOUTME: Names are stable; callers record events, exporters are someone else's problem.

use warden_core::throttle::ResponseKind;

pub fn record_message_processed() {
    metrics::counter!("warden_messages_processed_total").increment(1);
}

pub fn record_response_sent(kind: ResponseKind) {
    metrics::counter!("warden_responses_sent_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_response_refused(kind: ResponseKind) {
    metrics::counter!("warden_responses_refused_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_acquisition_failure() {
    metrics::counter!("warden_acquisition_failures_total").increment(1);
}

pub fn record_stream_found() {
    metrics::counter!("warden_streams_found_total").increment(1);
}

pub fn record_forced_reconnect() {
    metrics::counter!("warden_forced_reconnects_total").increment(1);
}

pub fn record_session_ended() {
    metrics::counter!("warden_sessions_ended_total").increment(1);
}

pub fn record_moderation_command() {
    metrics::counter!("warden_moderation_commands_total").increment(1);
}
