//! Prometheus metrics

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ServerError;

/// Install the Prometheus recorder. The handle renders `/metrics`.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("failed to install metrics recorder: {}", e)))
}

pub fn record_session_opened(role: &str) {
    counter!("gateway_sessions_opened_total", "role" => role.to_string()).increment(1);
}

pub fn record_session_closed() {
    counter!("gateway_sessions_closed_total").increment(1);
}

pub fn record_tool_call(tool: &str) {
    counter!("gateway_tool_calls_total", "tool" => tool.to_string()).increment(1);
}

pub fn record_handoff(target: &str) {
    counter!("gateway_handoffs_total", "target" => target.to_string()).increment(1);
}

pub fn record_malformed_event() {
    counter!("gateway_malformed_upstream_events_total").increment(1);
}

pub fn record_upstream_connect_failure() {
    counter!("gateway_upstream_connect_failures_total").increment(1);
}
