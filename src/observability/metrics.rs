//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route kind
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_filter_calls_total` (counter): filter calls by endpoint, result
//! - `gateway_filter_duration_seconds` (histogram): filter call latency
//! - `gateway_config_reloads_total` (counter): reloads by result

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, route_kind: &'static str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route_kind
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route_kind)
        .record(start.elapsed().as_secs_f64());
}

/// `result` is the filter's status code, or "error"/"timeout".
pub fn record_filter_call(endpoint: &str, result: &str, start: Instant) {
    metrics::counter!(
        "gateway_filter_calls_total",
        "endpoint" => endpoint.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_filter_duration_seconds", "endpoint" => endpoint.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("gateway_config_reloads_total", "result" => result).increment(1);
}
