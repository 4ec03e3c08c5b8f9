//! Metrics collection and exposition.
//!
//! # Metrics
//! - `health_checks_total` (counter): completed checks by status
//! - `health_check_latency_ms` (histogram): check round-trip time
//! - `health_consecutive_failures` (gauge): trailing offline run
//! - `health_store_errors_total` (counter): snapshot store failures by op
//! - `tracker_requests_total` (counter): tracked requests by outcome
//! - `tracker_stream_events_total` (counter): stream events by kind

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_health_check(status: &'static str, latency_ms: Option<u64>, consecutive_failures: u32) {
    counter!("health_checks_total", "status" => status).increment(1);
    if let Some(ms) = latency_ms {
        histogram!("health_check_latency_ms").record(ms as f64);
    }
    gauge!("health_consecutive_failures").set(f64::from(consecutive_failures));
}

pub fn record_store_error(op: &'static str) {
    counter!("health_store_errors_total", "op" => op).increment(1);
}

pub fn record_tracker_request(outcome: &'static str) {
    counter!("tracker_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_stream_event(event: &'static str) {
    counter!("tracker_stream_events_total", "event" => event).increment(1);
}
