//! Connection and performance tracking.
//!
//! # Data Flow
//! ```text
//! Caller performing requests:
//!     → record_success / record_failure / record_fallback
//!     → counters + rolling latency window (window.rs)
//!
//! Caller managing a stream:
//!     → record_stream_event (state.rs transition table)
//!
//! Presentation:
//!     → snapshot() (aggregates recomputed on every call)
//! ```
//!
//! # Design Decisions
//! - Independent of the health poller; any caller may own one
//! - Single owner, `&mut self` mutation; wrap in a lock to share
//! - Percentiles come from a bounded window, counters are cumulative

pub mod state;
pub mod window;

use crate::clock::now_millis;
use crate::config::TrackerConfig;
use crate::observability::metrics;

pub use state::{
    ConnectionState, ConnectionStatus, PerformanceSnapshot, StreamEvent, TrackerSnapshot,
    UnknownStreamEvent,
};
pub use window::{RollingWindow, DEFAULT_SAMPLE_CAPACITY};

const STREAM_ERROR_MESSAGE: &str = "Stream connection error";
const PARSE_ERROR_MESSAGE: &str = "Failed to parse stream payload";

/// Accumulates connection status and request performance.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    connection: ConnectionState,
    successful_requests: u64,
    failed_requests: u64,
    timeout_count: u64,
    stream_event_count: u64,
    stream_reconnects: u64,
    last_heartbeat_at: Option<u64>,
    last_failure_reason: Option<String>,
    samples: RollingWindow,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SAMPLE_CAPACITY)
    }

    pub fn with_capacity(sample_capacity: usize) -> Self {
        Self {
            connection: ConnectionState::default(),
            successful_requests: 0,
            failed_requests: 0,
            timeout_count: 0,
            stream_event_count: 0,
            stream_reconnects: 0,
            last_heartbeat_at: None,
            last_failure_reason: None,
            samples: RollingWindow::new(sample_capacity),
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::with_capacity(config.sample_capacity)
    }

    /// A request completed successfully.
    pub fn record_success(&mut self, latency_ms: f64) {
        self.successful_requests += 1;
        self.samples.push(latency_ms);

        let conn = &mut self.connection;
        conn.status = ConnectionStatus::Connected;
        conn.using_mock_data = false;
        conn.last_error = None;
        conn.consecutive_failures = 0;
        conn.reconnect_attempts = 0;
        conn.last_success_at = Some(now_millis());
        if latency_ms.is_finite() {
            conn.last_latency_ms = Some(latency_ms);
        }

        metrics::record_tracker_request("success");
    }

    /// A request failed. Status is left to the caller.
    pub fn record_failure(&mut self, latency_ms: f64, message: &str, is_timeout: bool) {
        self.failed_requests += 1;
        if is_timeout {
            self.timeout_count += 1;
        }
        self.samples.push(latency_ms);
        self.last_failure_reason = Some(message.to_string());

        let conn = &mut self.connection;
        conn.consecutive_failures += 1;
        conn.last_error = Some(message.to_string());
        conn.last_failure_at = Some(now_millis());
        if latency_ms.is_finite() {
            conn.last_latency_ms = Some(latency_ms);
        }

        tracing::debug!(
            error = message,
            timeout = is_timeout,
            consecutive_failures = conn.consecutive_failures,
            "Tracked request failure"
        );
        metrics::record_tracker_request(if is_timeout { "timeout" } else { "failure" });
    }

    /// Connectivity came back. `"stream"` also marks the stream as up.
    pub fn record_recovery(&mut self, context: &str) {
        let conn = &mut self.connection;
        conn.consecutive_failures = 0;
        conn.reconnect_attempts = 0;
        conn.last_error = None;

        if context == "stream" {
            conn.stream_connected = true;
            self.last_heartbeat_at = Some(now_millis());
        }
        tracing::info!(context, "Connection recovered");
    }

    /// Results are now being synthesized instead of fetched live.
    pub fn record_fallback(&mut self, reason: &str) {
        self.connection.using_mock_data = true;
        self.connection.last_error = Some(reason.to_string());
        self.last_failure_reason = Some(reason.to_string());
        tracing::warn!(reason, "Serving fallback data");
    }

    /// Apply one stream lifecycle event.
    pub fn record_stream_event(&mut self, event: StreamEvent) {
        self.stream_event_count += 1;
        let now = now_millis();
        let conn = &mut self.connection;

        match event {
            StreamEvent::OpenAttempt => {
                conn.status = ConnectionStatus::Connecting;
            }
            StreamEvent::Open => {
                conn.status = ConnectionStatus::Connected;
                conn.stream_connected = true;
                conn.reconnect_attempts = 0;
                conn.last_error = None;
            }
            StreamEvent::Message => {
                self.last_heartbeat_at = Some(now);
            }
            StreamEvent::Error => {
                conn.status = ConnectionStatus::Reconnecting;
                conn.stream_connected = false;
                conn.last_error = Some(STREAM_ERROR_MESSAGE.to_string());
            }
            StreamEvent::Close => {
                conn.status = ConnectionStatus::Offline;
                conn.stream_connected = false;
            }
            StreamEvent::Reconnect => {
                conn.status = ConnectionStatus::Reconnecting;
                conn.reconnect_attempts += 1;
                conn.reconnect_scheduled_at = Some(now);
                self.stream_reconnects += 1;
            }
            StreamEvent::ReconnectScheduled => {
                conn.reconnect_scheduled_at = Some(now);
            }
            StreamEvent::ParseError => {
                conn.last_error = Some(PARSE_ERROR_MESSAGE.to_string());
            }
        }

        metrics::record_stream_event(event.as_str());
    }

    /// Apply a stream event by name. Unknown names are ignored.
    pub fn record_stream_event_named(&mut self, name: &str) {
        match name.parse::<StreamEvent>() {
            Ok(event) => self.record_stream_event(event),
            Err(e) => tracing::debug!(error = %e, "Ignoring stream event"),
        }
    }

    pub fn reset_retries(&mut self) {
        self.connection.consecutive_failures = 0;
        self.connection.reconnect_attempts = 0;
    }

    pub fn increment_retries(&mut self) {
        self.connection.reconnect_attempts += 1;
    }

    /// Override the status. `Offline` also takes the stream down.
    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.connection.status = status;
        if status == ConnectionStatus::Offline {
            self.connection.stream_connected = false;
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status
    }

    /// Owned copy of the current state with aggregates computed now.
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            connection: self.connection.clone(),
            performance: PerformanceSnapshot {
                successful_requests: self.successful_requests,
                failed_requests: self.failed_requests,
                timeout_count: self.timeout_count,
                total_requests: self.successful_requests + self.failed_requests,
                average_latency_ms: self.samples.mean(),
                p95_latency_ms: self.samples.percentile(95.0),
                stream_event_count: self.stream_event_count,
                stream_reconnects: self.stream_reconnects,
                last_heartbeat_at: self.last_heartbeat_at,
                last_failure_reason: self.last_failure_reason.clone(),
            },
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
