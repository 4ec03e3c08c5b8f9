//! Connection state types.
//!
//! # Stream transitions
//! ```text
//! open-attempt         → connecting
//! open                 → connected     (stream up, reconnect attempts cleared)
//! error                → reconnecting  (stream down)
//! close                → offline       (stream down)
//! reconnect            → reconnecting
//! message, reconnect-scheduled, parse-error leave status untouched
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Current belief about connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Initializing,
    Connecting,
    Connected,
    Reconnecting,
    Offline,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Initializing => "initializing",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
            ConnectionStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle event reported by a streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamEvent {
    OpenAttempt,
    Open,
    Message,
    Error,
    Close,
    Reconnect,
    ReconnectScheduled,
    ParseError,
}

impl StreamEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEvent::OpenAttempt => "open-attempt",
            StreamEvent::Open => "open",
            StreamEvent::Message => "message",
            StreamEvent::Error => "error",
            StreamEvent::Close => "close",
            StreamEvent::Reconnect => "reconnect",
            StreamEvent::ReconnectScheduled => "reconnect-scheduled",
            StreamEvent::ParseError => "parse-error",
        }
    }
}

/// Returned when a stream event name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStreamEvent(pub String);

impl fmt::Display for UnknownStreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stream event '{}'", self.0)
    }
}

impl std::error::Error for UnknownStreamEvent {}

impl FromStr for StreamEvent {
    type Err = UnknownStreamEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open-attempt" => Ok(StreamEvent::OpenAttempt),
            "open" => Ok(StreamEvent::Open),
            "message" => Ok(StreamEvent::Message),
            "error" => Ok(StreamEvent::Error),
            "close" => Ok(StreamEvent::Close),
            "reconnect" => Ok(StreamEvent::Reconnect),
            "reconnect-scheduled" => Ok(StreamEvent::ReconnectScheduled),
            "parse-error" => Ok(StreamEvent::ParseError),
            other => Err(UnknownStreamEvent(other.to_string())),
        }
    }
}

/// Connectivity bookkeeping owned by a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Results are synthesized rather than live.
    pub using_mock_data: bool,
    pub consecutive_failures: u32,
    pub reconnect_attempts: u32,
    /// Streaming channel state, independent of request status.
    pub stream_connected: bool,
    pub last_error: Option<String>,
    pub last_success_at: Option<u64>,
    pub last_failure_at: Option<u64>,
    pub last_latency_ms: Option<f64>,
    pub reconnect_scheduled_at: Option<u64>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Initializing,
            using_mock_data: false,
            consecutive_failures: 0,
            reconnect_attempts: 0,
            stream_connected: false,
            last_error: None,
            last_success_at: None,
            last_failure_at: None,
            last_latency_ms: None,
            reconnect_scheduled_at: None,
        }
    }
}

/// Cumulative request and stream counters with derived latency figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub timeout_count: u64,
    pub total_requests: u64,
    pub average_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub stream_event_count: u64,
    pub stream_reconnects: u64,
    pub last_heartbeat_at: Option<u64>,
    pub last_failure_reason: Option<String>,
}

/// Point-in-time copy of a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub connection: ConnectionState,
    pub performance: PerformanceSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_event_names() {
        for event in [
            StreamEvent::OpenAttempt,
            StreamEvent::Open,
            StreamEvent::Message,
            StreamEvent::Error,
            StreamEvent::Close,
            StreamEvent::Reconnect,
            StreamEvent::ReconnectScheduled,
            StreamEvent::ParseError,
        ] {
            assert_eq!(event.as_str().parse::<StreamEvent>(), Ok(event));
        }
        assert_eq!(
            "heartbeat".parse::<StreamEvent>(),
            Err(UnknownStreamEvent("heartbeat".into()))
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Reconnecting).unwrap();
        assert_eq!(json, "\"reconnecting\"");
    }
}
