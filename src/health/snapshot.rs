//! Health snapshots and the bounded history they accumulate in.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of snapshots retained.
pub const DEFAULT_HISTORY_SIZE: usize = 25;

/// Classified outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No check has completed yet.
    Checking,
    Online,
    Degraded,
    Offline,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Checking => "checking",
            HealthStatus::Online => "online",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable observation of a health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// Completion time, epoch milliseconds.
    pub timestamp: u64,
    pub status: HealthStatus,
    /// Round-trip time; absent when the check failed before measuring.
    #[serde(rename = "latency", default)]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Opaque environment info from the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Value>,
    #[serde(default)]
    pub fallback_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Insertion-ordered snapshots, newest last, capped at `capacity`.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HealthSnapshot>,
    capacity: usize,
}

impl History {
    /// Capacity is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting from the front while over capacity.
    pub fn push(&mut self, snapshot: HealthSnapshot) {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&HealthSnapshot> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HealthSnapshot> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HealthSnapshot> {
        self.entries.iter().cloned().collect()
    }

    /// Rounded mean over every retained snapshot that carries a latency.
    pub fn latency_average(&self) -> Option<u64> {
        let (sum, count) = self
            .entries
            .iter()
            .filter_map(|s| s.latency_ms)
            .fold((0u128, 0u64), |(sum, count), ms| (sum + u128::from(ms), count + 1));

        if count == 0 {
            return None;
        }
        Some((sum as f64 / count as f64).round() as u64)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(status: HealthStatus, latency_ms: Option<u64>) -> HealthSnapshot {
        HealthSnapshot {
            timestamp: 1,
            status,
            latency_ms,
            error: None,
            error_type: None,
            diagnostics: None,
            fallback_active: false,
            endpoint: None,
        }
    }

    #[test]
    fn test_history_is_capped() {
        let mut history = History::new(3);
        for i in 0..10 {
            history.push(snap(HealthStatus::Online, Some(i)));
            assert!(history.len() <= 3);
            assert_eq!(history.latest().unwrap().latency_ms, Some(i));
        }
        let kept: Vec<_> = history.iter().map(|s| s.latency_ms.unwrap()).collect();
        assert_eq!(kept, vec![7, 8, 9]);
    }

    #[test]
    fn test_latency_average_skips_missing() {
        let mut history = History::default();
        assert_eq!(history.latency_average(), None);

        history.push(snap(HealthStatus::Offline, None));
        assert_eq!(history.latency_average(), None);

        history.push(snap(HealthStatus::Online, Some(100)));
        history.push(snap(HealthStatus::Online, Some(101)));
        history.push(snap(HealthStatus::Offline, None));
        // 100.5 rounds up
        assert_eq!(history.latency_average(), Some(101));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = HealthSnapshot {
            error: Some("timeout".into()),
            error_type: Some("timeout".into()),
            fallback_active: true,
            ..snap(HealthStatus::Offline, None)
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "offline");
        assert_eq!(json["errorType"], "timeout");
        assert_eq!(json["fallbackActive"], true);
        assert!(json["latency"].is_null());

        let back: HealthSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
