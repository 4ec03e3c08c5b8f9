//! Derived poller state.
//!
//! # Invariants
//! - `consecutive_failures` is the length of the trailing run of offline
//!   snapshots; any other status resets it to 0
//! - `latency_avg_ms` is recomputed from the whole history on every fold,
//!   never kept as a running sum

use serde::{Deserialize, Serialize};

use crate::health::snapshot::{HealthSnapshot, HealthStatus, History};

/// Aggregate view of the most recent checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerState {
    pub status: HealthStatus,
    pub last_checked: Option<u64>,
    pub latency_ms: Option<u64>,
    pub latency_avg_ms: Option<u64>,
    pub consecutive_failures: u32,
    pub last_success_at: Option<u64>,
    pub last_failure_at: Option<u64>,
    pub last_error: Option<String>,
    pub error_type: Option<String>,
    pub fallback_active: bool,
    pub endpoint: Option<String>,
}

impl Default for PollerState {
    fn default() -> Self {
        Self {
            status: HealthStatus::Checking,
            last_checked: None,
            latency_ms: None,
            latency_avg_ms: None,
            consecutive_failures: 0,
            last_success_at: None,
            last_failure_at: None,
            last_error: None,
            error_type: None,
            fallback_active: false,
            endpoint: None,
        }
    }
}

impl PollerState {
    /// Initial state recovered from a persisted snapshot.
    ///
    /// A snapshot still marked `checking` carries no information and yields
    /// the default state.
    pub fn seeded(snapshot: &HealthSnapshot) -> Self {
        if snapshot.status == HealthStatus::Checking {
            return Self::default();
        }

        let mut state = Self::default();
        state.apply_latest(snapshot);
        if snapshot.status == HealthStatus::Offline {
            state.consecutive_failures = 1;
            state.last_failure_at = Some(snapshot.timestamp);
        } else {
            state.last_success_at = Some(snapshot.timestamp);
        }
        state
    }

    /// Fold a new snapshot in. `history` must already contain it.
    pub fn apply(&mut self, snapshot: &HealthSnapshot, history: &History) {
        self.apply_latest(snapshot);
        self.latency_avg_ms = history.latency_average();

        if snapshot.status == HealthStatus::Offline {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            self.last_failure_at = Some(snapshot.timestamp);
        } else {
            self.consecutive_failures = 0;
            self.last_success_at = Some(snapshot.timestamp);
        }
    }

    fn apply_latest(&mut self, snapshot: &HealthSnapshot) {
        self.status = snapshot.status;
        self.last_checked = Some(snapshot.timestamp);
        self.latency_ms = snapshot.latency_ms;
        self.last_error = snapshot.error.clone();
        self.error_type = snapshot.error_type.clone();
        self.fallback_active = snapshot.fallback_active;
        self.endpoint = snapshot.endpoint.clone();
    }
}
