//! Post-update hooks for external inspection.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

use crate::health::snapshot::{HealthSnapshot, HealthStatus};
use crate::health::state::PollerState;

/// Called after every snapshot is folded into poller state.
///
/// Runs on the task that completed the check; keep it cheap.
pub trait PollerObserver: Send + Sync {
    fn on_update(&self, state: &PollerState, snapshot: &HealthSnapshot);
}

impl<F> PollerObserver for F
where
    F: Fn(&PollerState, &HealthSnapshot) + Send + Sync,
{
    fn on_update(&self, state: &PollerState, snapshot: &HealthSnapshot) {
        self(state, snapshot)
    }
}

/// Flat summary of the latest check for debugging tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugView {
    pub endpoint: Option<String>,
    pub status: HealthStatus,
    pub timestamp: u64,
    pub latency_ms: Option<u64>,
    pub fallback_active: bool,
    pub error_type: Option<String>,
    pub consecutive_failures: u32,
}

/// Observer keeping the latest [`DebugView`], readable without locking.
#[derive(Debug, Default)]
pub struct DebugMirror {
    latest: ArcSwapOption<DebugView>,
}

impl DebugMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first check completes.
    pub fn latest(&self) -> Option<Arc<DebugView>> {
        self.latest.load_full()
    }
}

impl PollerObserver for DebugMirror {
    fn on_update(&self, state: &PollerState, snapshot: &HealthSnapshot) {
        self.latest.store(Some(Arc::new(DebugView {
            endpoint: snapshot.endpoint.clone(),
            status: snapshot.status,
            timestamp: snapshot.timestamp,
            latency_ms: snapshot.latency_ms,
            fallback_active: snapshot.fallback_active,
            error_type: snapshot.error_type.clone(),
            consecutive_failures: state.consecutive_failures,
        })));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_tracks_latest() {
        let mirror = DebugMirror::new();
        assert!(mirror.latest().is_none());

        let snapshot = HealthSnapshot {
            timestamp: 10,
            status: HealthStatus::Offline,
            latency_ms: None,
            error: Some("refused".into()),
            error_type: Some("network".into()),
            diagnostics: None,
            fallback_active: true,
            endpoint: Some("http://api/health".into()),
        };
        let state = PollerState {
            consecutive_failures: 3,
            ..PollerState::default()
        };
        mirror.on_update(&state, &snapshot);

        let view = mirror.latest().unwrap();
        assert_eq!(view.status, HealthStatus::Offline);
        assert_eq!(view.consecutive_failures, 3);
        assert_eq!(view.error_type.as_deref(), Some("network"));
        assert!(view.fallback_active);
    }
}
