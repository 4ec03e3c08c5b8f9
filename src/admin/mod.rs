//! Read-only admin endpoint.
//!
//! # Routes
//! - `GET /status`   → current `PollerState`
//! - `GET /history`  → retained snapshots, oldest first
//! - `GET /debug`    → latest `DebugView` (404 before the first check)
//! - `GET /tracker`  → `TrackerSnapshot` fed from completed checks
//! - `POST /refresh` → run or join a check, return its snapshot

pub mod handlers;

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::health::{DebugMirror, HealthPoller, HealthSnapshot, HealthStatus, PollerObserver, PollerState};
use crate::tracker::{ConnectionStatus, ConnectionTracker};

use self::handlers::*;

/// Shared handles for admin handlers.
///
/// The poller sits behind `ArcSwap` so a config reload can replace it.
#[derive(Clone)]
pub struct AppState {
    pub poller: Arc<ArcSwap<HealthPoller>>,
    pub mirror: Arc<DebugMirror>,
    pub tracker: Arc<Mutex<ConnectionTracker>>,
}

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/history", get(get_history))
        .route("/debug", get(get_debug))
        .route("/tracker", get(get_tracker))
        .route("/refresh", post(post_refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Feeds completed health checks into a [`ConnectionTracker`].
pub struct TrackerFeed {
    tracker: Arc<Mutex<ConnectionTracker>>,
}

impl TrackerFeed {
    pub fn new(tracker: Arc<Mutex<ConnectionTracker>>) -> Self {
        Self { tracker }
    }
}

impl PollerObserver for TrackerFeed {
    fn on_update(&self, _state: &PollerState, snapshot: &HealthSnapshot) {
        let mut tracker = self.tracker.lock().expect("tracker mutex poisoned");
        let latency = snapshot.latency_ms.map_or(f64::NAN, |ms| ms as f64);
        match snapshot.status {
            HealthStatus::Online | HealthStatus::Degraded => {
                tracker.record_success(latency);
                if snapshot.fallback_active {
                    tracker.record_fallback("Health served by fallback endpoint");
                }
            }
            HealthStatus::Offline => {
                let message = snapshot.error.as_deref().unwrap_or("Health check failed");
                let is_timeout = snapshot.error_type.as_deref() == Some("timeout");
                tracker.record_failure(latency, message, is_timeout);
                tracker.set_status(ConnectionStatus::Offline);
            }
            HealthStatus::Checking => {}
        }
    }
}
