use axum::{extract::State, http::StatusCode, Json};

use crate::admin::AppState;
use crate::health::{DebugView, HealthSnapshot, PollerState};
use crate::tracker::TrackerSnapshot;

pub async fn get_status(State(state): State<AppState>) -> Json<PollerState> {
    Json(state.poller.load().state())
}

pub async fn get_history(State(state): State<AppState>) -> Json<Vec<HealthSnapshot>> {
    Json(state.poller.load().history())
}

pub async fn get_debug(State(state): State<AppState>) -> Result<Json<DebugView>, StatusCode> {
    state
        .mirror
        .latest()
        .map(|view| Json(view.as_ref().clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_tracker(State(state): State<AppState>) -> Json<TrackerSnapshot> {
    let snapshot = state.tracker.lock().expect("tracker mutex poisoned").snapshot();
    Json(snapshot)
}

pub async fn post_refresh(State(state): State<AppState>) -> Json<HealthSnapshot> {
    let poller = state.poller.load_full();
    Json(poller.refresh(None).await)
}
