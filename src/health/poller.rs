//! Health poller.
//!
//! # Responsibilities
//! - Run health checks on a timer and on demand
//! - Allow at most one check in flight; concurrent callers share its result
//! - Fold each outcome into history and derived state
//! - Persist the latest snapshot and notify observers
//!
//! # Lifecycle
//! ```text
//! build() ─▶ seeded from store ─▶ start() ─▶ tick ─▶ refresh ─▶ fold ─┐
//!                                   ▲                                │
//!                                   └──────── interval ◀─────────────┘
//! stop()    → timer task cancelled
//! dispose() → stop() + late results discarded
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::clock::now_millis;
use crate::config::PollerConfig;
use crate::health::classify::{classify, ClassificationInput, RateLimitProbe};
use crate::health::observer::PollerObserver;
use crate::health::snapshot::{HealthSnapshot, HealthStatus, History};
use crate::health::state::PollerState;
use crate::health::store::SnapshotStore;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::transport::{Transport, TransportRequest, TransportResponse};

const GENERIC_FAILURE: &str = "Health check failed";

/// Per-call overrides for [`HealthPoller::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOverrides {
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub use_fallback: Option<bool>,
    /// Persist this check's snapshot (defaults to `persist_snapshots`).
    pub persist: Option<bool>,
}

type PendingCheck = Shared<BoxFuture<'static, HealthSnapshot>>;

enum Flight {
    Idle,
    InFlight { id: u64, pending: PendingCheck },
}

impl Flight {
    fn is(&self, check: u64) -> bool {
        matches!(self, Flight::InFlight { id, .. } if *id == check)
    }
}

struct Core {
    state: PollerState,
    history: History,
    flight: Flight,
}

struct PollerInner {
    transport: Arc<dyn Transport>,
    config: PollerConfig,
    probe: RateLimitProbe,
    store: Option<Arc<dyn SnapshotStore>>,
    observers: Vec<Arc<dyn PollerObserver>>,
    core: Mutex<Core>,
    state_tx: watch::Sender<PollerState>,
    disposed: AtomicBool,
    transport_calls: AtomicU64,
    next_check: AtomicU64,
}

impl PollerInner {
    // Core stays consistent across a panic: every mutation under the lock is
    // a plain field update.
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a check, or join the one already running.
    fn begin_check(self: &Arc<Self>, overrides: Option<CheckOverrides>) -> PendingCheck {
        let mut core = self.lock();
        if let Flight::InFlight { pending, .. } = &core.flight {
            tracing::debug!("Joining in-flight health check");
            return pending.clone();
        }

        let id = self.next_check.fetch_add(1, Ordering::Relaxed);
        let overrides = overrides.unwrap_or_default();
        let endpoint = self.request_for(&overrides).endpoint;

        // The check runs as its own task so it folds even when every caller
        // goes away. The fold waits on `core`, which is held until the marker
        // below is in place.
        let handle = tokio::spawn(Arc::clone(self).run_check(id, overrides));
        let inner = Arc::clone(self);
        let pending = async move {
            match handle.await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(error = %e, "Health check task failed");
                    {
                        let mut core = inner.lock();
                        if core.flight.is(id) {
                            core.flight = Flight::Idle;
                        }
                    }
                    failure_snapshot(&endpoint, e.to_string(), "unexpected")
                }
            }
        }
        .boxed()
        .shared();
        core.flight = Flight::InFlight {
            id,
            pending: pending.clone(),
        };
        pending
    }

    async fn run_check(self: Arc<Self>, id: u64, overrides: CheckOverrides) -> HealthSnapshot {
        let request = self.request_for(&overrides);
        let endpoint = request.endpoint.clone();
        let persist = overrides.persist.unwrap_or(self.config.persist_snapshots);

        self.transport_calls.fetch_add(1, Ordering::Relaxed);
        let outcome = AssertUnwindSafe(self.transport.call(request))
            .catch_unwind()
            .await;

        let snapshot = match outcome {
            Ok(Ok(response)) => self.snapshot_from(response, &endpoint),
            Ok(Err(e)) => failure_snapshot(&endpoint, e.to_string(), "transport_error"),
            Err(panic) => failure_snapshot(&endpoint, panic_message(panic.as_ref()), "unexpected"),
        };

        self.fold(id, &snapshot, persist);
        snapshot
    }

    fn request_for(&self, overrides: &CheckOverrides) -> TransportRequest {
        TransportRequest {
            endpoint: overrides
                .endpoint
                .clone()
                .unwrap_or_else(|| self.config.endpoint.clone()),
            timeout: Duration::from_millis(overrides.timeout_ms.unwrap_or(self.config.timeout_ms)),
            retry_attempts: overrides.retry_attempts.unwrap_or(self.config.retry_attempts),
            use_fallback: overrides.use_fallback.unwrap_or(self.config.use_fallback),
        }
    }

    fn snapshot_from(&self, response: TransportResponse, requested: &str) -> HealthSnapshot {
        let verdict = classify(&ClassificationInput::from_response(&response, &self.probe));

        let (error, error_type) = match verdict.status {
            HealthStatus::Offline => (
                Some(
                    response
                        .error
                        .filter(|e| !e.is_empty())
                        .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
                ),
                Some(response.error_type.unwrap_or_else(|| "unknown".to_string())),
            ),
            _ => (verdict.reason, verdict.error_type.map(str::to_string)),
        };

        HealthSnapshot {
            timestamp: now_millis(),
            status: verdict.status,
            latency_ms: response.duration_ms,
            error,
            error_type,
            diagnostics: response.diagnostics,
            fallback_active: response.fallback_used,
            endpoint: Some(response.endpoint.unwrap_or_else(|| requested.to_string())),
        }
    }

    /// Apply a finished check. Clears the in-flight marker of check `id`.
    fn fold(&self, id: u64, snapshot: &HealthSnapshot, persist: bool) {
        let (previous, state) = {
            let mut core = self.lock();
            if self.disposed.load(Ordering::Acquire) {
                if core.flight.is(id) {
                    core.flight = Flight::Idle;
                }
                tracing::debug!(status = %snapshot.status, "Poller disposed, discarding health result");
                return;
            }

            let Core { state, history, flight } = &mut *core;
            let previous = state.status;
            history.push(snapshot.clone());
            state.apply(snapshot, history);
            if flight.is(id) {
                *flight = Flight::Idle;
            }
            (previous, state.clone())
        };

        if persist {
            self.persist(snapshot);
        }
        for observer in &self.observers {
            let notified = panic::catch_unwind(AssertUnwindSafe(|| observer.on_update(&state, snapshot)));
            if let Err(payload) = notified {
                tracing::error!(error = %panic_message(payload.as_ref()), "Health observer panicked");
            }
        }
        metrics::record_health_check(
            snapshot.status.as_str(),
            snapshot.latency_ms,
            state.consecutive_failures,
        );
        log_transition(previous, &state);
        self.state_tx.send_replace(state);
    }

    fn persist(&self, snapshot: &HealthSnapshot) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(snapshot) {
            tracing::warn!(error = %e, "Failed to persist health snapshot");
            metrics::record_store_error("save");
        }
    }
}

fn log_transition(previous: HealthStatus, state: &PollerState) {
    if previous == state.status {
        tracing::debug!(
            status = %state.status,
            latency_ms = ?state.latency_ms,
            consecutive_failures = state.consecutive_failures,
            "Health check completed"
        );
        return;
    }

    match state.status {
        HealthStatus::Online => tracing::info!(
            from = %previous,
            endpoint = ?state.endpoint,
            latency_ms = ?state.latency_ms,
            "Backend online"
        ),
        HealthStatus::Degraded => tracing::warn!(
            from = %previous,
            endpoint = ?state.endpoint,
            reason = ?state.last_error,
            "Backend degraded"
        ),
        HealthStatus::Offline => tracing::warn!(
            from = %previous,
            endpoint = ?state.endpoint,
            error = ?state.last_error,
            consecutive_failures = state.consecutive_failures,
            "Backend offline"
        ),
        HealthStatus::Checking => {}
    }
}

fn failure_snapshot(endpoint: &str, error: String, error_type: &str) -> HealthSnapshot {
    let error = if error.is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        error
    };
    HealthSnapshot {
        timestamp: now_millis(),
        status: HealthStatus::Offline,
        latency_ms: None,
        error: Some(error),
        error_type: Some(error_type.to_string()),
        diagnostics: None,
        fallback_active: true,
        endpoint: Some(endpoint.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        GENERIC_FAILURE.to_string()
    }
}

fn load_seed(store: &dyn SnapshotStore) -> Option<HealthSnapshot> {
    match store.load() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring persisted health snapshot");
            metrics::record_store_error("load");
            None
        }
    }
}

/// Builder for [`HealthPoller`].
pub struct HealthPollerBuilder {
    transport: Arc<dyn Transport>,
    config: PollerConfig,
    store: Option<Arc<dyn SnapshotStore>>,
    observers: Vec<Arc<dyn PollerObserver>>,
}

impl HealthPollerBuilder {
    pub fn config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PollerObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the poller, starting it when `auto_start` is set.
    ///
    /// With `auto_start` this must run inside a Tokio runtime.
    pub fn build(self) -> HealthPoller {
        let auto_start = self.config.auto_start;
        let poller = HealthPoller::new(self.transport, self.config, self.store, self.observers);
        if auto_start {
            poller.start();
        }
        poller
    }
}

/// Polls a health endpoint and keeps derived state.
///
/// Dropping the poller disposes it.
pub struct HealthPoller {
    inner: Arc<PollerInner>,
    shutdown: Shutdown,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthPoller {
    pub fn builder(transport: Arc<dyn Transport>) -> HealthPollerBuilder {
        HealthPollerBuilder {
            transport,
            config: PollerConfig::default(),
            store: None,
            observers: Vec::new(),
        }
    }

    fn new(
        transport: Arc<dyn Transport>,
        config: PollerConfig,
        store: Option<Arc<dyn SnapshotStore>>,
        observers: Vec<Arc<dyn PollerObserver>>,
    ) -> Self {
        let seed = if config.persist_snapshots {
            store.as_deref().and_then(load_seed)
        } else {
            None
        };
        let state = match &seed {
            Some(snapshot) => {
                tracing::info!(
                    status = %snapshot.status,
                    checked_at = snapshot.timestamp,
                    "Restored persisted health snapshot"
                );
                PollerState::seeded(snapshot)
            }
            None => PollerState::default(),
        };

        let (state_tx, _) = watch::channel(state.clone());
        let inner = PollerInner {
            transport,
            probe: RateLimitProbe::new(config.rate_limit_pointer.clone()),
            store,
            observers,
            core: Mutex::new(Core {
                state,
                history: History::new(config.history_size),
                flight: Flight::Idle,
            }),
            state_tx,
            disposed: AtomicBool::new(false),
            transport_calls: AtomicU64::new(0),
            next_check: AtomicU64::new(0),
            config,
        };

        Self {
            inner: Arc::new(inner),
            shutdown: Shutdown::new(),
            task: Mutex::new(None),
        }
    }

    /// Run a check now, or join the one already in flight.
    ///
    /// Never fails: transport errors become `offline` snapshots. The check
    /// runs to completion and is folded in even if this future is dropped.
    pub async fn refresh(&self, overrides: Option<CheckOverrides>) -> HealthSnapshot {
        self.inner.begin_check(overrides).await
    }

    /// Spawn the polling task: one check immediately, then one per interval.
    ///
    /// No-op if already running or disposed. Must run inside a Tokio runtime.
    pub fn start(&self) {
        if self.is_disposed() {
            tracing::warn!("Cannot start a disposed health poller");
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let mut shutdown = self.shutdown.subscribe();
        let interval_ms = inner.config.poll_interval_ms;

        tracing::info!(
            endpoint = %inner.config.endpoint,
            interval_ms,
            "Health poller starting"
        );

        *task = Some(tokio::spawn(async move {
            if interval_ms == 0 {
                tokio::select! {
                    _ = inner.begin_check(None) => {}
                    _ = shutdown.recv() => {}
                }
                return;
            }

            let mut ticker = time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        inner.begin_check(None).await;
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Health poller received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        }));
    }

    /// Cancel the polling task. Manual `refresh` keeps working.
    pub fn stop(&self) {
        self.shutdown.trigger();
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Stop for good. Results of checks still in flight are discarded.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop();
        self.inner.lock().flight = Flight::Idle;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn state(&self) -> PollerState {
        self.inner.lock().state.clone()
    }

    /// Retained snapshots, oldest first.
    pub fn history(&self) -> Vec<HealthSnapshot> {
        self.inner.lock().history.to_vec()
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.inner.state_tx.subscribe()
    }

    /// Number of checks that reached the transport.
    pub fn transport_calls(&self) -> u64 {
        self.inner.transport_calls.load(Ordering::Relaxed)
    }
}

impl Drop for HealthPoller {
    fn drop(&mut self) {
        self.dispose();
    }
}
