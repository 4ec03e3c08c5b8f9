//! End-to-end health checks through HttpTransport.

mod common;

use std::sync::Arc;

use common::{closed_port, health_url, start_mock_backend, start_programmable_backend};
use health_watch::config::{PollerConfig, RetryConfig};
use health_watch::health::{CheckOverrides, HealthPoller, HealthStatus, MemorySnapshotStore, SnapshotStore};
use health_watch::transport::HttpTransport;

fn poller_config(endpoint: String) -> PollerConfig {
    PollerConfig {
        endpoint,
        retry_attempts: 0,
        timeout_ms: 2_000,
        persist_snapshots: false,
        auto_start: false,
        ..PollerConfig::default()
    }
}

fn poller(config: PollerConfig) -> HealthPoller {
    let retry = RetryConfig {
        base_delay_ms: 10,
        max_delay_ms: 20,
    };
    let transport = HttpTransport::new(retry, config.fallback_endpoint.clone()).unwrap();
    HealthPoller::builder(Arc::new(transport)).config(config).build()
}

#[tokio::test]
async fn test_online() {
    let addr = start_mock_backend(r#"{"status":"healthy"}"#).await;
    let poller = poller(poller_config(health_url(addr)));

    let snapshot = poller.refresh(None).await;

    assert_eq!(snapshot.status, HealthStatus::Online);
    assert!(snapshot.latency_ms.is_some());
    assert!(snapshot.error.is_none());
    assert!(!snapshot.fallback_active);

    let state = poller.state();
    assert_eq!(state.status, HealthStatus::Online);
    assert_eq!(state.consecutive_failures, 0);
    assert!(state.last_success_at.is_some());
    assert_eq!(state.latency_avg_ms, snapshot.latency_ms);
}

#[tokio::test]
async fn test_backend_reports_degraded() {
    let addr = start_mock_backend(r#"{"status":"maintenance"}"#).await;
    let poller = poller(poller_config(health_url(addr)));

    let snapshot = poller.refresh(None).await;

    assert_eq!(snapshot.status, HealthStatus::Degraded);
    assert_eq!(snapshot.error_type.as_deref(), Some("backend_status"));
    assert!(snapshot.error.unwrap().contains("maintenance"));
    assert_eq!(poller.state().consecutive_failures, 0);
}

#[tokio::test]
async fn test_rate_limit_exhausted() {
    let addr = start_mock_backend(
        r#"{"status":"healthy","rate_limiting":{"github":{"remaining":0,"limit":5000}}}"#,
    )
    .await;
    let poller = poller(poller_config(health_url(addr)));

    let snapshot = poller.refresh(None).await;

    assert_eq!(snapshot.status, HealthStatus::Degraded);
    assert_eq!(snapshot.error_type.as_deref(), Some("rate_limited"));
}

#[tokio::test]
async fn test_offline_counts_failures() {
    let addr = closed_port().await;
    let poller = poller(poller_config(health_url(addr)));

    poller.refresh(None).await;
    let snapshot = poller.refresh(None).await;

    assert_eq!(snapshot.status, HealthStatus::Offline);
    assert_eq!(snapshot.error_type.as_deref(), Some("network"));
    assert!(snapshot.latency_ms.is_some());

    let state = poller.state();
    assert_eq!(state.consecutive_failures, 2);
    assert!(state.last_failure_at.is_some());
    assert!(state.last_success_at.is_none());
    assert_eq!(poller.history().len(), 2);
}

#[tokio::test]
async fn test_server_error_is_offline() {
    let addr = start_programmable_backend(|| async { (500, r#"{"status":"error"}"#.to_string()) }).await;
    let poller = poller(poller_config(health_url(addr)));

    let snapshot = poller.refresh(None).await;

    assert_eq!(snapshot.status, HealthStatus::Offline);
    assert_eq!(snapshot.error_type.as_deref(), Some("http"));
}

#[tokio::test]
async fn test_fallback_marks_snapshot() {
    let primary = closed_port().await;
    let fallback = start_mock_backend(r#"{"status":"healthy"}"#).await;
    let mut config = poller_config(health_url(primary));
    config.fallback_endpoint = Some(health_url(fallback));
    let poller = poller(config);

    let snapshot = poller.refresh(None).await;

    assert_eq!(snapshot.status, HealthStatus::Online);
    assert!(snapshot.fallback_active);
    assert_eq!(snapshot.endpoint.as_deref(), Some(health_url(fallback).as_str()));
    assert!(poller.state().fallback_active);
}

#[tokio::test]
async fn test_recovery_after_outage() {
    let down = closed_port().await;
    let up = start_mock_backend(r#"{"status":"healthy"}"#).await;
    let poller = poller(poller_config(health_url(down)));

    poller.refresh(None).await;
    assert_eq!(poller.state().consecutive_failures, 1);

    let snapshot = poller
        .refresh(Some(CheckOverrides {
            endpoint: Some(health_url(up)),
            ..CheckOverrides::default()
        }))
        .await;

    assert_eq!(snapshot.status, HealthStatus::Online);
    let state = poller.state();
    assert_eq!(state.consecutive_failures, 0);
    assert!(state.last_failure_at.is_some());
    assert!(state.last_success_at.is_some());
}

#[tokio::test]
async fn test_persisted_snapshot_survives_restart() {
    let addr = start_mock_backend(r#"{"status":"healthy"}"#).await;
    let store = Arc::new(MemorySnapshotStore::new());
    let mut config = poller_config(health_url(addr));
    config.persist_snapshots = true;

    let retry = RetryConfig::default();
    let first = HealthPoller::builder(Arc::new(HttpTransport::new(retry.clone(), None).unwrap()))
        .config(config.clone())
        .store(store.clone())
        .build();
    let snapshot = first.refresh(None).await;
    first.dispose();
    assert_eq!(store.load().unwrap(), Some(snapshot.clone()));

    let second = HealthPoller::builder(Arc::new(HttpTransport::new(retry, None).unwrap()))
        .config(config)
        .store(store)
        .build();
    let state = second.state();
    assert_eq!(state.status, HealthStatus::Online);
    assert_eq!(state.last_checked, Some(snapshot.timestamp));
    assert!(second.history().is_empty());
}
