//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the watcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for health-watch.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WatchConfig {
    /// Health poller settings.
    pub poller: PollerConfig,

    /// Retry backoff used by the HTTP transport.
    pub retries: RetryConfig,

    /// Snapshot persistence settings.
    pub storage: StorageConfig,

    /// Connection tracker settings.
    pub tracker: TrackerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin inspection endpoint.
    pub admin: AdminConfig,
}

/// Health poller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Health endpoint URL.
    pub endpoint: String,

    /// Secondary endpoint tried when the primary fails and `use_fallback` is set.
    pub fallback_endpoint: Option<String>,

    /// Automatic polling interval in milliseconds. `0` disables the timer.
    pub poll_interval_ms: u64,

    /// Per-attempt request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Retries after the first attempt.
    pub retry_attempts: u32,

    /// Allow the transport to fall back to `fallback_endpoint`.
    pub use_fallback: bool,

    /// Number of snapshots kept in history.
    pub history_size: usize,

    /// Persist the latest snapshot after every check.
    pub persist_snapshots: bool,

    /// Start polling as soon as the poller is built.
    pub auto_start: bool,

    /// JSON pointer to a rate-limit "remaining" count in the health payload.
    /// A value at or below zero classifies the check as degraded.
    pub rate_limit_pointer: Option<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/health".to_string(),
            fallback_endpoint: None,
            poll_interval_ms: 45_000,
            timeout_ms: 10_000,
            retry_attempts: 2,
            use_fallback: true,
            history_size: 25,
            persist_snapshots: true,
            auto_start: true,
            rate_limit_pointer: Some("/rate_limiting/github/remaining".to_string()),
        }
    }
}

/// Retry backoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding per-session snapshot files.
    pub dir: String,

    /// Session identifier. A fresh UUID is used when absent.
    pub session_id: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: ".health-watch".to_string(),
            session_id: None,
        }
    }
}

/// Connection tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Capacity of the rolling latency window.
    pub sample_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { sample_capacity: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin inspection endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin endpoint.
    pub enabled: bool,

    /// Admin endpoint bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.poller.poll_interval_ms, 45_000);
        assert_eq!(config.poller.history_size, 25);
        assert_eq!(config.tracker.sample_capacity, 60);
        assert!(config.poller.persist_snapshots);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_minimal_toml() {
        let config: WatchConfig = toml::from_str(
            r#"
            [poller]
            endpoint = "https://api.example.com/health"
            poll_interval_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.poller.endpoint, "https://api.example.com/health");
        assert_eq!(config.poller.poll_interval_ms, 0);
        // Unspecified fields fall back to defaults
        assert_eq!(config.poller.timeout_ms, 10_000);
        assert_eq!(config.retries.base_delay_ms, 200);
    }
}
