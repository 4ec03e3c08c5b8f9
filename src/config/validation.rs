//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, capacities > 0)
//! - Validate URLs and socket addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::WatchConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &WatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let poller = &config.poller;

    if let Err(msg) = check_http_url(&poller.endpoint) {
        errors.push(ValidationError::new("poller.endpoint", msg));
    }
    if let Some(fallback) = &poller.fallback_endpoint {
        if let Err(msg) = check_http_url(fallback) {
            errors.push(ValidationError::new("poller.fallback_endpoint", msg));
        }
    }
    if poller.timeout_ms == 0 {
        errors.push(ValidationError::new("poller.timeout_ms", "must be greater than 0"));
    }
    if poller.history_size == 0 {
        errors.push(ValidationError::new("poller.history_size", "must be greater than 0"));
    }
    if let Some(pointer) = &poller.rate_limit_pointer {
        if !pointer.is_empty() && !pointer.starts_with('/') {
            errors.push(ValidationError::new(
                "poller.rate_limit_pointer",
                format!("'{}' is not a JSON pointer (must start with '/')", pointer),
            ));
        }
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.tracker.sample_capacity == 0 {
        errors.push(ValidationError::new("tracker.sample_capacity", "must be greater than 0"));
    }

    let obs = &config.observability;
    if obs.log_format != "pretty" && obs.log_format != "json" {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}' (expected 'pretty' or 'json')", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "admin.bind_address",
            format!("'{}' is not a socket address", config.admin.bind_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&WatchConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = WatchConfig::default();
        config.poller.endpoint = "ftp://example.com/health".into();
        config.poller.timeout_ms = 0;
        config.poller.history_size = 0;
        config.retries.base_delay_ms = 5_000;
        config.observability.log_format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "poller.endpoint",
                "poller.timeout_ms",
                "poller.history_size",
                "retries.base_delay_ms",
                "observability.log_format",
            ]
        );
    }

    #[test]
    fn test_rate_limit_pointer_shape() {
        let mut config = WatchConfig::default();
        config.poller.rate_limit_pointer = Some("rate_limiting.github.remaining".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "poller.rate_limit_pointer");

        config.poller.rate_limit_pointer = None;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_addresses_checked_only_when_enabled() {
        let mut config = WatchConfig::default();
        config.admin.bind_address = "not-an-address".into();
        assert!(validate_config(&config).is_ok());

        config.admin.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
