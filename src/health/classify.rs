//! Status classification.
//!
//! ```text
//! transport failed                      → offline
//! body status present, not "healthy"    → degraded
//! rate-limit remaining present and <= 0 → degraded
//! otherwise                             → online
//! ```

use serde_json::Value;

use crate::health::snapshot::HealthStatus;
use crate::transport::TransportResponse;

/// Typed view of a transport result, all classification needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationInput {
    pub http_ok: bool,
    /// `status` field reported by the backend payload itself.
    pub body_status: Option<String>,
    /// Remaining rate-limit budget, when the payload reports one.
    pub rate_remaining: Option<f64>,
}

impl ClassificationInput {
    /// Adapt a transport response, probing the payload for rate-limit data.
    pub fn from_response(response: &TransportResponse, probe: &RateLimitProbe) -> Self {
        let data = response.data.as_ref();
        Self {
            http_ok: response.ok,
            body_status: data
                .and_then(|d| d.get("status"))
                .and_then(Value::as_str)
                .map(str::to_string),
            rate_remaining: data.and_then(|d| probe.remaining(d)),
        }
    }
}

/// Locates a rate-limit "remaining" count inside a health payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitProbe {
    pointer: Option<String>,
}

impl RateLimitProbe {
    /// `pointer` is an RFC 6901 JSON pointer; `None` or empty disables the probe.
    pub fn new(pointer: Option<String>) -> Self {
        Self {
            pointer: pointer.filter(|p| !p.is_empty()),
        }
    }

    pub fn disabled() -> Self {
        Self { pointer: None }
    }

    pub fn remaining(&self, data: &Value) -> Option<f64> {
        let pointer = self.pointer.as_deref()?;
        data.pointer(pointer).and_then(Value::as_f64)
    }
}

/// Result of classification, with a reason for degraded outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: HealthStatus,
    pub reason: Option<String>,
    pub error_type: Option<&'static str>,
}

impl Classification {
    fn of(status: HealthStatus) -> Self {
        Self {
            status,
            reason: None,
            error_type: None,
        }
    }
}

pub fn classify(input: &ClassificationInput) -> Classification {
    if !input.http_ok {
        return Classification::of(HealthStatus::Offline);
    }

    if let Some(status) = input.body_status.as_deref() {
        if !status.eq_ignore_ascii_case("healthy") {
            return Classification {
                status: HealthStatus::Degraded,
                reason: Some(format!("Backend reported status '{}'", status)),
                error_type: Some("backend_status"),
            };
        }
    }

    if let Some(remaining) = input.rate_remaining {
        if remaining <= 0.0 {
            return Classification {
                status: HealthStatus::Degraded,
                reason: Some("Rate limit exhausted".to_string()),
                error_type: Some("rate_limited"),
            };
        }
    }

    Classification::of(HealthStatus::Online)
}
