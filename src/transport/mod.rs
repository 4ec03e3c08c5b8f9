//! Transport boundary for health checks.
//!
//! # Responsibilities
//! - Define the request/response contract the poller consumes
//! - Own timeouts, retries and fallback endpoints
//!
//! # Design Decisions
//! - The poller never retries or times out on its own; it only reads the
//!   outcome the transport already decided
//! - Failures are normally folded into a `TransportResponse` with
//!   `ok = false`; `Err` is reserved for calls that could not be attempted

pub mod http;

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use http::HttpTransport;

/// Parameters of one health call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub endpoint: String,
    /// Per-attempt deadline.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub retry_attempts: u32,
    /// Permit a degraded/fallback path when the primary fails.
    pub use_fallback: bool,
}

/// Outcome of one health call, after retries and fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    /// The call succeeded (2xx with a readable response).
    pub ok: bool,
    /// Parsed JSON body, when the body was JSON.
    pub data: Option<Value>,
    /// HTTP status of the final attempt.
    pub status: Option<u16>,
    /// Round-trip time of the final attempt.
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub error_type: Option<String>,
    /// Endpoint that produced this response.
    pub endpoint: Option<String>,
    pub diagnostics: Option<Value>,
    /// Response was served by the fallback path.
    pub fallback_used: bool,
}

impl TransportResponse {
    /// A failed call with the given error and class.
    pub fn failure(endpoint: &str, error: impl Into<String>, error_type: &str) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            error_type: Some(error_type.to_string()),
            endpoint: Some(endpoint.to_string()),
            ..Self::default()
        }
    }
}

/// Errors a transport may raise instead of answering.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Something that can perform a health call.
pub trait Transport: Send + Sync {
    fn call(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse, TransportError>>;
}
