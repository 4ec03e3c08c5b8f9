//! HTTP transport built on reqwest.

use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use tokio::time;
use url::Url;

use crate::config::{RetryConfig, WatchConfig};
use crate::resilience::backoff::backoff_for;
use crate::resilience::retries::{is_retryable, AttemptFailure};
use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

const USER_AGENT: &str = concat!("health-watch/", env!("CARGO_PKG_VERSION"));

/// Result of a single attempt against one endpoint.
struct Attempt {
    status: Option<u16>,
    data: Option<Value>,
    duration_ms: u64,
    failure: Option<(AttemptFailure, String)>,
}

/// Result of all attempts against one endpoint.
struct EndpointOutcome {
    response: TransportResponse,
    attempts: u32,
}

/// Health transport performing `GET` requests with retries and fallback.
pub struct HttpTransport {
    client: reqwest::Client,
    retry: RetryConfig,
    fallback_endpoint: Option<String>,
}

impl HttpTransport {
    pub fn new(retry: RetryConfig, fallback_endpoint: Option<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            retry,
            fallback_endpoint,
        })
    }

    pub fn from_config(config: &WatchConfig) -> Result<Self, TransportError> {
        Self::new(config.retries.clone(), config.poller.fallback_endpoint.clone())
    }

    async fn attempt(&self, endpoint: &str, timeout: Duration) -> Attempt {
        let started = Instant::now();
        let request = async {
            let response = self
                .client
                .get(endpoint)
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let result = time::timeout(timeout, request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok((status, body))) => {
                let data = serde_json::from_slice::<Value>(&body).ok();
                let failure = if status.is_success() {
                    None
                } else {
                    Some((
                        AttemptFailure::Status(status.as_u16()),
                        format!("Health endpoint returned HTTP {}", status.as_u16()),
                    ))
                };
                Attempt {
                    status: Some(status.as_u16()),
                    data,
                    duration_ms,
                    failure,
                }
            }
            Ok(Err(e)) => Attempt {
                status: None,
                data: None,
                duration_ms,
                failure: Some((AttemptFailure::Network, e.to_string())),
            },
            Err(_) => Attempt {
                status: None,
                data: None,
                duration_ms,
                failure: Some((
                    AttemptFailure::Timeout,
                    format!("Request timed out after {}ms", timeout.as_millis()),
                )),
            },
        }
    }

    async fn call_endpoint(&self, endpoint: &str, timeout: Duration, retry_attempts: u32) -> EndpointOutcome {
        let mut retries = 0;
        loop {
            let attempt = self.attempt(endpoint, timeout).await;
            let attempts = retries + 1;

            let Some((failure, message)) = attempt.failure else {
                return EndpointOutcome {
                    response: TransportResponse {
                        ok: true,
                        data: attempt.data,
                        status: attempt.status,
                        duration_ms: Some(attempt.duration_ms),
                        endpoint: Some(endpoint.to_string()),
                        ..TransportResponse::default()
                    },
                    attempts,
                };
            };

            if retries < retry_attempts && is_retryable(failure) {
                retries += 1;
                let delay = backoff_for(retries, &self.retry);
                tracing::debug!(
                    endpoint,
                    error = %message,
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    "Health request failed, retrying"
                );
                time::sleep(delay).await;
                continue;
            }

            tracing::warn!(endpoint, error = %message, attempts, "Health request failed");
            return EndpointOutcome {
                response: TransportResponse {
                    ok: false,
                    data: attempt.data,
                    status: attempt.status,
                    // A timeout never measured a round trip.
                    duration_ms: (failure != AttemptFailure::Timeout).then_some(attempt.duration_ms),
                    error: Some(message),
                    error_type: Some(failure.kind().to_string()),
                    endpoint: Some(endpoint.to_string()),
                    ..TransportResponse::default()
                },
                attempts,
            };
        }
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        Url::parse(&request.endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", request.endpoint, e)))?;

        let primary = self
            .call_endpoint(&request.endpoint, request.timeout, request.retry_attempts)
            .await;
        let mut attempts = primary.attempts;
        let mut fallback_attempted = false;

        let mut response = primary.response;
        if !response.ok && request.use_fallback {
            if let Some(fallback) = self.fallback_endpoint.as_deref().filter(|f| *f != request.endpoint) {
                fallback_attempted = true;
                tracing::info!(primary = %request.endpoint, fallback, "Trying fallback health endpoint");
                let secondary = self.call_endpoint(fallback, request.timeout, 0).await;
                attempts += secondary.attempts;
                if secondary.response.ok {
                    response = TransportResponse {
                        fallback_used: true,
                        ..secondary.response
                    };
                }
            }
        }

        response.diagnostics = Some(json!({
            "attempts": attempts,
            "endpoint": request.endpoint,
            "fallback_attempted": fallback_attempted,
            "client": USER_AGENT,
        }));
        Ok(response)
    }
}

impl Transport for HttpTransport {
    fn call(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        self.execute(request).boxed()
    }
}
