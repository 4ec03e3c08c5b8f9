//! Retry decisions for health requests.

/// Outcome class of a single attempt, as seen by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Attempt exceeded its deadline.
    Timeout,
    /// Connection refused, reset, DNS failure, etc.
    Network,
    /// Backend answered with a non-success status.
    Status(u16),
}

impl AttemptFailure {
    /// Short label used as the snapshot `error_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptFailure::Timeout => "timeout",
            AttemptFailure::Network => "network",
            AttemptFailure::Status(_) => "http",
        }
    }
}

/// Whether another attempt may succeed where this one failed.
pub fn is_retryable(failure: AttemptFailure) -> bool {
    match failure {
        AttemptFailure::Timeout | AttemptFailure::Network => true,
        AttemptFailure::Status(code) => code >= 500 || code == 429,
    }
}
