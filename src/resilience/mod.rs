//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Health request from the HTTP transport:
//!     → per-attempt timeout (tokio::time::timeout)
//!     → On failure: retries.rs (check if retryable)
//!     → backoff.rs (delay before next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Jittered backoff prevents thundering herd
//! - Connection errors and timeouts always retryable; 4xx never

pub mod backoff;
pub mod retries;
