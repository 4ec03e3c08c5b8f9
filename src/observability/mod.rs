//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Poller, transport and tracker produce:
//!     → tracing events (structured fields, see logging.rs)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
