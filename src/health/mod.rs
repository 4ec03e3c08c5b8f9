//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Timer tick or manual refresh (poller.rs)
//!     → single-flight guard
//!     → Transport call (crate::transport)
//!     → classify.rs (offline / degraded / online)
//!     → snapshot.rs (HealthSnapshot appended to History)
//!     → state.rs (PollerState recomputed)
//!     → store.rs (latest snapshot persisted)
//!     → observer.rs (DebugMirror and other hooks)
//! ```
//!
//! # Design Decisions
//! - The poller never retries; the transport owns timeouts and retries
//! - Every failure ends as an `offline` snapshot, never an error
//! - State is per poller; independent pollers never share anything

pub mod classify;
pub mod observer;
pub mod poller;
pub mod snapshot;
pub mod state;
pub mod store;

pub use classify::{classify, Classification, ClassificationInput, RateLimitProbe};
pub use observer::{DebugMirror, DebugView, PollerObserver};
pub use poller::{CheckOverrides, HealthPoller, HealthPollerBuilder};
pub use snapshot::{HealthSnapshot, HealthStatus, History, DEFAULT_HISTORY_SIZE};
pub use state::PollerState;
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, StoreError};
