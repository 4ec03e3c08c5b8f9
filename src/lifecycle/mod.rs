//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Poller start → subscribe to Shutdown → polling loop
//! stop()/dispose()/Ctrl-C → Shutdown::trigger → loops exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
