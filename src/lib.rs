//! Backend health polling and connection tracking.

pub mod admin;
pub mod clock;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod tracker;
pub mod transport;

pub use config::WatchConfig;
pub use health::{HealthPoller, HealthSnapshot, HealthStatus, PollerState};
pub use lifecycle::Shutdown;
pub use tracker::ConnectionTracker;
pub use transport::{HttpTransport, Transport};
