//! # gcache-server
//!
//! TCP accept loop for peer-fetch requests, dispatching each one to the
//! process-wide [`gcache_core::registry`]. The network-facing counterpart
//! to `gcache-client`.

pub mod metrics;
pub mod server;

pub use metrics::{LatencySnapshot, Metrics, MetricsSnapshot};
pub use server::{handle_connection, run, ServerConfig};
