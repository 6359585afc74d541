//! Metrics sidecar library.
//!
//! Serves `/metrics` (Prometheus text) and `/logs` (endless synthetic log
//! stream), counting every request and sampling host CPU and memory.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod sink;
pub mod streaming;

pub use config::SidecarConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use observability::MetricsRegistry;
