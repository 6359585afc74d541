//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → resources.rs (CPU / memory sample)
//!     → metrics.rs (request counter, resource gauges)
//!
//! Consumers:
//!     → GET /metrics (Prometheus scrape of metrics.rs)
//!     → logging.rs (the sidecar's own diagnostics on stdout)
//! ```
//!
//! # Design Decisions
//! - Metrics are cheap (atomic increments)
//! - The registry is a value passed through state, never a global

pub mod logging;
pub mod metrics;
pub mod resources;

pub use self::metrics::MetricsRegistry;
pub use resources::{ResourceSample, ResourceSampler, SystemSampler};
