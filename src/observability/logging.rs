//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the process
//! - Resolve the log filter from environment and config
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is absent.
pub fn default_filter(log_level: &str) -> String {
    format!("metrics_sidecar={level},tower_http={level}", level = log_level)
}

/// Install the global subscriber. Call once from `main`.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
