//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the process-wide state from a validated config
//! - Open the durable sink before any traffic is accepted
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The registry is created here, once, and handed out by clone

use std::sync::Arc;

use crate::config::{ConfigError, SidecarConfig};
use crate::http::AppState;
use crate::lifecycle::Shutdown;
use crate::observability::{MetricsRegistry, SystemSampler};
use crate::sink::{RotatingFileSink, SinkError};
use crate::streaming::RandomLineSource;

/// Error type for anything that stops the sidecar from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("log sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
}

/// Wire the production components together.
pub fn build_state(config: &SidecarConfig, shutdown: &Shutdown) -> Result<AppState, StartupError> {
    let durable = RotatingFileSink::open(&config.log_sink)?;

    Ok(AppState {
        registry: MetricsRegistry::new(),
        sampler: Arc::new(SystemSampler::new()),
        durable: Arc::new(durable),
        sources: RandomLineSource::factory(),
        stream: config.stream.clone(),
        shutdown: shutdown.clone(),
    })
}
