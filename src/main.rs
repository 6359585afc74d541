//! Metrics sidecar.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────────────────────────────────────────┐
//!     ────────────────────┼─▶ TraceLayer ─▶ instrumentation middleware   │
//!                         │                   │  counter + cpu/mem gauges │
//!                         │                   ▼                           │
//!                         │   /metrics ─▶ MetricsRegistry::export         │
//!                         │   /logs    ─▶ LogStreamGenerator task ──┐     │
//!                         │                   │                     │     │
//!     Client Response     │                   ▼                     ▼     │
//!     ◀───────────────────┼── chunked body ◀─ channel     RotatingFileSink│
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use metrics_sidecar::config::{self, SidecarConfig};
use metrics_sidecar::lifecycle::{self, signals, StartupError};
use metrics_sidecar::observability::logging;
use metrics_sidecar::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "metrics-sidecar")]
#[command(about = "Request metrics, host gauges and a synthetic log stream", long_about = None)]
struct Args {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override.
    #[arg(short, long)]
    port: Option<u16>,

    /// Durable log directory override.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path).map_err(StartupError::from)?,
        None => SidecarConfig::default(),
    };
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    if let Some(dir) = args.log_dir {
        config.log_sink.directory = dir;
    }

    logging::init(&config.observability.log_level);

    tracing::info!("metrics-sidecar v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        log_file = %config.log_sink.path().display(),
        stream_interval_ms = config.stream.interval_ms,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let state = lifecycle::build_state(&config, &shutdown)?;

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, state);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
