//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request instrumentation)
//! - Bind server to listener
//! - Drain open streams on shutdown

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{SidecarConfig, StreamConfig};
use crate::http::handlers::{logs_handler, metrics_handler, not_found};
use crate::http::middleware::{instrument_requests, Instrumentation};
use crate::lifecycle::Shutdown;
use crate::observability::{MetricsRegistry, ResourceSampler};
use crate::sink::DurableSink;
use crate::streaming::SourceFactory;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: MetricsRegistry,
    pub sampler: Arc<dyn ResourceSampler>,
    pub durable: Arc<dyn DurableSink>,
    pub sources: SourceFactory,
    pub stream: StreamConfig,
    /// Hands each stream session its own child token.
    pub shutdown: Shutdown,
}

/// HTTP server for the sidecar.
pub struct HttpServer {
    router: Router,
    config: SidecarConfig,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server around already-built state.
    pub fn new(config: SidecarConfig, state: AppState) -> Self {
        let shutdown = state.shutdown.clone();
        let router = Self::build_router(state);
        Self {
            router,
            config,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        let instrumentation = Instrumentation::new(state.registry.clone(), state.sampler.clone());

        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/logs", get(logs_handler))
            .fallback(not_found)
            .with_state(state)
            .layer(middleware::from_fn_with_state(instrumentation, instrument_requests))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown token is cancelled.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            stream_interval_ms = self.config.stream.interval_ms,
            "HTTP server starting"
        );

        let token = self.shutdown.token();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                token.cancelled().await;
                tracing::info!("Shutdown signal received, closing open streams");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
