//! Route handlers for `/metrics` and `/logs`.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::stream;

use crate::http::server::AppState;
use crate::observability::metrics::EXPOSITION_CONTENT_TYPE;
use crate::streaming::LogStreamGenerator;

/// Prometheus scrape endpoint.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.registry.export() {
        Ok(body) => ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Open-ended log stream, one generator per connection.
///
/// The generator stops when hyper drops the body (client gone) or when the
/// process shutdown token is cancelled.
pub async fn logs_handler(State(state): State<AppState>) -> Response {
    let generator = LogStreamGenerator::new(
        (state.sources)(),
        state.durable.clone(),
        state.stream.interval(),
    );
    tracing::debug!(session = %generator.id(), "Opening log stream");

    let (rx, _session) = generator.spawn(state.stream.buffer, state.shutdown.subscribe());

    let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    }));

    ([(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

/// Fallback for unknown paths; still passes through the instrumentation layer.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
