//! Request instrumentation middleware.
//! Counts every request and refreshes resource gauges before the handler runs.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::observability::{MetricsRegistry, ResourceSampler};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const CPU_USAGE: &str = "cpu_usage";
pub const MEMORY_USAGE: &str = "memory_usage";

/// What the middleware writes into.
#[derive(Clone)]
pub struct Instrumentation {
    pub registry: MetricsRegistry,
    pub sampler: Arc<dyn ResourceSampler>,
}

impl Instrumentation {
    pub fn new(registry: MetricsRegistry, sampler: Arc<dyn ResourceSampler>) -> Self {
        registry.describe(HTTP_REQUESTS_TOTAL, "Total HTTP Requests");
        registry.describe(CPU_USAGE, "CPU Usage Percentage");
        registry.describe(MEMORY_USAGE, "Memory Usage Percentage");
        Self { registry, sampler }
    }

    /// Count one arrival and take a resource sample.
    pub fn record_arrival(&self, method: &str, endpoint: &str) {
        self.registry
            .increment_counter(HTTP_REQUESTS_TOTAL, [("method", method), ("endpoint", endpoint)]);

        let sample = self.sampler.sample();
        self.registry.set_gauge(CPU_USAGE, sample.cpu_percent);
        self.registry.set_gauge(MEMORY_USAGE, sample.mem_percent);
    }
}

/// Records the request before delegating, so failed requests are counted too.
/// The downstream response is passed through untouched.
pub async fn instrument_requests(
    State(instrumentation): State<Instrumentation>,
    request: Request<Body>,
    next: Next,
) -> Response {
    instrumentation.record_arrival(request.method().as_str(), request.uri().path());
    next.run(request).await
}
