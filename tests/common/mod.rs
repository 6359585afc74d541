//! Shared utilities for integration testing.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics_sidecar::config::SidecarConfig;
use metrics_sidecar::observability::SystemSampler;
use metrics_sidecar::sink::{DurableSink, SinkError};
use metrics_sidecar::streaming::{LogLine, RandomLineSource, SourceFactory};
use metrics_sidecar::{AppState, HttpServer, MetricsRegistry, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A sidecar running on an ephemeral local port.
#[allow(dead_code)]
pub struct TestSidecar {
    pub addr: SocketAddr,
    pub registry: MetricsRegistry,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<io::Result<()>>,
}

impl TestSidecar {
    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Durable sink kept in memory that can be switched into failure mode.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DurableSink for MemorySink {
    fn append(&self, line: &str) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Write(io::Error::new(
                io::ErrorKind::Other,
                "no space left on device",
            )));
        }
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

/// Start a sidecar with the given sink and line source.
pub async fn start_sidecar(
    durable: Arc<dyn DurableSink>,
    sources: SourceFactory,
    interval_ms: u64,
) -> TestSidecar {
    let mut config = SidecarConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.stream.interval_ms = interval_ms;

    let shutdown = Shutdown::new();
    let registry = MetricsRegistry::new();
    let state = AppState {
        registry: registry.clone(),
        sampler: Arc::new(SystemSampler::new()),
        durable,
        sources,
        stream: config.stream.clone(),
        shutdown: shutdown.clone(),
    };

    let listener = TcpListener::bind(config.listener.bind_address()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, state);
    let handle = tokio::spawn(server.run(listener));

    TestSidecar {
        addr,
        registry,
        shutdown,
        handle,
    }
}

/// Sidecar with random content and an in-memory sink.
#[allow(dead_code)]
pub async fn start_default_sidecar() -> (TestSidecar, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let sidecar = start_sidecar(sink.clone(), RandomLineSource::factory(), 50).await;
    (sidecar, sink)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Reassembles newline-terminated lines from a chunked response.
#[allow(dead_code)]
pub struct LineReader {
    response: reqwest::Response,
    pending: String,
}

#[allow(dead_code)]
impl LineReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            pending: String::new(),
        }
    }

    /// Next raw line including its `\n`, or `None` once the stream ends.
    pub async fn next_raw(&mut self) -> Option<String> {
        loop {
            if let Some(end) = self.pending.find('\n') {
                return Some(self.pending.drain(..=end).collect());
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.response.chunk())
                .await
                .expect("stream stalled")
                .ok()??;
            self.pending.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    pub async fn next_line(&mut self) -> LogLine {
        let raw = self.next_raw().await.expect("stream ended");
        raw.parse().unwrap_or_else(|e| panic!("bad line {:?}: {}", raw, e))
    }
}

/// Value of one exposition line, e.g. `http_requests_total{endpoint="/a",method="GET"}`.
#[allow(dead_code)]
pub fn sample_value(exposition: &str, series: &str) -> Option<f64> {
    exposition
        .lines()
        .find_map(|line| line.strip_prefix(series)?.strip_prefix(' '))
        .and_then(|value| value.parse().ok())
}
