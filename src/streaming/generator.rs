//! Per-connection log stream generator.
//!
//! # States
//! - Starting: emit the startup marker
//! - Streaming: one line per interval to both sinks
//! - Stopped: terminal, nothing is written afterwards
//!
//! # State Transitions
//! ```text
//! Starting → Streaming: marker delivered
//! Starting/Streaming → Stopped: client gone, or cancellation token fired
//! ```
//!
//! # Design Decisions
//! - Runs on its own task; the response body only drains a channel
//! - Durable writes run on the blocking pool; failures are logged and skipped
//! - State changes are published on a watch channel
//! - A closed channel means the client left: the session stops

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::sink::DurableSink;
use crate::streaming::line::LogLine;
use crate::streaming::source::LineSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Streaming,
    Stopped,
}

/// Why a session reached `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The network receiver went away.
    ClientDisconnected,
    /// The session token (or the process-wide one) was cancelled.
    Cancelled,
}

/// Produces an endless sequence of lines for a single `/logs` connection.
pub struct LogStreamGenerator {
    id: Uuid,
    source: Box<dyn LineSource>,
    durable: Arc<dyn DurableSink>,
    interval: Duration,
    state: watch::Sender<SessionState>,
}

impl LogStreamGenerator {
    pub fn new(
        source: Box<dyn LineSource>,
        durable: Arc<dyn DurableSink>,
        interval: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            durable,
            interval,
            state: watch::channel(SessionState::Starting).0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Follow the session through its states. Keeps the last one after the
    /// session ends.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Run on a new task, returning the network side of the stream.
    ///
    /// Dropping the receiver stops the session.
    pub fn spawn(
        self,
        buffer: usize,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<Bytes>, JoinHandle<StopReason>) {
        let (tx, rx) = mpsc::channel(buffer);
        let span = tracing::info_span!("log_stream", session = %self.id);
        let handle = tokio::spawn(self.run(tx, cancel).instrument(span));
        (rx, handle)
    }

    /// Drive the session until the client leaves or `cancel` fires.
    pub async fn run(mut self, tx: mpsc::Sender<Bytes>, cancel: CancellationToken) -> StopReason {
        tracing::info!("Log stream session started");

        if let Err(reason) = deliver(&tx, &cancel, LogLine::startup().render()).await {
            return self.stop(reason);
        }
        self.state.send_replace(SessionState::Streaming);

        let mut ticker = time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.stop(StopReason::Cancelled),
                _ = tx.closed() => return self.stop(StopReason::ClientDisconnected),
                _ = ticker.tick() => {}
            }

            let text = self.source.next_line().render();

            persist(self.durable.clone(), text.clone()).await;

            if let Err(reason) = deliver(&tx, &cancel, text).await {
                return self.stop(reason);
            }
        }
    }

    fn stop(&mut self, reason: StopReason) -> StopReason {
        self.state.send_replace(SessionState::Stopped);
        tracing::info!(reason = ?reason, "Log stream session stopped");
        reason
    }
}

/// Append to the durable sink without holding a runtime thread on disk I/O.
async fn persist(durable: Arc<dyn DurableSink>, line: String) {
    match tokio::task::spawn_blocking(move || durable.append(&line)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Durable log write failed, line kept on stream only");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Durable log write task failed, line kept on stream only");
        }
    }
}

/// Send one chunk, giving up early if the session is cancelled while the
/// client is not reading.
async fn deliver(
    tx: &mpsc::Sender<Bytes>,
    cancel: &CancellationToken,
    text: String,
) -> Result<(), StopReason> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StopReason::Cancelled),
        sent = tx.send(Bytes::from(text)) => sent.map_err(|_| StopReason::ClientDisconnected),
    }
}
