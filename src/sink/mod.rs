//! Durable log sinks.
//!
//! # Data Flow
//! ```text
//! LogStreamGenerator tick
//!     → DurableSink::append(line)
//!     → rotating.rs (size check → rotate → append)
//!     → <directory>/app.log, app.log.1 .. app.log.N
//! ```
//!
//! # Design Decisions
//! - One sink per process, shared by every stream session
//! - Appends are best-effort: callers log failures and carry on

use std::io;
use std::path::PathBuf;

pub mod rotating;

pub use rotating::RotatingFileSink;

/// Error type for durable sink operations.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to rotate {path}: {source}")]
    Rotate { path: PathBuf, source: io::Error },
    #[error("write failed: {0}")]
    Write(#[from] io::Error),
}

/// Append-only destination for generated log lines.
pub trait DurableSink: Send + Sync + 'static {
    /// Persist one line. A trailing newline is added when missing.
    fn append(&self, line: &str) -> Result<(), SinkError>;
}
