//! Synthetic log streaming subsystem.
//!
//! # Data Flow
//! ```text
//! GET /logs
//!     → generator.rs (one task per connection)
//!         → source.rs (next level + message)
//!         → line.rs (timestamped text line)
//!         → sink (durable copy, best-effort)
//!         → mpsc channel → chunked response body
//! ```
//!
//! # Design Decisions
//! - Sessions share nothing but the durable sink
//! - Every session token is a child of the process shutdown token

pub mod generator;
pub mod line;
pub mod source;

pub use generator::{LogStreamGenerator, SessionState, StopReason};
pub use line::{LogLevel, LogLine, ParseLineError, STARTUP_MESSAGE};
pub use source::{LineSource, RandomLineSource, ScriptedSource, SourceFactory};
