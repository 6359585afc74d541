//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Open log sink → Build state → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Cancel root token → Streams stop → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then sink, then listener
//! - Stream sessions hold child tokens, so shutdown reaches every one

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_state, StartupError};
