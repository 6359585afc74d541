//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, graceful shutdown)
//!     → middleware/instrumentation.rs (count request, sample resources)
//!     → handlers.rs (/metrics snapshot, /logs stream, 404 fallback)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{AppState, HttpServer};
