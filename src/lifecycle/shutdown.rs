//! Shutdown coordination for the sidecar.

use tokio_util::sync::CancellationToken;

/// Coordinator for graceful shutdown.
///
/// Every long-running task holds a child of the root token, so triggering
/// shutdown reaches all of them at once.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Root token; cancelling it cancels every subscriber.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Token for one task. Cancelling it does not affect the others.
    pub fn subscribe(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Trigger the shutdown signal. Safe to call more than once.
    pub fn trigger(&self) {
        self.token.cancel();
    }
}
