// ABOUTME: Run cancellation shared between the signal handler and the orchestrator.
// ABOUTME: Split into a firing handle and observing tokens over one CancellationToken.

use tokio_util::sync::CancellationToken;

/// Fires cancellation.
#[derive(Debug)]
pub struct CancelHandle {
    inner: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.inner.cancel();
    }
}

/// Observes cancellation; cannot fire it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> (CancelHandle, CancelToken) {
        let inner = CancellationToken::new();
        (
            CancelHandle {
                inner: inner.clone(),
            },
            CancelToken { inner },
        )
    }

    /// A token whose handle is already gone, so it never fires.
    pub fn never() -> Self {
        Self::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once cancelled.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }
}
