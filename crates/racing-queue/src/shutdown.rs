//! Graceful shutdown coordination. Stopping intake and aborting
//! in-flight simulations are deliberately separate signals: a race already
//! running gets `shutdownGrace` to finish before it is cancelled.
use racing_sim::CancellationToken;

#[derive(Clone, Default)]
pub struct ShutdownSignal {
    /// Checked before polling for a new delivery.
    pub stop_accepting: CancellationToken,
    /// Handed to the processor as the per-message cancellation signal.
    pub abort_inflight: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops new intake immediately, then aborts whatever is still running
    /// after `grace`. Partial `RaceRun`s are never persisted: the executor
    /// honours `abort_inflight` at tick boundaries.
    pub async fn trigger(&self, grace: std::time::Duration) {
        log::warn!("shutdown requested, no longer accepting new messages");
        self.stop_accepting.cancel();
        tokio::time::sleep(grace).await;
        if !self.abort_inflight.is_cancelled() {
            log::warn!("grace period elapsed, aborting in-flight simulations");
            self.abort_inflight.cancel();
        }
    }
}
