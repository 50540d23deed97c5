//! Teardown.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::coordinator::Shared;

/// Stops the background cycle, including one already blocked.
///
/// Cancellation is sticky: once requested, every later cycle returns
/// [`CycleOutcome::Cancelled`](crate::CycleOutcome::Cancelled) immediately.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    shared: Arc<Shared>,
}

impl CancellationHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Requests teardown.
    ///
    /// Force-releases the merge gate and any GPU barrier being waited on,
    /// without waiting for a merge or for the upload threads.
    pub fn cancel(&self) {
        if self.shared.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shared.merge_gate.cancel();
        if let Some(barrier) = self.shared.barrier.lock().as_ref() {
            barrier.release();
        }
        tracing::info!("scene sync cancelled");
    }

    /// Returns true once teardown was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }
}
