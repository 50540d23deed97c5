//! # Background Operation Thread
//!
//! Runs [`SyncCoordinator::cycle`] in a loop on a dedicated thread.
//!
//! ```text
//! loop {
//!     Staged    -> next cycle right away
//!     Idle      -> wait idle_interval (interruptible) or just yield
//!     Cancelled -> exit
//! }
//! ```

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::cancel::CancellationHandle;
use crate::coordinator::{CycleOutcome, SyncCoordinator};

/// Owns the background thread.
///
/// Dropping it stops the thread and waits for it.
#[derive(Debug)]
pub struct OperationThread {
    cancel: CancellationHandle,
    wake: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl OperationThread {
    /// Starts cycling `coordinator` on a new thread.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the OS refuses to create the thread.
    pub fn spawn(coordinator: SyncCoordinator) -> io::Result<Self> {
        let cancel = coordinator.cancellation_handle();
        let (wake, woken) = bounded(1);

        let handle = thread::Builder::new()
            .name("scenesync-operation".to_string())
            .spawn(move || Self::run(&coordinator, &woken))?;

        tracing::info!("background sync started");

        Ok(Self {
            cancel,
            wake,
            handle: Some(handle),
        })
    }

    /// Handle that cancels this thread's coordinator.
    #[must_use]
    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    /// Returns true while the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancels the coordinator, wakes the loop and joins the thread.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.cancel.cancel();
        let _ = self.wake.try_send(());

        if handle.join().is_err() {
            tracing::error!("background sync thread panicked");
        }
        tracing::info!("background sync stopped");
    }

    fn run(coordinator: &SyncCoordinator, woken: &Receiver<()>) {
        let idle = coordinator.idle_interval();
        loop {
            match coordinator.cycle() {
                CycleOutcome::Staged => {}
                CycleOutcome::Idle => {
                    if !Self::idle_wait(woken, idle) {
                        break;
                    }
                }
                CycleOutcome::Cancelled => break,
            }
        }
        tracing::debug!(stats = ?coordinator.stats(), "background loop exited");
    }

    /// Returns false if woken for shutdown.
    fn idle_wait(woken: &Receiver<()>, idle: Duration) -> bool {
        if idle.is_zero() {
            return true;
        }
        matches!(woken.recv_timeout(idle), Err(RecvTimeoutError::Timeout))
    }
}

impl Drop for OperationThread {
    fn drop(&mut self) {
        self.stop();
    }
}
