//! Resettable one-shot gate.
//!
//! The background thread blocks on the gate after staging a diff; the update
//! thread releases it once the diff is merged.
//!
//! ## State Machine
//!
//! ```text
//!                release()
//!   ┌──────────┐ ────────► ┌──────────┐
//!   │  CLOSED  │           │   OPEN   │
//!   └──────────┘ ◄──────── └──────────┘
//!         │       reset()        │
//!         └──────── cancel() ────┴────► CANCELLED (sticky)
//! ```
//!
//! A release that happens before `block()` is called is not lost: the gate
//! stays open until the next `reset()`.

use parking_lot::{Condvar, Mutex};

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Default)]
struct GateState {
    released: bool,
    cancelled: bool,
}

/// One-shot gate released by the merging thread.
///
/// ## Usage
///
/// ```rust,ignore
/// let gate = MergeGate::new();
///
/// // Background thread, under the staging lock:
/// gate.reset();
/// // ... stage the diff, drop the lock
/// gate.block()?;
///
/// // Update thread, after applying the diff:
/// gate.release();
/// ```
#[derive(Debug, Default)]
pub struct MergeGate {
    state: Mutex<GateState>,
    condvar: Condvar,
}

impl MergeGate {
    /// Creates a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the gate is released or cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] if the gate was cancelled, even if it
    /// had also been released.
    pub fn block(&self) -> SyncResult<()> {
        let mut state = self.state.lock();
        while !state.released && !state.cancelled {
            self.condvar.wait(&mut state);
        }

        if state.cancelled {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Opens the gate, waking every blocked thread.
    ///
    /// Releasing an open gate is a no-op.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if !state.released {
            state.released = true;
            self.condvar.notify_all();
            tracing::trace!("merge gate released");
        }
    }

    /// Closes the gate for the next cycle.
    ///
    /// Cancellation is sticky and survives a reset.
    pub fn reset(&self) {
        self.state.lock().released = false;
    }

    /// Force-releases every current and future waiter.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        self.condvar.notify_all();
        tracing::trace!("merge gate cancelled");
    }

    /// Returns true if the gate is currently open.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }
}
