//! Countdown barrier for GPU upload completion.
//!
//! Sized to `upload_threads + 1`. Each upload thread arrives without blocking
//! once the preparation work queued ahead of the arrival has run; the
//! submitting thread arrives and waits.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{SyncError, SyncResult};

#[derive(Debug)]
struct BarrierState {
    remaining: usize,
    cancelled: bool,
}

/// One-shot countdown barrier with a forced-release path.
#[derive(Debug)]
pub struct CountdownBarrier {
    participants: usize,
    state: Mutex<BarrierState>,
    condvar: Condvar,
}

impl CountdownBarrier {
    /// Creates a barrier that opens after `participants` arrivals.
    ///
    /// A barrier with zero participants is open from the start.
    #[must_use]
    pub fn new(participants: usize) -> Self {
        Self {
            participants,
            state: Mutex::new(BarrierState {
                remaining: participants,
                cancelled: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Number of arrivals needed to open the barrier.
    #[inline]
    #[must_use]
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Arrivals still outstanding.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }

    /// Returns true once every participant has arrived.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.remaining() == 0
    }

    /// Records one arrival without blocking.
    ///
    /// Returns true if this arrival opened the barrier. Arrivals past the
    /// participant count are ignored.
    pub fn arrive(&self) -> bool {
        let mut state = self.state.lock();
        if state.remaining == 0 {
            return false;
        }

        state.remaining -= 1;
        if state.remaining == 0 {
            self.condvar.notify_all();
            tracing::trace!(participants = self.participants, "barrier opened");
            return true;
        }
        false
    }

    /// Records one arrival and blocks until the barrier opens.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] if the barrier was force-released
    /// before every participant arrived.
    pub fn arrive_and_wait(&self) -> SyncResult<()> {
        self.arrive();
        self.wait()
    }

    /// Blocks until the barrier opens without arriving.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] if the barrier was force-released
    /// before every participant arrived.
    pub fn wait(&self) -> SyncResult<()> {
        let mut state = self.state.lock();
        while state.remaining > 0 && !state.cancelled {
            self.condvar.wait(&mut state);
        }

        if state.remaining == 0 {
            Ok(())
        } else {
            Err(SyncError::Cancelled)
        }
    }

    /// Force-releases every waiter without waiting for the stragglers.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.cancelled = true;
        self.condvar.notify_all();
        tracing::trace!(remaining = state.remaining, "barrier force-released");
    }

    /// Hands out one arrival as a value.
    ///
    /// The ticket arrives when it is used or dropped, so a ticket lost in a
    /// closed queue still counts.
    #[must_use]
    pub fn ticket(self: &Arc<Self>) -> ArrivalTicket {
        ArrivalTicket {
            barrier: Some(Arc::clone(self)),
        }
    }
}

/// One pending arrival at a [`CountdownBarrier`].
#[derive(Debug)]
pub struct ArrivalTicket {
    barrier: Option<Arc<CountdownBarrier>>,
}

impl ArrivalTicket {
    /// Arrives now.
    pub fn arrive(mut self) {
        if let Some(barrier) = self.barrier.take() {
            barrier.arrive();
        }
    }
}

impl Drop for ArrivalTicket {
    fn drop(&mut self) {
        if let Some(barrier) = self.barrier.take() {
            barrier.arrive();
        }
    }
}
