//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Background cycles started.
    pub cycles: u64,
    /// Diffs staged for merge.
    pub staged: u64,
    /// Diffs applied by the merger.
    pub applied: u64,
    /// Asset loads that failed.
    pub load_failures: u64,
    /// Batches sent to the upload threads.
    pub gpu_batches: u64,
    /// Nodes attached to the scene.
    pub attached: u64,
    /// Nodes detached from the scene.
    pub detached: u64,
}

impl SyncStats {
    /// Diffs staged but not yet applied. Never more than one.
    #[must_use]
    pub fn unmerged(&self) -> u64 {
        self.staged.saturating_sub(self.applied)
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) cycles: AtomicU64,
    pub(crate) staged: AtomicU64,
    pub(crate) applied: AtomicU64,
    pub(crate) load_failures: AtomicU64,
    pub(crate) gpu_batches: AtomicU64,
    pub(crate) attached: AtomicU64,
    pub(crate) detached: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> SyncStats {
        // Applied before staged, so a snapshot never shows more applied
        let applied = self.applied.load(Ordering::Acquire);
        let staged = self.staged.load(Ordering::Acquire);
        SyncStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            staged,
            applied,
            load_failures: self.load_failures.load(Ordering::Relaxed),
            gpu_batches: self.gpu_batches.load(Ordering::Relaxed),
            attached: self.attached.load(Ordering::Relaxed),
            detached: self.detached.load(Ordering::Relaxed),
        }
    }
}
