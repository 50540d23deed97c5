//! # Scene Merger
//!
//! The update thread's side of the handoff. Called once per frame; never
//! blocks on the background thread beyond the state lock.
//!
//! ```text
//! merge(scene):
//!   lock
//!   take pending ──none──> release gate, return
//!     │
//!   detach + drop every removal
//!   attach + insert every addition
//!   release gate
//!   unlock
//! ```

use std::sync::Arc;

use scenesync_rendering::SceneGraph;

use crate::coordinator::Shared;
use crate::stats::{StatsCounters, SyncStats};

/// What one merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Nodes detached.
    pub removed: usize,
    /// Nodes attached.
    pub added: usize,
}

impl MergeReport {
    /// Returns true if the merge changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed == 0 && self.added == 0
    }
}

/// Applies staged diffs to the live scene.
#[derive(Debug, Clone)]
pub struct SceneMerger {
    shared: Arc<Shared>,
}

impl SceneMerger {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Applies the pending diff, if any, and releases the background thread.
    ///
    /// Removals run before additions, so an id removed and re-added in one
    /// diff is never attached twice. Detached assets give up their GPU
    /// resources.
    pub fn merge<S: SceneGraph + ?Sized>(&self, scene: &mut S) -> MergeReport {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        let Some(diff) = state.pending.take() else {
            // The background thread resets the gate before staging
            shared.merge_gate.release();
            return MergeReport::default();
        };

        let mut report = MergeReport::default();
        for id in &diff.remove {
            let Some(handle) = state.live.remove(id) else {
                continue;
            };
            if !scene.detach(&handle) {
                tracing::warn!(asset = %id, "live asset was not attached to the scene");
            }
            shared.prepare.release(&handle);
            tracing::info!(asset = %id, "detached");
            report.removed += 1;
        }

        for (id, handle) in diff.add {
            scene.attach(Arc::clone(&handle));
            tracing::info!(asset = %id, kind = %handle.kind(), "attached");
            state.live.insert(id, handle);
            report.added += 1;
        }

        StatsCounters::bump(&shared.stats.detached, report.removed as u64);
        StatsCounters::bump(&shared.stats.attached, report.added as u64);
        StatsCounters::bump(&shared.stats.applied, 1);
        shared.merge_gate.release();
        drop(state);

        tracing::debug!(removed = report.removed, added = report.added, "diff merged");
        report
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.shared.stats.snapshot()
    }
}
