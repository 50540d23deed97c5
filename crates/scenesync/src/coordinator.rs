//! # Sync Coordinator
//!
//! Owns the live set and drives one background cycle at a time.
//!
//! ## Cycle State Machine
//!
//! ```text
//!   Idle ──> Diffing ──> Loading ──> Preparing ──> Staged ──(MergeGate)──> Idle
//!                                         │            │
//!                                         │            └─ nothing to stage: yield
//!                                         └─ cancel: barrier force-released
//! ```
//!
//! The live set and the pending diff share one mutex. The merger writes the
//! live set under it, and the diff step reads it under it, so a diff is
//! always computed against the state left by the last completed merge.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use scenesync_assets::{
    AssetError, AssetHandle, AssetId, AssetLoader, FileAssetLoader, ManifestReader,
};
use scenesync_core::{CountdownBarrier, MergeGate};
use scenesync_rendering::{GpuPrepareStage, SceneGraph, UploadPool};

use crate::cancel::CancellationHandle;
use crate::config::SyncConfig;
use crate::diff::ManifestDiff;
use crate::merger::SceneMerger;
use crate::stats::{StatsCounters, SyncStats};

/// Removals and additions waiting for the update thread.
#[derive(Debug, Default)]
pub(crate) struct PendingDiff {
    pub(crate) remove: BTreeSet<AssetId>,
    pub(crate) add: BTreeMap<AssetId, AssetHandle>,
}

/// State guarded by the coordinator's single lock.
#[derive(Debug, Default)]
pub(crate) struct SyncState {
    pub(crate) live: BTreeMap<AssetId, AssetHandle>,
    pub(crate) pending: Option<PendingDiff>,
}

/// Everything the background thread shares with the merger and the
/// cancellation handle.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: Mutex<SyncState>,
    pub(crate) merge_gate: MergeGate,
    /// Barrier the background thread is waiting on, if any.
    pub(crate) barrier: Mutex<Option<Arc<CountdownBarrier>>>,
    pub(crate) cancelled: AtomicBool,
    pub(crate) prepare: GpuPrepareStage,
    pub(crate) stats: StatsCounters,
}

impl Shared {
    pub(crate) fn new(prepare: GpuPrepareStage) -> Self {
        Self {
            state: Mutex::new(SyncState::default()),
            merge_gate: MergeGate::new(),
            barrier: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            prepare,
            stats: StatsCounters::default(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How one background cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The manifest matched the live set; nothing was staged.
    Idle,
    /// A diff was staged and the merger applied it.
    Staged,
    /// Teardown was requested; the background thread should exit.
    Cancelled,
}

/// Diffs the manifest against the live set and hands changes to the merger.
pub struct SyncCoordinator {
    shared: Arc<Shared>,
    manifest: ManifestReader,
    loader: Arc<dyn AssetLoader>,
    load_parallelism: usize,
    idle_interval: Duration,
}

impl SyncCoordinator {
    /// Creates a coordinator with an empty live set.
    #[must_use]
    pub fn new<L: AssetLoader + 'static>(
        manifest: ManifestReader,
        loader: L,
        prepare: GpuPrepareStage,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(prepare)),
            manifest,
            loader: Arc::new(loader),
            load_parallelism: 1,
            idle_interval: Duration::ZERO,
        }
    }

    /// Builds the file loader and coordinator described by `config`.
    ///
    /// Relative asset paths resolve against the manifest's directory first,
    /// then against each configured search path.
    #[must_use]
    pub fn from_config(config: &SyncConfig, pool: Arc<UploadPool>) -> Self {
        let manifest = ManifestReader::new(&config.manifest_path);

        let mut loader = FileAssetLoader::new();
        if let Some(dir) = manifest.base_dir() {
            loader = loader.with_search_path(dir);
        }
        for dir in &config.search_paths {
            loader = loader.with_search_path(dir);
        }

        Self::new(manifest, loader, GpuPrepareStage::new(pool))
            .with_load_parallelism(config.load_parallelism)
            .with_idle_interval(config.idle_interval())
    }

    /// Runs up to `n` loads at once per cycle.
    #[must_use]
    pub fn with_load_parallelism(mut self, n: usize) -> Self {
        self.load_parallelism = n.max(1);
        self
    }

    /// Pause the background thread takes after an idle cycle.
    #[must_use]
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Pause after an idle cycle.
    #[inline]
    #[must_use]
    pub fn idle_interval(&self) -> Duration {
        self.idle_interval
    }

    /// The manifest being watched.
    #[must_use]
    pub fn manifest(&self) -> &ManifestReader {
        &self.manifest
    }

    /// Handle for the update thread.
    #[must_use]
    pub fn merger(&self) -> SceneMerger {
        SceneMerger::new(Arc::clone(&self.shared))
    }

    /// Handle for teardown.
    #[must_use]
    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle::new(Arc::clone(&self.shared))
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.shared.stats.snapshot()
    }

    /// Ids currently in the live set.
    #[must_use]
    pub fn live_ids(&self) -> Vec<AssetId> {
        self.shared.state.lock().live.keys().cloned().collect()
    }

    /// Returns true if a staged diff is waiting for the merger.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.shared.state.lock().pending.is_some()
    }

    /// Populates `scene` synchronously from the manifest.
    ///
    /// Meant for the update thread before the background thread starts. No
    /// GPU preparation is done; the renderer creates resources lazily. Assets
    /// that fail to load are picked up by the first background cycle.
    ///
    /// Returns the number of nodes attached.
    pub fn open<S: SceneGraph + ?Sized>(&self, scene: &mut S) -> usize {
        let snapshot = self.manifest.read();
        let wanted: Vec<AssetId> = {
            let state = self.shared.state.lock();
            snapshot
                .into_iter()
                .filter(|id| !state.live.contains_key(id))
                .collect()
        };
        let loaded = self.load_all(&wanted);

        let mut state = self.shared.state.lock();
        let mut attached = 0;
        for (id, handle) in loaded {
            if state.live.contains_key(&id) {
                continue;
            }
            scene.attach(Arc::clone(&handle));
            state.live.insert(id, handle);
            attached += 1;
        }
        drop(state);

        StatsCounters::bump(&self.shared.stats.attached, attached as u64);
        tracing::info!(attached, manifest = %self.manifest.path().display(), "scene opened");
        attached
    }

    /// Runs one background cycle.
    ///
    /// Blocks while GPU preparation runs and, if a diff was staged, until the
    /// merger has applied it. Returns [`CycleOutcome::Cancelled`] as soon as
    /// teardown is requested, even mid-wait.
    pub fn cycle(&self) -> CycleOutcome {
        let shared = &*self.shared;
        if shared.is_cancelled() {
            return CycleOutcome::Cancelled;
        }
        StatsCounters::bump(&shared.stats.cycles, 1);

        // Diffing
        let snapshot = self.manifest.read();
        let diff = {
            let state = shared.state.lock();
            ManifestDiff::compute(&snapshot, &state.live)
        };

        // Loading
        let to_add = self.load_all(&diff.added);

        // Preparing
        if !to_add.is_empty() && !self.prepare(&to_add) {
            self.discard(&to_add);
            return CycleOutcome::Cancelled;
        }

        if diff.removed.is_empty() && to_add.is_empty() {
            thread::yield_now();
            return CycleOutcome::Idle;
        }

        // Staged
        {
            let mut state = shared.state.lock();
            if shared.is_cancelled() {
                drop(state);
                self.discard(&to_add);
                return CycleOutcome::Cancelled;
            }
            // Cleared under the lock, so a release by the merge that takes
            // this diff cannot be lost
            shared.merge_gate.reset();
            tracing::debug!(
                remove = diff.removed.len(),
                add = to_add.len(),
                "diff staged"
            );
            state.pending = Some(PendingDiff {
                remove: diff.removed,
                add: to_add,
            });
            StatsCounters::bump(&shared.stats.staged, 1);
        }

        match shared.merge_gate.block() {
            Ok(()) => CycleOutcome::Staged,
            Err(_) => CycleOutcome::Cancelled,
        }
    }

    /// Submits `batch` for GPU preparation and waits for it.
    ///
    /// Returns false if cancelled while waiting.
    fn prepare(&self, batch: &BTreeMap<AssetId, AssetHandle>) -> bool {
        let shared = &*self.shared;
        let handles: Vec<AssetHandle> = batch.values().cloned().collect();
        let Some(barrier) = shared.prepare.submit(&handles) else {
            return true;
        };
        StatsCounters::bump(&shared.stats.gpu_batches, 1);

        *shared.barrier.lock() = Some(Arc::clone(&barrier));
        // A cancel that ran before the barrier was published missed it
        if shared.is_cancelled() {
            barrier.release();
        }
        let waited = barrier.arrive_and_wait();
        *shared.barrier.lock() = None;

        if waited.is_err() {
            tracing::debug!("GPU preparation wait cancelled");
            return false;
        }
        true
    }

    /// Frees GPU resources prepared for assets that will never be staged.
    fn discard(&self, batch: &BTreeMap<AssetId, AssetHandle>) {
        for handle in batch.values() {
            self.shared.prepare.release(handle);
        }
    }

    /// Loads `ids`, skipping failures.
    fn load_all(&self, ids: &[AssetId]) -> BTreeMap<AssetId, AssetHandle> {
        if ids.is_empty() {
            return BTreeMap::new();
        }

        let loader = &*self.loader;
        let load_chunk = |chunk: &[AssetId]| -> Vec<(AssetId, AssetHandle)> {
            chunk
                .iter()
                .filter_map(|id| Self::load_one(loader, id).map(|handle| (id.clone(), handle)))
                .collect()
        };

        let loaded: BTreeMap<AssetId, AssetHandle> =
            if self.load_parallelism <= 1 || ids.len() == 1 {
                load_chunk(ids).into_iter().collect()
            } else {
                let chunk_len = ids.len().div_ceil(self.load_parallelism);
                thread::scope(|scope| {
                    let mut inline = Vec::new();
                    let mut workers = Vec::new();
                    for (i, chunk) in ids.chunks(chunk_len).enumerate() {
                        let spawned = thread::Builder::new()
                            .name(format!("scenesync-load-{i}"))
                            .spawn_scoped(scope, move || load_chunk(chunk));
                        match spawned {
                            Ok(worker) => workers.push(worker),
                            Err(e) => {
                                tracing::warn!("load worker not started, loading inline: {e}");
                                inline.extend(load_chunk(chunk));
                            }
                        }
                    }
                    workers
                        .into_iter()
                        .flat_map(|worker| {
                            worker.join().unwrap_or_else(|_| {
                                tracing::error!("load worker panicked, retrying next cycle");
                                Vec::new()
                            })
                        })
                        .chain(inline)
                        .collect()
                })
            };

        let failures = ids.len() - loaded.len();
        StatsCounters::bump(&self.shared.stats.load_failures, failures as u64);
        loaded
    }

    /// Loads one asset. A panicking loader counts as a failed load.
    fn load_one(loader: &dyn AssetLoader, id: &AssetId) -> Option<AssetHandle> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| loader.load(id)))
            .unwrap_or_else(|_| {
                Err(AssetError::LoadFailed {
                    id: id.clone(),
                    reason: "loader panicked".to_string(),
                })
            });
        match result {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(asset = %id, "load failed, retrying next cycle: {e}");
                None
            }
        }
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("manifest", &self.manifest.path())
            .field("load_parallelism", &self.load_parallelism)
            .field("cancelled", &self.shared.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesync_assets::{Asset, AssetData, AssetResult};
    use scenesync_rendering::SceneGroup;
    use std::fs;
    use std::path::PathBuf;

    /// Loads anything except ids starting with "bad".
    struct BlobLoader;

    impl AssetLoader for BlobLoader {
        fn load(&self, id: &AssetId) -> AssetResult<AssetHandle> {
            if id.as_str().starts_with("bad") {
                return Err(AssetError::NotFound(id.clone()));
            }
            Ok(Asset::new_handle(id.clone(), AssetData::Blob(Vec::new())))
        }
    }

    /// Panics on ids starting with "boom", loads everything else.
    struct PanickyLoader;

    impl AssetLoader for PanickyLoader {
        fn load(&self, id: &AssetId) -> AssetResult<AssetHandle> {
            assert!(!id.as_str().starts_with("boom"), "decoder bug on {id}");
            Ok(Asset::new_handle(id.clone(), AssetData::Blob(Vec::new())))
        }
    }

    fn manifest(tag: &str, body: &str) -> PathBuf {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("scenesync_coord_{tag}_{stamp}.manifest"));
        fs::write(&path, body).unwrap();
        path
    }

    fn coordinator(path: &PathBuf) -> SyncCoordinator {
        SyncCoordinator::new(
            ManifestReader::new(path),
            BlobLoader,
            GpuPrepareStage::new(Arc::new(UploadPool::new())),
        )
    }

    #[test]
    fn test_open_populates_scene() {
        let path = manifest("open", "file a.bin\nfile b.bin\nfile bad.bin\n");
        let coordinator = coordinator(&path);
        let mut scene = SceneGroup::new();

        assert_eq!(coordinator.open(&mut scene), 2);
        assert_eq!(scene.len(), 2);
        assert_eq!(
            coordinator.live_ids(),
            vec![AssetId::from("a.bin"), AssetId::from("b.bin")]
        );
        assert_eq!(coordinator.stats().load_failures, 1);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_idle_cycle_stages_nothing() {
        let path = manifest("idle", "file a.bin\n");
        let coordinator = coordinator(&path);
        coordinator.open(&mut SceneGroup::new());

        assert_eq!(coordinator.cycle(), CycleOutcome::Idle);
        assert!(!coordinator.has_pending());
        assert_eq!(coordinator.stats().staged, 0);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_failed_load_only_is_idle() {
        let path = manifest("bad", "file bad.bin\n");
        let coordinator = coordinator(&path);

        assert_eq!(coordinator.cycle(), CycleOutcome::Idle);
        assert_eq!(coordinator.cycle(), CycleOutcome::Idle);
        // Retried every cycle
        assert_eq!(coordinator.stats().load_failures, 2);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_cancelled_coordinator_does_not_cycle() {
        let path = manifest("cancel", "file a.bin\n");
        let coordinator = coordinator(&path);
        coordinator.cancellation_handle().cancel();

        assert_eq!(coordinator.cycle(), CycleOutcome::Cancelled);
        assert!(!coordinator.has_pending());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_parallel_loads_match_sequential() {
        let body: String = (0..16).map(|i| format!("file asset{i}.bin\n")).collect();
        let path = manifest("parallel", &body);
        let coordinator = coordinator(&path).with_load_parallelism(4);
        let mut scene = SceneGroup::new();

        assert_eq!(coordinator.open(&mut scene), 16);
        assert_eq!(coordinator.live_ids().len(), 16);

        fs::remove_file(&path).ok();
    }

    fn panicky_cycles(parallelism: usize) {
        let path = manifest(
            &format!("panic{parallelism}"),
            "file boom.bin\nfile ok.bin\n",
        );
        let coordinator = SyncCoordinator::new(
            ManifestReader::new(&path),
            PanickyLoader,
            GpuPrepareStage::new(Arc::new(UploadPool::new())),
        )
        .with_load_parallelism(parallelism);
        let merger = coordinator.merger();

        // The healthy asset still stages alongside the panicking one
        let mut scene = SceneGroup::new();
        let background = std::thread::spawn(move || {
            let first = coordinator.cycle();
            let second = coordinator.cycle();
            let third = coordinator.cycle();
            (first, second, third, coordinator.stats())
        });
        while !background.is_finished() {
            merger.merge(&mut scene);
            let stats = merger.stats();
            assert!(stats.applied <= stats.staged);
            std::thread::yield_now();
        }
        let (first, second, third, stats) = background.join().unwrap();

        assert_eq!(first, CycleOutcome::Staged);
        assert_eq!(second, CycleOutcome::Idle);
        assert_eq!(third, CycleOutcome::Idle);
        assert_eq!(scene.ids(), vec![AssetId::from("ok.bin")]);
        assert_eq!(stats.load_failures, 3);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_panicking_loader_sequential() {
        panicky_cycles(1);
    }

    #[test]
    fn test_panicking_loader_parallel() {
        panicky_cycles(4);
    }

    #[test]
    fn test_panicking_loader_single_id() {
        let path = manifest("panic_single", "file boom.bin\n");
        // One id never fans out, even with parallelism configured
        let coordinator = SyncCoordinator::new(
            ManifestReader::new(&path),
            PanickyLoader,
            GpuPrepareStage::new(Arc::new(UploadPool::new())),
        )
        .with_load_parallelism(4);

        assert_eq!(coordinator.open(&mut SceneGroup::new()), 0);
        assert_eq!(coordinator.cycle(), CycleOutcome::Idle);
        assert_eq!(coordinator.stats().load_failures, 2);

        fs::remove_file(&path).ok();
    }
}
