//! GPU preparation stage.
//!
//! Fans a batch of loaded assets out to every active upload context and hands
//! back the barrier that opens once every context has worked through the
//! batch. The caller is the last participant.

use std::sync::Arc;

use scenesync_assets::AssetHandle;
use scenesync_core::CountdownBarrier;

use crate::pool::UploadPool;
use crate::upload::UploadJob;

/// Submits preparation work and release requests to the upload pool.
#[derive(Debug, Clone)]
pub struct GpuPrepareStage {
    pool: Arc<UploadPool>,
}

impl GpuPrepareStage {
    /// Creates a stage over `pool`.
    #[must_use]
    pub fn new(pool: Arc<UploadPool>) -> Self {
        Self { pool }
    }

    /// The pool this stage feeds.
    #[must_use]
    pub fn pool(&self) -> &Arc<UploadPool> {
        &self.pool
    }

    /// Queues preparation of `batch` on every active context.
    ///
    /// Returns the barrier to wait on, sized to the number of contexts plus
    /// one for the caller. Returns `None` when there is nothing to wait for:
    /// an empty batch, no active context, or no asset needing a GPU resource.
    ///
    /// A context that closes while jobs are queued still arrives, and the
    /// assets it never reached are marked for lazy creation.
    #[must_use]
    pub fn submit(&self, batch: &[AssetHandle]) -> Option<Arc<CountdownBarrier>> {
        let gpu_assets: Vec<&AssetHandle> = batch.iter().filter(|a| a.requires_gpu()).collect();
        if gpu_assets.is_empty() {
            return None;
        }

        let contexts = self.pool.active_contexts();
        if contexts.is_empty() {
            tracing::debug!(
                assets = gpu_assets.len(),
                "no upload context, deferring creation to the renderer"
            );
            return None;
        }

        let barrier = Arc::new(CountdownBarrier::new(contexts.len() + 1));
        for thread in &contexts {
            for asset in &gpu_assets {
                if let Err(e) = thread.enqueue(UploadJob::Prepare(Arc::clone(asset))) {
                    tracing::warn!(asset = %asset.id(), "{e}");
                    asset.residency().record_lazy(thread.context(), e.to_string());
                }
            }
            // A rejected ticket is dropped here and arrives for the context
            if let Err(e) = thread.enqueue(UploadJob::Arrive(barrier.ticket())) {
                tracing::debug!("{e}");
            }
        }

        tracing::debug!(
            assets = gpu_assets.len(),
            contexts = contexts.len(),
            "GPU preparation submitted"
        );
        Some(barrier)
    }

    /// Frees the resources `asset` holds on every context.
    ///
    /// Queued behind any preparation still in flight for the asset. Returns
    /// the number of contexts that accepted the job.
    pub fn release(&self, asset: &AssetHandle) -> usize {
        if !asset.requires_gpu() {
            return 0;
        }
        self.pool
            .active_contexts()
            .iter()
            .filter(|thread| thread.enqueue(UploadJob::Discard(Arc::clone(asset))).is_ok())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostUploadDevice;
    use scenesync_assets::{
        Asset, AssetData, AssetId, ContextId, ModelVoxel, VoxPalette, VoxelModel,
    };

    fn cube(name: &str) -> AssetHandle {
        Asset::new_handle(
            AssetId::from(name),
            AssetData::Voxels(VoxelModel {
                name: name.to_string(),
                size: [1, 1, 1],
                voxels: vec![ModelVoxel { x: 0, y: 0, z: 0, color_index: 1 }],
                palette: VoxPalette::default(),
            }),
        )
    }

    fn stage(contexts: usize) -> GpuPrepareStage {
        let pool = UploadPool::with_contexts(contexts, |_| HostUploadDevice::new()).unwrap();
        GpuPrepareStage::new(Arc::new(pool))
    }

    #[test]
    fn test_nothing_to_wait_for() {
        let stage = stage(2);
        assert!(stage.submit(&[]).is_none());

        let blob = Asset::new_handle(AssetId::from("notes.txt"), AssetData::Blob(vec![1, 2]));
        assert!(stage.submit(&[blob]).is_none());
    }

    #[test]
    fn test_no_context_skips_preparation() {
        let stage = stage(0);
        let asset = cube("a.vox");
        assert!(stage.submit(&[Arc::clone(&asset)]).is_none());
        assert!(asset.residency().resident_contexts().is_empty());
    }

    #[test]
    fn test_ready_on_every_context_after_barrier() {
        let stage = stage(3);
        let batch = vec![cube("a.vox"), cube("b.vox")];

        let barrier = stage.submit(&batch).unwrap();
        assert_eq!(barrier.participants(), 4);
        barrier.arrive_and_wait().unwrap();

        for asset in &batch {
            for ctx in 0..3 {
                assert!(asset.residency().is_resident_on(ContextId(ctx)));
            }
        }
    }

    #[test]
    fn test_closed_context_does_not_stall() {
        let stage = stage(2);
        let closing = stage.pool().get(ContextId(1)).unwrap();
        let asset = cube("a.vox");

        let barrier = stage.submit(&[Arc::clone(&asset)]).unwrap();
        closing.shutdown();
        barrier.arrive_and_wait().unwrap();

        assert!(asset.residency().is_resident_on(ContextId(0)));
        assert!(asset.residency().is_settled_on(ContextId(1)));
    }

    #[test]
    fn test_release_clears_residency() {
        let stage = stage(2);
        let asset = cube("a.vox");
        stage.submit(&[Arc::clone(&asset)]).unwrap().arrive_and_wait().unwrap();

        assert_eq!(stage.release(&asset), 2);
        // Any later batch is processed after the discards
        stage.submit(&[cube("b.vox")]).unwrap().arrive_and_wait().unwrap();

        assert!(asset.residency().resident_contexts().is_empty());
        for ctx in 0..2 {
            assert_eq!(stage.pool().get(ContextId(ctx)).unwrap().released_count(), 1);
        }
    }

    #[test]
    fn test_release_while_preparing() {
        let pool = UploadPool::with_contexts(1, |_| {
            HostUploadDevice::new().with_latency(std::time::Duration::from_millis(50))
        })
        .unwrap();
        let stage = GpuPrepareStage::new(Arc::new(pool));
        let asset = cube("slow.vox");

        let barrier = stage.submit(&[Arc::clone(&asset)]).unwrap();
        // Released before the upload finishes
        assert_eq!(stage.release(&asset), 1);
        barrier.arrive_and_wait().unwrap();
        stage.submit(&[cube("flush.vox")]).unwrap().arrive_and_wait().unwrap();

        let thread = stage.pool().get(ContextId(0)).unwrap();
        assert_eq!(thread.released_count(), 1);
        assert!(!asset.residency().is_resident_on(ContextId(0)));
    }
}
