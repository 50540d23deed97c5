//! Upload threads.
//!
//! ## Architecture
//!
//! ```text
//!   GpuPrepareStage ──┐
//!   SceneMerger ──────┼──> [crossbeam queue] ──> [upload thread] ──> UploadDevice
//!                     │      (FIFO jobs)          (owns context)
//! ```
//!
//! Jobs run strictly in queue order, so an `Arrive` job queued after a batch
//! of `Prepare` jobs fires only once that batch has been processed.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use scenesync_assets::{AssetHandle, ContextId, ResidencyState};
use scenesync_core::ArrivalTicket;

use crate::device::UploadDevice;
use crate::error::{GpuError, GpuResult};

/// Unit of work executed on an upload thread.
#[derive(Debug)]
pub enum UploadJob {
    /// Create the asset's resource on this context.
    Prepare(AssetHandle),
    /// Free whatever the asset holds on this context.
    ///
    /// Runs after any `Prepare` queued before it, so a resource still being
    /// created when the asset was dropped is freed too.
    Discard(AssetHandle),
    /// Signal the barrier once every earlier job has run.
    ///
    /// A ticket dropped without running still arrives.
    Arrive(ArrivalTicket),
    /// Stop the thread after the jobs queued before this one.
    Shutdown,
}

/// Counters for one upload thread.
#[derive(Debug, Default)]
struct UploadCounters {
    prepared: AtomicU64,
    failed: AtomicU64,
    released: AtomicU64,
}

/// A thread bound to one upload context.
pub struct UploadThread {
    context: ContextId,
    sender: Sender<UploadJob>,
    running: Arc<AtomicBool>,
    counters: Arc<UploadCounters>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl UploadThread {
    /// Starts a thread that owns `device`.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::Spawn`] if the thread cannot be created.
    pub fn spawn<D: UploadDevice + 'static>(context: ContextId, device: D) -> GpuResult<Self> {
        let (sender, receiver) = unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(UploadCounters::default());

        let thread_running = Arc::clone(&running);
        let thread_counters = Arc::clone(&counters);
        let handle = thread::Builder::new()
            .name(format!("scenesync-upload-{}", context.0))
            .spawn(move || {
                Self::run(context, device, &receiver, &thread_running, &thread_counters);
            })?;

        tracing::info!(%context, "upload context started");

        Ok(Self {
            context,
            sender,
            running,
            counters,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Context served by this thread.
    #[inline]
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Returns true while the thread accepts work.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Assets successfully prepared so far.
    #[must_use]
    pub fn prepared_count(&self) -> u64 {
        self.counters.prepared.load(Ordering::Relaxed)
    }

    /// Preparations that degraded to lazy creation so far.
    #[must_use]
    pub fn failed_count(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Buffers freed so far.
    #[must_use]
    pub fn released_count(&self) -> u64 {
        self.counters.released.load(Ordering::Relaxed)
    }

    /// Queues a job.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ContextClosed`] if the thread has stopped.
    pub fn enqueue(&self, job: UploadJob) -> GpuResult<()> {
        if !self.is_active() {
            return Err(GpuError::ContextClosed(self.context));
        }
        self.sender
            .send(job)
            .map_err(|_| GpuError::ContextClosed(self.context))
    }

    /// Stops the thread after its queued jobs and waits for it.
    pub fn shutdown(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };

        let _ = self.sender.send(UploadJob::Shutdown);
        if handle.join().is_err() {
            tracing::error!(context = %self.context, "upload thread panicked");
        }
        self.running.store(false, Ordering::Release);
        tracing::info!(context = %self.context, "upload context stopped");
    }

    /// Upload thread main loop.
    fn run<D: UploadDevice>(
        context: ContextId,
        mut device: D,
        receiver: &Receiver<UploadJob>,
        running: &AtomicBool,
        counters: &UploadCounters,
    ) {
        for job in receiver {
            match job {
                UploadJob::Prepare(asset) => Self::prepare(context, &mut device, &asset, counters),
                UploadJob::Discard(asset) => Self::discard(context, &mut device, &asset, counters),
                UploadJob::Arrive(ticket) => ticket.arrive(),
                UploadJob::Shutdown => break,
            }
        }

        running.store(false, Ordering::Release);

        // Nothing queued behind the shutdown may leave a waiter hanging
        for job in receiver.try_iter() {
            match job {
                UploadJob::Prepare(asset) => {
                    asset.residency().record_lazy(context, "upload context shut down");
                }
                UploadJob::Discard(asset) => Self::discard(context, &mut device, &asset, counters),
                UploadJob::Arrive(ticket) => ticket.arrive(),
                UploadJob::Shutdown => {}
            }
        }
    }

    fn prepare<D: UploadDevice>(
        context: ContextId,
        device: &mut D,
        asset: &AssetHandle,
        counters: &UploadCounters,
    ) {
        if !asset.requires_gpu() {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| device.upload(context, asset)));
        match outcome {
            Ok(Ok(resource)) => {
                tracing::trace!(asset = %asset.id(), %context, bytes = resource.byte_len, "prepared");
                asset.residency().record_resident(resource);
                counters.prepared.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                tracing::warn!(asset = %asset.id(), %context, "GPU preparation failed, deferring to renderer: {e}");
                asset.residency().record_lazy(context, e.to_string());
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                tracing::error!(asset = %asset.id(), %context, "upload device panicked, deferring to renderer");
                asset.residency().record_lazy(context, "upload device panicked");
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn discard<D: UploadDevice>(
        context: ContextId,
        device: &mut D,
        asset: &AssetHandle,
        counters: &UploadCounters,
    ) {
        if let Some(ResidencyState::Resident(resource)) = asset.residency().take(context) {
            device.release(resource.buffer);
            counters.released.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(asset = %asset.id(), %context, buffer = resource.buffer, "released");
        }
    }
}

impl std::fmt::Debug for UploadThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadThread")
            .field("context", &self.context)
            .field("active", &self.is_active())
            .field("prepared", &self.prepared_count())
            .field("released", &self.released_count())
            .finish_non_exhaustive()
    }
}

impl Drop for UploadThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostUploadDevice;
    use scenesync_assets::{
        Asset, AssetData, AssetId, GpuResource, ModelVoxel, VoxPalette, VoxelModel,
    };
    use scenesync_core::CountdownBarrier;

    /// Device whose uploads always panic.
    struct PanickingDevice;

    impl UploadDevice for PanickingDevice {
        fn upload(&mut self, _context: ContextId, asset: &Asset) -> GpuResult<GpuResource> {
            panic!("driver fault uploading {}", asset.id());
        }

        fn release(&mut self, _buffer: u64) {}
    }

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

    #[test]
    fn test_prepare_then_arrive() {
        let thread = UploadThread::spawn(ContextId(3), HostUploadDevice::new()).unwrap();
        let asset = cube("a.vox");
        let barrier = Arc::new(CountdownBarrier::new(2));

        thread.enqueue(UploadJob::Prepare(Arc::clone(&asset))).unwrap();
        thread.enqueue(UploadJob::Arrive(barrier.ticket())).unwrap();
        barrier.arrive_and_wait().unwrap();

        // FIFO: preparation finished before the arrival
        assert!(asset.residency().is_resident_on(ContextId(3)));
        assert_eq!(thread.prepared_count(), 1);
    }

    #[test]
    fn test_failure_still_arrives() {
        let thread =
            UploadThread::spawn(ContextId(0), HostUploadDevice::new().with_budget(1)).unwrap();
        let asset = cube("big.vox");
        let barrier = Arc::new(CountdownBarrier::new(2));

        thread.enqueue(UploadJob::Prepare(Arc::clone(&asset))).unwrap();
        thread.enqueue(UploadJob::Arrive(barrier.ticket())).unwrap();
        barrier.arrive_and_wait().unwrap();

        assert!(!asset.residency().is_resident_on(ContextId(0)));
        assert!(asset.residency().is_settled_on(ContextId(0)));
        assert_eq!(thread.failed_count(), 1);
    }

    #[test]
    fn test_rejected_arrival_still_counts() {
        let thread = UploadThread::spawn(ContextId(2), HostUploadDevice::new()).unwrap();
        thread.shutdown();

        let barrier = Arc::new(CountdownBarrier::new(2));
        assert!(thread.enqueue(UploadJob::Arrive(barrier.ticket())).is_err());
        assert_eq!(barrier.arrive_and_wait(), Ok(()));
    }

    #[test]
    fn test_enqueue_after_shutdown_fails() {
        let thread = UploadThread::spawn(ContextId(1), HostUploadDevice::new()).unwrap();
        thread.shutdown();

        assert!(!thread.is_active());
        assert!(matches!(
            thread.enqueue(UploadJob::Shutdown),
            Err(GpuError::ContextClosed(ContextId(1)))
        ));
    }

    #[test]
    fn test_device_panic_degrades_to_lazy() {
        let thread = UploadThread::spawn(ContextId(4), PanickingDevice).unwrap();
        let asset = cube("cursed.vox");
        let barrier = Arc::new(CountdownBarrier::new(2));

        thread.enqueue(UploadJob::Prepare(Arc::clone(&asset))).unwrap();
        thread.enqueue(UploadJob::Arrive(barrier.ticket())).unwrap();
        assert_eq!(barrier.arrive_and_wait(), Ok(()));

        assert!(matches!(
            asset.residency().state(ContextId(4)),
            Some(ResidencyState::Lazy { .. })
        ));
        assert_eq!(thread.failed_count(), 1);
        // The thread survives and keeps serving jobs
        assert!(thread.is_active());
        let again = Arc::new(CountdownBarrier::new(2));
        thread.enqueue(UploadJob::Arrive(again.ticket())).unwrap();
        assert_eq!(again.arrive_and_wait(), Ok(()));
    }

    #[test]
    fn test_discard_after_prepare_frees_buffer() {
        let thread = UploadThread::spawn(ContextId(5), HostUploadDevice::new()).unwrap();
        let asset = cube("gone.vox");
        let barrier = Arc::new(CountdownBarrier::new(2));

        // Queued back to back: the discard must see the finished upload
        thread.enqueue(UploadJob::Prepare(Arc::clone(&asset))).unwrap();
        thread.enqueue(UploadJob::Discard(Arc::clone(&asset))).unwrap();
        thread.enqueue(UploadJob::Arrive(barrier.ticket())).unwrap();
        barrier.arrive_and_wait().unwrap();

        assert_eq!(thread.prepared_count(), 1);
        assert_eq!(thread.released_count(), 1);
        assert!(!asset.residency().is_settled_on(ContextId(5)));
    }
}
