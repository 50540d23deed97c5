//! Upload devices: the graphics-context binding owned by one upload thread.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use scenesync_assets::{Asset, AssetData, ContextId, GpuResource};

use crate::error::{GpuError, GpuResult};
use crate::instance::InstanceData;

/// A graphics context able to create resources for assets.
///
/// Owned by exactly one upload thread; never shared, so it needs `Send` but
/// not `Sync`.
pub trait UploadDevice: Send {
    /// Creates the GPU-side resource for `asset` on `context`.
    ///
    /// # Errors
    ///
    /// Returns a [`GpuError`] if the resource cannot be created. The asset
    /// then falls back to lazy creation by the renderer.
    fn upload(&mut self, context: ContextId, asset: &Asset) -> GpuResult<GpuResource>;

    /// Frees a resource previously returned by [`upload`](Self::upload).
    fn release(&mut self, buffer: u64);
}

/// Device backed by host memory.
///
/// Packs voxel models into instance buffers and keeps them in a table. A byte
/// budget and an artificial per-upload latency can be configured to model a
/// constrained or slow device.
#[derive(Debug, Default)]
pub struct HostUploadDevice {
    buffers: HashMap<u64, Vec<u8>>,
    next_buffer: u64,
    budget: Option<usize>,
    used: usize,
    latency: Duration,
}

impl HostUploadDevice {
    /// Creates a device with unlimited memory and no latency.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits device memory to `bytes`.
    #[must_use]
    pub fn with_budget(mut self, bytes: usize) -> Self {
        self.budget = Some(bytes);
        self
    }

    /// Sleeps for `latency` on every upload.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Bytes currently held.
    #[must_use]
    pub fn bytes_used(&self) -> usize {
        self.used
    }

    /// Buffers currently held.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}

impl UploadDevice for HostUploadDevice {
    fn upload(&mut self, context: ContextId, asset: &Asset) -> GpuResult<GpuResource> {
        let AssetData::Voxels(model) = asset.data() else {
            return Err(GpuError::PrepareFailed {
                id: asset.id().clone(),
                context,
                reason: format!("{} assets have no GPU representation", asset.kind()),
            });
        };

        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let instances = InstanceData::pack_model(model);
        let bytes: &[u8] = bytemuck::cast_slice(&instances);

        if let Some(budget) = self.budget {
            let available = budget.saturating_sub(self.used);
            if bytes.len() > available {
                return Err(GpuError::OutOfMemory {
                    requested: bytes.len(),
                    available,
                });
            }
        }

        let buffer = self.next_buffer;
        self.next_buffer += 1;
        self.used += bytes.len();
        self.buffers.insert(buffer, bytes.to_vec());

        Ok(GpuResource {
            context,
            buffer,
            byte_len: bytes.len(),
            instance_count: u32::try_from(instances.len()).unwrap_or(u32::MAX),
        })
    }

    fn release(&mut self, buffer: u64) {
        if let Some(bytes) = self.buffers.remove(&buffer) {
            self.used -= bytes.len();
        }
    }
}
