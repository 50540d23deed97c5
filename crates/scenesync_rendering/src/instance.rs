//! Instance layout uploaded for voxel models.

use bytemuck::{Pod, Zeroable};
use scenesync_assets::VoxelModel;

/// Brightness above which an opaque voxel is drawn as emissive.
const EMISSIVE_THRESHOLD: f32 = 0.9;

/// Per-voxel instance data sent to the GPU.
///
/// 16-byte aligned rows, consumed by the vertex shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    /// Voxel position (x, y, z) + unit scale in w.
    pub position_scale: [f32; 4],
    /// Linear RGBA color.
    pub color: [f32; 4],
    /// Emission RGB in xyz, intensity in w.
    pub emission: [f32; 4],
}

impl InstanceData {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Packs every voxel of a model, centered on the model's footprint.
    #[must_use]
    pub fn pack_model(model: &VoxelModel) -> Vec<Self> {
        #[allow(clippy::cast_precision_loss)]
        let origin = [model.size[0] as f32 / 2.0, 0.0, model.size[2] as f32 / 2.0];

        model
            .voxels
            .iter()
            .map(|voxel| {
                let color = model.color_of(voxel).as_float();
                let brightness = 0.299 * color[0] + 0.587 * color[1] + 0.114 * color[2];
                let emission = if brightness > EMISSIVE_THRESHOLD && color[3] >= 1.0 {
                    [color[0], color[1], color[2], 2.0]
                } else {
                    [0.0; 4]
                };

                Self {
                    position_scale: [
                        f32::from(voxel.x) - origin[0],
                        f32::from(voxel.y) - origin[1],
                        f32::from(voxel.z) - origin[2],
                        1.0,
                    ],
                    color,
                    emission,
                }
            })
            .collect()
    }
}
