//! Loaded assets and their shared handles.

use std::fmt;
use std::sync::Arc;

use crate::id::AssetId;
use crate::residency::ResidencyTable;
use crate::vox::VoxelModel;

/// Kind of a loaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Voxel model, drawn from an instance buffer.
    Voxels,
    /// Opaque bytes with no GPU-side representation.
    Blob,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Voxels => f.write_str("voxels"),
            Self::Blob => f.write_str("blob"),
        }
    }
}

/// Decoded payload of an asset.
#[derive(Debug, Clone)]
pub enum AssetData {
    /// A decoded `.vox` model.
    Voxels(VoxelModel),
    /// Raw file contents.
    Blob(Vec<u8>),
}

impl AssetData {
    /// Kind tag of this payload.
    #[must_use]
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Voxels(_) => AssetKind::Voxels,
            Self::Blob(_) => AssetKind::Blob,
        }
    }

    /// Returns true if the payload needs a resource created on each upload
    /// context before it can be drawn.
    #[must_use]
    pub fn requires_gpu(&self) -> bool {
        match self {
            Self::Voxels(model) => !model.voxels.is_empty(),
            Self::Blob(_) => false,
        }
    }
}

/// A loaded asset.
///
/// Built on the background thread, prepared on the upload threads, then
/// handed to the update thread inside a staged diff.
#[derive(Debug)]
pub struct Asset {
    id: AssetId,
    data: AssetData,
    residency: ResidencyTable,
}

/// Shared ownership of a loaded asset.
///
/// The live set keeps one reference for bookkeeping, the scene graph keeps
/// another for rendering.
pub type AssetHandle = Arc<Asset>;

impl Asset {
    /// Wraps a payload into a new handle with empty residency.
    #[must_use]
    pub fn new_handle(id: AssetId, data: AssetData) -> AssetHandle {
        Arc::new(Self {
            id,
            data,
            residency: ResidencyTable::new(),
        })
    }

    /// Asset identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &AssetId {
        &self.id
    }

    /// Decoded payload.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &AssetData {
        &self.data
    }

    /// Kind tag.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> AssetKind {
        self.data.kind()
    }

    /// See [`AssetData::requires_gpu`].
    #[inline]
    #[must_use]
    pub fn requires_gpu(&self) -> bool {
        self.data.requires_gpu()
    }

    /// Per-context GPU residency.
    #[inline]
    #[must_use]
    pub fn residency(&self) -> &ResidencyTable {
        &self.residency
    }
}
