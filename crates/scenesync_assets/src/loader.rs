//! The background load stage.
//!
//! Loads are synchronous from the caller's point of view; the coordinator
//! may run several of them on different threads within one cycle.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::asset::{Asset, AssetData, AssetHandle};
use crate::error::{AssetError, AssetResult};
use crate::id::AssetId;
use crate::vox::VoxDecoder;

/// Produces an asset handle from an identifier.
pub trait AssetLoader: Send + Sync {
    /// Loads one asset.
    ///
    /// # Errors
    ///
    /// Returns an [`AssetError`] if the asset is missing or corrupt. The
    /// caller skips the asset for this cycle and retries on the next.
    fn load(&self, id: &AssetId) -> AssetResult<AssetHandle>;
}

impl<L: AssetLoader + ?Sized> AssetLoader for Arc<L> {
    fn load(&self, id: &AssetId) -> AssetResult<AssetHandle> {
        (**self).load(id)
    }
}

/// Loads assets from the filesystem.
///
/// Relative identifiers are looked up in each search path in order; absolute
/// identifiers are used as-is. `.vox` files are decoded into voxel models,
/// everything else is kept as a blob.
#[derive(Debug, Clone, Default)]
pub struct FileAssetLoader {
    search_paths: Vec<PathBuf>,
}

impl FileAssetLoader {
    /// Creates a loader that resolves relative paths against the working
    /// directory only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a directory to the search list.
    #[must_use]
    pub fn with_search_path<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.search_paths.push(dir.as_ref().to_path_buf());
        self
    }

    /// Search directories, in lookup order.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Finds the file backing `id`.
    #[must_use]
    pub fn resolve(&self, id: &AssetId) -> Option<PathBuf> {
        let path = id.as_path();
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }

        self.search_paths
            .iter()
            .map(|dir| dir.join(path))
            .chain(std::iter::once(path.to_path_buf()))
            .find(|candidate| candidate.is_file())
    }
}

impl AssetLoader for FileAssetLoader {
    fn load(&self, id: &AssetId) -> AssetResult<AssetHandle> {
        let path = self
            .resolve(id)
            .ok_or_else(|| AssetError::NotFound(id.clone()))?;

        let data = match id.extension().as_deref() {
            Some("vox") => VoxDecoder::load(&path)
                .map(AssetData::Voxels)
                .map_err(|source| AssetError::Vox {
                    id: id.clone(),
                    source,
                })?,
            _ => fs::read(&path)
                .map(AssetData::Blob)
                .map_err(|source| AssetError::Io {
                    id: id.clone(),
                    source,
                })?,
        };

        tracing::debug!(asset = %id, path = %path.display(), kind = %data.kind(), "asset loaded");
        Ok(Asset::new_handle(id.clone(), data))
    }
}
