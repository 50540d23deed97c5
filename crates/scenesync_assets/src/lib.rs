//! # SceneSync Asset Pipeline
//!
//! Turns a manifest of file paths into loaded, shareable asset handles.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ASSET PIPELINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  manifest.txt → ManifestReader → ManifestSnapshot (set)     │
//! │                                        ↓                    │
//! │  AssetId → AssetLoader → AssetHandle (Arc<Asset>)           │
//! │                              ↓                              │
//! │              .vox → VoxelModel     other → Blob             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! GPU residency of a handle is tracked per upload context in its
//! [`ResidencyTable`]; the upload threads that fill it live in
//! `scenesync_rendering`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod asset;
pub mod error;
pub mod id;
pub mod loader;
pub mod manifest;
pub mod residency;
pub mod vox;

pub use asset::{Asset, AssetData, AssetHandle, AssetKind};
pub use error::{AssetError, AssetResult, VoxError};
pub use id::AssetId;
pub use loader::{AssetLoader, FileAssetLoader};
pub use manifest::{ManifestReader, ManifestSnapshot};
pub use residency::{ContextId, GpuResource, ResidencyState, ResidencyTable};
pub use vox::{ModelVoxel, VoxColor, VoxDecoder, VoxPalette, VoxelModel};
