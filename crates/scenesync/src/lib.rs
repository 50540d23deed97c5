//! # SceneSync
//!
//! Keeps a live scene graph in step with a manifest of asset files, without
//! the renderer ever observing a half-merged scene or a resource whose upload
//! has not finished.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ BACKGROUND THREAD (OperationThread)                              │
//! │   read manifest → diff vs LiveSet → load new → GPU prepare       │
//! │        → wait barrier → stage PendingDiff → block on MergeGate   │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ UPLOAD THREADS (UploadPool)                                      │
//! │   Prepare(asset)... Arrive(barrier)                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ UPDATE THREAD (owns the scene)                                   │
//! │   once per frame: SceneMerger::merge(&mut scene)                 │
//! │        removals → additions → release MergeGate                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = SyncConfig::load("scenesync.toml")?;
//! let pool = Arc::new(UploadPool::with_contexts(config.upload_threads, |_| HostUploadDevice::new())?);
//! let coordinator = SyncCoordinator::from_config(&config, pool);
//! let merger = coordinator.merger();
//!
//! let mut scene = SceneGroup::new();
//! coordinator.open(&mut scene);
//! let mut operation = OperationThread::spawn(coordinator)?;
//!
//! loop {
//!     merger.merge(&mut scene);
//!     // render
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod diff;
pub mod error;
pub mod merger;
pub mod operation;
pub mod stats;

pub use cancel::CancellationHandle;
pub use config::SyncConfig;
pub use coordinator::{CycleOutcome, SyncCoordinator};
pub use diff::ManifestDiff;
pub use error::{ConfigError, Error, Result};
pub use merger::{MergeReport, SceneMerger};
pub use operation::OperationThread;
pub use stats::SyncStats;

pub use scenesync_assets::{AssetHandle, AssetId, AssetLoader, FileAssetLoader, ManifestReader};
pub use scenesync_rendering::{
    GpuPrepareStage, HostUploadDevice, SceneGraph, SceneGroup, UploadDevice, UploadPool,
};
