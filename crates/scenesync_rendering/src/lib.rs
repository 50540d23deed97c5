//! # SceneSync Rendering Side
//!
//! Everything that touches a graphics context or the live scene graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GPU PREPARATION                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  GpuPrepareStage.submit(batch)                              │
//! │       ↓                                                     │
//! │  UploadPool.active_contexts()                               │
//! │       ↓                                                     │
//! │  ctx0 thread: Prepare(a) Prepare(b) Arrive ─┐               │
//! │  ctx1 thread: Prepare(a) Prepare(b) Arrive ─┼→ Barrier(n+1) │
//! │  caller:                       arrive_and_wait ─┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## MANDATE
//!
//! - Resources are created only on the thread owning their context
//! - No context: preparation is skipped, the renderer creates lazily
//! - A failed upload degrades that asset to lazy creation, the batch goes on

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod device;
pub mod error;
pub mod instance;
pub mod pool;
pub mod prepare;
pub mod scene;
pub mod upload;

pub use device::{HostUploadDevice, UploadDevice};
pub use error::{GpuError, GpuResult};
pub use instance::InstanceData;
pub use pool::UploadPool;
pub use prepare::GpuPrepareStage;
pub use scene::{SceneGraph, SceneGroup};
pub use upload::{UploadJob, UploadThread};
