//! # GPU Preparation Error Types

use std::io;

use scenesync_assets::{AssetId, ContextId};
use thiserror::Error;

/// Errors raised by upload contexts.
#[derive(Error, Debug)]
pub enum GpuError {
    /// The context's thread is gone or shutting down.
    #[error("upload context {0} is closed")]
    ContextClosed(ContextId),

    /// The device refused to create a resource for the asset.
    #[error("preparation of {id} failed on {context}: {reason}")]
    PrepareFailed {
        /// Asset being prepared.
        id: AssetId,
        /// Context that failed.
        context: ContextId,
        /// Human-readable reason.
        reason: String,
    },

    /// The device ran out of memory.
    #[error("device out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory {
        /// Bytes requested by the upload.
        requested: usize,
        /// Bytes left in the budget.
        available: usize,
    },

    /// The OS refused to start an upload thread.
    #[error("failed to spawn upload thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Result type for GPU operations.
pub type GpuResult<T> = Result<T, GpuError>;
