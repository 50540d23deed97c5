//! # Synchronization Error Types

use thiserror::Error;

/// Errors returned by blocking primitives.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The wait was force-released by a teardown request.
    #[error("wait cancelled by teardown")]
    Cancelled,
}

/// Result type for blocking operations.
pub type SyncResult<T> = Result<T, SyncError>;
