//! # Asset Error Types
//!
//! All errors that can occur while reading the manifest or loading assets.
//! Every one of them is recoverable: the coordinator logs it and retries on
//! the next manifest read.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::id::AssetId;

/// Errors produced by the VOX decoder.
#[derive(Error, Debug)]
pub enum VoxError {
    /// File I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Invalid VOX file format.
    #[error("invalid VOX format: {0}")]
    InvalidFormat(String),

    /// Unsupported VOX version.
    #[error("unsupported VOX version: {0}")]
    UnsupportedVersion(u32),

    /// Missing required chunk.
    #[error("missing required chunk: {0}")]
    MissingChunk(&'static str),

    /// Invalid chunk data.
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),
}

/// Errors that can occur in the manifest/load stages.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The manifest could not be opened or read.
    #[error("manifest {path} unreadable: {source}")]
    ManifestUnreadable {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// No file exists for the asset in any search location.
    #[error("asset {0} not found")]
    NotFound(AssetId),

    /// The asset file exists but could not be read.
    #[error("failed to read asset {id}: {source}")]
    Io {
        /// Asset that failed.
        id: AssetId,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The asset is a VOX model that failed to decode.
    #[error("failed to decode asset {id}: {source}")]
    Vox {
        /// Asset that failed.
        id: AssetId,
        /// Decoder failure.
        #[source]
        source: VoxError,
    },

    /// A custom loader rejected the asset.
    #[error("failed to load asset {id}: {reason}")]
    LoadFailed {
        /// Asset that failed.
        id: AssetId,
        /// Human-readable reason.
        reason: String,
    },
}

impl AssetError {
    /// Returns the asset this error refers to, if any.
    #[must_use]
    pub fn asset_id(&self) -> Option<&AssetId> {
        match self {
            Self::ManifestUnreadable { .. } => None,
            Self::NotFound(id)
            | Self::Io { id, .. }
            | Self::Vox { id, .. }
            | Self::LoadFailed { id, .. } => Some(id),
        }
    }
}

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
