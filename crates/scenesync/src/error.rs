//! # Error Types
//!
//! Only startup can fail. Once the background thread runs, every failure is
//! logged and absorbed by the stage that hit it.

use std::io;
use std::path::PathBuf;

use scenesync_rendering::GpuError;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The file is not valid TOML for [`SyncConfig`](crate::SyncConfig).
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Errors raised while starting the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An upload context could not be started.
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// The background thread could not be started.
    #[error("failed to spawn background thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Result type for pipeline startup.
pub type Result<T> = std::result::Result<T, Error>;
