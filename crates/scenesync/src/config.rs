//! Pipeline configuration.
//!
//! ```toml
//! manifest_path = "assets/scene.manifest"
//! search_paths = ["assets/shared"]
//! upload_threads = 2
//! load_parallelism = 4
//! idle_interval_ms = 16
//! open_on_start = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration for the sync pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Manifest file to watch.
    pub manifest_path: PathBuf,
    /// Extra directories for relative asset paths, searched after the
    /// manifest's own directory.
    pub search_paths: Vec<PathBuf>,
    /// Upload contexts to create. 0 leaves GPU preparation to the renderer.
    pub upload_threads: usize,
    /// Loads running at once within one cycle.
    pub load_parallelism: usize,
    /// Pause after a cycle with nothing to stage. 0 only yields.
    pub idle_interval_ms: u64,
    /// Populate the scene synchronously before the background thread starts.
    pub open_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("scene.manifest"),
            search_paths: Vec::new(),
            upload_threads: 1,
            load_parallelism: 1,
            idle_interval_ms: 0,
            open_on_start: true,
        }
    }
}

impl SyncConfig {
    /// Production config: parallel loads and a polling interval of about one
    /// frame, so an idle manifest does not keep a core busy.
    #[must_use]
    pub fn production() -> Self {
        Self {
            upload_threads: 2,
            load_parallelism: 4,
            idle_interval_ms: 16,
            ..Self::default()
        }
    }

    /// Parses a TOML document. Missing fields take their default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML, unknown keys or
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.load_parallelism == 0 {
            return Err(ConfigError::Invalid {
                field: "load_parallelism",
                reason: "must be at least 1",
            });
        }
        if self.manifest_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "manifest_path",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// [`idle_interval_ms`](Self::idle_interval_ms) as a duration.
    #[must_use]
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}
