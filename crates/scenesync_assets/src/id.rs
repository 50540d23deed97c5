//! Asset identifiers.

use std::borrow::Borrow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Identifier of an asset, derived from the path string in the manifest.
///
/// Cheap to clone (shared string), totally ordered, hashable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(Arc<str>);

impl AssetId {
    /// Creates an identifier from a path string.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self(Arc::from(path))
    }

    /// Returns the identifier as written in the manifest.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier as a filesystem path.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(&*self.0)
    }

    /// Lower-cased file extension, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.as_path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for AssetId {
    fn from(path: String) -> Self {
        Self(Arc::from(path))
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for AssetId {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_ordering_and_dedup() {
        let set: BTreeSet<AssetId> = ["b.model", "a.model", "b.model"]
            .into_iter()
            .map(AssetId::from)
            .collect();

        let ids: Vec<&str> = set.iter().map(AssetId::as_str).collect();
        assert_eq!(ids, vec!["a.model", "b.model"]);
    }

    #[test]
    fn test_lookup_by_str() {
        let set: BTreeSet<AssetId> = [AssetId::from("ship.vox")].into_iter().collect();
        assert!(set.contains("ship.vox"));
    }

    #[test]
    fn test_extension_lowercased() {
        assert_eq!(AssetId::from("models/Ship.VOX").extension().as_deref(), Some("vox"));
        assert_eq!(AssetId::from("README").extension(), None);
    }
}
