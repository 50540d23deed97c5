//! Manifest diffing.

use std::collections::{BTreeMap, BTreeSet};

use scenesync_assets::{AssetId, ManifestSnapshot};

/// Difference between a manifest read and the live set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// Listed in the manifest but not live.
    pub added: Vec<AssetId>,
    /// Live but no longer listed.
    pub removed: BTreeSet<AssetId>,
}

impl ManifestDiff {
    /// Computes `(snapshot - live, live - snapshot)`.
    #[must_use]
    pub fn compute<V>(snapshot: &ManifestSnapshot, live: &BTreeMap<AssetId, V>) -> Self {
        let added = snapshot
            .iter()
            .filter(|id| !live.contains_key(*id))
            .cloned()
            .collect();
        let removed = live
            .keys()
            .filter(|id| !snapshot.contains(*id))
            .cloned()
            .collect();
        Self { added, removed }
    }

    /// Returns true if the manifest matches the live set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
