//! Live scene graph collaborator.
//!
//! The scene is owned and mutated by the update thread only. The merger
//! receives it by `&mut` during a merge and never keeps it.

use std::slice;

use scenesync_assets::{AssetHandle, AssetId};

/// A scene the merger can attach nodes to and detach nodes from.
pub trait SceneGraph {
    /// Adds `node` as a child.
    fn attach(&mut self, node: AssetHandle);

    /// Removes `node`. Returns false if it was not attached.
    fn detach(&mut self, node: &AssetHandle) -> bool;
}

/// A flat group of asset nodes.
#[derive(Debug, Default)]
pub struct SceneGroup {
    children: Vec<AssetHandle>,
}

impl SceneGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a node for `id` is attached.
    #[must_use]
    pub fn contains(&self, id: &AssetId) -> bool {
        self.children.iter().any(|c| c.id() == id)
    }

    /// Number of attached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns true if nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Attached nodes in attach order.
    pub fn iter(&self) -> slice::Iter<'_, AssetHandle> {
        self.children.iter()
    }

    /// Ids of the attached nodes, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<AssetId> {
        let mut ids: Vec<_> = self.children.iter().map(|c| c.id().clone()).collect();
        ids.sort();
        ids
    }
}

impl SceneGraph for SceneGroup {
    fn attach(&mut self, node: AssetHandle) {
        if self.children.iter().any(|c| AssetHandle::ptr_eq(c, &node)) {
            tracing::warn!(asset = %node.id(), "node already attached");
            return;
        }
        self.children.push(node);
    }

    fn detach(&mut self, node: &AssetHandle) -> bool {
        match self.children.iter().position(|c| AssetHandle::ptr_eq(c, node)) {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a SceneGroup {
    type Item = &'a AssetHandle;
    type IntoIter = slice::Iter<'a, AssetHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
