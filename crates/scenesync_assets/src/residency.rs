//! Per-context GPU residency bookkeeping.
//!
//! Upload threads record here what they created for an asset, and clear the
//! entry again when the asset is discarded. Writes come from the upload
//! thread owning the context, so the lock is rarely contended.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;

/// Identifier of an upload (graphics) context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(pub u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// A resource created on an upload context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuResource {
    /// Context that owns the resource.
    pub context: ContextId,
    /// Device-local buffer handle.
    pub buffer: u64,
    /// Bytes uploaded.
    pub byte_len: usize,
    /// Instances contained in the buffer.
    pub instance_count: u32,
}

/// Outcome of preparing an asset on one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidencyState {
    /// The resource was created and is ready for drawing.
    Resident(GpuResource),
    /// Preparation failed; the renderer creates the resource on first use.
    Lazy {
        /// Why eager preparation was abandoned.
        reason: String,
    },
}

/// Residency of one asset across every upload context.
#[derive(Debug, Default)]
pub struct ResidencyTable {
    entries: RwLock<BTreeMap<ContextId, ResidencyState>>,
}

impl ResidencyTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully created resource.
    pub fn record_resident(&self, resource: GpuResource) {
        self.entries
            .write()
            .insert(resource.context, ResidencyState::Resident(resource));
    }

    /// Records that preparation on `context` degraded to lazy creation.
    pub fn record_lazy(&self, context: ContextId, reason: impl Into<String>) {
        self.entries.write().insert(
            context,
            ResidencyState::Lazy {
                reason: reason.into(),
            },
        );
    }

    /// State for one context, if preparation ran there.
    #[must_use]
    pub fn state(&self, context: ContextId) -> Option<ResidencyState> {
        self.entries.read().get(&context).cloned()
    }

    /// Returns true if a resource exists on `context`.
    #[must_use]
    pub fn is_resident_on(&self, context: ContextId) -> bool {
        matches!(
            self.entries.read().get(&context),
            Some(ResidencyState::Resident(_))
        )
    }

    /// Returns true if preparation on `context` has finished, either way.
    #[must_use]
    pub fn is_settled_on(&self, context: ContextId) -> bool {
        self.entries.read().contains_key(&context)
    }

    /// Contexts holding a resource for this asset.
    #[must_use]
    pub fn resident_contexts(&self) -> Vec<ContextId> {
        self.entries
            .read()
            .iter()
            .filter(|(_, state)| matches!(state, ResidencyState::Resident(_)))
            .map(|(context, _)| *context)
            .collect()
    }

    /// Removes and returns the entry for `context`.
    pub fn take(&self, context: ContextId) -> Option<ResidencyState> {
        self.entries.write().remove(&context)
    }

    /// Drops every entry for `context`, e.g. when the context shuts down.
    pub fn evict(&self, context: ContextId) {
        self.entries.write().remove(&context);
    }
}
