//! The set of upload contexts, one thread each.
//!
//! Contexts can come and go while the pipeline runs. Readers take a snapshot
//! of the active threads under a read lock and work on the snapshot, so a
//! context closing mid-batch only affects the jobs it had not yet accepted.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use scenesync_assets::ContextId;

use crate::device::UploadDevice;
use crate::error::GpuResult;
use crate::upload::UploadThread;

/// Registry of upload threads.
#[derive(Debug, Default)]
pub struct UploadPool {
    threads: RwLock<Vec<Arc<UploadThread>>>,
    next_context: AtomicU32,
}

impl UploadPool {
    /// Creates a pool with no contexts. Preparation is skipped until one is added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool with `count` contexts built by `factory`.
    ///
    /// # Errors
    ///
    /// Returns the first spawn failure. Contexts started before it are shut down.
    pub fn with_contexts<D, F>(count: usize, mut factory: F) -> GpuResult<Self>
    where
        D: UploadDevice + 'static,
        F: FnMut(ContextId) -> D,
    {
        let pool = Self::new();
        for _ in 0..count {
            pool.add_context(&mut factory)?;
        }
        Ok(pool)
    }

    /// Starts a new context whose device is built by `make`.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::Spawn`](crate::GpuError::Spawn) if the thread
    /// cannot be created.
    pub fn add_context<D, F>(&self, make: F) -> GpuResult<ContextId>
    where
        D: UploadDevice + 'static,
        F: FnOnce(ContextId) -> D,
    {
        let context = ContextId(self.next_context.fetch_add(1, Ordering::Relaxed));
        let thread = UploadThread::spawn(context, make(context))?;
        self.threads.write().push(Arc::new(thread));
        Ok(context)
    }

    /// Snapshot of the threads currently accepting work.
    #[must_use]
    pub fn active_contexts(&self) -> Vec<Arc<UploadThread>> {
        self.threads
            .read()
            .iter()
            .filter(|t| t.is_active())
            .cloned()
            .collect()
    }

    /// Number of active contexts.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.threads.read().iter().filter(|t| t.is_active()).count()
    }

    /// Looks up a context's thread.
    #[must_use]
    pub fn get(&self, context: ContextId) -> Option<Arc<UploadThread>> {
        self.threads
            .read()
            .iter()
            .find(|t| t.context() == context)
            .cloned()
    }

    /// Stops one context after its queued jobs and removes it.
    ///
    /// Returns false if the context is unknown.
    pub fn remove_context(&self, context: ContextId) -> bool {
        let removed = {
            let mut threads = self.threads.write();
            threads
                .iter()
                .position(|t| t.context() == context)
                .map(|index| threads.remove(index))
        };

        match removed {
            Some(thread) => {
                thread.shutdown();
                true
            }
            None => false,
        }
    }

    /// Stops every context.
    pub fn shutdown(&self) {
        let threads = std::mem::take(&mut *self.threads.write());
        for thread in &threads {
            thread.shutdown();
        }
    }
}

impl Drop for UploadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostUploadDevice;

    #[test]
    fn test_empty_pool() {
        let pool = UploadPool::new();
        assert_eq!(pool.context_count(), 0);
        assert!(pool.active_contexts().is_empty());
    }

    #[test]
    fn test_contexts_numbered_in_order() {
        let pool = UploadPool::with_contexts(3, |_| HostUploadDevice::new()).unwrap();
        let ids: Vec<_> = pool.active_contexts().iter().map(|t| t.context()).collect();
        assert_eq!(ids, vec![ContextId(0), ContextId(1), ContextId(2)]);
    }

    #[test]
    fn test_remove_context() {
        let pool = UploadPool::with_contexts(2, |_| HostUploadDevice::new()).unwrap();
        let handle = pool.get(ContextId(0)).unwrap();

        assert!(pool.remove_context(ContextId(0)));
        assert!(!pool.remove_context(ContextId(0)));
        assert!(!handle.is_active());
        assert_eq!(pool.context_count(), 1);

        // Ids are never reused
        let added = pool.add_context(|_| HostUploadDevice::new()).unwrap();
        assert_eq!(added, ContextId(2));
    }

    #[test]
    fn test_shutdown_stops_everything() {
        let pool = UploadPool::with_contexts(2, |_| HostUploadDevice::new()).unwrap();
        let handles = pool.active_contexts();
        pool.shutdown();

        assert_eq!(pool.context_count(), 0);
        assert!(handles.iter().all(|t| !t.is_active()));
    }
}
