// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Identity, versioning and native links shared by every resource handle.

A handle never owns a native object.  Instead, each [Context](crate::images::Context) that
materializes a handle registers its deletion queue here; closing the handle enqueues the handle's
id on every registered queue, and the contexts release their native objects at their next flush
point.
*/

use crate::images::native::DeletionQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use wasm_safe_mutex::Mutex;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a resource handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) struct ResourceCore {
    id: ResourceId,
    links: Mutex<Vec<Weak<DeletionQueue>>>,
}

impl ResourceCore {
    pub(crate) fn new() -> Self {
        ResourceCore {
            id: ResourceId::next(),
            links: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> ResourceId {
        self.id
    }

    /// Records that `queue`'s context now holds a native object for this resource.
    pub(crate) fn link(&self, queue: &Arc<DeletionQueue>) {
        let mut links = self.links.lock_sync();
        links.retain(|l| l.strong_count() > 0);
        if !links.iter().any(|l| std::ptr::eq(l.as_ptr(), Arc::as_ptr(queue))) {
            links.push(Arc::downgrade(queue));
        }
    }

    /// Requests deletion from every linked context.  Later calls find no links and do nothing.
    pub(crate) fn close(&self) {
        let links = std::mem::take(&mut *self.links.lock_sync());
        for queue in links.iter().filter_map(Weak::upgrade) {
            queue.push(self.id);
        }
    }
}

impl Drop for ResourceCore {
    fn drop(&mut self) {
        self.close();
    }
}

/// Native state derived from one version of a handle.
///
/// This is the "update if dirty" guard: materialization runs only when the recorded version
/// differs from the handle's current version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachedVersion(Option<u64>);

impl CachedVersion {
    pub const fn new() -> Self {
        CachedVersion(None)
    }

    pub fn get(self) -> Option<u64> {
        self.0
    }

    pub fn is_current(self, version: u64) -> bool {
        self.0 == Some(version)
    }

    /// Runs `materialize` once if `version` is not the cached one, then caches it.
    ///
    /// Returns whether `materialize` ran.
    pub fn update_if_dirty(&mut self, version: u64, materialize: impl FnOnce()) -> bool {
        if self.is_current(version) {
            return false;
        }
        materialize();
        self.0 = Some(version);
        true
    }

    /// Forgets the cached version, so the next use materializes again.
    pub fn invalidate(&mut self) {
        self.0 = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = ResourceCore::new();
        let b = ResourceCore::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn update_if_dirty_runs_once_per_version() {
        let mut cached = CachedVersion::new();
        let mut runs = 0;
        assert!(cached.update_if_dirty(0, || runs += 1));
        assert!(!cached.update_if_dirty(0, || runs += 1));
        assert!(cached.update_if_dirty(1, || runs += 1));
        assert_eq!(runs, 2);
        cached.invalidate();
        assert!(cached.update_if_dirty(1, || runs += 1));
        assert_eq!(runs, 3);
    }

    #[test]
    fn close_is_idempotent() {
        let queue = Arc::new(DeletionQueue::new());
        let core = ResourceCore::new();
        core.link(&queue);
        core.link(&queue);
        core.close();
        core.close();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn close_without_link_is_noop() {
        let queue = Arc::new(DeletionQueue::new());
        let core = ResourceCore::new();
        core.close();
        drop(core);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn drop_closes() {
        let queue = Arc::new(DeletionQueue::new());
        let core = ResourceCore::new();
        core.link(&queue);
        drop(core);
        assert_eq!(queue.len(), 1);
    }
}
