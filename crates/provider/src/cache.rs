//! Per-viewer cache of visible child listings
//!
//! Keys are `(viewer scope, node id)`; values are the ids of the children
//! that viewer may see, in document order, tagged with the generation of the
//! tree they were computed from. Entries expire after a period
//! without access (sliding expiration). Two invalidation shapes are
//! supported: everything (after a rebuild) and everything under one scope
//! (after a viewer's permissions change).

use moka::sync::Cache;
use sitetree_core::config::DEFAULT_SLIDING_EXPIRATION;
use sitetree_core::{NodeId, ViewerScope};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Visible child ids of one node for one viewer scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleChildren {
    generation: u64,
    ids: Arc<[NodeId]>,
}

impl VisibleChildren {
    pub fn new(generation: u64, ids: impl Into<Arc<[NodeId]>>) -> Self {
        Self {
            generation,
            ids: ids.into(),
        }
    }

    /// Generation of the tree the listing was computed from
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }
}

impl Deref for VisibleChildren {
    type Target = [NodeId];

    fn deref(&self) -> &[NodeId] {
        &self.ids
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub scope: ViewerScope,
    pub node: NodeId,
}

impl CacheKey {
    pub fn new(scope: &ViewerScope, node: NodeId) -> Self {
        Self {
            scope: scope.clone(),
            node,
        }
    }
}

#[derive(Clone)]
pub struct ScopedResultCache {
    cache: Cache<CacheKey, VisibleChildren>,
    sliding_expiration: Duration,
}

impl ScopedResultCache {
    pub fn new(sliding_expiration: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_idle(sliding_expiration)
            .support_invalidation_closures()
            .build();
        Self {
            cache,
            sliding_expiration,
        }
    }

    pub fn sliding_expiration(&self) -> Duration {
        self.sliding_expiration
    }

    /// Look up an entry, refreshing its expiration
    pub fn get(&self, scope: &ViewerScope, node: NodeId) -> Option<VisibleChildren> {
        self.cache.get(&CacheKey::new(scope, node))
    }

    /// Insert or replace an entry
    pub fn put(&self, scope: ViewerScope, node: NodeId, children: VisibleChildren) {
        self.cache.insert(CacheKey { scope, node }, children);
    }

    pub fn remove(&self, scope: &ViewerScope, node: NodeId) {
        self.cache.invalidate(&CacheKey::new(scope, node));
    }

    /// Drop every entry
    pub fn clear_all(&self) {
        self.cache.invalidate_all();
    }

    /// Drop the entries of `scope` and of every scope nested under it
    ///
    /// Other viewers' entries are left alone. See [`ViewerScope::is_within`].
    pub fn clear_by_scope_prefix(&self, scope: &ViewerScope) {
        let prefix = scope.clone();
        let registered = self
            .cache
            .invalidate_entries_if(move |key, _| key.scope.is_within(&prefix));

        if let Err(e) = registered {
            warn!(error = %e, scope = %scope, "invalidation closure rejected, evicting by scan");
            for (key, _) in self.cache.iter() {
                if key.scope.is_within(scope) {
                    self.cache.invalidate(key.as_ref());
                }
            }
        }
        debug!(scope = %scope, "cleared cached child listings for scope");
    }

    /// Approximate number of live entries
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for ScopedResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_SLIDING_EXPIRATION)
    }
}

impl std::fmt::Debug for ScopedResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedResultCache")
            .field("sliding_expiration", &self.sliding_expiration)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitetree_core::ViewerContext;

    fn ids(raw: &[u32]) -> VisibleChildren {
        let ids: Vec<NodeId> = raw.iter().copied().map(NodeId::new).collect();
        VisibleChildren::new(1, ids)
    }

    #[test]
    fn test_put_get_remove() {
        let cache = ScopedResultCache::default();
        let scope = ViewerContext::authenticated("bob").scope();

        assert!(cache.get(&scope, NodeId::ROOT).is_none());

        cache.put(scope.clone(), NodeId::ROOT, ids(&[1, 2]));
        assert_eq!(cache.get(&scope, NodeId::ROOT).unwrap(), ids(&[1, 2]));

        // Last write wins
        cache.put(scope.clone(), NodeId::ROOT, ids(&[2]));
        assert_eq!(cache.get(&scope, NodeId::ROOT).unwrap().ids(), [NodeId::new(2)]);

        cache.remove(&scope, NodeId::ROOT);
        assert!(cache.get(&scope, NodeId::ROOT).is_none());
    }

    #[test]
    fn test_scopes_are_separate() {
        let cache = ScopedResultCache::default();
        let anonymous = ViewerContext::anonymous().scope();
        let bob = ViewerContext::authenticated("bob").scope();

        cache.put(bob.clone(), NodeId::ROOT, ids(&[1, 2]));
        assert!(cache.get(&anonymous, NodeId::ROOT).is_none());
    }

    #[test]
    fn test_clear_all() {
        let cache = ScopedResultCache::default();
        let bob = ViewerContext::authenticated("bob").scope();
        let alice = ViewerContext::authenticated("alice").scope();

        cache.put(bob.clone(), NodeId::ROOT, ids(&[1]));
        cache.put(alice.clone(), NodeId::new(1), ids(&[2]));
        cache.clear_all();

        assert!(cache.get(&bob, NodeId::ROOT).is_none());
        assert!(cache.get(&alice, NodeId::new(1)).is_none());
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn test_clear_by_scope_prefix() {
        let cache = ScopedResultCache::default();
        let bob = ViewerContext::authenticated("bob").with_session("s1").scope();
        let guest = ViewerContext::anonymous().with_session("s1").scope();
        let carol = ViewerContext::authenticated("carol").with_session("s10").scope();

        cache.put(bob.clone(), NodeId::ROOT, ids(&[1]));
        cache.put(bob.clone(), NodeId::new(1), ids(&[2]));
        cache.put(guest.clone(), NodeId::ROOT, ids(&[1]));
        cache.put(carol.clone(), NodeId::ROOT, ids(&[1, 2]));

        cache.clear_by_scope_prefix(&ViewerScope::session("s1"));

        assert!(cache.get(&bob, NodeId::ROOT).is_none());
        assert!(cache.get(&bob, NodeId::new(1)).is_none());
        assert!(cache.get(&guest, NodeId::ROOT).is_none());
        assert!(cache.get(&carol, NodeId::ROOT).is_some());
    }

    #[test]
    fn test_entries_added_after_prefix_clear_survive() {
        let cache = ScopedResultCache::default();
        let bob = ViewerContext::authenticated("bob").scope();

        cache.put(bob.clone(), NodeId::ROOT, ids(&[1]));
        cache.clear_by_scope_prefix(&bob);
        cache.put(bob.clone(), NodeId::ROOT, ids(&[1, 2]));

        assert_eq!(cache.get(&bob, NodeId::ROOT).unwrap().len(), 2);
    }

    #[test]
    fn test_sliding_expiration() {
        let cache = ScopedResultCache::new(Duration::from_millis(100));
        let bob = ViewerContext::authenticated("bob").scope();
        cache.put(bob.clone(), NodeId::ROOT, ids(&[1]));

        // Each access pushes expiry out again
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(40));
            assert!(cache.get(&bob, NodeId::ROOT).is_some());
        }

        std::thread::sleep(Duration::from_millis(250));
        assert!(cache.get(&bob, NodeId::ROOT).is_none());
    }
}
