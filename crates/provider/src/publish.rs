//! Atomic publication of snapshots
//!
//! Readers take one `Arc` of the published tree at the start of an operation
//! and work against it until they are done; a rebuild swapping in a new tree
//! meanwhile does not affect them. Loads are lock-free.

use arc_swap::ArcSwapOption;
use sitetree_core::Snapshot;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A snapshot together with its publication number
#[derive(Debug)]
pub struct PublishedTree {
    generation: u64,
    snapshot: Snapshot,
}

impl PublishedTree {
    /// Starts at 1 and increases with every publish
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl Deref for PublishedTree {
    type Target = Snapshot;

    fn deref(&self) -> &Snapshot {
        &self.snapshot
    }
}

/// Holds the one live tree
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: ArcSwapOption<PublishedTree>,
    generations: AtomicU64,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live tree, if any build has succeeded yet
    pub fn load(&self) -> Option<Arc<PublishedTree>> {
        self.current.load_full()
    }

    /// Replace the live tree in a single swap
    pub fn publish(&self, snapshot: Snapshot) -> Arc<PublishedTree> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let tree = Arc::new(PublishedTree {
            generation,
            snapshot,
        });
        self.current.store(Some(Arc::clone(&tree)));
        tree
    }

    /// Generation of the live tree, 0 before the first publish
    pub fn generation(&self) -> u64 {
        self.current
            .load()
            .as_ref()
            .map(|tree| tree.generation)
            .unwrap_or(0)
    }

    pub fn is_published(&self) -> bool {
        self.current.load().is_some()
    }
}
