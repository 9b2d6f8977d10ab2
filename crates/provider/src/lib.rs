//! Site tree provider
//!
//! This crate provides:
//! - Lock-free publication of immutable snapshots
//! - A per-viewer cache of visible child listings
//! - Queries by id, url, parent and children
//! - `SiteTreeProvider`, wiring builds, queries and file watching together

pub mod cache;
pub mod provider;
pub mod publish;
pub mod query;

// Re-exports
pub use cache::{CacheKey, ScopedResultCache, VisibleChildren};
pub use provider::SiteTreeProvider;
pub use publish::{PublishedTree, SnapshotCell};
pub use query::{normalize_url_path, QueryEngine};

pub use sitetree_core::{NodeId, QueryError, TreeNode, ViewerContext, ViewerScope};
pub use sitetree_watcher::{DebouncePolicy, FragmentWatcher};
