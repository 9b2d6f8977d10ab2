//! Lookups and traversal against the published tree
//!
//! Every operation loads the published tree exactly once on entry, so a
//! rebuild finishing mid-call never mixes nodes of two trees into one result.

use crate::cache::{ScopedResultCache, VisibleChildren};
use crate::publish::{PublishedTree, SnapshotCell};
use sitetree_core::{AccessEvaluator, NodeId, QueryError, Snapshot, TreeNode, ViewerContext};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Read side of the site tree
#[derive(Debug, Clone)]
pub struct QueryEngine {
    tree: Arc<SnapshotCell>,
    cache: Arc<ScopedResultCache>,
    access: AccessEvaluator,
}

impl QueryEngine {
    pub fn new(tree: Arc<SnapshotCell>, cache: Arc<ScopedResultCache>, access: AccessEvaluator) -> Self {
        Self { tree, cache, access }
    }

    /// The published tree, if any
    pub fn snapshot(&self) -> Option<Arc<PublishedTree>> {
        self.tree.load()
    }

    /// Root node (id `0`)
    pub fn get_root(&self) -> Result<TreeNode, QueryError> {
        self.tree
            .load()
            .and_then(|tree| tree.get(NodeId::ROOT).cloned())
            .ok_or(QueryError::RootNotFound)
    }

    /// Node by its textual id; unknown or malformed ids yield `None`
    pub fn find_by_id(&self, key: &str) -> Option<TreeNode> {
        let id: NodeId = key.parse().ok()?;
        self.tree.load()?.get(id).cloned()
    }

    pub fn get_parent(&self, node: &TreeNode) -> Option<TreeNode> {
        if node.id.is_root() {
            return None;
        }
        self.tree.load()?.parent(node.id).cloned()
    }

    /// Node whose url matches `raw_url`
    ///
    /// Query string and fragment are stripped and the url lowercased. Nodes
    /// whose url contains the result are candidates; the first one in
    /// document order whose normalized path is equal wins.
    pub fn find_by_url(&self, raw_url: &str) -> Option<TreeNode> {
        let tree = self.tree.load()?;

        let mut notes: Vec<&str> = Vec::new();
        let mut candidate = raw_url.to_lowercase();
        if let Some(pos) = candidate.find('?') {
            candidate.truncate(pos);
            notes.push("query string removed");
        }
        if let Some(pos) = candidate.find('#') {
            candidate.truncate(pos);
            notes.push("fragment removed");
        }

        let wanted = normalize_url_path(&candidate);
        let mut candidates = 0usize;
        let found = tree
            .iter()
            .filter(|node| node.has_url() && node.url.contains(candidate.as_str()))
            .inspect(|_| candidates += 1)
            .find(|node| normalize_url_path(&node.url) == wanted)
            .cloned();

        trace!(
            url = %candidate,
            candidates,
            found = ?found.as_ref().map(|node| node.id),
            notes = ?notes,
            "find_by_url"
        );
        found
    }

    pub fn is_accessible(&self, node: &TreeNode, viewer: &ViewerContext) -> bool {
        self.access.is_visible(node, viewer)
    }

    /// Children of `node` visible to `viewer`, in document order
    ///
    /// Fails with `NodeNotFound` when `node` is not part of the published
    /// tree, e.g. a handle kept across a rebuild that removed it.
    pub fn get_children(&self, node: &TreeNode, viewer: &ViewerContext) -> Result<Vec<TreeNode>, QueryError> {
        let tree = self
            .tree
            .load()
            .filter(|tree| tree.contains(node.id))
            .ok_or(QueryError::NodeNotFound(node.id))?;

        // Listings computed from an earlier tree are treated as misses
        let scope = viewer.scope();
        if let Some(cached) = self.cache.get(&scope, node.id) {
            if cached.generation() == tree.generation() {
                return Ok(resolve(&tree, &cached));
            }
        }

        trace!(node = %node.id, scope = %scope, "get_child_nodes");
        let visible: Vec<NodeId> = tree
            .children(node.id)
            .iter()
            .copied()
            .filter(|&id| {
                tree.get(id)
                    .is_some_and(|child| self.access.is_visible(child, viewer))
            })
            .collect();

        let children = resolve(&tree, &visible);
        self.cache
            .put(scope, node.id, VisibleChildren::new(tree.generation(), visible));

        Ok(children)
    }
}

fn resolve(tree: &Snapshot, ids: &[NodeId]) -> Vec<TreeNode> {
    ids.iter().filter_map(|&id| tree.get(id).cloned()).collect()
}

/// Absolute form of a url path for comparison
///
/// Backslashes count as separators, empty and `.` segments are dropped and
/// `..` removes the previous segment without ever leaving the root.
pub fn normalize_url_path(url: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in url.split(|c: char| c == '/' || c == '\\') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Urls shared by more than one node after normalization
///
/// `find_by_url` resolves such urls to the first node in document order
/// only, which usually means a fragment is wrong.
pub fn duplicate_urls(tree: &Snapshot) -> BTreeMap<String, Vec<NodeId>> {
    let mut by_path: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
    for node in tree.iter().filter(|node| node.has_url()) {
        by_path
            .entry(normalize_url_path(&node.url))
            .or_default()
            .push(node.id);
    }
    by_path.retain(|_, ids| ids.len() > 1);
    by_path
}
