//! Immutable tree snapshots
//!
//! A [`Snapshot`] is a fully built navigation tree. Nodes are stored in
//! document order, so a node's id doubles as its index. Parent and child
//! links are resolved once at build time and never change afterwards.

use crate::node::{NodeId, TreeNode};
use smallvec::SmallVec;
use std::time::SystemTime;

/// Child id list, inline for the common case of a handful of children
pub type Children = SmallVec<[NodeId; 8]>;

/// One fully built navigation tree
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: Vec<TreeNode>,
    children: Vec<Children>,
    parents: Vec<Option<NodeId>>,
    /// `key=value` summary of the attributes the tree was built with
    debug: String,
    built_at: SystemTime,
}

impl Snapshot {
    /// Start an empty snapshot carrying the given debug summary
    pub(crate) fn with_debug(debug: String) -> Self {
        Self {
            nodes: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
            debug,
            built_at: SystemTime::now(),
        }
    }

    /// Append a node; ids must be pushed in order
    pub(crate) fn push(&mut self, node: TreeNode, parent: Option<NodeId>) {
        debug_assert_eq!(node.id.index(), self.nodes.len());
        let id = node.id;
        self.nodes.push(node);
        self.children.push(Children::new());
        self.parents.push(parent);
        if let Some(parent) = parent {
            self.children[parent.index()].push(id);
        }
    }

    /// Number of nodes carrying an id
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.first()
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Parent of `id`; `None` for the root and for unknown ids
    pub fn parent(&self, id: NodeId) -> Option<&TreeNode> {
        let parent = self.parents.get(id.index()).copied().flatten()?;
        self.get(parent)
    }

    /// Child ids of `id` in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id.index())
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// All nodes in document order
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn debug_summary(&self) -> &str {
        &self.debug
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Roles;

    fn node(id: u32, url: &str) -> TreeNode {
        TreeNode {
            id: NodeId::new(id),
            url: url.to_string(),
            title: String::new(),
            description: String::new(),
            roles: Roles::new(),
        }
    }

    #[test]
    fn test_links_resolve_both_ways() {
        let mut snapshot = Snapshot::with_debug(String::new());
        snapshot.push(node(0, "/"), None);
        snapshot.push(node(1, "/a"), Some(NodeId::new(0)));
        snapshot.push(node(2, "/a/b"), Some(NodeId::new(1)));
        snapshot.push(node(3, "/c"), Some(NodeId::new(0)));

        assert_eq!(snapshot.node_count(), 4);
        assert_eq!(snapshot.root().unwrap().id, NodeId::ROOT);
        assert_eq!(snapshot.children(NodeId::ROOT), [NodeId::new(1), NodeId::new(3)]);
        assert_eq!(snapshot.parent(NodeId::new(2)).unwrap().url, "/a");
        assert!(snapshot.parent(NodeId::ROOT).is_none());
        assert!(snapshot.children(NodeId::new(7)).is_empty());
        assert!(!snapshot.contains(NodeId::new(4)));
    }
}
