//! Merging fragment sources into one snapshot
//!
//! Fragments are processed in configured order. The first fragment that
//! yields nodes supplies the tree root; every later fragment's root is
//! appended, with its whole subtree, as another child of that root. Ids are
//! handed out from one counter for the whole build, so they are unique
//! across fragments and follow document order of the merged tree.

use crate::config::BuildAttributes;
use crate::error::{BuildError, FragmentError};
use crate::fragment::{Fragment, RawNode};
use crate::node::{parse_roles, NodeId, TreeNode};
use crate::tree::Snapshot;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Builds snapshots from fragment files
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder;

impl TreeBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a snapshot from `sources`
    ///
    /// Unreadable, empty and malformed fragments are skipped. Cancellation
    /// is checked before every fragment and once more at the end; a
    /// cancelled build never returns a snapshot.
    pub fn build(
        &self,
        sources: &[PathBuf],
        attributes: &BuildAttributes,
        cancel: &CancellationToken,
    ) -> Result<Snapshot, BuildError> {
        self.build_with(sources, attributes, cancel, Fragment::load)
    }

    fn build_with(
        &self,
        sources: &[PathBuf],
        attributes: &BuildAttributes,
        cancel: &CancellationToken,
        mut load: impl FnMut(&Path) -> Result<Fragment, FragmentError>,
    ) -> Result<Snapshot, BuildError> {
        if sources.is_empty() {
            warn!("empty list of fragment sources, nothing to build");
            return Err(BuildError::NoSources);
        }

        let mut snapshot = Snapshot::with_debug(attributes.debug_summary());

        for path in sources {
            if cancel.is_cancelled() {
                debug!(path = %path.display(), "build cancelled before fragment");
                return Err(BuildError::Cancelled);
            }

            let fragment = match load(path) {
                Ok(fragment) => fragment,
                Err(e) if e.is_parse_failure() => {
                    error!(error = ?e, "error on populating with fragment: {}", path.display());
                    continue;
                }
                Err(e) => {
                    warn!("skipping fragment: {e}");
                    continue;
                }
            };

            if fragment.ignored_roots > 0 {
                warn!(
                    path = %path.display(),
                    ignored = fragment.ignored_roots,
                    "fragment has more than one top-level siteMapNode, only the first is merged"
                );
            }

            // The first contributing fragment becomes the root
            let parent = snapshot.root().map(|root| root.id);
            append_subtree(&mut snapshot, &fragment.root, parent);
        }

        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }

        if snapshot.is_empty() {
            return Err(BuildError::Empty {
                sources: sources.len(),
            });
        }

        Ok(snapshot)
    }
}

/// Assign ids depth-first and link `raw` under `parent`
fn append_subtree(snapshot: &mut Snapshot, raw: &RawNode, parent: Option<NodeId>) {
    let id = NodeId::new(snapshot.node_count() as u32);
    snapshot.push(to_tree_node(id, raw), parent);
    for child in &raw.children {
        append_subtree(snapshot, child, Some(id));
    }
}

fn to_tree_node(id: NodeId, raw: &RawNode) -> TreeNode {
    let url = raw
        .url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .map(str::to_lowercase)
        .unwrap_or_default();

    TreeNode {
        id,
        url,
        title: raw.title.clone().unwrap_or_default(),
        description: raw.description.clone().unwrap_or_default(),
        roles: raw.roles.as_deref().map(parse_roles).unwrap_or_default(),
    }
}
