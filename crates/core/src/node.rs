//! Navigation tree nodes

use crate::error::InvalidNodeId;
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Role that grants access to unauthenticated viewers only
pub const ANONYMOUS_ROLE: &str = "?";

/// Role that grants access to any authenticated viewer
pub const AUTHENTICATED_ROLE: &str = "*";

/// Sequential node identifier, unique within one snapshot
///
/// Rendered as a decimal string, the form hosts use as a node key.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Id reserved for the tree root
    pub const ROOT: NodeId = NodeId(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts ASCII digits only: no sign, no surrounding whitespace
impl FromStr for NodeId {
    type Err = InvalidNodeId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidNodeId(s.to_string());
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse().map(NodeId).map_err(|_| invalid())
    }
}

/// Normalized role names attached to a node
pub type Roles = SmallVec<[String; 4]>;

/// A single node of the navigation tree
///
/// Nodes are immutable once built; handles returned from queries are owned
/// copies and stay valid after the snapshot they came from is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: NodeId,
    /// Lowercased url, empty when the fragment gave none
    pub url: String,
    pub title: String,
    pub description: String,
    /// Lowercased, trimmed, deduplicated
    pub roles: Roles,
}

impl TreeNode {
    pub fn has_roles(&self) -> bool {
        !self.roles.is_empty()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }
}

/// Split a `roles` attribute on `;` or `,`
///
/// Entries are trimmed and lowercased; blanks and duplicates are dropped
/// while first-seen order is kept.
pub fn parse_roles(raw: &str) -> Roles {
    let mut roles = Roles::new();
    for role in raw.split(|c: char| c == ';' || c == ',') {
        let role = role.trim();
        if role.is_empty() {
            continue;
        }
        let role = role.to_lowercase();
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    roles
}
