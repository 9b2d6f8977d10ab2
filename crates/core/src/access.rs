//! Viewer context and per-node access evaluation (security trimming)

use crate::node::{TreeNode, ANONYMOUS_ROLE, AUTHENTICATED_ROLE};
use ahash::AHashSet;
use std::fmt;
use tracing::trace;

/// Who is asking, supplied by the host on every query call
#[derive(Debug, Clone, Default)]
pub struct ViewerContext {
    session_id: Option<String>,
    identity: Option<String>,
    authenticated: bool,
    roles: AHashSet<String>,
}

impl ViewerContext {
    /// Unauthenticated viewer without a session
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated viewer with the given identity name
    pub fn authenticated(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            authenticated: true,
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Identity name without marking the viewer authenticated
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        let role = role.trim().to_lowercase();
        if !role.is_empty() {
            self.roles.insert(role);
        }
        self
    }

    pub fn with_roles<'a>(self, roles: impl IntoIterator<Item = &'a str>) -> Self {
        roles.into_iter().fold(self, Self::with_role)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Case-insensitive, trimmed role membership
    pub fn is_in_role(&self, role: &str) -> bool {
        let role = role.trim();
        if self.roles.contains(role) {
            return true;
        }
        self.roles.contains(&role.to_lowercase())
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn scope(&self) -> ViewerScope {
        ViewerScope::of(self)
    }
}

/// Cache partition key derived from session and identity
///
/// Built as `//<session>` followed by `//<identity>`, each present only when
/// the viewer has one. The empty scope belongs to anonymous, sessionless
/// viewers.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ViewerScope(String);

const SCOPE_SEPARATOR: &str = "//";

impl ViewerScope {
    pub fn of(viewer: &ViewerContext) -> Self {
        let mut scope = String::new();
        if let Some(session) = viewer.session_id() {
            scope.push_str(SCOPE_SEPARATOR);
            scope.push_str(session);
        }
        if let Some(identity) = viewer.identity() {
            scope.push_str(SCOPE_SEPARATOR);
            scope.push_str(identity);
        }
        Self(scope)
    }

    /// Scope covering every viewer within one session
    pub fn session(session_id: &str) -> Self {
        Self(format!("{SCOPE_SEPARATOR}{session_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this scope is `prefix` itself or nested under it
    ///
    /// Nesting is by whole `//` segments: `//s1//bob` is within `//s1` but
    /// `//s10` is not.
    pub fn is_within(&self, prefix: &ViewerScope) -> bool {
        match self.0.strip_prefix(prefix.as_str()) {
            Some("") => true,
            Some(rest) => prefix.is_anonymous() || rest.starts_with(SCOPE_SEPARATOR),
            None => false,
        }
    }
}

impl fmt::Display for ViewerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The rule that decided a visibility check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule {
    TrimmingDisabled,
    OpenNode,
    AnonymousAllowed,
    AnonymousDenied,
    AnyAuthenticated,
    MemberOf(String),
    NoMatchingRole,
}

impl AccessRule {
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::AnonymousDenied | Self::NoMatchingRole)
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrimmingDisabled => f.write_str("security trimming not enabled"),
            Self::OpenNode => f.write_str("node has no roles"),
            Self::AnonymousAllowed => f.write_str("node allows unauthenticated viewers (?)"),
            Self::AnonymousDenied => f.write_str("viewer not authenticated"),
            Self::AnyAuthenticated => f.write_str("node allows any authenticated viewer (*)"),
            Self::MemberOf(role) => write!(f, "viewer belongs to role: {role}"),
            Self::NoMatchingRole => f.write_str("viewer holds none of the node roles"),
        }
    }
}

/// Role-based node visibility
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessEvaluator {
    security_trimming: bool,
}

impl AccessEvaluator {
    pub fn new(security_trimming: bool) -> Self {
        Self { security_trimming }
    }

    pub fn security_trimming(&self) -> bool {
        self.security_trimming
    }

    /// Decide visibility and report the rule that applied
    pub fn evaluate(&self, node: &TreeNode, viewer: &ViewerContext) -> AccessRule {
        let rule = if !self.security_trimming {
            AccessRule::TrimmingDisabled
        } else if !node.has_roles() {
            AccessRule::OpenNode
        } else if !viewer.is_authenticated() {
            if node.has_role(ANONYMOUS_ROLE) {
                AccessRule::AnonymousAllowed
            } else {
                AccessRule::AnonymousDenied
            }
        } else if node.has_role(AUTHENTICATED_ROLE) {
            AccessRule::AnyAuthenticated
        } else {
            node.roles
                .iter()
                .find(|role| viewer.is_in_role(role))
                .map(|role| AccessRule::MemberOf(role.clone()))
                .unwrap_or(AccessRule::NoMatchingRole)
        };

        trace!(
            node = %node.title,
            authenticated = viewer.is_authenticated(),
            accessible = rule.is_visible(),
            reason = %rule,
            "is_accessible_to_user"
        );
        rule
    }

    pub fn is_visible(&self, node: &TreeNode, viewer: &ViewerContext) -> bool {
        self.evaluate(node, viewer).is_visible()
    }
}
