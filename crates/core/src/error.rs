//! Error types shared across the site tree crates

use crate::node::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid provider configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A boolean attribute held something other than `true`/`false`
    #[error("attribute `{key}` is not a boolean: {value:?}")]
    InvalidBool { key: String, value: String },

    /// Configuration file could not be read
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::config::SiteTreeConfig`]
    #[error("invalid config file {path}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure to load a single fragment. Never fatal for a build.
#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("cannot read fragment {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("empty fragment: {path}")]
    Empty { path: PathBuf },

    #[error("malformed fragment {path}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    /// Document ended with elements still open
    #[error("fragment {path} ends before all elements are closed")]
    Truncated { path: PathBuf },

    /// Well-formed document without a `siteMap` root holding a `siteMapNode`
    #[error("fragment {path} has no siteMap/siteMapNode root")]
    MissingRoot { path: PathBuf },
}

impl FragmentError {
    /// Empty and unreadable fragments are warnings, parse failures are errors
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Self::Xml { .. } | Self::Truncated { .. } | Self::MissingRoot { .. }
        )
    }
}

/// Reasons a build does not produce a snapshot
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no fragment sources configured")]
    NoSources,

    #[error("no nodes were built from {sources} fragment source(s)")]
    Empty { sources: usize },

    #[error("build cancelled")]
    Cancelled,
}

/// Query failures surfaced to callers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("root node not found")]
    RootNotFound,

    #[error("node {0} not found in the published tree")]
    NodeNotFound(NodeId),
}

/// Text that is not a plain decimal node id
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid node id: {0:?}")]
pub struct InvalidNodeId(pub String);
