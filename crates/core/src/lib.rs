//! Core of the site tree service
//!
//! This crate provides:
//! - Tree nodes and immutable snapshots
//! - Fragment parsing and the multi-fragment tree builder
//! - Viewer context and role-based access evaluation
//! - Provider configuration (host attributes and TOML)
//! - Diagnostic document output

pub mod access;
pub mod builder;
pub mod config;
pub mod error;
pub mod fragment;
pub mod node;
pub mod store;
pub mod tree;

// Re-exports
pub use access::{AccessEvaluator, AccessRule, ViewerContext, ViewerScope};
pub use builder::TreeBuilder;
pub use config::{BuildAttributes, ProviderConfig, SiteTreeConfig};
pub use error::{BuildError, ConfigError, FragmentError, InvalidNodeId, QueryError};
pub use node::{NodeId, TreeNode};
pub use tree::Snapshot;

pub use tokio_util::sync::CancellationToken;
