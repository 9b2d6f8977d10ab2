//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use owo_colors::OwoColorize;
use sitetree_core::ViewerContext;
use sitetree_provider::{SiteTreeProvider, TreeNode};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// Who is looking at the tree
#[derive(Args, Debug, Clone, Default)]
pub struct ViewerArgs {
    /// Authenticated user name
    #[arg(long, conflicts_with = "anonymous")]
    pub user: Option<String>,

    /// Session id (scopes cached results)
    #[arg(long)]
    pub session: Option<String>,

    /// Role held by the user (repeatable)
    #[arg(long = "role", requires = "user")]
    pub roles: Vec<String>,

    /// View as an anonymous visitor (default)
    #[arg(long)]
    pub anonymous: bool,
}

impl ViewerArgs {
    pub fn to_viewer(&self) -> ViewerContext {
        let mut viewer = match &self.user {
            Some(user) if !self.anonymous => ViewerContext::authenticated(user.as_str()),
            _ => ViewerContext::anonymous(),
        };
        if let Some(session) = &self.session {
            viewer = viewer.with_session(session.as_str());
        }
        viewer.with_roles(self.roles.iter().map(String::as_str))
    }
}

/// Load the config file and run the initial build
pub fn load_provider(config_path: &Path) -> Result<Arc<SiteTreeProvider>> {
    let provider = SiteTreeProvider::from_config_file(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    if provider.config().sources.is_empty() {
        anyhow::bail!(
            "No fragment sources configured (set attributes.mapsList in {})",
            config_path.display()
        );
    }
    Ok(provider)
}

/// Load the provider and fail when no tree could be built
pub fn load_built_provider(config_path: &Path) -> Result<Arc<SiteTreeProvider>> {
    let provider = load_provider(config_path)?;
    if provider.snapshot().is_none() {
        anyhow::bail!("Site tree could not be built (run with -v for details)");
    }
    Ok(provider)
}

/// Format a timestamp as local time ("2024-01-03 14:30:00")
pub fn format_absolute_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One-line rendering of a node
pub fn format_node(node: &TreeNode) -> String {
    let mut line = format!("[{}] {}", node.id.yellow(), node.title.bold());
    if node.has_url() {
        line.push_str(&format!("  {}", node.url.cyan()));
    }
    if node.has_roles() {
        line.push_str(&format!("  {}", format!("roles={}", node.roles.join(";")).dimmed()));
    }
    line
}
