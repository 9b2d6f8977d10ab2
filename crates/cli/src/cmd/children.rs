//! List the visible children of a node

use crate::util::{self, ViewerArgs};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(config_path: &Path, id: &str, viewer: &ViewerArgs) -> Result<()> {
    let provider = util::load_built_provider(config_path)?;
    let viewer = viewer.to_viewer();

    let node = provider
        .find_by_id(id)
        .with_context(|| format!("No node with id '{}'", id))?;
    let children = provider.get_children(&node, &viewer)?;

    println!("{}", util::format_node(&node));
    if children.is_empty() {
        println!("  {}", "(no visible children)".dimmed());
    }
    for child in &children {
        println!("  {}", util::format_node(child));
    }

    Ok(())
}
