//! Print the tree as seen by a viewer

use crate::util::{self, ViewerArgs};
use anyhow::Result;
use owo_colors::OwoColorize;
use sitetree_provider::{SiteTreeProvider, TreeNode, ViewerContext};
use std::path::Path;

pub async fn run(config_path: &Path, viewer: &ViewerArgs) -> Result<()> {
    let provider = util::load_built_provider(config_path)?;
    let viewer = viewer.to_viewer();
    let root = provider.get_root()?;

    println!("{} {}", "Viewer:".bold(), viewer.scope().to_string().cyan());
    let mut shown = 0;
    print_subtree(&provider, &root, &viewer, 0, &mut shown)?;
    println!();
    println!("{} visible nodes", shown.to_string().green());

    Ok(())
}

fn print_subtree(
    provider: &SiteTreeProvider,
    node: &TreeNode,
    viewer: &ViewerContext,
    depth: usize,
    shown: &mut usize,
) -> Result<()> {
    println!("{}{}", "  ".repeat(depth), util::format_node(node));
    *shown += 1;

    for child in provider.get_children(node, viewer)? {
        print_subtree(provider, &child, viewer, depth + 1, shown)?;
    }
    Ok(())
}
