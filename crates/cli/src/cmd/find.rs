//! Find the node matching a url

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(config_path: &Path, url: &str) -> Result<()> {
    let provider = util::load_built_provider(config_path)?;

    let Some(node) = provider.find_by_url(url) else {
        anyhow::bail!("No node matches url '{}'", url);
    };

    println!("{}", util::format_node(&node));
    if !node.description.is_empty() {
        println!("  {}", node.description.dimmed());
    }

    // Breadcrumb up to the root
    let mut trail = vec![node.title.clone()];
    let mut current = node;
    while let Some(parent) = provider.get_parent(&current) {
        trail.push(parent.title.clone());
        current = parent;
    }
    trail.reverse();
    println!("  {}", trail.join(" > ").dimmed());

    Ok(())
}
