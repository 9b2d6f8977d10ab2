//! Build, then rebuild whenever a fragment changes

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use tracing::info;

pub async fn run(config_path: &Path) -> Result<()> {
    let provider = util::load_provider(config_path)?;
    match provider.snapshot() {
        Some(tree) => println!("Initial build: {} nodes", tree.node_count().to_string().green()),
        None => println!("{}", "Initial build failed, waiting for changes".yellow()),
    }

    let mut watcher = provider
        .watch(provider.debounce_policy())
        .context("Failed to start watching fragments")?;

    println!("Watching {} fragment(s)", watcher.sources().len());
    for source in watcher.sources() {
        println!("  {}", source.display().to_string().cyan());
    }
    println!("{}", "Press Ctrl-C to stop".dimmed());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    watcher.stop();
    info!("stopped watching site map fragments");
    Ok(())
}
