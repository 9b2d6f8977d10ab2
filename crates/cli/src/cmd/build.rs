//! Build the tree once and report

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Instant;

pub async fn run(config_path: &Path) -> Result<()> {
    let start = Instant::now();
    let provider = util::load_built_provider(config_path)?;
    let elapsed = start.elapsed();

    let Some(tree) = provider.snapshot() else {
        anyhow::bail!("Site tree could not be built");
    };
    let config = provider.config();

    println!("{}", "Site Tree".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Provider:      {}", config.name.cyan());
    println!("Sources:       {}", config.sources.len());
    for source in &config.sources {
        let status = if source.exists() {
            "ok".green().to_string()
        } else {
            "missing".red().to_string()
        };
        println!("  {} ({})", source.display(), status);
    }
    println!("Nodes:         {}", tree.node_count().to_string().green());
    println!("Built at:      {}", util::format_absolute_time(tree.built_at()));
    println!("Build time:    {:.2?}", elapsed);
    if config.debug {
        println!(
            "Debug copy:    {}",
            config.debug_artifact_path().display().to_string().dimmed()
        );
    }

    Ok(())
}
