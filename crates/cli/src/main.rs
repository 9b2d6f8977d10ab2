//! SiteTree CLI - sitetree command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cmd;
mod util;

use util::ViewerArgs;

/// SiteTree - Navigation tree built from site map fragments
#[derive(Parser)]
#[command(name = "sitetree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "sitetree.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the tree once and report
    Build,
    /// Print the tree as seen by a viewer
    Tree {
        #[command(flatten)]
        viewer: ViewerArgs,
    },
    /// Find the node matching a url
    Find {
        /// Url, query string and fragment allowed
        url: String,
    },
    /// List the visible children of a node
    Children {
        /// Node id (0 is the root)
        id: String,
        #[command(flatten)]
        viewer: ViewerArgs,
    },
    /// Build, then rebuild whenever a fragment changes
    Watch {
        /// Also write daily-rolling log files here
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = match &cli.command {
        Commands::Watch { log_dir } => log_dir.as_deref(),
        _ => None,
    };
    let _guard = init_tracing(cli.verbose, log_dir);

    match cli.command {
        Commands::Build => cmd::build::run(&cli.config).await,
        Commands::Tree { viewer } => cmd::tree::run(&cli.config, &viewer).await,
        Commands::Find { url } => cmd::find::run(&cli.config, &url).await,
        Commands::Children { id, viewer } => cmd::children::run(&cli.config, &id, &viewer).await,
        Commands::Watch { .. } => cmd::watch::run(&cli.config).await,
    }
}

/// Install the stderr subscriber, plus a file writer when `log_dir` is set
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "sitetree.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(level)
        .with(stderr)
        .with(file)
        .init();

    guard
}
