//! Fragment file watching for the site tree
//!
//! This crate provides:
//! - Change coalescing: one debounced, cancellable rebuild per burst
//! - Escalating debounce delays (burst count x base delay)
//! - A `notify` adapter feeding raw file events into the coalescer

pub mod coalesce;
pub mod debounce;

pub use coalesce::{ChangeCoalescer, Phase, RebuildTarget, Schedule};
pub use debounce::DebouncePolicy;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace, warn};

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Create,
    /// File modified
    Modify,
    /// File deleted
    Delete,
    /// File renamed
    Rename,
}

impl EventKind {
    /// Map a `notify` event kind; access and unknown events are dropped
    pub fn from_notify(kind: &notify::EventKind) -> Option<Self> {
        use notify::event::ModifyKind;

        match kind {
            notify::EventKind::Create(_) => Some(Self::Create),
            notify::EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            notify::EventKind::Modify(_) => Some(Self::Modify),
            notify::EventKind::Remove(_) => Some(Self::Delete),
            notify::EventKind::Access(_) | notify::EventKind::Any | notify::EventKind::Other => None,
        }
    }
}

/// Last write time of `path`
///
/// A file that cannot be inspected (typically just deleted) reports the
/// current time so its removal still triggers a rebuild.
pub fn observed_write_time(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .unwrap_or_else(|_| SystemTime::now())
}

/// Watches fragment files and forwards their changes to a coalescer
pub struct FragmentWatcher {
    coalescer: Arc<ChangeCoalescer>,
    watchers: Vec<RecommendedWatcher>,
    sources: Vec<PathBuf>,
}

impl FragmentWatcher {
    pub fn new(coalescer: Arc<ChangeCoalescer>) -> Self {
        Self {
            coalescer,
            watchers: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Start watching one fragment file
    ///
    /// The file's directory is watched non-recursively and events are
    /// filtered down to the file itself, so editors that replace the file
    /// on save are still seen.
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        debug!("including a watcher to file: {}", path.display());

        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file_name: OsString = path
            .file_name()
            .with_context(|| format!("Not a file path: {}", path.display()))?
            .to_os_string();

        let source = path.to_path_buf();
        let coalescer = Arc::clone(&self.coalescer);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, path = %source.display(), "watch error");
                    return;
                }
            };
            let Some(kind) = EventKind::from_notify(&event.kind) else {
                return;
            };
            if !event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()))
            {
                return;
            }

            trace!(path = %source.display(), ?kind, "raw change event");
            coalescer.on_change(&source, observed_write_time(&source), kind);
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory {}", dir.display()))?;

        self.watchers.push(watcher);
        self.sources.push(path.to_path_buf());
        Ok(())
    }

    /// Watch every path in order, stopping at the first failure
    pub fn watch_all<'a>(&mut self, paths: impl IntoIterator<Item = &'a PathBuf>) -> Result<()> {
        for path in paths {
            self.watch(path)?;
        }
        Ok(())
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn coalescer(&self) -> &Arc<ChangeCoalescer> {
        &self.coalescer
    }

    /// Stop watching and cancel pending rebuilds
    pub fn stop(&mut self) {
        self.watchers.clear();
        self.coalescer.cancel_all();
    }
}

impl Drop for FragmentWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
