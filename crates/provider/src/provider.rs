//! The site tree provider
//!
//! Wires configuration, the tree builder, snapshot publication, the result
//! cache and the query engine together, and exposes the rebuild hook the
//! change coalescer drives.

use crate::cache::ScopedResultCache;
use crate::publish::{PublishedTree, SnapshotCell};
use crate::query::{duplicate_urls, QueryEngine};
use anyhow::Result;
use parking_lot::Mutex;
use sitetree_core::store::write_debug_artifact;
use sitetree_core::{
    AccessEvaluator, BuildAttributes, BuildError, CancellationToken, ConfigError, ProviderConfig,
    QueryError, SiteTreeConfig, TreeBuilder, TreeNode, ViewerContext,
};
use sitetree_watcher::{ChangeCoalescer, DebouncePolicy, FragmentWatcher, RebuildTarget};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct SiteTreeProvider {
    config: ProviderConfig,
    builder: TreeBuilder,
    /// Held from build start until the debug artifact is written
    build_lock: Mutex<()>,
    tree: Arc<SnapshotCell>,
    cache: Arc<ScopedResultCache>,
    query: QueryEngine,
}

impl SiteTreeProvider {
    /// Create a provider without building anything yet
    pub fn new(config: ProviderConfig) -> Self {
        let tree = Arc::new(SnapshotCell::new());
        let cache = Arc::new(ScopedResultCache::new(config.sliding_expiration));
        let query = QueryEngine::new(
            Arc::clone(&tree),
            Arc::clone(&cache),
            AccessEvaluator::new(config.security_trimming),
        );

        Self {
            config,
            builder: TreeBuilder::new(),
            build_lock: Mutex::new(()),
            tree,
            cache,
            query,
        }
    }

    /// Configure from host attributes and perform the initial build
    ///
    /// A failed initial build is logged and leaves the provider without a
    /// tree; queries then report `NotFound` until a rebuild succeeds.
    pub fn initialize(
        name: &str,
        attributes: BuildAttributes,
        base_dir: &Path,
    ) -> Result<Arc<Self>, ConfigError> {
        let config = ProviderConfig::from_attributes(name, attributes, base_dir)?;
        Ok(Self::start(config))
    }

    /// Same as [`SiteTreeProvider::initialize`] from a TOML config file
    pub fn from_config_file(path: &Path) -> Result<Arc<Self>, ConfigError> {
        let config_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let config = SiteTreeConfig::load(path)?.into_provider_config(config_dir)?;
        Ok(Self::start(config))
    }

    fn start(config: ProviderConfig) -> Arc<Self> {
        debug!(
            name = %config.name,
            attributes = %config.attributes.debug_summary(),
            sources = config.sources.len(),
            "initializing site tree provider"
        );
        let provider = Arc::new(Self::new(config));
        provider.generate(&CancellationToken::new());
        provider
    }

    /// Build the tree from the configured sources and publish it
    ///
    /// Returns false when nothing was published; the previous tree, if any,
    /// stays live in that case.
    ///
    /// Calls are serialized, so the last one to publish read every source
    /// after all earlier builds finished.
    pub fn generate(&self, cancel: &CancellationToken) -> bool {
        let _building = self.build_lock.lock();
        let start = Instant::now();
        let snapshot = match self
            .builder
            .build(&self.config.sources, &self.config.attributes, cancel)
        {
            Ok(snapshot) => snapshot,
            Err(BuildError::Cancelled) => {
                debug!(name = %self.config.name, "site tree build cancelled");
                return false;
            }
            // Already reported by the builder
            Err(BuildError::NoSources) => return false,
            Err(e) => {
                warn!(name = %self.config.name, error = %e, "site tree not generated");
                return false;
            }
        };

        for (url, ids) in duplicate_urls(&snapshot) {
            warn!(url = %url, nodes = ?ids, "url shared by several nodes, first match wins");
        }

        let published = self.tree.publish(snapshot);
        self.cache.clear_all();

        debug!(
            generation = published.generation(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "site tree generated with success, ({}) nodes",
            published.node_count()
        );

        if self.config.debug {
            let target = self.config.debug_artifact_path();
            if let Err(e) = write_debug_artifact(&published, &target) {
                error!(error = %e, path = %target.display(), "failed to write debug artifact");
            }
        }
        true
    }

    /// Debounce policy from the configured base delay
    pub fn debounce_policy(&self) -> DebouncePolicy {
        DebouncePolicy::new(self.config.base_delay)
    }

    /// Watch every configured source and rebuild on change
    ///
    /// Must be called inside a tokio runtime. Dropping the returned watcher
    /// stops watching and cancels pending rebuilds.
    pub fn watch(self: &Arc<Self>, policy: DebouncePolicy) -> Result<FragmentWatcher> {
        let target: Arc<dyn RebuildTarget> = Arc::clone(self) as Arc<dyn RebuildTarget>;
        let coalescer = Arc::new(ChangeCoalescer::new(target, policy)?);

        let mut watcher = FragmentWatcher::new(coalescer);
        watcher.watch_all(&self.config.sources)?;
        info!(
            name = %self.config.name,
            sources = watcher.sources().len(),
            base_delay_ms = policy.base_delay().as_millis() as u64,
            "watching site map fragments"
        );
        Ok(watcher)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Cache handle for targeted invalidation
    pub fn cache(&self) -> &ScopedResultCache {
        &self.cache
    }

    pub fn query(&self) -> &QueryEngine {
        &self.query
    }

    pub fn snapshot(&self) -> Option<Arc<PublishedTree>> {
        self.query.snapshot()
    }

    pub fn get_root(&self) -> Result<TreeNode, QueryError> {
        self.query.get_root()
    }

    pub fn find_by_id(&self, key: &str) -> Option<TreeNode> {
        self.query.find_by_id(key)
    }

    pub fn find_by_url(&self, raw_url: &str) -> Option<TreeNode> {
        self.query.find_by_url(raw_url)
    }

    pub fn get_parent(&self, node: &TreeNode) -> Option<TreeNode> {
        self.query.get_parent(node)
    }

    pub fn get_children(&self, node: &TreeNode, viewer: &ViewerContext) -> Result<Vec<TreeNode>, QueryError> {
        self.query.get_children(node, viewer)
    }

    pub fn is_accessible(&self, node: &TreeNode, viewer: &ViewerContext) -> bool {
        self.query.is_accessible(node, viewer)
    }
}

impl RebuildTarget for SiteTreeProvider {
    fn rebuild(&self, cancel: &CancellationToken) -> bool {
        self.generate(cancel)
    }
}

impl std::fmt::Debug for SiteTreeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteTreeProvider")
            .field("name", &self.config.name)
            .field("sources", &self.config.sources)
            .field("generation", &self.tree.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitetree_core::NodeId;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn attributes(list: &str) -> BuildAttributes {
        [("mapsList", list)].into_iter().collect()
    }

    #[test]
    fn test_initialize_builds_tree() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("web.sitemap"),
            r#"<siteMap><siteMapNode url="/" title="Home"/></siteMap>"#,
        )
        .unwrap();

        let provider = SiteTreeProvider::initialize("main", attributes("web.sitemap"), temp_dir.path()).unwrap();
        assert_eq!(provider.get_root().unwrap().id, NodeId::ROOT);
        assert_eq!(provider.snapshot().unwrap().generation(), 1);
    }

    #[test]
    fn test_initialize_with_missing_sources_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let provider = SiteTreeProvider::initialize("main", attributes("gone.sitemap"), temp_dir.path()).unwrap();

        assert_eq!(provider.get_root(), Err(QueryError::RootNotFound));
        assert!(provider.snapshot().is_none());
    }

    #[test]
    fn test_invalid_debug_attribute_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let attributes: BuildAttributes = [("Debug", "maybe")].into_iter().collect();

        let result = SiteTreeProvider::initialize("main", attributes, temp_dir.path());
        assert!(matches!(result, Err(ConfigError::InvalidBool { .. })));
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_tree() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("web.sitemap");
        fs::write(&path, r#"<siteMap><siteMapNode url="/" title="Home"/></siteMap>"#).unwrap();

        let provider = SiteTreeProvider::initialize("main", attributes("web.sitemap"), temp_dir.path()).unwrap();
        fs::write(&path, "<siteMap><siteMapNode").unwrap();

        assert!(!provider.generate(&CancellationToken::new()));
        assert_eq!(provider.get_root().unwrap().title, "Home");
    }

    #[test]
    fn test_cancelled_generate_publishes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("web.sitemap"),
            r#"<siteMap><siteMapNode url="/" title="Home"/></siteMap>"#,
        )
        .unwrap();
        let config =
            ProviderConfig::from_attributes("main", attributes("web.sitemap"), temp_dir.path()).unwrap();
        let provider = SiteTreeProvider::new(config);

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!provider.rebuild(&cancel));
        assert!(provider.snapshot().is_none());
    }

    #[test]
    fn test_generate_waits_for_running_build() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("web.sitemap");
        fs::write(&path, r#"<siteMap><siteMapNode url="/" title="Home"/></siteMap>"#).unwrap();
        let provider = SiteTreeProvider::initialize("main", attributes("web.sitemap"), temp_dir.path()).unwrap();

        // Stand in for a build that is still running
        let running = provider.build_lock.lock();
        let waiting = {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.generate(&CancellationToken::new()))
        };
        thread::sleep(Duration::from_millis(100));
        assert_eq!(provider.snapshot().unwrap().generation(), 1);

        fs::write(&path, r#"<siteMap><siteMapNode url="/" title="Start"/></siteMap>"#).unwrap();
        drop(running);

        assert!(waiting.join().unwrap());
        let tree = provider.snapshot().unwrap();
        assert_eq!(tree.generation(), 2);
        assert_eq!(tree.root().unwrap().title, "Start");
    }
}
