//! Provider configuration
//!
//! Hosts configure a provider with a flat list of `key=value` attributes.
//! The recognized keys are:
//! - `Debug`: write a diagnostic copy of every built tree
//! - `mapsList`: `;`/`,` delimited fragment paths, relative to the base dir
//! - `securityTrimmingEnabled`: filter child listings by node roles
//!
//! The CLI reads the same attributes from a TOML file ([`SiteTreeConfig`]).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEBUG_KEY: &str = "Debug";
pub const MAPS_LIST_KEY: &str = "mapsList";
pub const SECURITY_TRIMMING_KEY: &str = "securityTrimmingEnabled";

/// File name of the diagnostic copy written when `Debug` is set
pub const DEBUG_ARTIFACT: &str = "Web.sitemap.debug";

/// Default delay unit between a change and its rebuild
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

/// Default sliding expiration of cached child listings (5 hours)
pub const DEFAULT_SLIDING_EXPIRATION: Duration = Duration::from_secs(5 * 60 * 60);

/// Ordered provider attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildAttributes {
    entries: Vec<(String, String)>,
}

impl BuildAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an existing value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `key=value` pairs joined by `,`, stamped on the built document
    pub fn debug_summary(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn parse_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidBool {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

/// Resolved configuration of one provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub attributes: BuildAttributes,
    /// Directory fragment paths and the debug artifact are relative to
    pub base_dir: PathBuf,
    /// Absolute fragment paths in merge order
    pub sources: Vec<PathBuf>,
    pub debug: bool,
    pub security_trimming: bool,
    pub base_delay: Duration,
    pub sliding_expiration: Duration,
}

impl ProviderConfig {
    /// Interpret host attributes
    pub fn from_attributes(
        name: impl Into<String>,
        attributes: BuildAttributes,
        base_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let debug = attributes.parse_bool(DEBUG_KEY)?.unwrap_or(false);
        let security_trimming = attributes
            .parse_bool(SECURITY_TRIMMING_KEY)?
            .unwrap_or(false);
        let sources = attributes
            .get(MAPS_LIST_KEY)
            .map(|list| resolve_sources(base_dir, list))
            .unwrap_or_default();

        Ok(Self {
            name: name.into(),
            attributes,
            base_dir: base_dir.to_path_buf(),
            sources,
            debug,
            security_trimming,
            base_delay: DEFAULT_BASE_DELAY,
            sliding_expiration: DEFAULT_SLIDING_EXPIRATION,
        })
    }

    /// Location of the diagnostic copy of the built tree
    pub fn debug_artifact_path(&self) -> PathBuf {
        self.base_dir.join(DEBUG_ARTIFACT)
    }
}

/// Split a `mapsList` value and anchor each entry at `base_dir`
///
/// Blank entries are dropped. Leading separators are stripped so that
/// host-style paths such as `/App_Data/web.sitemap` stay under the base dir.
pub fn resolve_sources(base_dir: &Path, list: &str) -> Vec<PathBuf> {
    list.split(|c: char| c == ';' || c == ',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let relative = entry.trim_start_matches(|c: char| c == '/' || c == '\\');
            base_dir.join(relative.replace('\\', "/"))
        })
        .collect()
}

/// TOML configuration file used by the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteTreeConfig {
    pub name: Option<String>,
    /// Base directory; relative values are resolved against the config file
    pub base_dir: Option<PathBuf>,
    pub attributes: BTreeMap<String, String>,
    pub watcher: WatcherSection,
    pub cache: CacheSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSection {
    pub base_delay_ms: u64,
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub sliding_expiration_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            sliding_expiration_secs: DEFAULT_SLIDING_EXPIRATION.as_secs(),
        }
    }
}

impl SiteTreeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve into a provider configuration
    ///
    /// `config_dir` anchors a relative `base_dir` (normally the directory
    /// holding the config file).
    pub fn into_provider_config(self, config_dir: &Path) -> Result<ProviderConfig, ConfigError> {
        let base_dir = match self.base_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => config_dir.join(dir),
            None => config_dir.to_path_buf(),
        };
        let name = self.name.unwrap_or_else(|| "sitetree".to_string());
        let attributes: BuildAttributes = self.attributes.into_iter().collect();

        let mut config = ProviderConfig::from_attributes(name, attributes, &base_dir)?;
        config.base_delay = Duration::from_millis(self.watcher.base_delay_ms);
        config.sliding_expiration = Duration::from_secs(self.cache.sliding_expiration_secs);
        Ok(config)
    }
}
