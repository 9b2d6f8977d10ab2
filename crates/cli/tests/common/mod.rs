//! Common utilities for integration tests

pub mod cli;

use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const HOME: &str = r#"<siteMap>
  <siteMapNode url="/" title="Home">
    <siteMapNode url="/products" title="Products" description="Everything we sell"/>
    <siteMapNode url="/admin" title="Admin" roles="admin"/>
  </siteMapNode>
</siteMap>"#;

pub const SUPPORT: &str = r#"<siteMap>
  <siteMapNode url="/support" title="Support">
    <siteMapNode url="/support/faq" title="FAQ"/>
  </siteMapNode>
</siteMap>"#;

/// Temp project with a config file and two fragments
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        Self::with_config(
            r#"name = "test"

[attributes]
mapsList = "web.sitemap;support.sitemap"
securityTrimmingEnabled = "true"
"#,
        )
    }

    pub fn with_config(config: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("sitetree.toml"), config)?;
        fs::write(dir.path().join("web.sitemap"), HOME)?;
        fs::write(dir.path().join("support.sitemap"), SUPPORT)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
