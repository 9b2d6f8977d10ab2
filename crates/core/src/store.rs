//! On-disk output of built trees
//!
//! The only thing ever written is the diagnostic copy of a snapshot, in the
//! same `siteMap`/`siteMapNode` shape the fragments use:
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <siteMap xmlns="..." debug="Debug=true,mapsList=web.sitemap">
//!   <siteMapNode id="0" url="/" title="Home">
//!     <siteMapNode id="1" url="/products" title="Products"/>
//!   </siteMapNode>
//! </siteMap>
//! ```

use crate::node::NodeId;
use crate::tree::Snapshot;
use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Write;
use std::path::Path;

pub const SITE_MAP_NAMESPACE: &str = "http://schemas.microsoft.com/AspNet/SiteMap-File-1.0";

/// Render a snapshot as an XML document
pub fn render_document(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("siteMap");
    root.push_attribute(("xmlns", SITE_MAP_NAMESPACE));
    root.push_attribute(("debug", snapshot.debug_summary()));
    writer.write_event(Event::Start(root))?;

    if snapshot.root().is_some() {
        write_node(&mut writer, snapshot, NodeId::ROOT)?;
    }

    writer.write_event(Event::End(BytesEnd::new("siteMap")))?;
    Ok(writer.into_inner())
}

fn write_node(writer: &mut Writer<Vec<u8>>, snapshot: &Snapshot, id: NodeId) -> Result<()> {
    let Some(node) = snapshot.get(id) else {
        return Ok(());
    };

    let id_text = node.id.to_string();
    let roles = node.roles.join(";");
    let mut element = BytesStart::new("siteMapNode");
    element.push_attribute(("id", id_text.as_str()));
    if node.has_url() {
        element.push_attribute(("url", node.url.as_str()));
    }
    if !node.title.is_empty() {
        element.push_attribute(("title", node.title.as_str()));
    }
    if !node.description.is_empty() {
        element.push_attribute(("description", node.description.as_str()));
    }
    if !roles.is_empty() {
        element.push_attribute(("roles", roles.as_str()));
    }

    let children = snapshot.children(id);
    if children.is_empty() {
        writer.write_event(Event::Empty(element))?;
        return Ok(());
    }

    writer.write_event(Event::Start(element))?;
    for &child in children {
        write_node(writer, snapshot, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new("siteMapNode")))?;
    Ok(())
}

/// Write the diagnostic copy of `snapshot` to `target`
pub fn write_debug_artifact(snapshot: &Snapshot, target: &Path) -> Result<()> {
    let document = render_document(snapshot)?;
    atomic_write(target, &document)
}

/// Atomic write helper
///
/// Writes data to a temporary file next to the target, fsyncs it, then
/// renames it over the target so readers never see a half-written file.
pub fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(data).context("Failed to write temp file")?;
    tmp.as_file().sync_all().context("Failed to sync temp file")?;
    tmp.persist(target)
        .with_context(|| format!("Failed to rename temp file to {}", target.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Fragment;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out.txt");

        atomic_write(&target, b"first").unwrap();
        atomic_write(&target, b"second").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"second");
        // Only the target remains, no stray temp files
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_snapshot_renders_bare_root() {
        let snapshot = Snapshot::with_debug("Debug=true".to_string());
        let text = String::from_utf8(render_document(&snapshot).unwrap()).unwrap();

        assert!(text.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(text.contains(r#"debug="Debug=true""#));
        assert!(text.contains("</siteMap>"));
        assert!(!text.contains("siteMapNode"));
    }

    #[test]
    fn test_rendered_document_parses_back() {
        use crate::node::{parse_roles, TreeNode};

        let mut snapshot = Snapshot::with_debug("mapsList=a;b".to_string());
        snapshot.push(
            TreeNode {
                id: NodeId::new(0),
                url: "/".to_string(),
                title: "Home & more".to_string(),
                description: String::new(),
                roles: parse_roles(""),
            },
            None,
        );
        snapshot.push(
            TreeNode {
                id: NodeId::new(1),
                url: "/admin".to_string(),
                title: "Admin".to_string(),
                description: "Tools".to_string(),
                roles: parse_roles("admin;ops"),
            },
            Some(NodeId::ROOT),
        );

        let document = String::from_utf8(render_document(&snapshot).unwrap()).unwrap();
        let fragment = Fragment::parse(Path::new("debug"), &document).unwrap();

        assert_eq!(fragment.root.title.as_deref(), Some("Home & more"));
        let admin = &fragment.root.children[0];
        assert_eq!(admin.roles.as_deref(), Some("admin;ops"));
        assert_eq!(admin.description.as_deref(), Some("Tools"));
    }
}
