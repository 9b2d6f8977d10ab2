//! One test per CLI command

use crate::common::TestProject;
use crate::sitetree;
use anyhow::Result;

#[test]
fn test_build_reports_node_count() -> Result<()> {
    let project = TestProject::new()?;

    let result = sitetree!(project.path(), "build").assert_success()?;
    assert!(result.contains_stdout("Nodes:         5"), "stdout: {}", result.stdout);
    assert!(result.contains_stdout("support.sitemap (ok)"));
    Ok(())
}

#[test]
fn test_find_prints_breadcrumb() -> Result<()> {
    let project = TestProject::new()?;

    let result = sitetree!(project.path(), "find", "/Support/FAQ?page=2").assert_success()?;
    assert_eq!(result.node_lines(), ["[4] FAQ  /support/faq"]);
    assert!(result.contains_stdout("Home > Support > FAQ"));
    Ok(())
}

#[test]
fn test_find_unknown_url_fails() -> Result<()> {
    let project = TestProject::new()?;

    let result = sitetree!(project.path(), "find", "/nowhere").assert_failure()?;
    assert!(result.contains_stderr("No node matches url"));
    Ok(())
}

#[test]
fn test_children_trimmed_per_viewer() -> Result<()> {
    let project = TestProject::new()?;

    let anonymous = sitetree!(project.path(), "children", "0").assert_success()?;
    assert_eq!(
        anonymous.node_lines(),
        ["[0] Home  /", "[1] Products  /products", "[3] Support  /support"]
    );

    let admin = sitetree!(project.path(), "children", "0", "--user", "ann", "--role", "Admin")
        .assert_success()?;
    assert_eq!(admin.node_lines().len(), 4);
    assert!(admin.contains_stdout("[2] Admin  /admin  roles=admin"));
    Ok(())
}

#[test]
fn test_tree_counts_visible_nodes() -> Result<()> {
    let project = TestProject::new()?;

    let result = sitetree!(project.path(), "tree", "--session", "s1").assert_success()?;
    assert!(result.contains_stdout("4 visible nodes"), "stdout: {}", result.stdout);
    assert!(result.contains_stdout("Viewer: //s1"));
    Ok(())
}

#[test]
fn test_missing_sources_fail() -> Result<()> {
    let project = TestProject::with_config("name = \"empty\"\n")?;

    let result = sitetree!(project.path(), "build").assert_failure()?;
    assert!(result.contains_stderr("No fragment sources configured"));
    Ok(())
}

#[test]
fn test_missing_config_fails() -> Result<()> {
    let project = TestProject::new()?;

    let result = sitetree!(project.path(), "--config", "other.toml", "build").assert_failure()?;
    assert!(result.contains_stderr("Failed to load config"));
    Ok(())
}
