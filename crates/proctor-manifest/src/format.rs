use anyhow::{Context, Result};
use proctor_core::TestManifest;

/// Canonical YAML for a manifest: fields in schema order, maps sorted by key,
/// defaults left out. Comments are not kept.
pub fn format_manifest(text: &str) -> Result<String> {
    let manifest: TestManifest = serde_yaml::from_str(text).context("parse manifest yaml")?;
    serde_yaml::to_string(&manifest).context("serialize manifest")
}
