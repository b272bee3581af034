use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::expectation::Expectation;
use crate::request::HttpRequestSpec;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub request: HttpRequestSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expectations: Vec<Expectation>,
    /// Snapshot file used when no inline expectations are given, and the
    /// capture target in snapshot-update mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, request: HttpRequestSpec) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: vec![],
            request,
            expectations: vec![],
            snapshot: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// A manifest together with the file it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedManifest {
    pub manifest: TestManifest,
    pub source_path: PathBuf,
}

impl LoadedManifest {
    pub fn new(manifest: TestManifest, source_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            source_path: source_path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn test_cases(&self) -> &[TestCase] {
        &self.manifest.test_cases
    }

    /// Snapshot path of `tc`, relative paths resolved against the manifest's
    /// directory.
    pub fn snapshot_path(&self, tc: &TestCase) -> Option<PathBuf> {
        let snapshot = tc.snapshot.as_ref()?;
        if snapshot.is_absolute() {
            return Some(snapshot.clone());
        }
        let dir = self.source_path.parent().unwrap_or_else(|| Path::new(""));
        Some(dir.join(snapshot))
    }
}
