use std::path::Path;

use anyhow::{Context, Result};
use proctor_core::{Expectation, ProcessingResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::convert::expectations_from_result;

/// Source of expectations for snapshot-backed tests and sink for captured
/// results in update mode.
pub trait SnapshotStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<Expectation>>;

    fn write(&self, path: &Path, result: &ProcessingResult) -> Result<()>;
}

/// On-disk layout of a snapshot file; uses the manifest expectation schema.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

/// YAML snapshot files on the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSnapshotStore;

impl FsSnapshotStore {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn read(&self, path: &Path) -> Result<Vec<Expectation>> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))?;
        let file: SnapshotFile =
            serde_yaml::from_str(&s).with_context(|| format!("parse snapshot {}", path.display()))?;
        Ok(file.expectations)
    }

    fn write(&self, path: &Path, result: &ProcessingResult) -> Result<()> {
        let file = SnapshotFile {
            name: "snapshot".to_string(),
            expectations: expectations_from_result(result),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = serde_yaml::to_string(&file).with_context(|| "serialize snapshot yaml")?;
        std::fs::write(path, s).with_context(|| format!("write snapshot {}", path.display()))?;
        debug!(path = %path.display(), expectations = file.expectations.len(), "snapshot written");
        Ok(())
    }
}
