use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Result};
use proctor_core::{Expectation, ProcessingResult};

use crate::store::SnapshotStore;

/// In-memory snapshot store for tests. Records every write.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    snapshots: HashMap<PathBuf, Vec<Expectation>>,
    writes: Vec<(PathBuf, ProcessingResult)>,
    reads: usize,
    fail_writes: bool,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, expectations: Vec<Expectation>) {
        self.lock().snapshots.insert(path.into(), expectations);
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self) {
        self.lock().fail_writes = true;
    }

    pub fn writes(&self) -> Vec<(PathBuf, ProcessingResult)> {
        self.lock().writes.clone()
    }

    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn read(&self, path: &Path) -> Result<Vec<Expectation>> {
        let mut inner = self.lock();
        inner.reads += 1;
        inner
            .snapshots
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no snapshot at {}", path.display()))
    }

    fn write(&self, path: &Path, result: &ProcessingResult) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(anyhow!("write refused for {}", path.display()));
        }
        inner.writes.push((path.to_path_buf(), result.clone()));
        Ok(())
    }
}
