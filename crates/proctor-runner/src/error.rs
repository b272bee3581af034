use std::path::PathBuf;

use proctor_driver::DriverError;
use thiserror::Error;

use crate::select::PatternError;

/// Problems with the run settings. Nothing executes when one is reported.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: PatternError,
    },
    #[error("parallelism must be at least 1")]
    ZeroParallelism,
}

/// Why a single test case errored. Recorded on its result; the run goes on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TestError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("read snapshot {}: {message}", path.display())]
    SnapshotRead { path: PathBuf, message: String },
    #[error("write snapshot {}: {message}", path.display())]
    SnapshotWrite { path: PathBuf, message: String },
    #[error("test case has no expectations and no snapshot")]
    NoExpectations,
    #[error("run cancelled before the test case started")]
    Cancelled,
    #[error("test task did not complete: {0}")]
    Aborted(String),
}
