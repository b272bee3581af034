use std::time::Duration;

use proctor_core::Expectation;
use proctor_matcher::Difference;
use serde::{Deserialize, Serialize};

use crate::error::TestError;
use crate::ids::RunId;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pending => "pending",
            TestStatus::Running => "running",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TestStatus::Passed | TestStatus::Failed | TestStatus::Skipped)
    }

    /// `pending -> running -> {passed | failed | skipped}`, plus
    /// `pending -> skipped` for cases that never start. Terminal states stay put.
    pub fn can_advance_to(&self, next: TestStatus) -> bool {
        matches!(
            (self, next),
            (TestStatus::Pending, TestStatus::Running)
                | (TestStatus::Pending, TestStatus::Skipped)
                | (TestStatus::Running, TestStatus::Passed)
                | (TestStatus::Running, TestStatus::Failed)
                | (TestStatus::Running, TestStatus::Skipped)
        )
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one test case.
#[derive(Clone, Debug, PartialEq)]
pub struct TestResult {
    pub name: String,
    /// Name of the manifest the case came from.
    pub manifest: String,
    pub status: TestStatus,
    pub duration: Duration,
    pub error: Option<TestError>,
    pub differences: Vec<Difference>,
    pub unmatched: Vec<Expectation>,
}

impl TestResult {
    pub fn skipped(name: impl Into<String>, manifest: impl Into<String>, error: Option<TestError>) -> Self {
        Self {
            name: name.into(),
            manifest: manifest.into(),
            status: TestStatus::Skipped,
            duration: Duration::ZERO,
            error,
            differences: vec![],
            unmatched: vec![],
        }
    }

    pub fn failed(name: impl Into<String>, manifest: impl Into<String>, error: TestError) -> Self {
        Self {
            status: TestStatus::Failed,
            ..Self::skipped(name, manifest, Some(error))
        }
    }

    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Aggregate counts handed to `Reporter::end_suite`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl SuiteSummary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunResult {
    pub run_id: RunId,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
    /// Completion order.
    pub tests: Vec<TestResult>,
}

impl RunResult {
    pub fn new(run_id: RunId, total: usize) -> Self {
        Self {
            run_id,
            total,
            passed: 0,
            failed: 0,
            skipped: 0,
            duration: Duration::ZERO,
            tests: Vec::with_capacity(total),
        }
    }

    pub fn record(&mut self, result: TestResult) {
        match result.status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Skipped => self.skipped += 1,
            _ => self.failed += 1,
        }
        self.tests.push(result);
    }

    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary {
            total: self.total,
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            duration: self.duration,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.tests.iter().find(|t| t.name == name)
    }
}
