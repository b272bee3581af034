use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use proctor_runner::{Reporter, RunId, SuiteSummary, TestResult};
use serde::Serialize;
use tracing::warn;

use crate::writer::{lock, Sink};

#[derive(Debug, Default, Serialize)]
struct Document {
    run_id: String,
    started_at_ms: u64,
    tests: Vec<JsonTest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<JsonSummary>,
}

#[derive(Debug, Serialize)]
struct JsonTest {
    name: String,
    manifest: String,
    status: &'static str,
    duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    differences: Vec<JsonDifference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unmatched: Vec<JsonUnmatched>,
}

#[derive(Debug, Serialize)]
struct JsonDifference {
    phase: String,
    path: String,
    expected: String,
    actual: String,
}

#[derive(Debug, Serialize)]
struct JsonUnmatched {
    phase: String,
    response_type: &'static str,
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    duration_ms: f64,
    success: bool,
}

/// Collects every test and prints one pretty JSON document when the suite ends.
pub struct JsonReporter {
    out: Sink,
    doc: Mutex<Document>,
}

impl JsonReporter {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
            doc: Mutex::default(),
        }
    }
}

impl Reporter for JsonReporter {
    fn start_suite(&self, run_id: &RunId, _total: usize) {
        let mut doc = lock(&self.doc);
        doc.run_id = run_id.as_str().to_string();
        doc.started_at_ms = now_ms();
        doc.tests.clear();
        doc.summary = None;
    }

    fn start_test(&self, _name: &str) {}

    fn end_test(&self, result: &TestResult) {
        let test = JsonTest {
            name: result.name.clone(),
            manifest: result.manifest.clone(),
            status: result.status.as_str(),
            duration_ms: millis(result.duration),
            error: result.error.as_ref().map(|e| e.to_string()),
            differences: result
                .differences
                .iter()
                .map(|d| JsonDifference {
                    phase: d.phase.to_string(),
                    path: d.path.clone(),
                    expected: d.expected.clone(),
                    actual: d.actual.clone(),
                })
                .collect(),
            unmatched: result
                .unmatched
                .iter()
                .map(|u| JsonUnmatched {
                    phase: u.phase.to_string(),
                    response_type: u.response.kind_name(),
                })
                .collect(),
        };
        lock(&self.doc).tests.push(test);
    }

    fn end_suite(&self, summary: &SuiteSummary) {
        let mut doc = lock(&self.doc);
        doc.summary = Some(JsonSummary {
            total: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            duration_ms: millis(summary.duration),
            success: summary.success(),
        });
        let mut out = lock(&self.out);
        let written = serde_json::to_writer_pretty(&mut *out, &*doc)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(out))
            .and_then(|()| out.flush());
        if let Err(e) = written {
            warn!(error = %e, "failed to write json report");
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SharedBuffer;
    use proctor_core::{Expectation, ImmediateExpectation, ProcessingPhase};
    use proctor_matcher::Difference;
    use proctor_runner::{TestError, TestStatus};

    #[test]
    fn test_single_document_at_suite_end() {
        let buf = SharedBuffer::new();
        let reporter = JsonReporter::with_writer(buf.clone());

        reporter.start_suite(&RunId::from_str("run-1"), 2);
        let mut passed = TestResult::skipped("ok", "basic", None);
        passed.status = TestStatus::Passed;
        reporter.end_test(&passed);
        assert_eq!(buf.contents(), "");

        let mut failed = TestResult::skipped("bad", "basic", Some(TestError::NoExpectations));
        failed.status = TestStatus::Failed;
        failed.differences.push(Difference::new(
            ProcessingPhase::RequestHeaders,
            "immediate_response.status_code",
            "403",
            "200",
        ));
        failed.unmatched.push(Expectation::immediate(
            ProcessingPhase::RequestBody,
            ImmediateExpectation::default(),
        ));
        reporter.end_test(&failed);
        reporter.end_suite(&SuiteSummary {
            total: 2,
            passed: 1,
            failed: 1,
            skipped: 0,
            duration: Duration::from_millis(5),
        });

        let doc: serde_json::Value = serde_json::from_str(&buf.contents()).unwrap();
        assert_eq!(doc["run_id"], "run-1");
        assert!(doc["started_at_ms"].as_u64().unwrap() > 0);
        assert_eq!(doc["tests"].as_array().unwrap().len(), 2);
        assert_eq!(doc["tests"][0]["status"], "passed");
        assert!(doc["tests"][0].get("error").is_none());
        assert!(doc["tests"][0].get("differences").is_none());

        let bad = &doc["tests"][1];
        assert_eq!(bad["manifest"], "basic");
        assert_eq!(bad["status"], "failed");
        assert_eq!(bad["error"], "test case has no expectations and no snapshot");
        assert_eq!(bad["differences"][0]["phase"], "REQUEST_HEADERS");
        assert_eq!(bad["differences"][0]["expected"], "403");
        assert_eq!(bad["unmatched"][0]["response_type"], "immediate_response");

        assert_eq!(doc["summary"]["total"], 2);
        assert_eq!(doc["summary"]["success"], false);
        assert_eq!(doc["summary"]["duration_ms"], 5.0);
    }
}
