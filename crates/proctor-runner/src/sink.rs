use crate::ids::RunId;
use crate::result::{SuiteSummary, TestResult};

/// Receives run progress. Called from worker tasks when the run is parallel.
pub trait Reporter: Send + Sync {
    fn start_suite(&self, run_id: &RunId, total: usize);

    fn start_test(&self, name: &str);

    fn end_test(&self, result: &TestResult);

    fn end_suite(&self, summary: &SuiteSummary);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn start_suite(&self, _run_id: &RunId, _total: usize) {}

    fn start_test(&self, _name: &str) {}

    fn end_test(&self, _result: &TestResult) {}

    fn end_suite(&self, _summary: &SuiteSummary) {}
}
