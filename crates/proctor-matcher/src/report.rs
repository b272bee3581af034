use proctor_core::{Expectation, PhaseResponse, ProcessingPhase};

/// A single field that did not hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Difference {
    pub phase: ProcessingPhase,
    /// Dotted path of the field, e.g. `set_headers[x-custom-header]`.
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl Difference {
    pub fn new(
        phase: ProcessingPhase,
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedExpectation {
    pub expectation: Expectation,
    pub response: PhaseResponse,
}

/// Outcome of one `compare` call. Built once and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub passed: bool,
    pub differences: Vec<Difference>,
    pub matched: Vec<MatchedExpectation>,
    pub unmatched: Vec<Expectation>,
}
