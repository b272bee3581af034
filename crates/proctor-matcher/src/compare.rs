use std::collections::BTreeMap;

use proctor_core::{
    BodyExpectation, CommonResponse, ExpectedResponse, Expectation, HeaderMutation, HeadersExpectation,
    ImmediateExpectation, ImmediateResponse, ProcessingPhase, ProcessingResponse, ProcessingResult, TrailersExpectation,
};

use crate::report::{Difference, MatchReport, MatchedExpectation};

const NOT_SET: &str = "<not set>";
const NOT_REMOVED: &str = "<not removed>";
const NO_MUTATION: &str = "<no header mutation>";
const ABSENT: &str = "<absent>";

/// Compare `expectations` against the responses in `result`.
///
/// Each expectation is satisfied by the first same-phase response that
/// yields no differences; a response may satisfy several expectations.
/// Differences are only reported for expectations left unmatched.
pub fn compare(expectations: &[Expectation], result: &ProcessingResult) -> MatchReport {
    let mut report = MatchReport {
        passed: true,
        ..MatchReport::default()
    };

    for expectation in expectations {
        let mut observed = Vec::new();
        let mut candidates = 0usize;
        let mut satisfied = None;

        for actual in result.for_phase(expectation.phase) {
            candidates += 1;
            let diffs = compare_response(expectation, &actual.response);
            if diffs.is_empty() {
                satisfied = Some(actual);
                break;
            }
            observed.extend(diffs);
        }

        match satisfied {
            Some(actual) => report.matched.push(MatchedExpectation {
                expectation: expectation.clone(),
                response: actual.clone(),
            }),
            None => {
                if candidates == 0 {
                    observed.push(Difference::new(
                        expectation.phase,
                        "response",
                        expectation.response.kind_name(),
                        ABSENT,
                    ));
                }
                report.differences.extend(observed);
                report.unmatched.push(expectation.clone());
                report.passed = false;
            }
        }
    }

    report
}

fn compare_response(expectation: &Expectation, actual: &ProcessingResponse) -> Vec<Difference> {
    let phase = expectation.phase;
    match &expectation.response {
        ExpectedResponse::Headers(exp) => match actual.as_headers() {
            Some(common) => compare_headers(phase, exp, common),
            None => wrong_type(phase, &expectation.response, actual),
        },
        ExpectedResponse::Body(exp) => match actual.as_body() {
            Some(common) => compare_body(phase, exp, common),
            None => wrong_type(phase, &expectation.response, actual),
        },
        ExpectedResponse::Trailers(exp) => match actual.as_trailers() {
            Some(trailers) => compare_trailers(phase, exp, trailers.header_mutation.as_ref()),
            None => wrong_type(phase, &expectation.response, actual),
        },
        ExpectedResponse::Immediate(exp) => match actual.as_immediate() {
            Some(immediate) => compare_immediate(phase, exp, immediate),
            None => wrong_type(phase, &expectation.response, actual),
        },
    }
}

fn wrong_type(phase: ProcessingPhase, expected: &ExpectedResponse, actual: &ProcessingResponse) -> Vec<Difference> {
    vec![Difference::new(
        phase,
        "response_type",
        expected.kind_name(),
        actual.kind().as_str(),
    )]
}

fn compare_headers(phase: ProcessingPhase, exp: &HeadersExpectation, actual: &CommonResponse) -> Vec<Difference> {
    let mutation = actual.header_mutation.as_ref();
    let mut diffs = Vec::new();

    if let Some(full) = exp.header_mutation.as_ref().filter(|m| !m.is_empty()) {
        match mutation {
            None => diffs.push(Difference::new(phase, "header_mutation", "present", "nil")),
            Some(m) => {
                diffs.extend(missing_sets(phase, "header_mutation.set_headers", &full.set_headers, m));
                diffs.extend(missing_removals(phase, "header_mutation.remove_headers", &full.remove_headers, m));
            }
        }
    }

    diffs.extend(compare_mutation(phase, "set_headers", "remove_headers", &exp.set_headers, &exp.remove_headers, mutation));
    diffs
}

fn compare_trailers(phase: ProcessingPhase, exp: &TrailersExpectation, mutation: Option<&HeaderMutation>) -> Vec<Difference> {
    compare_mutation(
        phase,
        "set_trailers",
        "remove_trailers",
        &exp.set_trailers,
        &exp.remove_trailers,
        mutation,
    )
}

/// Set and remove checks shared by headers and trailers. A missing mutation
/// yields one difference per non-empty field.
fn compare_mutation(
    phase: ProcessingPhase,
    set_field: &str,
    remove_field: &str,
    set: &BTreeMap<String, String>,
    remove: &[String],
    mutation: Option<&HeaderMutation>,
) -> Vec<Difference> {
    let Some(m) = mutation else {
        let mut diffs = Vec::new();
        if !set.is_empty() {
            diffs.push(Difference::new(phase, set_field, render_map(set), NO_MUTATION));
        }
        if !remove.is_empty() {
            diffs.push(Difference::new(phase, remove_field, remove.join(", "), NO_MUTATION));
        }
        return diffs;
    };

    let mut diffs = missing_sets(phase, set_field, set, m);
    diffs.extend(missing_removals(phase, remove_field, remove, m));
    diffs
}

fn missing_sets(
    phase: ProcessingPhase,
    field: &str,
    expected: &BTreeMap<String, String>,
    mutation: &HeaderMutation,
) -> Vec<Difference> {
    expected
        .iter()
        .filter_map(|(key, want)| match mutation.get(key) {
            Some(got) if got == want => None,
            Some(got) => Some(Difference::new(phase, format!("{field}[{key}]"), want, got)),
            None => Some(Difference::new(phase, format!("{field}[{key}]"), want, NOT_SET)),
        })
        .collect()
}

fn missing_removals(phase: ProcessingPhase, field: &str, expected: &[String], mutation: &HeaderMutation) -> Vec<Difference> {
    expected
        .iter()
        .filter(|key| !mutation.removes(key))
        .map(|key| Difference::new(phase, format!("{field}[{key}]"), "removed", NOT_REMOVED))
        .collect()
}

fn compare_body(phase: ProcessingPhase, exp: &BodyExpectation, actual: &CommonResponse) -> Vec<Difference> {
    let mutation = actual.body_mutation.as_ref();
    let mut diffs = Vec::new();

    if exp.clear_body && !mutation.is_some_and(|m| m.clears()) {
        diffs.push(Difference::new(phase, "body.clear_body", "true", "false"));
    }

    if !exp.body.is_empty() {
        match mutation {
            None => diffs.push(Difference::new(phase, "body.body_mutation", text(&exp.body), "<nil>")),
            Some(m) if m.body() != exp.body.as_slice() => {
                diffs.push(Difference::new(phase, "body.body_mutation.body", text(&exp.body), text(m.body())))
            }
            Some(_) => {}
        }
    }

    diffs
}

fn compare_immediate(phase: ProcessingPhase, exp: &ImmediateExpectation, actual: &ImmediateResponse) -> Vec<Difference> {
    let mut diffs = Vec::new();

    if exp.status_code != 0 && exp.status_code != actual.status_code {
        diffs.push(Difference::new(
            phase,
            "immediate_response.status_code",
            exp.status_code.to_string(),
            actual.status_code.to_string(),
        ));
    }

    if !exp.body.is_empty() && exp.body != actual.body {
        diffs.push(Difference::new(phase, "immediate_response.body", text(&exp.body), text(&actual.body)));
    }

    for (key, want) in &exp.headers {
        let got = actual.headers.as_ref().and_then(|m| m.get(key));
        if got != Some(want.as_str()) {
            diffs.push(Difference::new(
                phase,
                format!("immediate_response.headers[{key}]"),
                want,
                got.unwrap_or(NOT_SET),
            ));
        }
    }

    if let Some(want) = exp.grpc_status {
        if actual.grpc_status != Some(want) {
            let got = actual.grpc_status.map(|s| s.to_string()).unwrap_or_else(|| NOT_SET.to_string());
            diffs.push(Difference::new(phase, "immediate_response.grpc_status", want.to_string(), got));
        }
    }

    if !exp.details.is_empty() && exp.details != actual.details {
        diffs.push(Difference::new(phase, "immediate_response.details", &exp.details, &actual.details));
    }

    diffs
}

fn render_map(map: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}:{v}")).collect();
    format!("map[{}]", pairs.join(" "))
}

/// Non UTF-8 payloads are shown with `\xNN` escapes.
fn text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.escape_ascii().to_string(),
    }
}
