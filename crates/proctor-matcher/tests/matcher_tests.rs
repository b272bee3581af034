use proctor_core::{
    BodyExpectation, BodyMutation, CommonResponse, Expectation, HeaderEntry, HeaderMutation, HeadersExpectation,
    ImmediateExpectation, ImmediateResponse, PhaseResponse, ProcessingPhase, ProcessingResponse, ProcessingResult,
};
use proctor_matcher::{compare, Difference};

fn set_header_expectation(key: &str, value: &str) -> Expectation {
    let mut exp = HeadersExpectation::default();
    exp.set_headers.insert(key.into(), value.into());
    Expectation::headers(ProcessingPhase::RequestHeaders, exp)
}

fn sets_headers(pairs: &[(&str, &str)]) -> ProcessingResponse {
    ProcessingResponse::RequestHeaders(CommonResponse {
        header_mutation: Some(HeaderMutation {
            set_headers: pairs.iter().map(|(k, v)| HeaderEntry::new(*k, *v)).collect(),
            remove_headers: vec![],
        }),
        body_mutation: None,
    })
}

fn result_of(responses: Vec<(ProcessingPhase, ProcessingResponse)>) -> ProcessingResult {
    responses
        .into_iter()
        .map(|(phase, response)| PhaseResponse::new(phase, response))
        .collect()
}

#[test]
fn test_matching_header_passes() {
    let expectations = vec![set_header_expectation("x-custom-header", "custom-value")];
    let result = result_of(vec![(
        ProcessingPhase::RequestHeaders,
        sets_headers(&[("x-custom-header", "custom-value")]),
    )]);

    let report = compare(&expectations, &result);
    assert!(report.passed);
    assert!(report.differences.is_empty());
    assert!(report.unmatched.is_empty());
    assert_eq!(report.matched.len(), 1);
}

#[test]
fn test_wrong_header_value_reports_one_difference() {
    let expectations = vec![set_header_expectation("x-custom-header", "custom-value")];
    let result = result_of(vec![(
        ProcessingPhase::RequestHeaders,
        sets_headers(&[("x-custom-header", "wrong-value")]),
    )]);

    let report = compare(&expectations, &result);
    assert!(!report.passed);
    assert_eq!(
        report.differences,
        vec![Difference::new(
            ProcessingPhase::RequestHeaders,
            "set_headers[x-custom-header]",
            "custom-value",
            "wrong-value",
        )]
    );
    assert_eq!(report.unmatched, expectations);
}

#[test]
fn test_immediate_response_matches() {
    let expectations = vec![Expectation::immediate(
        ProcessingPhase::RequestHeaders,
        ImmediateExpectation {
            status_code: 403,
            body: b"forbidden".to_vec(),
            ..ImmediateExpectation::default()
        },
    )];
    let result = result_of(vec![(
        ProcessingPhase::RequestHeaders,
        ProcessingResponse::Immediate(ImmediateResponse {
            status_code: 403,
            body: b"forbidden".to_vec(),
            ..ImmediateResponse::default()
        }),
    )]);

    assert!(compare(&expectations, &result).passed);
}

#[test]
fn test_expectation_without_phase_response_is_unmatched() {
    let expectations = vec![Expectation::body(
        ProcessingPhase::RequestBody,
        BodyExpectation {
            body: b"x".to_vec(),
            clear_body: false,
        },
    )];
    let result = result_of(vec![(ProcessingPhase::RequestHeaders, sets_headers(&[]))]);

    let report = compare(&expectations, &result);
    assert!(!report.passed);
    assert_eq!(report.unmatched, expectations);
    assert_eq!(
        report.differences,
        vec![Difference::new(ProcessingPhase::RequestBody, "response", "body_response", "<absent>")]
    );
}

#[test]
fn test_no_cross_phase_matching() {
    let mut exp = HeadersExpectation::default();
    exp.set_headers.insert("x-a".into(), "1".into());
    let expectations = vec![Expectation::headers(ProcessingPhase::ResponseHeaders, exp)];
    let result = result_of(vec![(ProcessingPhase::RequestHeaders, sets_headers(&[("x-a", "1")]))]);

    let report = compare(&expectations, &result);
    assert!(!report.passed);
    assert_eq!(report.unmatched.len(), 1);
}

#[test]
fn test_response_order_within_phase_is_irrelevant() {
    let expectations = vec![
        set_header_expectation("x-a", "1"),
        set_header_expectation("x-b", "2"),
    ];
    let first = (ProcessingPhase::RequestHeaders, sets_headers(&[("x-a", "1")]));
    let second = (ProcessingPhase::RequestHeaders, sets_headers(&[("x-b", "2")]));

    let forward = compare(&expectations, &result_of(vec![first.clone(), second.clone()]));
    let backward = compare(&expectations, &result_of(vec![second, first]));
    assert!(forward.passed);
    assert_eq!(forward.passed, backward.passed);
}

#[test]
fn test_one_response_may_satisfy_several_expectations() {
    let expectations = vec![
        set_header_expectation("x-a", "1"),
        set_header_expectation("x-b", "2"),
    ];
    let result = result_of(vec![(
        ProcessingPhase::RequestHeaders,
        sets_headers(&[("x-b", "2"), ("x-a", "1")]),
    )]);

    let report = compare(&expectations, &result);
    assert!(report.passed);
    assert_eq!(report.matched.len(), 2);
}

#[test]
fn test_diagnostics_collected_from_every_candidate() {
    let expectations = vec![set_header_expectation("x-a", "1")];
    let result = result_of(vec![
        (ProcessingPhase::RequestHeaders, sets_headers(&[("x-a", "2")])),
        (
            ProcessingPhase::RequestHeaders,
            ProcessingResponse::RequestBody(CommonResponse {
                header_mutation: None,
                body_mutation: Some(BodyMutation::Clear),
            }),
        ),
    ]);

    let report = compare(&expectations, &result);
    let paths: Vec<&str> = report.differences.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec!["set_headers[x-a]", "response_type"]);
}

#[test]
fn test_compare_is_idempotent() {
    let expectations = vec![
        set_header_expectation("x-a", "1"),
        set_header_expectation("x-c", "3"),
    ];
    let result = result_of(vec![(ProcessingPhase::RequestHeaders, sets_headers(&[("x-a", "1")]))]);

    assert_eq!(compare(&expectations, &result), compare(&expectations, &result));
}

#[test]
fn test_empty_expectations_pass() {
    let result = result_of(vec![(ProcessingPhase::RequestHeaders, sets_headers(&[]))]);
    let report = compare(&[], &result);
    assert!(report.passed);
    assert!(report.matched.is_empty());
}
