use std::collections::BTreeMap;

use proctor_core::{
    BodyExpectation, CommonResponse, Expectation, HeaderMutation, HeadersExpectation, ImmediateExpectation,
    ImmediateResponse, PhaseResponse, ProcessingResponse, ProcessingResult, TrailersExpectation,
};
use tracing::warn;

/// Turn captured responses into fully specified expectations, one per
/// response. Responses without a variant cannot be expressed and are skipped.
pub fn expectations_from_result(result: &ProcessingResult) -> Vec<Expectation> {
    result.responses().iter().filter_map(expectation_from_response).collect()
}

fn expectation_from_response(captured: &PhaseResponse) -> Option<Expectation> {
    let phase = captured.phase;
    let expectation = match &captured.response {
        ProcessingResponse::RequestHeaders(c) | ProcessingResponse::ResponseHeaders(c) => {
            Expectation::headers(phase, headers_expectation(c))
        }
        ProcessingResponse::RequestBody(c) | ProcessingResponse::ResponseBody(c) => {
            Expectation::body(phase, body_expectation(c))
        }
        ProcessingResponse::RequestTrailers(t) | ProcessingResponse::ResponseTrailers(t) => {
            let (set_trailers, remove_trailers) = split_mutation(t.header_mutation.as_ref());
            Expectation::trailers(
                phase,
                TrailersExpectation {
                    set_trailers,
                    remove_trailers,
                },
            )
        }
        ProcessingResponse::Immediate(i) => Expectation::immediate(phase, immediate_expectation(i)),
        ProcessingResponse::Unset => {
            warn!(%phase, "response without a variant left out of snapshot");
            return None;
        }
    };
    Some(expectation)
}

fn headers_expectation(response: &CommonResponse) -> HeadersExpectation {
    let (set_headers, remove_headers) = split_mutation(response.header_mutation.as_ref());
    HeadersExpectation {
        set_headers,
        remove_headers,
        header_mutation: None,
    }
}

fn body_expectation(response: &CommonResponse) -> BodyExpectation {
    match &response.body_mutation {
        Some(m) => BodyExpectation {
            body: m.body().to_vec(),
            clear_body: m.clears(),
        },
        None => BodyExpectation::default(),
    }
}

fn immediate_expectation(response: &ImmediateResponse) -> ImmediateExpectation {
    let (headers, _) = split_mutation(response.headers.as_ref());
    ImmediateExpectation {
        status_code: response.status_code,
        body: response.body.clone(),
        headers,
        grpc_status: response.grpc_status,
        details: response.details.clone(),
    }
}

/// First value wins for repeated keys, mirroring how the matcher reads a
/// mutation.
fn split_mutation(mutation: Option<&HeaderMutation>) -> (BTreeMap<String, String>, Vec<String>) {
    let Some(m) = mutation else {
        return (BTreeMap::new(), Vec::new());
    };
    let mut set = BTreeMap::new();
    for entry in &m.set_headers {
        set.entry(entry.key.clone()).or_insert_with(|| entry.value.clone());
    }
    (set, m.remove_headers.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::{BodyMutation, ExpectedResponse, HeaderEntry, ProcessingPhase, TrailersResponse};

    #[test]
    fn test_repeated_header_keeps_first_value() {
        let mutation = HeaderMutation {
            set_headers: vec![HeaderEntry::new("x-a", "1"), HeaderEntry::new("x-a", "2")],
            remove_headers: vec!["x-b".into()],
        };
        let (set, remove) = split_mutation(Some(&mutation));
        assert_eq!(set.get("x-a").map(String::as_str), Some("1"));
        assert_eq!(remove, vec!["x-b".to_string()]);
    }

    #[test]
    fn test_each_variant_converts() {
        let mut result = ProcessingResult::new();
        result.push(
            ProcessingPhase::RequestBody,
            ProcessingResponse::RequestBody(CommonResponse {
                header_mutation: None,
                body_mutation: Some(BodyMutation::Clear),
            }),
        );
        result.push(
            ProcessingPhase::ResponseTrailers,
            ProcessingResponse::ResponseTrailers(TrailersResponse {
                header_mutation: Some(HeaderMutation {
                    set_headers: vec![HeaderEntry::new("x-sum", "abc")],
                    remove_headers: vec![],
                }),
            }),
        );
        result.push(ProcessingPhase::RequestHeaders, ProcessingResponse::Unset);

        let expectations = expectations_from_result(&result);
        assert_eq!(expectations.len(), 2);
        match &expectations[0].response {
            ExpectedResponse::Body(b) => assert!(b.clear_body && b.body.is_empty()),
            other => panic!("unexpected {}", other.kind_name()),
        }
        assert_eq!(expectations[1].phase, ProcessingPhase::ResponseTrailers);
    }
}
