use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::phase::ProcessingPhase;

/// Declarative, partial description of an acceptable response for a phase.
///
/// In manifests the response kind sits next to `phase`:
///
/// ```yaml
/// - phase: REQUEST_HEADERS
///   headers_response:
///     set_headers: { x-custom-header: custom-value }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expectation {
    pub phase: ProcessingPhase,
    #[serde(flatten)]
    pub response: ExpectedResponse,
}

impl Expectation {
    pub fn new(phase: ProcessingPhase, response: ExpectedResponse) -> Self {
        Self { phase, response }
    }

    pub fn headers(phase: ProcessingPhase, expectation: HeadersExpectation) -> Self {
        Self::new(phase, ExpectedResponse::Headers(expectation))
    }

    pub fn body(phase: ProcessingPhase, expectation: BodyExpectation) -> Self {
        Self::new(phase, ExpectedResponse::Body(expectation))
    }

    pub fn trailers(phase: ProcessingPhase, expectation: TrailersExpectation) -> Self {
        Self::new(phase, ExpectedResponse::Trailers(expectation))
    }

    pub fn immediate(phase: ProcessingPhase, expectation: ImmediateExpectation) -> Self {
        Self::new(phase, ExpectedResponse::Immediate(expectation))
    }
}

/// Expected response kind. Comparison dispatches on this and fails closed
/// when the actual response is of another kind.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExpectedResponse {
    #[serde(rename = "headers_response")]
    Headers(HeadersExpectation),
    #[serde(rename = "body_response")]
    Body(BodyExpectation),
    #[serde(rename = "trailers_response")]
    Trailers(TrailersExpectation),
    #[serde(rename = "immediate_response")]
    Immediate(ImmediateExpectation),
}

impl ExpectedResponse {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExpectedResponse::Headers(_) => "headers_response",
            ExpectedResponse::Body(_) => "body_response",
            ExpectedResponse::Trailers(_) => "trailers_response",
            ExpectedResponse::Immediate(_) => "immediate_response",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeadersExpectation {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_headers: Vec<String>,
    /// Full header mutation; reported under the `header_mutation.` path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_mutation: Option<HeaderMutationExpectation>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderMutationExpectation {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_headers: Vec<String>,
}

impl HeaderMutationExpectation {
    pub fn is_empty(&self) -> bool {
        self.set_headers.is_empty() && self.remove_headers.is_empty()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BodyExpectation {
    #[serde(default, with = "crate::text", skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<u8>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_body: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrailersExpectation {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_trailers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_trailers: Vec<String>,
}

/// Zero-valued fields are unconstrained.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImmediateExpectation {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub status_code: u32,
    #[serde(default, with = "crate::text", skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_status: Option<u32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}
