//! Processor protocol messages as closed enums.
//!
//! Transports convert their wire types into these so the driver and matcher
//! never look at wire encodings.

use std::fmt;

use crate::phase::ProcessingPhase;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One message sent to the processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingRequest {
    RequestHeaders {
        headers: Vec<HeaderEntry>,
        end_of_stream: bool,
    },
    RequestBody {
        body: Vec<u8>,
        end_of_stream: bool,
    },
    RequestTrailers {
        trailers: Vec<HeaderEntry>,
    },
}

impl ProcessingRequest {
    pub fn phase(&self) -> ProcessingPhase {
        match self {
            ProcessingRequest::RequestHeaders { .. } => ProcessingPhase::RequestHeaders,
            ProcessingRequest::RequestBody { .. } => ProcessingPhase::RequestBody,
            ProcessingRequest::RequestTrailers { .. } => ProcessingPhase::RequestTrailers,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMutation {
    pub set_headers: Vec<HeaderEntry>,
    pub remove_headers: Vec<String>,
}

impl HeaderMutation {
    /// Value of the first set-header entry with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.set_headers
            .iter()
            .find(|h| h.key == key)
            .map(|h| h.value.as_str())
    }

    pub fn removes(&self, key: &str) -> bool {
        self.remove_headers.iter().any(|k| k == key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyMutation {
    Replace(Vec<u8>),
    Clear,
}

impl BodyMutation {
    pub fn body(&self) -> &[u8] {
        match self {
            BodyMutation::Replace(b) => b,
            BodyMutation::Clear => &[],
        }
    }

    pub fn clears(&self) -> bool {
        matches!(self, BodyMutation::Clear)
    }
}

/// Mutation carried by headers and body responses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommonResponse {
    pub header_mutation: Option<HeaderMutation>,
    pub body_mutation: Option<BodyMutation>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrailersResponse {
    pub header_mutation: Option<HeaderMutation>,
}

/// Short-circuit reply: the processor answers the client directly and the
/// remaining phases are never driven.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImmediateResponse {
    pub status_code: u32,
    pub headers: Option<HeaderMutation>,
    pub body: Vec<u8>,
    pub grpc_status: Option<u32>,
    pub details: String,
}

/// One message received from the processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingResponse {
    RequestHeaders(CommonResponse),
    ResponseHeaders(CommonResponse),
    RequestBody(CommonResponse),
    ResponseBody(CommonResponse),
    RequestTrailers(TrailersResponse),
    ResponseTrailers(TrailersResponse),
    Immediate(ImmediateResponse),
    /// The processor replied without setting any response variant.
    Unset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    RequestHeaders,
    ResponseHeaders,
    RequestBody,
    ResponseBody,
    RequestTrailers,
    ResponseTrailers,
    Immediate,
    Unset,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::RequestHeaders => "request_headers",
            ResponseKind::ResponseHeaders => "response_headers",
            ResponseKind::RequestBody => "request_body",
            ResponseKind::ResponseBody => "response_body",
            ResponseKind::RequestTrailers => "request_trailers",
            ResponseKind::ResponseTrailers => "response_trailers",
            ResponseKind::Immediate => "immediate_response",
            ResponseKind::Unset => "unset",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProcessingResponse {
    pub fn kind(&self) -> ResponseKind {
        match self {
            ProcessingResponse::RequestHeaders(_) => ResponseKind::RequestHeaders,
            ProcessingResponse::ResponseHeaders(_) => ResponseKind::ResponseHeaders,
            ProcessingResponse::RequestBody(_) => ResponseKind::RequestBody,
            ProcessingResponse::ResponseBody(_) => ResponseKind::ResponseBody,
            ProcessingResponse::RequestTrailers(_) => ResponseKind::RequestTrailers,
            ProcessingResponse::ResponseTrailers(_) => ResponseKind::ResponseTrailers,
            ProcessingResponse::Immediate(_) => ResponseKind::Immediate,
            ProcessingResponse::Unset => ResponseKind::Unset,
        }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, ProcessingResponse::Immediate(_))
    }

    /// Headers response for either leg.
    pub fn as_headers(&self) -> Option<&CommonResponse> {
        match self {
            ProcessingResponse::RequestHeaders(c) | ProcessingResponse::ResponseHeaders(c) => Some(c),
            _ => None,
        }
    }

    /// Body response for either leg.
    pub fn as_body(&self) -> Option<&CommonResponse> {
        match self {
            ProcessingResponse::RequestBody(c) | ProcessingResponse::ResponseBody(c) => Some(c),
            _ => None,
        }
    }

    /// Trailers response for either leg.
    pub fn as_trailers(&self) -> Option<&TrailersResponse> {
        match self {
            ProcessingResponse::RequestTrailers(t) | ProcessingResponse::ResponseTrailers(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_immediate(&self) -> Option<&ImmediateResponse> {
        match self {
            ProcessingResponse::Immediate(i) => Some(i),
            _ => None,
        }
    }
}

/// A response tagged with the phase whose request produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseResponse {
    pub phase: ProcessingPhase,
    pub response: ProcessingResponse,
}

impl PhaseResponse {
    pub fn new(phase: ProcessingPhase, response: ProcessingResponse) -> Self {
        Self { phase, response }
    }
}

/// Ordered, append-only record of the responses of one test case execution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessingResult {
    responses: Vec<PhaseResponse>,
}

impl ProcessingResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, phase: ProcessingPhase, response: ProcessingResponse) {
        self.responses.push(PhaseResponse::new(phase, response));
    }

    pub fn responses(&self) -> &[PhaseResponse] {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn phases(&self) -> Vec<ProcessingPhase> {
        self.responses.iter().map(|r| r.phase).collect()
    }

    /// Responses produced for `phase`, in arrival order.
    pub fn for_phase(&self, phase: ProcessingPhase) -> impl Iterator<Item = &PhaseResponse> {
        self.responses.iter().filter(move |r| r.phase == phase)
    }
}

impl FromIterator<PhaseResponse> for ProcessingResult {
    fn from_iter<I: IntoIterator<Item = PhaseResponse>>(iter: I) -> Self {
        Self {
            responses: iter.into_iter().collect(),
        }
    }
}
