//! Conversions between `ext_proc.v3` wire messages and proctor's own types.

use envoy_types::pb::envoy::config::core::v3::{HeaderMap, HeaderValue};
use envoy_types::pb::envoy::service::ext_proc::v3 as pb;
use envoy_types::pb::envoy::service::ext_proc::v3::{body_mutation, processing_request, processing_response};
use proctor_core::{
    BodyMutation, CommonResponse, HeaderEntry, HeaderMutation, ImmediateResponse, ProcessingRequest,
    ProcessingResponse, TrailersResponse,
};

pub fn request_to_wire(request: ProcessingRequest) -> pb::ProcessingRequest {
    let request = match request {
        ProcessingRequest::RequestHeaders { headers, end_of_stream } => {
            processing_request::Request::RequestHeaders(pb::HttpHeaders {
                headers: Some(header_map(headers)),
                end_of_stream,
                ..Default::default()
            })
        }
        ProcessingRequest::RequestBody { body, end_of_stream } => {
            processing_request::Request::RequestBody(pb::HttpBody {
                body: body.into(),
                end_of_stream,
                ..Default::default()
            })
        }
        ProcessingRequest::RequestTrailers { trailers } => {
            processing_request::Request::RequestTrailers(pb::HttpTrailers {
                trailers: Some(header_map(trailers)),
                ..Default::default()
            })
        }
    };
    pb::ProcessingRequest {
        request: Some(request),
        ..Default::default()
    }
}

fn header_map(entries: Vec<HeaderEntry>) -> HeaderMap {
    HeaderMap {
        headers: entries
            .into_iter()
            .map(|h| HeaderValue {
                key: h.key,
                value: h.value,
                ..Default::default()
            })
            .collect(),
    }
}

#[allow(unreachable_patterns)]
pub fn response_from_wire(response: pb::ProcessingResponse) -> ProcessingResponse {
    use processing_response::Response;

    let Some(response) = response.response else {
        return ProcessingResponse::Unset;
    };
    match response {
        Response::RequestHeaders(r) => ProcessingResponse::RequestHeaders(common(r.response)),
        Response::ResponseHeaders(r) => ProcessingResponse::ResponseHeaders(common(r.response)),
        Response::RequestBody(r) => ProcessingResponse::RequestBody(common(r.response)),
        Response::ResponseBody(r) => ProcessingResponse::ResponseBody(common(r.response)),
        Response::RequestTrailers(r) => ProcessingResponse::RequestTrailers(TrailersResponse {
            header_mutation: r.header_mutation.map(header_mutation),
        }),
        Response::ResponseTrailers(r) => ProcessingResponse::ResponseTrailers(TrailersResponse {
            header_mutation: r.header_mutation.map(header_mutation),
        }),
        Response::ImmediateResponse(r) => ProcessingResponse::Immediate(immediate(r)),
        _ => ProcessingResponse::Unset,
    }
}

fn common(response: Option<pb::CommonResponse>) -> CommonResponse {
    let Some(response) = response else {
        return CommonResponse::default();
    };
    CommonResponse {
        header_mutation: response.header_mutation.map(header_mutation),
        body_mutation: response.body_mutation.and_then(body_mutation),
    }
}

fn header_mutation(mutation: pb::HeaderMutation) -> HeaderMutation {
    HeaderMutation {
        set_headers: mutation
            .set_headers
            .into_iter()
            .filter_map(|option| option.header)
            .map(header_entry)
            .collect(),
        remove_headers: mutation.remove_headers,
    }
}

/// Processors may send the value as raw bytes instead of text.
fn header_entry(header: HeaderValue) -> HeaderEntry {
    let value = if header.value.is_empty() && !header.raw_value.is_empty() {
        String::from_utf8_lossy(header.raw_value.as_ref()).into_owned()
    } else {
        header.value
    };
    HeaderEntry::new(header.key, value)
}

#[allow(unreachable_patterns)]
fn body_mutation(mutation: pb::BodyMutation) -> Option<BodyMutation> {
    match mutation.mutation? {
        body_mutation::Mutation::Body(body) => Some(BodyMutation::Replace(body.to_vec())),
        body_mutation::Mutation::ClearBody(true) => Some(BodyMutation::Clear),
        body_mutation::Mutation::ClearBody(false) => None,
        _ => None,
    }
}

fn immediate(response: pb::ImmediateResponse) -> ImmediateResponse {
    let body: &[u8] = response.body.as_ref();
    ImmediateResponse {
        status_code: response.status.map(|s| s.code.max(0) as u32).unwrap_or(0),
        headers: response.headers.map(header_mutation),
        body: body.to_vec(),
        grpc_status: response.grpc_status.map(|s| s.status),
        details: response.details,
    }
}
