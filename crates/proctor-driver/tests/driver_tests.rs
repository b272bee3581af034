use std::time::Duration;

use proctor_core::{
    CommonResponse, HttpRequestSpec, ImmediateResponse, ProcessingPhase, ProcessingRequest, ProcessingResponse,
    TrailersResponse,
};
use proctor_driver::{
    CancellationSource, CancellationToken, Driver, DriverConfig, DriverError, ScriptedReply, ScriptedTransport,
    TransportError,
};

/// Answers every phase with the matching empty response.
fn pass_through(request: &ProcessingRequest) -> ScriptedReply {
    ScriptedReply::Respond(match request {
        ProcessingRequest::RequestHeaders { .. } => ProcessingResponse::RequestHeaders(CommonResponse::default()),
        ProcessingRequest::RequestBody { .. } => ProcessingResponse::RequestBody(CommonResponse::default()),
        ProcessingRequest::RequestTrailers { .. } => ProcessingResponse::RequestTrailers(TrailersResponse::default()),
    })
}

fn full_request() -> HttpRequestSpec {
    let mut spec = HttpRequestSpec::new("POST", "/upload");
    spec.scheme = "https".into();
    spec.body = b"payload".to_vec();
    spec.send_body = true;
    spec.trailers.insert("x-checksum".into(), "abc".into());
    spec.send_trailers = true;
    spec
}

#[tokio::test]
async fn test_headers_only_request_ends_stream() {
    let transport = ScriptedTransport::new(pass_through);
    let driver = Driver::new(transport.clone(), DriverConfig::default());

    let result = driver
        .execute(&HttpRequestSpec::new("GET", "/api/v1/users"), &CancellationToken::none())
        .await
        .unwrap();

    assert_eq!(result.phases(), vec![ProcessingPhase::RequestHeaders]);
    let streams = transport.streams();
    assert_eq!(streams.len(), 1);
    assert!(streams[0].closed);
    match &streams[0].requests[0] {
        ProcessingRequest::RequestHeaders { headers, end_of_stream } => {
            assert!(*end_of_stream);
            assert_eq!(headers[0].key, ":method");
            assert_eq!(headers[0].value, "GET");
            assert_eq!(headers[1].value, "/api/v1/users");
        }
        other => panic!("unexpected first request {other:?}"),
    }
}

#[tokio::test]
async fn test_all_phases_in_order_with_end_of_stream_flags() {
    let transport = ScriptedTransport::new(pass_through);
    let driver = Driver::new(transport.clone(), DriverConfig::default());

    let result = driver.execute(&full_request(), &CancellationToken::none()).await.unwrap();
    assert_eq!(
        result.phases(),
        vec![
            ProcessingPhase::RequestHeaders,
            ProcessingPhase::RequestBody,
            ProcessingPhase::RequestTrailers
        ]
    );

    let requests = &transport.streams()[0].requests;
    assert!(matches!(requests[0], ProcessingRequest::RequestHeaders { end_of_stream: false, .. }));
    assert!(matches!(requests[1], ProcessingRequest::RequestBody { end_of_stream: false, .. }));
    assert!(matches!(requests[2], ProcessingRequest::RequestTrailers { .. }));
}

#[tokio::test]
async fn test_body_is_last_without_trailers() {
    let transport = ScriptedTransport::new(pass_through);
    let driver = Driver::new(transport.clone(), DriverConfig::default());
    let mut spec = full_request();
    spec.send_trailers = false;

    let result = driver.execute(&spec, &CancellationToken::none()).await.unwrap();
    assert_eq!(result.len(), 2);
    let requests = &transport.streams()[0].requests;
    assert!(matches!(requests[1], ProcessingRequest::RequestBody { end_of_stream: true, .. }));
}

#[tokio::test]
async fn test_empty_body_is_skipped_even_when_enabled() {
    let transport = ScriptedTransport::new(pass_through);
    let driver = Driver::new(transport.clone(), DriverConfig::default());
    let mut spec = HttpRequestSpec::new("POST", "/");
    spec.send_body = true;

    let result = driver.execute(&spec, &CancellationToken::none()).await.unwrap();
    assert_eq!(result.phases(), vec![ProcessingPhase::RequestHeaders]);
    assert!(matches!(
        transport.streams()[0].requests[0],
        ProcessingRequest::RequestHeaders { end_of_stream: true, .. }
    ));
}

#[tokio::test]
async fn test_immediate_response_stops_early() {
    let transport = ScriptedTransport::new(|_| {
        ScriptedReply::Respond(ProcessingResponse::Immediate(ImmediateResponse {
            status_code: 403,
            body: b"forbidden".to_vec(),
            ..ImmediateResponse::default()
        }))
    });
    let driver = Driver::new(transport.clone(), DriverConfig::default());

    let result = driver.execute(&full_request(), &CancellationToken::none()).await.unwrap();
    assert_eq!(result.phases(), vec![ProcessingPhase::RequestHeaders]);
    let streams = transport.streams();
    assert_eq!(streams[0].requests.len(), 1);
    assert!(streams[0].closed);
}

#[tokio::test]
async fn test_receive_failure_aborts_call() {
    let transport = ScriptedTransport::new(|request| match request {
        ProcessingRequest::RequestBody { .. } => ScriptedReply::Fail(TransportError::Status {
            code: "internal".into(),
            message: "boom".into(),
        }),
        other => pass_through(other),
    });
    let driver = Driver::new(transport.clone(), DriverConfig::default());

    let err = driver.execute(&full_request(), &CancellationToken::none()).await.unwrap_err();
    assert!(matches!(err, DriverError::Receive { phase: ProcessingPhase::RequestBody, .. }));
    assert_eq!(transport.streams()[0].requests.len(), 2);
    assert!(transport.streams()[0].closed);
}

#[tokio::test]
async fn test_stream_end_without_answer() {
    let driver = Driver::new(ScriptedTransport::new(|_| ScriptedReply::End), DriverConfig::default());
    let err = driver
        .execute(&HttpRequestSpec::new("GET", "/"), &CancellationToken::none())
        .await
        .unwrap_err();
    assert_eq!(err, DriverError::UnexpectedEnd { phase: ProcessingPhase::RequestHeaders });
}

#[tokio::test]
async fn test_open_failure() {
    let transport = ScriptedTransport::unavailable(TransportError::Connect("connection refused".into()));
    let driver = Driver::new(transport, DriverConfig::default());
    let err = driver
        .execute(&HttpRequestSpec::new("GET", "/"), &CancellationToken::none())
        .await
        .unwrap_err();
    assert!(matches!(err, DriverError::Open(TransportError::Connect(_))));
}

#[tokio::test(start_paused = true)]
async fn test_receive_timeout() {
    let config = DriverConfig {
        recv_timeout: Some(Duration::from_secs(5)),
    };
    let driver = Driver::new(ScriptedTransport::new(|_| ScriptedReply::Hang), config);
    let err = driver
        .execute(&HttpRequestSpec::new("GET", "/"), &CancellationToken::none())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DriverError::Timeout {
            phase: ProcessingPhase::RequestHeaders,
            after: Duration::from_secs(5)
        }
    );
}

#[tokio::test]
async fn test_cancellation_interrupts_hanging_receive() {
    let driver = Driver::new(ScriptedTransport::new(|_| ScriptedReply::Hang), DriverConfig::default());
    let source = CancellationSource::new();
    let token = source.token();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.cancel();
    });
    let err = driver.execute(&HttpRequestSpec::new("GET", "/"), &token).await.unwrap_err();
    canceller.await.unwrap();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_each_execution_uses_fresh_stream() {
    let transport = ScriptedTransport::new(pass_through);
    let driver = Driver::new(transport.clone(), DriverConfig::default());
    for _ in 0..3 {
        driver
            .execute(&HttpRequestSpec::new("GET", "/"), &CancellationToken::none())
            .await
            .unwrap();
    }
    assert_eq!(transport.opened(), 3);
    assert_eq!(transport.peak_concurrency(), 1);
}
