use std::future::Future;
use std::sync::Arc;

use proctor_core::{ProcessingRequest, ProcessingResponse};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect to processor failed: {0}")]
    Connect(String),
    #[error("stream failed with status {code}: {message}")]
    Status { code: String, message: String },
    #[error("stream closed")]
    Closed,
}

/// One bidirectional processor stream. Never shared between test cases.
pub trait ProcessingStream: Send {
    fn send(&mut self, request: ProcessingRequest) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// `Ok(None)` when the processor ended the stream.
    fn recv(&mut self) -> impl Future<Output = Result<Option<ProcessingResponse>, TransportError>> + Send;

    /// Half-close: no more requests follow.
    fn close_send(&mut self);
}

/// Factory for processor streams. The underlying connection may be shared
/// by concurrent streams.
pub trait ProcessorTransport: Send + Sync + 'static {
    type Stream: ProcessingStream + 'static;

    fn open_stream(&self) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;
}

impl<T: ProcessorTransport> ProcessorTransport for Arc<T> {
    type Stream = T::Stream;

    fn open_stream(&self) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send {
        (**self).open_stream()
    }
}
