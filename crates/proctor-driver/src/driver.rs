use std::future::Future;
use std::time::Duration;

use proctor_core::{HeaderEntry, HttpRequestSpec, ProcessingPhase, ProcessingRequest, ProcessingResult};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::transport::{ProcessingStream, ProcessorTransport, TransportError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("failed to open processing stream: {0}")]
    Open(#[source] TransportError),
    #[error("failed to send {phase}: {source}")]
    Send {
        phase: ProcessingPhase,
        #[source]
        source: TransportError,
    },
    #[error("failed to receive response for {phase}: {source}")]
    Receive {
        phase: ProcessingPhase,
        #[source]
        source: TransportError,
    },
    #[error("no response for {phase} within {after:?}")]
    Timeout { phase: ProcessingPhase, after: Duration },
    #[error("cancelled during {phase}")]
    Cancelled { phase: ProcessingPhase },
    #[error("processor ended the stream before answering {phase}")]
    UnexpectedEnd { phase: ProcessingPhase },
}

impl DriverError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DriverError::Cancelled { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverConfig {
    /// Upper bound on every receive. `None` waits indefinitely.
    pub recv_timeout: Option<Duration>,
}

/// Plays one `HttpRequestSpec` against a processor over a fresh stream.
#[derive(Debug)]
pub struct Driver<T> {
    transport: T,
    config: DriverConfig,
}

impl<T: ProcessorTransport> Driver<T> {
    pub fn new(transport: T, config: DriverConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Send the request phases in order and collect one response per phase.
    ///
    /// An immediate response ends the exchange without error. Any transport
    /// failure aborts the call; nothing is retried.
    pub async fn execute(
        &self,
        spec: &HttpRequestSpec,
        cancel: &CancellationToken,
    ) -> Result<ProcessingResult, DriverError> {
        let opened = guard(ProcessingPhase::RequestHeaders, cancel, None, self.transport.open_stream()).await;
        let mut stream = match opened.and_then(|r| r.map_err(DriverError::Open)) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "processing stream unavailable");
                return Err(e);
            }
        };

        let mut result = ProcessingResult::new();
        let outcome = self.drive(&mut stream, spec, cancel, &mut result).await;
        stream.close_send();

        match outcome {
            Ok(()) => Ok(result),
            Err(e) => {
                warn!(error = %e, "processing stream failed");
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        stream: &mut T::Stream,
        spec: &HttpRequestSpec,
        cancel: &CancellationToken,
        result: &mut ProcessingResult,
    ) -> Result<(), DriverError> {
        let body_follows = spec.body_follows();
        let trailers_follow = spec.trailers_follow();

        let headers = ProcessingRequest::RequestHeaders {
            headers: request_headers(spec),
            end_of_stream: !body_follows && !trailers_follow,
        };
        if self.exchange(stream, headers, cancel, result).await? {
            return Ok(());
        }

        if body_follows {
            let body = ProcessingRequest::RequestBody {
                body: spec.body.clone(),
                end_of_stream: !trailers_follow,
            };
            if self.exchange(stream, body, cancel, result).await? {
                return Ok(());
            }
        }

        if trailers_follow {
            let trailers = ProcessingRequest::RequestTrailers {
                trailers: entries(spec.trailers.iter()),
            };
            self.exchange(stream, trailers, cancel, result).await?;
        }

        Ok(())
    }

    /// One send/receive pair. Returns true when the processor short-circuited.
    async fn exchange(
        &self,
        stream: &mut T::Stream,
        request: ProcessingRequest,
        cancel: &CancellationToken,
        result: &mut ProcessingResult,
    ) -> Result<bool, DriverError> {
        let phase = request.phase();
        debug!(%phase, "sending phase");
        guard(phase, cancel, None, stream.send(request))
            .await?
            .map_err(|source| DriverError::Send { phase, source })?;

        let response = guard(phase, cancel, self.config.recv_timeout, stream.recv())
            .await?
            .map_err(|source| DriverError::Receive { phase, source })?
            .ok_or(DriverError::UnexpectedEnd { phase })?;

        debug!(%phase, kind = %response.kind(), "received response");
        let immediate = response.is_immediate();
        result.push(phase, response);
        if immediate {
            debug!(%phase, "immediate response; remaining phases skipped");
        }
        Ok(immediate)
    }
}

/// Pseudo-headers first, then the user headers.
pub fn request_headers(spec: &HttpRequestSpec) -> Vec<HeaderEntry> {
    let mut headers = Vec::with_capacity(spec.headers.len() + 4);
    headers.push(HeaderEntry::new(":method", &spec.method));
    headers.push(HeaderEntry::new(":path", &spec.path));
    if !spec.scheme.is_empty() {
        headers.push(HeaderEntry::new(":scheme", &spec.scheme));
    }
    if !spec.authority.is_empty() {
        headers.push(HeaderEntry::new(":authority", &spec.authority));
    }
    headers.extend(entries(spec.headers.iter()));
    headers
}

fn entries<'a>(map: impl Iterator<Item = (&'a String, &'a String)>) -> Vec<HeaderEntry> {
    map.map(|(k, v)| HeaderEntry::new(k, v)).collect()
}

/// Race `fut` against cancellation and an optional deadline.
async fn guard<F: Future>(
    phase: ProcessingPhase,
    cancel: &CancellationToken,
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, DriverError> {
    let bounded = async {
        match limit {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| DriverError::Timeout { phase, after }),
            None => Ok(fut.await),
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DriverError::Cancelled { phase }),
        out = bounded => out,
    }
}
