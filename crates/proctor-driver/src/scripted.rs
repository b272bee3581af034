use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use proctor_core::{ProcessingRequest, ProcessingResponse};

use crate::transport::{ProcessingStream, ProcessorTransport, TransportError};

/// What a scripted processor does with one request.
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Respond(ProcessingResponse),
    Fail(TransportError),
    /// End the stream without answering.
    End,
    /// Never answer.
    Hang,
}

type Responder = dyn Fn(&ProcessingRequest) -> ScriptedReply + Send + Sync;

/// Requests seen on one stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordedStream {
    pub requests: Vec<ProcessingRequest>,
    pub closed: bool,
}

/// In-memory processor for tests. Each request is answered by a closure.
#[derive(Clone)]
pub struct ScriptedTransport {
    responder: Arc<Responder>,
    open_error: Option<TransportError>,
    latency: Option<Duration>,
    streams: Arc<Mutex<Vec<RecordedStream>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(responder: impl Fn(&ProcessingRequest) -> ScriptedReply + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            open_error: None,
            latency: None,
            streams: Arc::default(),
            active: Arc::default(),
            peak: Arc::default(),
        }
    }

    /// Every stream open fails with `error`.
    pub fn unavailable(error: TransportError) -> Self {
        let mut transport = Self::new(|_| ScriptedReply::End);
        transport.open_error = Some(error);
        transport
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn streams(&self) -> Vec<RecordedStream> {
        lock(&self.streams).clone()
    }

    pub fn opened(&self) -> usize {
        lock(&self.streams).len()
    }

    /// Highest number of streams that were open at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("open_error", &self.open_error)
            .field("latency", &self.latency)
            .field("opened", &self.opened())
            .finish()
    }
}

impl ProcessorTransport for ScriptedTransport {
    type Stream = ScriptedStream;

    async fn open_stream(&self) -> Result<ScriptedStream, TransportError> {
        if let Some(e) = &self.open_error {
            return Err(e.clone());
        }
        let index = {
            let mut streams = lock(&self.streams);
            streams.push(RecordedStream::default());
            streams.len() - 1
        };
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(ScriptedStream {
            index,
            responder: Arc::clone(&self.responder),
            latency: self.latency,
            streams: Arc::clone(&self.streams),
            active: Arc::clone(&self.active),
            pending: VecDeque::new(),
        })
    }
}

pub struct ScriptedStream {
    index: usize,
    responder: Arc<Responder>,
    latency: Option<Duration>,
    streams: Arc<Mutex<Vec<RecordedStream>>>,
    active: Arc<AtomicUsize>,
    pending: VecDeque<ScriptedReply>,
}

impl ProcessingStream for ScriptedStream {
    async fn send(&mut self, request: ProcessingRequest) -> Result<(), TransportError> {
        let reply = (self.responder)(&request);
        if let Some(stream) = lock(&self.streams).get_mut(self.index) {
            if stream.closed {
                return Err(TransportError::Closed);
            }
            stream.requests.push(request);
        }
        self.pending.push_back(reply);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<ProcessingResponse>, TransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.pending.pop_front() {
            Some(ScriptedReply::Respond(response)) => Ok(Some(response)),
            Some(ScriptedReply::Fail(e)) => Err(e),
            Some(ScriptedReply::Hang) => std::future::pending().await,
            Some(ScriptedReply::End) | None => Ok(None),
        }
    }

    fn close_send(&mut self) {
        if let Some(stream) = lock(&self.streams).get_mut(self.index) {
            stream.closed = true;
        }
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
