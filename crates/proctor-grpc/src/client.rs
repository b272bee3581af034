use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use envoy_types::pb::envoy::service::ext_proc::v3 as pb;
use envoy_types::pb::envoy::service::ext_proc::v3::external_processor_client::ExternalProcessorClient;
use hyper_util::rt::TokioIo;
use proctor_core::{ProcessingRequest, ProcessingResponse};
use proctor_driver::{ProcessingStream, ProcessorTransport, TransportError};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity, Uri};
use tonic::{Status, Streaming};
use tower::service_fn;
use tracing::debug;

use crate::convert::{request_to_wire, response_from_wire};
use crate::target::{TargetError, TlsTarget, TransportTarget};

/// Requests buffered ahead of the processor; the driver never has more than
/// one in flight.
const OUTBOUND_BUFFER: usize = 4;

/// gRPC client for the external processor service.
///
/// The channel connects lazily, so an unreachable processor fails each test
/// on its first exchange instead of failing the run up front.
#[derive(Clone, Debug)]
pub struct GrpcTransport {
    channel: Channel,
    target: TransportTarget,
}

impl GrpcTransport {
    /// Must be called within a tokio runtime.
    pub fn connect(target: &TransportTarget) -> Result<Self, TargetError> {
        let channel = match target {
            TransportTarget::Tcp { address } => endpoint(&format!("http://{address}"))?.connect_lazy(),
            TransportTarget::Unix { path } => unix_channel(path.clone())?,
            TransportTarget::Tls(tls) => {
                let uri = format!("https://{}", tls.address);
                endpoint(&uri)?
                    .tls_config(tls_config(tls)?)
                    .map_err(|source| TargetError::Endpoint { endpoint: uri, source })?
                    .connect_lazy()
            }
        };
        debug!(%target, "processor channel configured");
        Ok(Self {
            channel,
            target: target.clone(),
        })
    }

    pub fn target(&self) -> &TransportTarget {
        &self.target
    }
}

fn endpoint(uri: &str) -> Result<Endpoint, TargetError> {
    Endpoint::from_shared(uri.to_string()).map_err(|source| TargetError::Endpoint {
        endpoint: uri.to_string(),
        source,
    })
}

fn unix_channel(path: PathBuf) -> Result<Channel, TargetError> {
    // The authority is ignored; the connector dials the socket.
    let channel = endpoint("http://[::]:50051")?.connect_with_connector_lazy(service_fn(move |_: Uri| {
        let path = path.clone();
        async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
    }));
    Ok(channel)
}

fn tls_config(tls: &TlsTarget) -> Result<ClientTlsConfig, TargetError> {
    let mut config = ClientTlsConfig::new();
    config = match &tls.ca_cert {
        Some(ca) => config.ca_certificate(Certificate::from_pem(read_pem(ca)?)),
        None => config.with_webpki_roots(),
    };
    if let (Some(cert), Some(key)) = (&tls.client_cert, &tls.client_key) {
        config = config.identity(Identity::from_pem(read_pem(cert)?, read_pem(key)?));
    }
    if let Some(domain) = &tls.domain {
        config = config.domain_name(domain.clone());
    }
    Ok(config)
}

fn read_pem(path: &PathBuf) -> Result<Vec<u8>, TargetError> {
    std::fs::read(path).map_err(|source| TargetError::TlsFile {
        path: path.clone(),
        source,
    })
}

impl ProcessorTransport for GrpcTransport {
    type Stream = GrpcStream;

    async fn open_stream(&self) -> Result<GrpcStream, TransportError> {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let mut client = ExternalProcessorClient::new(self.channel.clone());
        let call: CallFuture = Box::pin(async move { client.process(ReceiverStream::new(rx)).await });
        Ok(GrpcStream {
            outbound: Some(tx),
            call: Some(call),
            inbound: None,
        })
    }
}

type CallFuture = Pin<Box<dyn Future<Output = Result<tonic::Response<Streaming<pb::ProcessingResponse>>, Status>> + Send>>;

/// One `Process` call. The call itself is started on the first receive, once
/// the first request is queued, since processors may hold back response
/// headers until they have seen a request.
pub struct GrpcStream {
    outbound: Option<mpsc::Sender<pb::ProcessingRequest>>,
    call: Option<CallFuture>,
    inbound: Option<Streaming<pb::ProcessingResponse>>,
}

impl ProcessingStream for GrpcStream {
    async fn send(&mut self, request: ProcessingRequest) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        outbound
            .send(request_to_wire(request))
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<ProcessingResponse>, TransportError> {
        if let Some(call) = self.call.take() {
            let response = call.await.map_err(status_error)?;
            self.inbound = Some(response.into_inner());
        }
        let inbound = self.inbound.as_mut().ok_or(TransportError::Closed)?;
        let message = inbound.message().await.map_err(status_error)?;
        Ok(message.map(response_from_wire))
    }

    fn close_send(&mut self) {
        self.outbound = None;
    }
}

fn status_error(status: Status) -> TransportError {
    TransportError::Status {
        code: format!("{:?}", status.code()),
        message: status.message().to_string(),
    }
}
