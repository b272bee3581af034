use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ADDRESS: &str = "localhost:50051";

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("--target and --unix-socket are mutually exclusive")]
    AddressAndSocket,
    #[error("TLS cannot be used with a Unix socket")]
    TlsOverSocket,
    #[error("TLS options given without enabling TLS")]
    TlsOptionsWithoutTls,
    #[error("client certificate and key must be given together")]
    IncompleteIdentity,
    #[error("read {path}: {source}")]
    TlsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid endpoint {endpoint}: {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsTarget {
    pub address: String,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub ca_cert: Option<PathBuf>,
    /// Overrides the server name checked against the certificate.
    pub domain: Option<String>,
}

/// Where the processor listens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportTarget {
    Tcp { address: String },
    Unix { path: PathBuf },
    Tls(TlsTarget),
}

impl Default for TransportTarget {
    fn default() -> Self {
        TransportTarget::Tcp {
            address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

impl std::fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportTarget::Tcp { address } => write!(f, "{address}"),
            TransportTarget::Unix { path } => write!(f, "unix://{}", path.display()),
            TransportTarget::Tls(tls) => write!(f, "{} (tls)", tls.address),
        }
    }
}

/// Target options as they appear in `proctor.toml` and on the command line.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unix_socket: Option<String>,
    #[serde(default)]
    pub tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_domain: Option<String>,
}

impl TargetConfig {
    /// Values set in `other` win.
    pub fn merged(&self, other: &TargetConfig) -> TargetConfig {
        TargetConfig {
            address: other.address.clone().or_else(|| self.address.clone()),
            unix_socket: other.unix_socket.clone().or_else(|| self.unix_socket.clone()),
            tls: self.tls || other.tls,
            tls_cert: other.tls_cert.clone().or_else(|| self.tls_cert.clone()),
            tls_key: other.tls_key.clone().or_else(|| self.tls_key.clone()),
            tls_ca: other.tls_ca.clone().or_else(|| self.tls_ca.clone()),
            tls_domain: other.tls_domain.clone().or_else(|| self.tls_domain.clone()),
        }
    }

    pub fn resolve(&self) -> Result<TransportTarget, TargetError> {
        let has_tls_files = self.tls_cert.is_some() || self.tls_key.is_some() || self.tls_ca.is_some();

        if let Some(socket) = &self.unix_socket {
            if self.address.is_some() {
                return Err(TargetError::AddressAndSocket);
            }
            if self.tls || has_tls_files {
                return Err(TargetError::TlsOverSocket);
            }
            return Ok(TransportTarget::Unix { path: expand(socket) });
        }

        let address = self.address.clone().unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        if !self.tls {
            if has_tls_files {
                return Err(TargetError::TlsOptionsWithoutTls);
            }
            return Ok(TransportTarget::Tcp { address });
        }

        if self.tls_cert.is_some() != self.tls_key.is_some() {
            return Err(TargetError::IncompleteIdentity);
        }
        Ok(TransportTarget::Tls(TlsTarget {
            address,
            client_cert: self.tls_cert.as_deref().map(expand),
            client_key: self.tls_key.as_deref().map(expand),
            ca_cert: self.tls_ca.as_deref().map(expand),
            domain: self.tls_domain.clone(),
        }))
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
