//! Channel establishment to the runtime's image service endpoint.
//!
//! Accepted targets:
//! - `unix:///run/containerd/containerd.sock`, `unix:/run/...` or a bare absolute path
//! - `http://host:port`, `https://host:port`
//! - `host:port` (treated as `http://host:port`)

use hyper_util::rt::TokioIo;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

use crate::error::{Error, Result};

/// Parsed image service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Network endpoint, always with a scheme
    Tcp(String),
    /// Local domain socket
    Unix(PathBuf),
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Config(
                "target is null, it should be a remote endpoint or a unix domain socket".to_owned(),
            ));
        }

        if let Some(path) = raw.strip_prefix("unix://") {
            return Self::unix(path);
        }
        if let Some(path) = raw.strip_prefix("unix:") {
            return Self::unix(path);
        }
        if raw.starts_with('/') {
            return Self::unix(raw);
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self::Tcp(raw.to_owned()));
        }

        Ok(Self::Tcp(format!("http://{}", raw)))
    }

    fn unix(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::Config("unix target has an empty socket path".to_owned()));
        }
        Ok(Self::Unix(PathBuf::from(path)))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(uri) => f.write_str(uri),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Open the shared channel. Connects eagerly so a bad endpoint fails at startup.
pub async fn connect(target: &Target, connect_timeout: Duration) -> Result<Channel> {
    let connection_error = |source| Error::Connection {
        target: target.to_string(),
        source,
    };

    tracing::debug!(endpoint = %target, "Dialing image service");

    let channel = match target {
        Target::Tcp(uri) => Endpoint::from_shared(uri.clone())
            .map_err(connection_error)?
            .connect_timeout(connect_timeout)
            .connect()
            .await
            .map_err(connection_error)?,
        Target::Unix(path) => {
            let path = path.clone();
            // The URI is ignored by the connector but must be well formed.
            Endpoint::from_static("http://[::]:50051")
                .connect_timeout(connect_timeout)
                .connect_with_connector(service_fn(move |_: Uri| {
                    let path = path.clone();
                    async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
                }))
                .await
                .map_err(connection_error)?
        }
    };

    tracing::info!(endpoint = %target, "Connected to image service");
    Ok(channel)
}
