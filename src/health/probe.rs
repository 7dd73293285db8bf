// ABOUTME: HTTP probe used by health verification.
// ABOUTME: One bounded GET over a fresh HTTP/1.1 connection per attempt.

use super::HealthUrl;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid health URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported scheme {0}: only plain http endpoints can be probed")]
    UnsupportedScheme(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Http(String),
}

/// Issues a single GET and returns the response status code.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn get(&self, url: &HealthUrl, timeout: Duration) -> Result<u16, ProbeError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpProbe;

impl HttpProbe {
    pub fn new() -> Self {
        Self
    }

    async fn request(&self, url: &HealthUrl) -> Result<u16, ProbeError> {
        let stream = TcpStream::connect((url.host(), url.port()))
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| ProbeError::Connect(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("health probe connection closed: {}", e);
            }
        });

        let req = hyper::Request::builder()
            .method("GET")
            .uri(url.path_and_query())
            .header("Host", url.authority())
            .header("User-Agent", concat!("rollout/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProbeError::Http(format!("failed to build request: {}", e)))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ProbeError::Http(e.to_string()))?;
        Ok(resp.status().as_u16())
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn get(&self, url: &HealthUrl, timeout: Duration) -> Result<u16, ProbeError> {
        tokio::time::timeout(timeout, self.request(url))
            .await
            .map_err(|_| ProbeError::Timeout(timeout))?
    }
}
