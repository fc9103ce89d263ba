//! HTTP transport for push requests

use crate::config::ExporterConfig;
use crate::errors::{ExporterError, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A fully prepared push, ready to hit the wire
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Status and body of whatever the remote answered
#[derive(Debug, Clone)]
pub struct PushResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one push request and reports the raw response.
///
/// Implementations surface network failures as [`ExporterError::Transport`]
/// and leave status interpretation to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PushRequest) -> Result<PushResponse>;
}

/// Acquires a transport when an exporter starts
pub trait Connector: Send + Sync {
    fn connect(&self, config: &ExporterConfig) -> Result<Arc<dyn Transport>>;
}

/// Connector producing reqwest-backed transports
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(&self, config: &ExporterConfig) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(HttpTransport::new(config.timeout)?))
    }
}

/// HTTP transport backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(http_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("loki_push_exporter/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PushRequest) -> Result<PushResponse> {
        let headers = header_map(&request.headers)?;

        debug!("Posting {} bytes to {}", request.body.len(), request.url);

        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        Ok(PushResponse { status, body })
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ExporterError::Config(format!("invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ExporterError::Config(format!("invalid value for header {}", name)))?;
        map.insert(name, value);
    }

    Ok(map)
}
