//! Loki push exporter with an explicit start/consume/shutdown lifecycle

use crate::config::{ExporterConfig, TENANT_HEADER};
use crate::encoder::{CONTENT_TYPE_JSON, PayloadEncoder};
use crate::errors::{ExporterError, Result};
use crate::telemetry::Batch;
use crate::transport::{Connector, HttpConnector, PushRequest, PushResponse, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The caller-facing boundary of a logs exporter
#[async_trait]
pub trait LogsExporter: Send + Sync {
    /// Validate configuration and acquire the outbound connection resource
    async fn start(&mut self, token: &CancellationToken) -> Result<()>;

    /// Push one batch; only valid while running
    async fn consume_logs(&self, token: &CancellationToken, batch: Batch) -> Result<()>;

    /// Release the connection resource. Calling it again is a no-op.
    async fn shutdown(&mut self, token: &CancellationToken) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterState {
    Unstarted,
    Running,
    Shutdown,
}

impl ExporterState {
    fn as_str(&self) -> &'static str {
        match self {
            ExporterState::Unstarted => "unstarted",
            ExporterState::Running => "running",
            ExporterState::Shutdown => "shut down",
        }
    }
}

enum Lifecycle {
    Unstarted,
    Running(Arc<dyn Transport>),
    Shutdown,
}

/// Exporter pushing batches to a Loki-compatible push endpoint
pub struct LokiExporter {
    config: ExporterConfig,
    encoder: PayloadEncoder,
    connector: Box<dyn Connector>,
    lifecycle: Lifecycle,
}

impl LokiExporter {
    /// Create an exporter that talks HTTP through reqwest
    pub fn new(config: ExporterConfig) -> Self {
        Self::with_connector(config, HttpConnector)
    }

    /// Create an exporter whose transport is acquired from `connector` on start
    pub fn with_connector(config: ExporterConfig, connector: impl Connector + 'static) -> Self {
        let encoder = PayloadEncoder::new(
            config.resource_attribute_to_label.clone(),
            config.line_format,
        );

        Self {
            config,
            encoder,
            connector: Box::new(connector),
            lifecycle: Lifecycle::Unstarted,
        }
    }

    pub fn state(&self) -> ExporterState {
        match self.lifecycle {
            Lifecycle::Unstarted => ExporterState::Unstarted,
            Lifecycle::Running(_) => ExporterState::Running,
            Lifecycle::Shutdown => ExporterState::Shutdown,
        }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    fn invalid_state(&self, operation: &'static str) -> ExporterError {
        ExporterError::InvalidState {
            operation,
            state: self.state().as_str(),
        }
    }

    fn push_request(&self, body: Vec<u8>) -> PushRequest {
        let mut headers: Vec<(String, String)> = self
            .config
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        headers.push(("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()));

        if let Some(tenant_id) = &self.config.tenant_id {
            headers.push((TENANT_HEADER.to_string(), tenant_id.clone()));
        }

        PushRequest {
            url: self.config.endpoint.clone(),
            headers,
            body,
        }
    }

    /// Handle the HTTP response from the push endpoint
    fn handle_response(&self, response: PushResponse, records: usize) -> Result<()> {
        if (200..300).contains(&response.status) {
            debug!("Push of {} records accepted with status {}", records, response.status);
            return Ok(());
        }

        let reason = match response.status {
            400 => "bad request",
            401 => "unauthorized",
            403 => "forbidden",
            404 => "push endpoint not found",
            413 => "payload too large",
            429 => "rate limited",
            500..=599 => "server error",
            _ => "unexpected response",
        };

        warn!(
            "Push of {} records rejected ({}, status {}): {}",
            records, reason, response.status, response.body
        );

        Err(ExporterError::PushRejected {
            status: response.status,
            body: response.body,
        })
    }
}

#[async_trait]
impl LogsExporter for LokiExporter {
    #[instrument(skip_all)]
    async fn start(&mut self, token: &CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(ExporterError::Cancelled);
        }

        if !matches!(self.lifecycle, Lifecycle::Unstarted) {
            return Err(self.invalid_state("start"));
        }

        self.config.validate().map_err(ExporterError::Config)?;
        let transport = self.connector.connect(&self.config)?;

        self.lifecycle = Lifecycle::Running(transport);
        info!("Loki exporter started, pushing to {}", self.config.endpoint);
        Ok(())
    }

    #[instrument(skip_all, fields(records = batch.len()))]
    async fn consume_logs(&self, token: &CancellationToken, batch: Batch) -> Result<()> {
        let transport = match &self.lifecycle {
            Lifecycle::Running(transport) => Arc::clone(transport),
            _ => return Err(self.invalid_state("consume logs")),
        };

        let body = self.encoder.encode(&batch)?;
        let records = batch.len();
        drop(batch);

        let request = self.push_request(body);

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!("Push of {} records cancelled", records);
                return Err(ExporterError::Cancelled);
            }
            response = transport.send(request) => response?,
        };

        self.handle_response(response, records)
    }

    #[instrument(skip_all)]
    async fn shutdown(&mut self, _token: &CancellationToken) -> Result<()> {
        if let Lifecycle::Running(_) = self.lifecycle {
            info!("Loki exporter shut down");
        }

        self.lifecycle = Lifecycle::Shutdown;
        Ok(())
    }
}
