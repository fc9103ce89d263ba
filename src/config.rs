//! Configuration for the Loki push exporter

use crate::encoder::LineFormat;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const TENANT_HEADER: &str = "X-Scope-OrgID";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Push API endpoint, e.g. `https://logs.example.net/loki/api/v1/push`
    pub endpoint: String,

    /// Static headers sent with every push (authorization and the like)
    pub headers: BTreeMap<String, String>,

    /// Resource attribute name to label override; an empty override means
    /// "use the attribute's own value"
    pub resource_attribute_to_label: BTreeMap<String, String>,

    /// Tenant sent as `X-Scope-OrgID` on multi-tenant deployments
    pub tenant_id: Option<String>,

    /// HTTP timeout for a single push
    pub timeout: Duration,

    /// How records are rendered into log lines
    pub line_format: LineFormat,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3100/loki/api/v1/push".to_string(),
            headers: BTreeMap::new(),
            resource_attribute_to_label: BTreeMap::from([("instance".to_string(), String::new())]),
            tenant_id: None,
            timeout: Duration::from_secs(10),
            line_format: LineFormat::Body,
        }
    }
}

impl ExporterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ExporterConfig::default();

        if let Some(endpoint) = lookup("LOKI_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Some(headers) = lookup("LOKI_HEADERS") {
            config.headers = parse_pairs(&headers, "LOKI_HEADERS");
        }

        if let Some(labels) = lookup("LOKI_LABELS") {
            config.resource_attribute_to_label = parse_pairs(&labels, "LOKI_LABELS");
        }

        if let Some(tenant_id) = lookup("LOKI_TENANT_ID") {
            if !tenant_id.is_empty() {
                config.tenant_id = Some(tenant_id);
            }
        }

        if let Some(timeout) = lookup("HTTP_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(seconds) => config.timeout = Duration::from_secs(seconds),
                Err(_) => warn!("Ignoring invalid HTTP_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Some(format) = lookup("LOKI_LINE_FORMAT") {
            match format.parse() {
                Ok(line_format) => config.line_format = line_format,
                Err(e) => warn!("Ignoring LOKI_LINE_FORMAT: {}", e),
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| format!("endpoint {} is not a valid URL: {}", self.endpoint, e))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!("endpoint scheme must be http or https, got {}", url.scheme()));
        }

        if url.host_str().is_none() {
            return Err(format!("endpoint {} has no host", self.endpoint));
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| format!("invalid header name: {}", name))?;
            HeaderValue::from_str(value)
                .map_err(|_| format!("invalid value for header {}", name))?;
        }

        if let Some(tenant_id) = &self.tenant_id {
            HeaderValue::from_str(tenant_id)
                .map_err(|_| "tenant_id is not a valid header value".to_string())?;
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Parse `key=value,key=value`; a bare `key` maps to an empty value
fn parse_pairs(raw: &str, variable: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = key.trim();
            if key.is_empty() {
                warn!("Ignoring entry without a key in {}: {}", variable, pair);
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
