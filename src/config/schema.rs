//! Configuration schema definitions.
//!
//! The filter document is the JSON file operators edit; `GatewayConfig`
//! holds the process settings assembled from the command line.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root of the filter document.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct FilterDocument {
    /// Pre-filters, in declaration order.
    #[serde(rename = "Prefilters", alias = "prefilters", default)]
    pub prefilters: Vec<FilterConfig>,

    /// Destination overrides.
    #[serde(rename = "Destinations", alias = "destinations", default)]
    pub destinations: Vec<DestinationConfig>,
}

/// An external pre-filter service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    /// URL the request snapshot is POSTed to.
    pub endpoint: Url,

    /// Credential sent to the filter as a bearer token. Empty means none.
    #[serde(default)]
    pub secret_token: String,

    /// HTTP methods this filter applies to (case-insensitive). Empty means all.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Path templates this filter applies to.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl FilterConfig {
    /// Whether this filter applies to the given request method.
    pub fn applies_to(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}

/// A backend that a set of path templates is forwarded to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DestinationConfig {
    #[serde(rename = "destinationURL", alias = "destinationUrl")]
    pub destination_url: Url,

    #[serde(default)]
    pub paths: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Process-wide gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address (e.g., "0.0.0.0:8091").
    pub bind_address: String,

    /// Where unmatched and destination-less requests go.
    pub default_destination: Url,

    /// Upper bound on a single filter call.
    pub filter_timeout: Duration,

    /// Upper bound on waiting for the destination's response head.
    pub upstream_timeout: Duration,

    /// Upper bound on producing a response for an inbound request.
    pub request_timeout: Duration,

    /// Largest inbound body that will be buffered for filtering.
    pub max_body_bytes: usize,

    /// Prometheus exporter address, if metrics are enabled.
    pub metrics_address: Option<String>,

    pub log_format: LogFormat,
}

impl GatewayConfig {
    pub fn new(default_destination: Url) -> Self {
        Self {
            bind_address: "0.0.0.0:8091".to_string(),
            default_destination,
            filter_timeout: Duration::from_secs(10),
            upstream_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(120),
            max_body_bytes: 1024 * 1024,
            metrics_address: None,
            log_format: LogFormat::default(),
        }
    }
}
