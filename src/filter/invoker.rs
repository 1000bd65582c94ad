//! Filter invocation over HTTP.
//!
//! # Responsibilities
//! - POST the request snapshot to a filter endpoint as JSON
//! - Return the filter's reply with its HTTP status attached
//! - Attach the filter's secret token and the request id
//!
//! # Design Decisions
//! - One shared, pooled client per process with a bounded per-call timeout
//! - Non-2xx replies are not errors here; the chain interprets the status
//! - An accepting reply that cannot be decoded is a transport fault
//! - Replies to rejections are never decoded; their bodies stay private

use std::future::Future;
use std::time::{Duration, Instant};

use axum::http::StatusCode;

use crate::config::schema::FilterConfig;
use crate::filter::data::{FilterData, FilterReply};
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;

/// Failure to obtain a verdict from a filter.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("request to filter failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("filter did not answer within {0:?}")]
    Timeout(Duration),
    #[error("undecodable filter reply: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Something that can ask a filter for its verdict.
pub trait InvokeFilter: Send + Sync {
    fn invoke(
        &self,
        filter: &FilterConfig,
        input: &FilterData,
        request_id: Option<&str>,
    ) -> impl Future<Output = Result<FilterData, FilterError>> + Send;
}

/// Invokes filters with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFilterInvoker {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFilterInvoker {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("api-filter-proxy/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()?;
        Ok(Self { client, timeout })
    }

    async fn call(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<FilterData, FilterError> {
        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

        tracing::trace!(
            endpoint = %endpoint,
            status = %status,
            payload = %String::from_utf8_lossy(&bytes),
            "Filter reply"
        );

        let reply = if status == StatusCode::OK && !bytes.is_empty() {
            serde_json::from_slice::<Option<FilterReply>>(&bytes)
                .map_err(FilterError::Decode)?
                .unwrap_or_default()
        } else {
            FilterReply::default()
        };
        Ok(reply.into_data(status.as_u16()))
    }

    fn classify(&self, err: reqwest::Error) -> FilterError {
        if err.is_timeout() {
            FilterError::Timeout(self.timeout)
        } else {
            FilterError::Transport(err)
        }
    }
}

impl InvokeFilter for HttpFilterInvoker {
    async fn invoke(
        &self,
        filter: &FilterConfig,
        input: &FilterData,
        request_id: Option<&str>,
    ) -> Result<FilterData, FilterError> {
        let start = Instant::now();
        let endpoint = filter.endpoint.as_str();

        tracing::trace!(endpoint = %endpoint, payload = ?input, "Filter request");

        let mut request = self.client.post(filter.endpoint.clone()).json(input);
        if !filter.secret_token.is_empty() {
            request = request.bearer_auth(&filter.secret_token);
        }
        if let Some(id) = request_id {
            request = request.header(X_REQUEST_ID, id);
        }

        let result = self.call(request, endpoint).await;

        match &result {
            Ok(reply) => metrics::record_filter_call(endpoint, &reply.status.to_string(), start),
            Err(FilterError::Timeout(_)) => metrics::record_filter_call(endpoint, "timeout", start),
            Err(_) => metrics::record_filter_call(endpoint, "error", start),
        }

        result
    }
}
