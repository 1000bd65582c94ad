//! Filter chain execution.

use axum::http::{Method, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use crate::filter::data::{FilterData, HeaderValues};
use crate::filter::invoker::InvokeFilter;
use crate::http::response::ProxyError;
use crate::routing::RoutingTable;

/// Outcome of a chain where every filter accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPassed {
    pub headers: HeaderValues,
    pub body: Map<String, Value>,
    pub destination: Url,
}

/// Runs the filters registered for a template, in order.
#[derive(Debug, Clone)]
pub struct FilterChain<I> {
    invoker: I,
}

impl<I: InvokeFilter> FilterChain<I> {
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    /// Thread `snapshot` through every filter registered for `template` that
    /// applies to `method`.
    ///
    /// Stops at the first transport fault (500) or rejection (the filter's
    /// status). On success the destination is resolved from `table`.
    pub async fn run(
        &self,
        table: &RoutingTable,
        template: &str,
        method: &Method,
        snapshot: FilterData,
        request_id: Option<&str>,
    ) -> Result<FilterPassed, ProxyError> {
        let lookup = table.lookup(template);
        let mut current = FilterData::new(snapshot.headers, snapshot.body);

        tracing::debug!(path = %template, filters = lookup.filters.len(), "Processing pre filters");

        for filter in lookup.filters.iter().filter(|f| f.applies_to(method.as_str())) {
            let endpoint = &filter.endpoint;
            tracing::debug!(path = %template, filter = %endpoint, "Invoking pre filter");

            let reply = match self.invoker.invoke(filter, &current, request_id).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(filter = %endpoint, error = %e, "Filter invocation failed");
                    return Err(ProxyError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Error {} processing the filter {}", e, endpoint),
                    ));
                }
            };

            if reply.status != StatusCode::OK.as_u16() {
                tracing::warn!(filter = %endpoint, status = reply.status, "Filter rejected request");
                let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
                return Err(ProxyError::new(
                    status,
                    format!("Error response while processing the filter {}", endpoint),
                ));
            }

            current.apply(reply);
        }

        tracing::debug!(
            path = %template,
            destination = %lookup.destination,
            "Pre filters passed"
        );

        Ok(FilterPassed {
            headers: current.headers,
            body: current.body,
            destination: lookup.destination.clone(),
        })
    }
}
