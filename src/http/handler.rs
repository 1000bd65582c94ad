//! The gateway request handler.
//!
//! ```text
//! Received → BodyDecoded → FiltersRunning ─┬→ FiltersPassed → Forwarded
//!                                          ├→ FilterRejected → ErrorWritten
//!                                          └→ TransportFault → ErrorWritten
//! Unmatched ─────────────────────────────────→ Forwarded (default destination, verbatim)
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::filter::data::{headers_to_values, values_to_headers, FilterData};
use crate::http::request::{request_id, X_REQUEST_ID};
use crate::http::response::ProxyError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::RoutingTable;

/// Entry point for every inbound request.
pub async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    // One table snapshot for the whole request, even if a reload lands mid-flight.
    let table = state.routes.load_full();
    let method = request.method().clone();
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let (route_kind, result) = match table.match_route(&method, request.uri().path()) {
        Some(template) => {
            let template = template.to_string();
            ("filtered", dispatch_filtered(&state, &table, &template, request, client_addr).await)
        }
        None => ("unmatched", dispatch_unmatched(&state, &table, request, client_addr).await),
    };

    let response = result.unwrap_or_else(|err| {
        tracing::debug!(status = %err.status, message = %err.message, "Request failed");
        err.into_response()
    });

    metrics::record_request(method.as_str(), response.status().as_u16(), route_kind, start);
    response
}

async fn dispatch_filtered(
    state: &AppState,
    table: &RoutingTable,
    template: &str,
    request: Request<Body>,
    client_addr: Option<SocketAddr>,
) -> Result<Response, ProxyError> {
    tracing::debug!(path = %template, "Request path matched");

    let (parts, body) = request.into_parts();
    let id = request_id(&parts.headers).map(str::to_string);

    let bytes = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| ProxyError::bad_request(format!("Error reading json request body, err: {}", e)))?;
    let body = decode_body(&bytes)?;

    let headers = headers_to_values(&parts.headers).map_err(|e| {
        ProxyError::bad_request(format!("Error reading request headers, {}: value is not UTF-8", e))
    })?;
    let snapshot = FilterData::new(headers, body);
    let passed = state
        .chain
        .run(table, template, &parts.method, snapshot, id.as_deref())
        .await?;

    let mut headers = values_to_headers(&passed.headers)
        .map_err(|e| ProxyError::internal(format!("Filter chain produced an {}", e)))?;

    let payload = if passed.body.is_empty() && bytes.is_empty() {
        Bytes::new()
    } else {
        serde_json::to_vec(&passed.body)
            .map(Bytes::from)
            .map_err(|e| ProxyError::internal(format!("Error encoding request body: {}", e)))?
    };

    headers.remove(header::CONTENT_LENGTH);
    if !payload.is_empty() {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(payload.len()));
    }
    if let Some(id) = id.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(X_REQUEST_ID, id);
    }

    let response = state
        .forwarder
        .forward(
            parts.method,
            &parts.uri,
            headers,
            Body::from(payload),
            &passed.destination,
            client_addr,
        )
        .await?;
    Ok(response)
}

async fn dispatch_unmatched(
    state: &AppState,
    table: &RoutingTable,
    request: Request<Body>,
    client_addr: Option<SocketAddr>,
) -> Result<Response, ProxyError> {
    tracing::debug!(path = %request.uri().path(), "Request path not matched, using default destination");

    let (parts, body) = request.into_parts();
    let response = state
        .forwarder
        .forward(
            parts.method,
            &parts.uri,
            parts.headers,
            body,
            table.default_destination(),
            client_addr,
        )
        .await?;
    Ok(response)
}

/// An empty body decodes to an empty map; anything else must be a JSON object.
fn decode_body(bytes: &[u8]) -> Result<Map<String, Value>, ProxyError> {
    if bytes.is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::warn!(error = %e, "Malformed json request body");
        ProxyError::bad_request(format!("Error reading json request body: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_decode_body() {
        assert!(decode_body(b"").unwrap().is_empty());
        assert_eq!(
            Value::Object(decode_body(br#"{"x": 1}"#).unwrap()),
            json!({"x": 1})
        );
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert_eq!(decode_body(b"{oops").unwrap_err().status, StatusCode::BAD_REQUEST);
        assert_eq!(decode_body(b"[1, 2]").unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}
