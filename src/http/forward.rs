//! Forwarding to destinations.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the destination base URL
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Stream the destination's response back to the client
//!
//! # Design Decisions
//! - One pooled hyper client shared by all requests
//! - Only the response head is bounded by the upstream timeout; bodies stream
//!   frame by frame so long-lived responses keep flowing
//! - Connection failures map to 502, deadline to 504

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, Method, Request, Uri,
    },
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::{Position, Url};

use crate::http::response::ProxyError;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Failure to hand a request to its destination.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid destination URI {0}")]
    Uri(String),
    #[error("failed to build destination request: {0}")]
    Build(#[from] axum::http::Error),
    #[error("destination unreachable: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
    #[error("destination did not respond within {0:?}")]
    Timeout(Duration),
}

impl From<ForwardError> for ProxyError {
    fn from(err: ForwardError) -> Self {
        let status = match &err {
            ForwardError::Uri(_) | ForwardError::Build(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
            ForwardError::Upstream(_) => axum::http::StatusCode::BAD_GATEWAY,
            ForwardError::Timeout(_) => axum::http::StatusCode::GATEWAY_TIMEOUT,
        };
        ProxyError::new(status, err.to_string())
    }
}

/// Sends requests to destinations over a shared client.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }

    /// Forward a request to `destination`, keeping the original method,
    /// path and query.
    pub async fn forward(
        &self,
        method: Method,
        original: &Uri,
        mut headers: HeaderMap,
        body: Body,
        destination: &Url,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response, ForwardError> {
        let uri = destination_uri(destination, original)?;

        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut headers, addr);
        }

        tracing::debug!(method = %method, uri = %uri, "Forwarding to destination");

        let mut request = Request::builder().method(method).uri(uri).body(body)?;
        *request.headers_mut() = headers;

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| ForwardError::Timeout(self.timeout))??;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Join the destination base URL with the inbound path and query.
pub fn destination_uri(base: &Url, original: &Uri) -> Result<Uri, ForwardError> {
    let path = join_paths(base.path(), original.path());
    let query = match (base.query().filter(|q| !q.is_empty()), original.query().filter(|q| !q.is_empty())) {
        (Some(a), Some(b)) => format!("?{}&{}", a, b),
        (Some(q), None) | (None, Some(q)) => format!("?{}", q),
        (None, None) => String::new(),
    };
    let authority = &base[Position::BeforeHost..Position::AfterPort];
    let raw = format!("{}://{}{}{}", base.scheme(), authority, path, query);
    raw.parse().map_err(|_| ForwardError::Uri(raw))
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Remove connection-scoped headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
