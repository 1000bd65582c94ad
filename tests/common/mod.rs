//! Shared utilities for integration testing: mock filters, an echoing
//! backend and a gateway running on ephemeral ports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_filter_proxy::config::parse_document;
use api_filter_proxy::{FilterDocument, GatewayConfig, GatewayServer, RoutingTable, Shutdown};
use axum::{
    body::Bytes,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A request as seen by a mock service.
#[derive(Debug, Clone)]
pub struct Seen {
    pub headers: HeaderMap,
    pub body: Value,
}

/// A filter that answers every call with a fixed status and JSON reply.
pub struct MockFilter {
    pub addr: SocketAddr,
    pub calls: Arc<AtomicU32>,
    pub seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockFilter {
    pub fn endpoint(&self) -> String {
        format!("http://{}/filter", self.addr)
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Seen {
        self.seen.lock().unwrap().last().cloned().expect("filter was not called")
    }
}

pub async fn start_filter(status: u16, reply: Value) -> MockFilter {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (c, s) = (calls.clone(), seen.clone());
    let router = Router::new().route(
        "/filter",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let (c, s, reply) = (c.clone(), s.clone(), reply.clone());
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                s.lock().unwrap().push(Seen { headers, body });
                (StatusCode::from_u16(status).unwrap(), Json(reply))
            }
        }),
    );

    MockFilter {
        addr: serve(router).await,
        calls,
        seen,
    }
}

/// A filter that answers every call with `status` and the literal `reply`
/// bytes after waiting `delay`. The reply need not be JSON.
pub async fn start_raw_filter(status: u16, reply: &'static str, delay: Duration) -> MockFilter {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (c, s) = (calls.clone(), seen.clone());
    let router = Router::new().route(
        "/filter",
        post(move |headers: HeaderMap, body: Bytes| {
            let (c, s) = (c.clone(), s.clone());
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
                s.lock().unwrap().push(Seen { headers, body });
                tokio::time::sleep(delay).await;
                (
                    StatusCode::from_u16(status).unwrap(),
                    [(header::CONTENT_TYPE, "application/json")],
                    reply,
                )
            }
        }),
    );

    MockFilter {
        addr: serve(router).await,
        calls,
        seen,
    }
}

/// A backend that echoes what it received as JSON.
pub struct EchoBackend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicU32>,
}

impl EchoBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hit_count(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn start_echo_backend(name: &'static str) -> EchoBackend {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let handler = move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            let headers: serde_json::Map<String, Value> = headers
                .iter()
                .map(|(k, v)| (k.to_string(), json!(v.to_str().unwrap_or_default())))
                .collect();
            Json(json!({
                "backend": name,
                "method": method.as_str(),
                "path": uri.path(),
                "query": uri.query(),
                "headers": headers,
                "body": String::from_utf8_lossy(&body),
            }))
        }
    };
    let router = Router::new()
        .route("/", any(handler.clone()))
        .route("/{*path}", any(handler));

    EchoBackend {
        addr: serve(router).await,
        hits,
    }
}

/// A gateway running in the background; shuts down on drop.
pub struct Gateway {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<FilterDocument>,
    shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(document: Value, default_destination: &str) -> Gateway {
    start_gateway_with_filter_timeout(document, default_destination, Duration::from_secs(2)).await
}

pub async fn start_gateway_with_filter_timeout(
    document: Value,
    default_destination: &str,
    filter_timeout: Duration,
) -> Gateway {
    let document = parse_document(&document.to_string()).unwrap();
    let default_destination = Url::parse(default_destination).unwrap();
    let table = RoutingTable::build(&document, default_destination.clone()).unwrap();

    let mut config = GatewayConfig::new(default_destination);
    config.filter_timeout = filter_timeout;
    config.upstream_timeout = Duration::from_secs(5);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::new(config, table).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (updates, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = server.run(listener, rx, server_shutdown).await;
    });

    Gateway {
        addr,
        updates,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
