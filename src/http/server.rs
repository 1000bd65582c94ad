//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Hold the shared routing table and swap in reloaded tables
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::config::{FilterDocument, GatewayConfig};
use crate::filter::{FilterChain, HttpFilterInvoker};
use crate::http::forward::Forwarder;
use crate::http::handler::gateway_handler;
use crate::http::request::UuidRequestId;
use crate::observability::metrics;
use crate::routing::RoutingTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<RoutingTable>>,
    pub chain: Arc<FilterChain<HttpFilterInvoker>>,
    pub forwarder: Forwarder,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    routes: Arc<ArcSwap<RoutingTable>>,
}

impl GatewayServer {
    /// Create a new server serving `table`.
    pub fn new(config: GatewayConfig, table: RoutingTable) -> Result<Self, reqwest::Error> {
        let routes = Arc::new(ArcSwap::from_pointee(table));
        let invoker = HttpFilterInvoker::new(config.filter_timeout)?;

        let state = AppState {
            routes: routes.clone(),
            chain: Arc::new(FilterChain::new(invoker)),
            forwarder: Forwarder::new(config.upstream_timeout),
            max_body_bytes: config.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            routes,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(config.request_timeout)),
            )
    }

    /// The router, for serving on a custom listener or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live routing table.
    pub fn routes(&self) -> Arc<ArcSwap<RoutingTable>> {
        self.routes.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Documents received on `updates` replace the routing table; the server
    /// stops when `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        updates: mpsc::UnboundedReceiver<FilterDocument>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.load().route_count(),
            default_destination = %self.config.default_destination,
            "HTTP server starting"
        );

        tokio::spawn(apply_updates(
            self.routes.clone(),
            self.config.default_destination.clone(),
            updates,
        ));

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Rebuild and swap the routing table for every document received.
async fn apply_updates(
    routes: Arc<ArcSwap<RoutingTable>>,
    default_destination: Url,
    mut updates: mpsc::UnboundedReceiver<FilterDocument>,
) {
    while let Some(document) = updates.recv().await {
        match RoutingTable::build(&document, default_destination.clone()) {
            Ok(table) => {
                let count = table.route_count();
                routes.store(Arc::new(table));
                metrics::record_config_reload(true);
                tracing::info!(routes = count, "Routing table reloaded");
            }
            Err(e) => {
                metrics::record_config_reload(false);
                tracing::error!(error = %e, "Rejected reloaded filter document");
            }
        }
    }
}
