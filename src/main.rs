//! API filter gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                     GATEWAY                          │
//!   Client Request     │  ┌─────────┐    ┌──────────────┐    ┌─────────────┐  │
//!   ───────────────────┼─▶│  http   │───▶│   routing    │───▶│   filter    │──┼──▶ Pre-filter
//!                      │  │ server  │    │    table     │    │   chain     │◀─┼─── services
//!                      │  └─────────┘    └──────────────┘    └──────┬──────┘  │
//!                      │                                            ▼         │
//!   Client Response    │  ┌─────────┐                        ┌─────────────┐  │
//!   ◀──────────────────┼──│response │◀───────────────────────│  forwarder  │◀─┼─── Destination
//!                      │  └─────────┘                        └─────────────┘  │
//!                      │                                                      │
//!                      │  config (load/validate/watch) · observability ·      │
//!                      │  lifecycle (signals/shutdown)                        │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

use api_filter_proxy::config::watcher::ConfigWatcher;
use api_filter_proxy::config::{load_document, GatewayConfig, LogFormat};
use api_filter_proxy::lifecycle::signals;
use api_filter_proxy::observability::{logging, metrics};
use api_filter_proxy::{GatewayServer, RoutingTable, Shutdown};

#[derive(Parser)]
#[command(name = "api-filter-proxy")]
#[command(about = "HTTP gateway that runs requests through external pre-filters", long_about = None)]
struct Cli {
    /// Path to the filter document (JSON)
    #[arg(short, long, env = "API_FILTER_CONFIG")]
    config: PathBuf,

    /// Destination for requests without an explicit one
    #[arg(long, env = "DEFAULT_DESTINATION")]
    default_destination: Option<Url>,

    /// Fallback when no default destination is given
    #[arg(long, env = "CATTLE_URL")]
    cattle_url: Option<Url>,

    #[arg(short, long, default_value = "0.0.0.0:8091")]
    listen: String,

    #[arg(long, default_value_t = 10)]
    filter_timeout_secs: u64,

    #[arg(long, default_value_t = 60)]
    upstream_timeout_secs: u64,

    #[arg(long, default_value_t = 120)]
    request_timeout_secs: u64,

    #[arg(long, default_value_t = 1024 * 1024)]
    max_body_bytes: usize,

    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatArg,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,

    /// Reload the filter document when it changes
    #[arg(long)]
    watch: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format.into());

    tracing::info!("api-filter-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let default_destination = match cli.default_destination.or(cli.cattle_url) {
        Some(url) => url,
        None => return Err("either --default-destination or --cattle-url must be set".into()),
    };

    let mut config = GatewayConfig::new(default_destination);
    config.bind_address = cli.listen;
    config.filter_timeout = Duration::from_secs(cli.filter_timeout_secs);
    config.upstream_timeout = Duration::from_secs(cli.upstream_timeout_secs);
    config.request_timeout = Duration::from_secs(cli.request_timeout_secs);
    config.max_body_bytes = cli.max_body_bytes;
    config.metrics_address = cli.metrics_address.map(|a| a.to_string());
    config.log_format = cli.log_format.into();

    let document = load_document(&cli.config).map_err(|e| {
        tracing::error!(path = ?cli.config, error = %e, "Failed to load filter document");
        e
    })?;
    let table = RoutingTable::build(&document, config.default_destination.clone())?;

    tracing::info!(
        bind_address = %config.bind_address,
        prefilters = document.prefilters.len(),
        destinations = document.destinations.len(),
        default_destination = %config.default_destination,
        "Configuration loaded"
    );

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_shutdown_listener(shutdown.clone());

    // The watcher handle must outlive the server for events to keep flowing.
    let (_watcher, updates) = if cli.watch {
        let (watcher, updates) = ConfigWatcher::new(&cli.config);
        signals::spawn_reload_on_hangup(cli.config.clone(), watcher.sender(), &shutdown);
        (Some(watcher.run()?), updates)
    } else {
        let (tx, updates) = mpsc::unbounded_channel();
        signals::spawn_reload_on_hangup(cli.config.clone(), tx, &shutdown);
        (None, updates)
    };

    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = GatewayServer::new(config, table)?;
    server.run(listener, updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
