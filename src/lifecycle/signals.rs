//! OS signal handling.
//!
//! - SIGINT/SIGTERM trigger graceful shutdown
//! - SIGHUP re-reads the filter document (unix only)

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::watcher::reload_into;
use crate::config::FilterDocument;
use crate::lifecycle::Shutdown;

/// Resolve when SIGINT or (on unix) SIGTERM arrives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Trigger `shutdown` on the first termination signal.
pub fn spawn_shutdown_listener(shutdown: Arc<Shutdown>) {
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Termination signal received, draining");
        shutdown.trigger();
    });
}

/// Reload `path` into `tx` on every SIGHUP until shutdown.
#[cfg(unix)]
pub fn spawn_reload_on_hangup(
    path: PathBuf,
    tx: mpsc::UnboundedSender<FilterDocument>,
    shutdown: &Shutdown,
) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = hangup.recv() => {
                    tracing::info!(path = ?path, "SIGHUP received, reloading filter document");
                    reload_into(&path, &tx);
                }
                _ = stop.recv() => break,
            }
        }
    });
}

#[cfg(not(unix))]
pub fn spawn_reload_on_hangup(
    _path: PathBuf,
    _tx: mpsc::UnboundedSender<FilterDocument>,
    _shutdown: &Shutdown,
) {
}
