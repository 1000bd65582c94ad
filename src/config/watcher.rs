//! Filter document watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_document;
use crate::config::schema::FilterDocument;
use crate::observability::metrics;

/// A watcher that monitors the filter document for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<FilterDocument>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated documents.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<FilterDocument>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// A sender that pushes documents into the same stream, used by SIGHUP reloads.
    pub fn sender(&self) -> mpsc::UnboundedSender<FilterDocument> {
        self.update_tx.clone()
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned handle must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Filter document change detected, reloading...");
                        reload_into(&path, &tx);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load the document at `path` and push it to `tx`, keeping the current
/// table on failure.
pub fn reload_into(path: &Path, tx: &mpsc::UnboundedSender<FilterDocument>) {
    match load_document(path) {
        Ok(document) => {
            let _ = tx.send(document);
        }
        Err(e) => {
            metrics::record_config_reload(false);
            tracing::error!(
                "Failed to reload filter document: {}. Keeping current routing table.",
                e
            );
        }
    }
}
