use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::ScanStore;
use crate::models::Scan;

/// Single writer per scan. Snapshots are written in the order they were queued;
/// a burst of queued snapshots collapses into its newest member.
pub struct Persister {
    tx: Option<mpsc::UnboundedSender<Scan>>,
    handle: Option<JoinHandle<()>>,
}

impl Persister {
    pub fn spawn(store: Option<Arc<dyn ScanStore>>) -> Self {
        let Some(store) = store else {
            return Self { tx: None, handle: None };
        };
        let (tx, mut rx) = mpsc::unbounded_channel::<Scan>();
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(mut latest) = rx.blocking_recv() {
                while let Ok(next) = rx.try_recv() {
                    latest = next;
                }
                match store.put(&latest) {
                    Ok(()) => debug!(scan_id = %latest.id, progress = latest.progress, "Scan persisted"),
                    Err(e) => warn!(scan_id = %latest.id, error = %e, "Failed to persist scan"),
                }
            }
        });
        Self { tx: Some(tx), handle: Some(handle) }
    }

    /// Queue a snapshot without waiting for the write.
    pub fn save(&self, scan: Scan) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(scan);
        }
    }

    /// Close the queue and wait until every queued snapshot is written.
    pub async fn flush(mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Persistence writer panicked");
            }
        }
    }
}
