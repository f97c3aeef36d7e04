use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::migration::migrate_session;
use super::store::SessionStore;
use crate::schedule::Debouncer;
use crate::session::LectureSession;

/// Debounced, serialized writes of session snapshots
///
/// Failures are logged and never returned; the caller's in-memory session
/// stays authoritative.
///
/// Every snapshot gets a revision when it is handed over. The write lock holds
/// the last revision written, and a snapshot older than that is dropped, so a
/// background save that loses the race to `flush` cannot overwrite it.
pub struct SessionSaver {
    store: Arc<dyn SessionStore>,
    debouncer: Debouncer,
    next_revision: AtomicU64,
    written: Arc<Mutex<u64>>,
}

impl SessionSaver {
    pub fn new(store: Arc<dyn SessionStore>, debounce: Duration) -> Self {
        Self {
            store,
            debouncer: Debouncer::new(debounce),
            next_revision: AtomicU64::new(1),
            written: Arc::new(Mutex::new(0)),
        }
    }

    fn revision(&self) -> u64 {
        self.next_revision.fetch_add(1, Ordering::SeqCst)
    }

    /// Restart the quiet period; `on_due` runs once it elapses without
    /// another change. The owner typically takes a snapshot there and hands
    /// it to [`SessionSaver::spawn_save`].
    pub fn mark_dirty<F>(&mut self, on_due: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.debouncer.schedule(on_due);
    }

    /// Debounce a snapshot taken now
    pub fn schedule(&mut self, snapshot: LectureSession) {
        let store = Arc::clone(&self.store);
        let written = Arc::clone(&self.written);
        let revision = self.revision();
        self.debouncer.schedule(async move {
            save(store, written, revision, snapshot).await;
        });
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Write in the background, after any save already in flight
    pub fn spawn_save(&self, snapshot: LectureSession) -> JoinHandle<bool> {
        let store = Arc::clone(&self.store);
        let written = Arc::clone(&self.written);
        tokio::spawn(save(store, written, self.revision(), snapshot))
    }

    /// Cancel any pending debounced save and write immediately. Saves handed
    /// over earlier can no longer replace this snapshot.
    pub async fn flush(&mut self, snapshot: LectureSession) -> bool {
        if self.debouncer.cancel() {
            debug!("Flush superseded a pending save");
        }
        let revision = self.revision();
        save(Arc::clone(&self.store), Arc::clone(&self.written), revision, snapshot).await
    }
}

async fn save(
    store: Arc<dyn SessionStore>,
    written: Arc<Mutex<u64>>,
    revision: u64,
    snapshot: LectureSession,
) -> bool {
    let mut last_written = written.lock().await;
    if revision < *last_written {
        debug!(
            "Skipped stale snapshot of {} (revision {} < {})",
            snapshot.id, revision, *last_written
        );
        return true;
    }

    let (snapshot, _) = migrate_session(snapshot).await;

    match store.update(&snapshot).await {
        Ok(()) => {
            *last_written = revision;
            debug!("Saved session {} to {}", snapshot.id, store.name());
            true
        }
        Err(e) => {
            error!("Failed to save session {}: {:#}", snapshot.id, e);
            false
        }
    }
}
