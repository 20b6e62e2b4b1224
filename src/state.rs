// FILE: src/state.rs

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use serde::Serialize;
use tokio::sync::watch;
use crate::config::IndexConfig;

/// Progress of the scan currently in flight (or the last one).
///
/// `fraction` is local to `directory`: every directory resets its own
/// denominator, so the value is not monotonic across the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ScanProgress {
    Idle,
    Walking { directory: PathBuf, fraction: f64 },
    Persisting { records: usize },
    Complete { records: usize },
    Failed { reason: String },
}

/// Global shared state: the orchestrating context for scans and searches.
pub struct GlobalState {
    pub config: IndexConfig,

    /// Database connection (created lazily by `init_connection`)
    pub db_connection: Arc<Mutex<Option<rusqlite::Connection>>>,

    /// Whether a scan has ever completed against this store.
    /// Seeded from the store at init, set by the Indexer after persistence.
    pub scan_completed: Arc<AtomicBool>,

    /// Guards against overlapping reindex calls from the same process.
    pub scan_in_flight: Arc<AtomicBool>,

    pub progress: watch::Sender<ScanProgress>,
}

/// Shared state wrapper for easy cloning and sharing
pub type SharedState = Arc<RwLock<GlobalState>>;

impl GlobalState {
    pub fn new(config: IndexConfig) -> Self {
        let (progress, _) = watch::channel(ScanProgress::Idle);
        Self {
            config,
            db_connection: Arc::new(Mutex::new(None)),
            scan_completed: Arc::new(AtomicBool::new(false)),
            scan_in_flight: Arc::new(AtomicBool::new(false)),
            progress,
        }
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    pub fn is_index_ready(&self) -> bool {
        self.scan_completed.load(Ordering::Acquire)
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ScanProgress> {
        self.progress.subscribe()
    }

    pub fn publish_progress(&self, progress: ScanProgress) {
        self.progress.send_replace(progress);
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}
