// FILE: src/engine/indexer.rs
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use crate::config::{IndexConfig, ScanPolicy};
use crate::engine::extractor::Extractor;
use crate::engine::favicon::IconFetcher;
use crate::engine::walker::{Walker, WalkEvent, WalkStats};
use crate::error::{Result, IndexError};
use crate::state::{ScanProgress, SharedState};
use crate::storage::{self, Record};

const WALK_CHANNEL_CAPACITY: usize = 64;

pub struct Indexer {
    state: SharedState,
    extractor: Arc<Extractor>,
    config: IndexConfig,
}

impl Indexer {
    pub fn new(state: SharedState, fetcher: Arc<dyn IconFetcher>) -> Result<Self> {
        let config = {
            let state_guard = state.read().map_err(|_| IndexError::State("Poisoned lock".into()))?;
            state_guard.config.clone()
        };
        let extractor = Arc::new(Extractor::new(&config, fetcher));
        Ok(Self { state, extractor, config })
    }

    /// One full scan of `root`:
    /// 1. Walk the tree (blocking pool), streaming documents out
    /// 2. Extract records with bounded concurrency
    /// 3. Resolve duplicate keys (last in traversal order wins)
    /// 4. Persist as one unit, then mark the index ready
    ///
    /// Returns the number of records written. A cancelled or failed scan
    /// leaves the store untouched.
    pub async fn reindex(&self, root: &Path, cancel: &CancellationToken) -> Result<usize> {
        let in_flight = {
            let state_guard = self.state.read().map_err(|_| IndexError::State("Poisoned lock".into()))?;
            Arc::clone(&state_guard.scan_in_flight)
        };
        if in_flight.swap(true, Ordering::AcqRel) {
            return Err(IndexError::State("A scan is already in progress".into()));
        }

        let result = self.run_scan(root, cancel).await;
        in_flight.store(false, Ordering::Release);

        match &result {
            Ok(count) => {
                self.publish(ScanProgress::Complete { records: *count });
                tracing::info!("[Indexer] Scan of {} complete: {} records", root.display(), count);
            }
            Err(e) => {
                self.publish(ScanProgress::Failed { reason: e.to_string() });
                tracing::error!("[Indexer] Scan of {} failed: {}", root.display(), e);
            }
        }
        result
    }

    async fn run_scan(&self, root: &Path, cancel: &CancellationToken) -> Result<usize> {
        tracing::info!("[Indexer] Scanning {}", root.display());

        let (tx, mut rx) = mpsc::channel::<WalkEvent>(WALK_CHANNEL_CAPACITY);
        let walk = Self::spawn_walk(Walker::new(&self.config), root.to_path_buf(), tx, cancel.clone());

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_extractions.max(1)));
        let mut pending: Vec<JoinHandle<Option<Record>>> = Vec::new();

        while let Some(event) = rx.recv().await {
            match event {
                WalkEvent::Document(document) => {
                    let extractor = Arc::clone(&self.extractor);
                    let permit = Arc::clone(&permits).acquire_owned().await
                        .map_err(|e| IndexError::Other(anyhow::anyhow!("Semaphore closed: {}", e)))?;
                    pending.push(tokio::spawn(async move {
                        let _permit = permit;
                        extractor.extract(&document.logical_path, &document.contents).await
                    }));
                }
                WalkEvent::Progress(progress) => {
                    self.publish(ScanProgress::Walking {
                        fraction: progress.fraction(),
                        directory: progress.directory,
                    });
                }
            }
        }

        let stats = walk.await
            .map_err(|e| IndexError::Other(anyhow::anyhow!("Walker task failed: {}", e)))??;

        if cancel.is_cancelled() {
            for handle in pending { handle.abort(); }
            tracing::warn!("[Indexer] Scan of {} cancelled before persistence", root.display());
            return Err(IndexError::Cancelled);
        }

        // Awaited in traversal order so the last document for a key wins.
        let mut extracted = Vec::with_capacity(pending.len());
        for handle in pending {
            match handle.await {
                Ok(Some(record)) => extracted.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!("[Indexer] Extraction task failed: {}", e),
            }
        }
        let records = dedupe_last_wins(extracted);

        tracing::debug!(
            "[Indexer] {} documents read ({} unreadable, {} skipped), {} records",
            stats.documents, stats.unreadable, stats.skipped, records.len()
        );

        if cancel.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        self.persist(records).await
    }

    fn spawn_walk(
        walker: Walker,
        root: PathBuf,
        tx: mpsc::Sender<WalkEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<WalkStats>> {
        tokio::task::spawn_blocking(move || {
            walker.walk(&root, |event| {
                if cancel.is_cancelled() || tx.blocking_send(event).is_err() {
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            })
        })
    }

    async fn persist(&self, records: Vec<Record>) -> Result<usize> {
        let policy: ScanPolicy = self.config.policy;
        self.publish(ScanProgress::Persisting { records: records.len() });

        let count = storage::upsert_all(&self.state, records, policy).await?;

        // Only now may searches see the index as ready.
        let state_guard = self.state.read().map_err(|_| IndexError::State("Poisoned lock".into()))?;
        state_guard.scan_completed.store(true, Ordering::Release);
        Ok(count)
    }

    fn publish(&self, progress: ScanProgress) {
        if let Ok(state_guard) = self.state.read() {
            state_guard.publish_progress(progress);
        }
    }
}

/// Keep one record per canonical URL: the last one's value, at the first
/// one's position.
fn dedupe_last_wins(records: Vec<Record>) -> Vec<Record> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Record> = Vec::with_capacity(records.len());
    for record in records {
        match positions.get(&record.canonical_url) {
            Some(&i) => unique[i] = record,
            None => {
                positions.insert(record.canonical_url.clone(), unique.len());
                unique.push(record);
            }
        }
    }
    unique
}
