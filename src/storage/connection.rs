//! Database connection management
//!
//! Provides one-time initialization of the store and the async entry points
//! (`upsert_all`, `get_all`) used by the Indexer and the Searcher.
//! Works with GlobalState's db_connection field.

use std::sync::{Arc, Mutex};
use std::sync::atomic::Ordering;
use rusqlite::Connection;
use crate::config::ScanPolicy;
use crate::error::{Result, IndexError};
use crate::state::SharedState;
use crate::storage::{Record, Repository};

type ConnectionSlot = Arc<Mutex<Option<Connection>>>;

/// Initialize the database connection in GlobalState
///
/// Opens (or creates) the database at `db_path` and creates the keyspace.
/// Calling it again on an already initialized state is a no-op.
pub fn init_connection(state: &SharedState, db_path: &str) -> Result<()> {
    let (conn_arc, scan_completed) = {
        let state_guard = state.read()
            .map_err(|_| IndexError::State("Poisoned lock".into()))?;
        (Arc::clone(&state_guard.db_connection), Arc::clone(&state_guard.scan_completed))
    };

    let mut conn_guard = conn_arc.lock()
        .map_err(|_| IndexError::State("Poisoned lock".into()))?;
    if conn_guard.is_some() {
        tracing::debug!("[Store] Connection already initialized");
        return Ok(());
    }

    let db_dir = std::path::Path::new(db_path).parent()
        .ok_or_else(|| IndexError::InvalidPath(format!("Invalid database path: {}", db_path)))?;
    if !db_dir.as_os_str().is_empty() {
        std::fs::create_dir_all(db_dir)?;
    }

    let mut conn = Connection::open(db_path)?;

    // WAL lets searches read the last committed scan while a new one is written
    let mode: String = conn.pragma_update_and_check(None, "journal_mode", WAL, |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", NORMAL)?;
    tracing::debug!("[Store] journal_mode={}", mode);

    let completed = {
        let repo = Repository::new(&mut conn);
        repo.initialize()?;
        repo.has_completed_scan()?
    };
    scan_completed.store(completed, Ordering::Release);

    *conn_guard = Some(conn);
    tracing::info!("[Store] Opened index at {} (previous scan: {})", db_path, completed);
    Ok(())
}

/// Get a reference to the database connection Arc<Mutex<Option<Connection>>>
pub fn get_connection(state: &SharedState) -> Result<ConnectionSlot> {
    let state_guard = state.read()
        .map_err(|_| IndexError::State("Poisoned lock".into()))?;
    Ok(Arc::clone(&state_guard.db_connection))
}

/// Run `f` against the repository on the blocking pool.
async fn with_repository<T, F>(state: &SharedState, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Repository<'_>) -> Result<T> + Send + 'static,
{
    let conn_arc = get_connection(state)?;
    tokio::task::spawn_blocking(move || {
        let mut conn_lock = conn_arc.lock()
            .map_err(|_| IndexError::State("Poisoned lock".into()))?;
        let conn = conn_lock.as_mut()
            .ok_or_else(|| IndexError::State("Database not initialized".into()))?;
        let mut repo = Repository::new(conn);
        f(&mut repo)
    })
    .await
    .map_err(|e| IndexError::Other(anyhow::anyhow!("Store task failed: {}", e)))?
}

/// Persist a scan's records as one unit. Succeeds or fails as a whole.
pub async fn upsert_all(state: &SharedState, records: Vec<Record>, policy: ScanPolicy) -> Result<usize> {
    let count = with_repository(state, move |repo| repo.upsert_records(&records, policy)).await?;
    tracing::debug!("[Store] Upserted {} records ({:?})", count, policy);
    Ok(count)
}

/// Every stored record, in unspecified order.
pub async fn get_all(state: &SharedState) -> Result<Vec<Record>> {
    with_repository(state, |repo| repo.get_all_records()).await
}

pub async fn clear(state: &SharedState) -> Result<usize> {
    with_repository(state, |repo| repo.clear()).await
}

pub async fn record_count(state: &SharedState) -> Result<u64> {
    with_repository(state, |repo| repo.record_count()).await
}

// SQL pragma constants
const WAL: &str = "WAL";
const NORMAL: &str = "NORMAL";
