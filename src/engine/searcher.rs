// FILE: src/engine/searcher.rs
use std::collections::HashSet;
use crate::state::SharedState;
use crate::error::{Result, IndexError};
use crate::storage::{self, Record};

pub struct Searcher;

impl Searcher {
    /// Case-insensitive substring search over titles and descriptions.
    ///
    /// A blank query, or a store that has never completed a scan, returns no
    /// results without touching the store. Results come back in store order.
    pub async fn search(state: &SharedState, query: &str) -> Result<Vec<Record>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let ready = {
            let state_guard = state.read().map_err(|_| IndexError::State("Poisoned lock".into()))?;
            state_guard.is_index_ready()
        };
        if !ready {
            tracing::debug!("[Searcher] Index not ready, ignoring '{}'", needle);
            return Ok(Vec::new());
        }

        let records = match storage::get_all(state).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("[Searcher] Store read failed for '{}': {}", needle, e);
                return Err(e);
            }
        };

        let results = Self::filter_matches(records, &needle);
        tracing::info!("[Searcher] Completed search for '{}' ({} results)", needle, results.len());
        Ok(results)
    }

    /// Keep records whose title or description contains `needle` (already
    /// lower-cased), dropping repeats of the same (title, canonical URL).
    pub fn filter_matches(records: Vec<Record>, needle: &str) -> Vec<Record> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        records
            .into_iter()
            .filter(|r| {
                r.title.to_lowercase().contains(needle) || r.description.to_lowercase().contains(needle)
            })
            .filter(|r| seen.insert((r.title.clone(), r.canonical_url.clone())))
            .collect()
    }
}
