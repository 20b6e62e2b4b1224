// FILE: src/engine/mod.rs
pub mod extractor;
pub mod favicon;
pub mod indexer;
pub mod searcher;
pub mod walker;

pub use extractor::{Extractor, RecordUrls};
pub use favicon::{HttpIconFetcher, IconFetcher, OfflineIconFetcher};
pub use indexer::Indexer;
pub use searcher::Searcher;
pub use walker::{Walker, WalkEvent};

use std::sync::Arc;
use crate::config::IndexConfig;
use crate::error::Result;

/// Icon fetcher selected by `fetch_icons`.
pub fn icon_fetcher(config: &IndexConfig) -> Result<Arc<dyn IconFetcher>> {
    if config.fetch_icons {
        Ok(Arc::new(HttpIconFetcher::new(config.icon_timeout(), config.max_icon_bytes)?))
    } else {
        Ok(Arc::new(OfflineIconFetcher))
    }
}
