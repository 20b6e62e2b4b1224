//! hnet-index: local index and search for marked-up documents
//!
//! - Walker + Extractor (engine) turn a directory tree into records
//! - Store (storage) persists them in SQLite, keyed by canonical URL
//! - Searcher answers substring queries over the stored records

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod storage;

pub use config::{IndexConfig, ScanPolicy};
pub use engine::{Indexer, Searcher};
pub use error::{Result, IndexError};
pub use state::{GlobalState, SharedState, ScanProgress};
pub use storage::{init_connection, Icon, Record};
