// FILE: src/storage/mod.rs
pub mod connection;
pub mod repository;
pub mod text_extraction;

// Common exports
pub use connection::{init_connection, get_connection, upsert_all, get_all, clear, record_count};
pub use repository::Repository;
pub use text_extraction::{extract_markers, read_document, DocumentMarkers};

use serde::Serialize;

/// Icon reference attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Icon {
    /// Bytes fetched from `<domain>/favicon.ico`.
    Fetched { data: Vec<u8> },
    /// Fixed fallback resource identifier.
    Default { reference: String },
}

impl Icon {
    pub fn is_default(&self) -> bool {
        matches!(self, Icon::Default { .. })
    }
}

/// One indexed document. `canonical_url` is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub http_url: String,
    pub icon: Icon,
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.title, self.canonical_url)
    }
}
