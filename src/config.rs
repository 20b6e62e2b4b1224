//! Index configuration
//!
//! Loaded from an optional JSON file. Every field has a default, so a missing
//! file (or a partial one) is valid. `HNET_INDEX_DB` overrides the database path.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "config.json";
pub const APP_DIR: &str = "hnet-index";
pub const DB_ENV_VAR: &str = "HNET_INDEX_DB";

/// What happens to stored records that a new scan no longer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanPolicy {
    /// Keep records from earlier scans; new records replace same-key entries.
    #[default]
    Merge,
    /// Replace the whole index with the records of the latest scan.
    Rebuild,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub db_path: PathBuf,
    /// Document extension, without the dot. Matched case-sensitively.
    pub extension: String,
    /// Scheme used for canonical URLs (`<scheme>://<logical path>`).
    pub scheme: String,
    pub default_icon: String,
    pub icon_timeout_ms: u64,
    /// Larger icons are discarded in favour of the default.
    pub max_icon_bytes: usize,
    pub fetch_icons: bool,
    pub max_concurrent_extractions: usize,
    pub policy: ScanPolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: default_data_dir().join("index.db"),
            extension: "html".to_string(),
            scheme: "hnet".to_string(),
            default_icon: "/default-favicon.png".to_string(),
            icon_timeout_ms: 3000,
            max_icon_bytes: 256 * 1024,
            fetch_icons: true,
            max_concurrent_extractions: 8,
            policy: ScanPolicy::Merge,
        }
    }
}

impl IndexConfig {
    /// Load from `path`, or from the default location when `path` is None.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_data_dir().join(CONFIG_FILENAME));

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let parsed: IndexConfig = serde_json::from_str(&raw)?;
            tracing::debug!("[Config] Loaded {}", path.display());
            parsed
        } else {
            tracing::debug!("[Config] No config at {}, using defaults", path.display());
            IndexConfig::default()
        };

        if let Ok(db) = std::env::var(DB_ENV_VAR) {
            if !db.trim().is_empty() {
                config.db_path = PathBuf::from(db);
            }
        }

        Ok(config)
    }

    pub fn icon_timeout(&self) -> Duration {
        Duration::from_millis(self.icon_timeout_ms)
    }

    /// Suffix a file name must end with to be indexed, e.g. `.html`.
    pub fn document_suffix(&self) -> String {
        format!(".{}", self.extension.trim_start_matches('.'))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}
