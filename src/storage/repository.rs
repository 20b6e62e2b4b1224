// FILE: src/storage/repository.rs
use rusqlite::{params, Connection, Row};
use crate::config::ScanPolicy;
use crate::error::{Result, IndexError};
use crate::storage::{Icon, Record};

const LAST_SCAN_KEY: &str = "last_scan_completed_at";

pub struct Repository<'a> {
    conn: &'a mut Connection,
}

impl<'a> Repository<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// Create the keyspace. Safe to call on an initialized database.
    pub fn initialize(&self) -> Result<()> {
        // 1. The index itself, keyed by canonical URL
        self.conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS search_index (
                canonical_url TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                http_url TEXT NOT NULL,
                icon_data BLOB,
                icon_ref TEXT,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
        "#).map_err(IndexError::Database)?;

        // 2. Bookkeeping (scan completion marker)
        self.conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS system_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
        "#).map_err(IndexError::Database)?;

        Ok(())
    }

    /// Write a scan's records and its completion marker in one transaction.
    ///
    /// Records are applied in order, so a later record wins over an earlier
    /// one with the same key. Under `ScanPolicy::Rebuild` every existing row
    /// is removed first.
    pub fn upsert_records(&mut self, records: &[Record], policy: ScanPolicy) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            if policy == ScanPolicy::Rebuild {
                let removed = tx.execute("DELETE FROM search_index", [])?;
                tracing::debug!("[Store] Rebuild: cleared {} existing records", removed);
            }

            let mut stmt = tx.prepare(
                "INSERT INTO search_index (canonical_url, title, description, http_url, icon_data, icon_ref)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(canonical_url) DO UPDATE SET
                     title = excluded.title,
                     description = excluded.description,
                     http_url = excluded.http_url,
                     icon_data = excluded.icon_data,
                     icon_ref = excluded.icon_ref,
                     updated_at = CURRENT_TIMESTAMP"
            )?;
            for record in records {
                let (icon_data, icon_ref) = match &record.icon {
                    Icon::Fetched { data } => (Some(data.as_slice()), None),
                    Icon::Default { reference } => (None, Some(reference.as_str())),
                };
                stmt.execute(params![
                    record.canonical_url,
                    record.title,
                    record.description,
                    record.http_url,
                    icon_data,
                    icon_ref,
                ])?;
            }

            tx.execute(
                "INSERT INTO system_config (key, value) VALUES (?1, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = CURRENT_TIMESTAMP",
                params![LAST_SCAN_KEY],
            )?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn get_all_records(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT canonical_url, title, description, http_url, icon_data, icon_ref FROM search_index"
        )?;
        let rows = stmt.query_map([], record_from_row)?;
        let mut results = Vec::new();
        for r in rows { results.push(r?); }
        Ok(results)
    }

    pub fn record_count(&self) -> Result<u64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM search_index", [], |row| row.get(0))?)
    }

    /// Remove every record. The scan completion marker is kept.
    pub fn clear(&self) -> Result<usize> {
        let rows = self.conn.execute("DELETE FROM search_index", [])
            .map_err(IndexError::Database)?;
        Ok(rows)
    }

    pub fn has_completed_scan(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM system_config WHERE key = ?1",
            params![LAST_SCAN_KEY],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let icon_data: Option<Vec<u8>> = row.get(4)?;
    let icon_ref: Option<String> = row.get(5)?;
    let icon = match icon_data {
        Some(data) => Icon::Fetched { data },
        None => Icon::Default { reference: icon_ref.unwrap_or_default() },
    };
    Ok(Record {
        canonical_url: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        http_url: row.get(3)?,
        icon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, title: &str) -> Record {
        Record {
            title: title.to_string(),
            description: format!("About {}", title.to_lowercase()),
            canonical_url: format!("hnet://{}", path),
            http_url: format!("https://{}", path),
            icon: Icon::Default { reference: "/default-favicon.png".to_string() },
        }
    }

    fn open() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        Repository::new(&mut conn).initialize().unwrap();
        conn
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut conn = open();
        let mut repo = Repository::new(&mut conn);
        repo.upsert_records(&[record("a/page.html", "Cats")], ScanPolicy::Merge).unwrap();
        repo.initialize().unwrap();
        assert_eq!(repo.record_count().unwrap(), 1);
    }

    #[test]
    fn upserting_twice_keeps_one_entry() {
        let mut conn = open();
        let mut repo = Repository::new(&mut conn);
        let cats = record("a/page.html", "Cats");
        repo.upsert_records(&[cats.clone()], ScanPolicy::Merge).unwrap();
        repo.upsert_records(&[cats.clone()], ScanPolicy::Merge).unwrap();

        assert_eq!(repo.record_count().unwrap(), 1);
        assert_eq!(repo.get_all_records().unwrap(), vec![cats]);
    }

    #[test]
    fn later_record_in_batch_wins() {
        let mut conn = open();
        let mut repo = Repository::new(&mut conn);
        repo.upsert_records(
            &[record("a/page.html", "Cats"), record("a/page.html", "Dogs")],
            ScanPolicy::Merge,
        ).unwrap();

        let all = repo.get_all_records().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Dogs");
    }

    #[test]
    fn merge_retains_untouched_keys_and_rebuild_drops_them() {
        let mut conn = open();
        let mut repo = Repository::new(&mut conn);
        repo.upsert_records(
            &[record("a/page.html", "Cats"), record("b/page.html", "Birds")],
            ScanPolicy::Merge,
        ).unwrap();

        repo.upsert_records(&[record("a/page.html", "Cats")], ScanPolicy::Merge).unwrap();
        assert_eq!(repo.record_count().unwrap(), 2);

        repo.upsert_records(&[record("a/page.html", "Cats")], ScanPolicy::Rebuild).unwrap();
        assert_eq!(repo.record_count().unwrap(), 1);
        assert_eq!(repo.get_all_records().unwrap()[0].canonical_url, "hnet://a/page.html");
    }

    #[test]
    fn fetched_icon_round_trips_through_blob_column() {
        let mut conn = open();
        let mut repo = Repository::new(&mut conn);
        let mut rec = record("a/page.html", "Cats");
        rec.icon = Icon::Fetched { data: vec![0, 1, 2, 255] };
        repo.upsert_records(&[rec.clone()], ScanPolicy::Merge).unwrap();

        assert_eq!(repo.get_all_records().unwrap()[0].icon, rec.icon);
    }

    #[test]
    fn completion_marker_written_with_batch_and_survives_clear() {
        let mut conn = open();
        let mut repo = Repository::new(&mut conn);
        assert!(!repo.has_completed_scan().unwrap());

        repo.upsert_records(&[], ScanPolicy::Merge).unwrap();
        assert!(repo.has_completed_scan().unwrap());

        repo.upsert_records(&[record("a/page.html", "Cats")], ScanPolicy::Merge).unwrap();
        assert_eq!(repo.clear().unwrap(), 1);
        assert_eq!(repo.record_count().unwrap(), 0);
        assert!(repo.has_completed_scan().unwrap());
    }
}
