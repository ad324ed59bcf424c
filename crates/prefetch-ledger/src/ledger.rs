use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::LedgerError;
use crate::record::LedgerRecord;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        size INTEGER NOT NULL,
        path TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        hash TEXT NOT NULL,
        url_hash TEXT NOT NULL,
        downloaded_at DATETIME NOT NULL
    )";

const COLUMNS: &str = "id, size, path, url, hash, url_hash, downloaded_at";

/// A single-connection handle onto the `items` table. The pipeline that
/// owns this ledger is single-threaded (one tick runs to completion before
/// the next starts), so a plain `rusqlite::Connection` is enough — no actor
/// thread or connection pool is needed.
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)
            .map_err(|source| LedgerError::Open { path: path.display().to_string(), source })?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self { conn })
    }

    /// Inserts `record`, or updates the existing row for `record.url` if one
    /// exists. Mirrors the reference `ItemTable.CreateOrUpdate`: lookup by
    /// URL first, then either `UPDATE` (refreshing `downloaded_at`) or
    /// `INSERT`.
    pub fn create_or_update(&self, record: &LedgerRecord) -> Result<i64, LedgerError> {
        if let Some(existing) = self.get_by_url(&record.url)? {
            let downloaded_at = chrono::Utc::now();
            self.conn.execute(
                "UPDATE items SET size = ?1, path = ?2, hash = ?3, url_hash = ?4, downloaded_at = ?5 WHERE url = ?6",
                params![record.size, record.path, record.hash, record.url_hash, downloaded_at, record.url],
            )?;
            tracing::debug!(url = %record.url, id = existing.id, "updated existing ledger row");
            Ok(existing.id.expect("rows read back from the ledger always have an id"))
        } else {
            self.conn.execute(
                "INSERT INTO items (size, path, url, hash, url_hash, downloaded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![record.size, record.path, record.url, record.hash, record.url_hash, record.downloaded_at],
            )?;
            let id = self.conn.last_insert_rowid();
            tracing::debug!(url = %record.url, id, "inserted new ledger row");
            Ok(id)
        }
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<LedgerRecord>, LedgerError> {
        self.conn
            .query_row(&format!("SELECT {COLUMNS} FROM items WHERE url = ?1"), params![url], row_to_record)
            .optional()
            .map_err(LedgerError::from)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Option<LedgerRecord>, LedgerError> {
        self.conn
            .query_row(&format!("SELECT {COLUMNS} FROM items WHERE id = ?1"), params![id], row_to_record)
            .optional()
            .map_err(LedgerError::from)
    }

    pub fn get_all(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        let mut stmt = self.conn.prepare(&format!("SELECT {COLUMNS} FROM items"))?;
        let rows = stmt.query_map([], row_to_record)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(LedgerError::from)
    }

    pub fn delete_by_id(&self, id: i64) -> Result<(), LedgerError> {
        self.conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerRecord> {
    Ok(LedgerRecord {
        id: row.get(0)?,
        size: row.get(1)?,
        path: row.get(2)?,
        url: row.get(3)?,
        hash: row.get(4)?,
        url_hash: row.get(5)?,
        downloaded_at: row.get(6)?,
    })
}
