use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use crate::errors::LabscanError;
use super::{CacheEntry, CacheKey, CacheStore};

const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS assessments (
    host TEXT NOT NULL,
    mode TEXT NOT NULL,
    report_json TEXT NOT NULL,
    retrieved_at TEXT NOT NULL,
    PRIMARY KEY (host, mode)
);

CREATE INDEX IF NOT EXISTS idx_assessments_retrieved ON assessments(retrieved_at);
";

/// On-disk store backed by a single SQLite file.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, LabscanError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| LabscanError::Database(format!("Failed to open cache database: {}", e)))?;

        // WAL so concurrent labscan processes don't block each other's reads
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| LabscanError::Database(format!("Failed to set pragmas: {}", e)))?;

        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, LabscanError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LabscanError::Database(format!("Failed to open in-memory db: {}", e)))?;
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<(), LabscanError> {
        let conn = self.lock()?;
        conn.execute_batch(CREATE_TABLES)
            .map_err(|e| LabscanError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LabscanError> {
        self.conn
            .lock()
            .map_err(|_| LabscanError::Cache("cache connection lock poisoned".into()))
    }
}

impl CacheStore for SqliteStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, LabscanError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT report_json, retrieved_at FROM assessments WHERE host = ?1 AND mode = ?2"
        ).map_err(|e| LabscanError::Cache(format!("Query failed: {}", e)))?;

        let row = stmt.query_row(rusqlite::params![key.host, key.mode], |row: &rusqlite::Row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        });

        let (report_json, retrieved_at) = match row {
            Ok(v) => v,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(LabscanError::Cache(format!("Query error: {}", e))),
        };

        let assessment = serde_json::from_str(&report_json)
            .map_err(|e| LabscanError::Cache(format!("Corrupt cached report for {}: {}", key.host, e)))?;
        let retrieved_at = DateTime::parse_from_rfc3339(&retrieved_at)
            .map_err(|e| LabscanError::Cache(format!("Corrupt cache timestamp for {}: {}", key.host, e)))?
            .with_timezone(&Utc);

        Ok(Some(CacheEntry { assessment, retrieved_at }))
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), LabscanError> {
        let report_json = serde_json::to_string(&entry.assessment)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO assessments (host, mode, report_json, retrieved_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![key.host, key.mode, report_json, entry.retrieved_at.to_rfc3339()],
        ).map_err(|e| LabscanError::Cache(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    fn remove(&self, host: Option<&str>) -> Result<usize, LabscanError> {
        let conn = self.lock()?;
        let affected = match host {
            Some(host) => conn.execute("DELETE FROM assessments WHERE host = ?1", rusqlite::params![host]),
            None => conn.execute("DELETE FROM assessments", []),
        }.map_err(|e| LabscanError::Cache(format!("Delete failed: {}", e)))?;
        Ok(affected)
    }

    fn list(&self) -> Result<Vec<(CacheKey, DateTime<Utc>)>, LabscanError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT host, mode, retrieved_at FROM assessments ORDER BY retrieved_at DESC"
        ).map_err(|e| LabscanError::Cache(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map([], |row: &rusqlite::Row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        }).map_err(|e| LabscanError::Cache(format!("Query error: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (host, mode, retrieved_at) = row.map_err(|e| LabscanError::Cache(format!("Row error: {}", e)))?;
            let retrieved_at = DateTime::parse_from_rfc3339(&retrieved_at)
                .map_err(|e| LabscanError::Cache(format!("Corrupt cache timestamp: {}", e)))?
                .with_timezone(&Utc);
            results.push((CacheKey { host, mode }, retrieved_at));
        }
        Ok(results)
    }
}
