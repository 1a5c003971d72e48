use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::warn;

use crate::error::StoreError;
use crate::scope::KeyValueScope;

const CREATE_TABLE: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     CREATE TABLE IF NOT EXISTS kv (
         key TEXT PRIMARY KEY,
         value TEXT NOT NULL,
         updated_at TEXT NOT NULL DEFAULT (datetime('now'))
     );";

/// File-backed durable scope.
///
/// The per-browser analog of durable storage: survives process restarts,
/// never cleared by this system. Uses a parking_lot Mutex for synchronous
/// access (rusqlite connections are not Sync).
pub struct SqliteScope {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteScope {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLE)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_owned(),
        })
    }

    /// In-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLE)
            .map_err(|e| StoreError::Database(format!("schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueScope for SqliteScope {
    fn get(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock();
        match conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
            row.get::<_, String>(0)
        }) {
            Ok(value) => Some(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                warn!(key, error = %e, "durable read failed, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let conn = self.conn.lock();
        let _ = conn.execute("DELETE FROM kv WHERE key = ?1", [key]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_set_get() {
        let scope = SqliteScope::in_memory().unwrap();
        assert!(scope.get("visitor").is_none());
        scope.set("visitor", "v-1").unwrap();
        assert_eq!(scope.get("visitor").as_deref(), Some("v-1"));
    }

    #[test]
    fn upsert_replaces_value() {
        let scope = SqliteScope::in_memory().unwrap();
        scope.set("score", "3").unwrap();
        scope.set("score", "8").unwrap();
        assert_eq!(scope.get("score").as_deref(), Some("8"));
    }

    #[test]
    fn remove_deletes_row() {
        let scope = SqliteScope::in_memory().unwrap();
        scope.set("k", "v").unwrap();
        scope.remove("k");
        assert!(scope.get("k").is_none());
    }

    #[test]
    fn open_file_database_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("pulse-store-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("durable.db");

        {
            let scope = SqliteScope::open(&path).unwrap();
            scope.set("visitor", "v-persisted").unwrap();
        }

        let scope = SqliteScope::open(&path).unwrap();
        assert_eq!(scope.get("visitor").as_deref(), Some("v-persisted"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
