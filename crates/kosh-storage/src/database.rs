//! SQLite-backed storage

use crate::{migrations, storage::Storage, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// SQLite key/value store
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        // Enable WAL mode
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        tracing::debug!("Storage database ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_database() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::open(dir.path().join("vault.db")).unwrap();
        assert!(storage.list_keys().unwrap().is_empty());
    }

    #[test]
    fn test_set_get_remove() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.set("app_data_abc123", "payload").unwrap();
        assert_eq!(
            storage.get("app_data_abc123").unwrap().as_deref(),
            Some("payload")
        );

        storage.set("app_data_abc123", "updated").unwrap();
        assert_eq!(
            storage.get("app_data_abc123").unwrap().as_deref(),
            Some("updated")
        );

        storage.remove("app_data_abc123").unwrap();
        assert!(storage.get("app_data_abc123").unwrap().is_none());
    }

    #[test]
    fn test_values_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.db");
        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.set("k1", "v1").unwrap();
            storage.set("k2", "v2").unwrap();
        }
        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(storage.list_keys().unwrap(), vec!["k1", "k2"]);
        assert_eq!(storage.get("k2").unwrap().as_deref(), Some("v2"));
    }
}
