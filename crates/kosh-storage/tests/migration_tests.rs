//! Migration tests
//!
//! Tests the key/value schema migrations against file-backed databases.

use kosh_storage::{migrations, SqliteStorage, Storage};
use rusqlite::Connection;
use tempfile::{NamedTempFile, TempDir};

/// Helper to get schema as sorted string for comparison
fn get_schema_snapshot(conn: &Connection) -> String {
    let mut stmt = conn
        .prepare(
            "SELECT type, name, sql FROM sqlite_master
             WHERE sql NOT NULL
             ORDER BY type, name",
        )
        .unwrap();

    let rows = stmt
        .query_map([], |row| {
            Ok(format!(
                "{}: {} -- {}",
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?
            ))
        })
        .unwrap();

    rows.collect::<Result<Vec<_>, _>>().unwrap().join("\n")
}

fn kv_columns(conn: &Connection) -> Vec<String> {
    conn.prepare("PRAGMA table_info(kv)")
        .unwrap()
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn test_fresh_migration() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();

    assert_eq!(migrations::get_schema_version(&conn).unwrap(), 2);
    assert_eq!(kv_columns(&conn), vec!["key", "value", "updated_at"]);
}

#[test]
fn test_migration_idempotency() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();
    let first = get_schema_snapshot(&conn);
    migrations::run_migrations(&conn).unwrap();
    let second = get_schema_snapshot(&conn);

    assert_eq!(first, second);
}

#[test]
fn test_upgrade_from_v1_keeps_values() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    // A database written before the updated_at column existed
    conn.execute_batch(
        "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
         INSERT INTO schema_version (version) VALUES (1);
         CREATE TABLE kv (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL);
         INSERT INTO kv (key, value) VALUES ('app_sec_config', 'aa:bb');",
    )
    .unwrap();

    migrations::run_migrations(&conn).unwrap();

    assert_eq!(migrations::get_schema_version(&conn).unwrap(), 2);
    let (value, updated_at): (String, i64) = conn
        .query_row(
            "SELECT value, updated_at FROM kv WHERE key = 'app_sec_config'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(value, "aa:bb");
    assert_eq!(updated_at, 0);
}

#[test]
fn test_storage_stamps_updates() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("vault.db");

    let storage = SqliteStorage::open(&db_path).unwrap();
    storage.set("app_data_q1w2e3", "fragment").unwrap();
    drop(storage);

    let conn = Connection::open(&db_path).unwrap();
    let updated_at: i64 = conn
        .query_row(
            "SELECT updated_at FROM kv WHERE key = 'app_data_q1w2e3'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(updated_at > 0);
}

#[test]
fn test_primary_key_is_unique() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();
    migrations::run_migrations(&conn).unwrap();

    conn.execute("INSERT INTO kv (key, value) VALUES ('k', 'v1')", [])
        .unwrap();
    let result = conn.execute("INSERT INTO kv (key, value) VALUES ('k', 'v2')", []);

    assert!(result.is_err());
}
