use crate::error::DebtError;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;

const DB_SCHEMA_VERSION: i64 = 2;

pub const DEBTS_KEY: &str = "debts";
pub const CONTACT_KEY: &str = "contactId";
pub const REMINDER_TIMESTAMP_KEY: &str = "scheduledReminderTimestamp";
pub const PREFERENCES_KEY: &str = "preferences";

/// String-valued key-value persistence the session mirrors its state into.
pub trait RecordStore: Send {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, DebtError>;
    fn set(&self, key: &str, value: &str) -> std::result::Result<(), DebtError>;
    fn remove(&self, key: &str) -> std::result::Result<(), DebtError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, DebtError> {
        let conn = Connection::open(path)?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> std::result::Result<Self, DebtError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteStore {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, DebtError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), DebtError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "
            INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), DebtError> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        // Written by a newer build; the key-value layout is forward compatible.
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "kv_store", "updated_at INTEGER NOT NULL DEFAULT 0")
}

fn add_column_if_missing(conn: &Connection, table: &str, column_def: &str) -> Result<()> {
    let column_name = column_def
        .split_whitespace()
        .next()
        .unwrap_or(column_def)
        .to_string();

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|res| res.ok())
        .any(|name| name == column_name);

    if !exists {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column_def}"), [])?;
    }

    Ok(())
}
