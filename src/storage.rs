use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

pub const TODOS_KEY: &str = "todos";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend failed: {0}")]
    Backend(#[from] rusqlite::Error),
    #[error("failed to encode todos: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A string keyed, string valued store. Writes are synchronous: once `set`
/// returns the value is durable.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Key-value storage kept in a single sqlite table.
pub struct SqliteStorage {
    db: Connection,
}

impl SqliteStorage {
    /// Open the storage file, creating it (and its table) if it does not
    /// exist.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Connection::open(path)
            .with_context(|| format!("Failed to open storage file {}.", path.display()))?;
        Self::from_connection(db)
    }

    pub fn from_connection(db: Connection) -> Result<Self> {
        init_storage(&db)?;
        Ok(SqliteStorage { db })
    }
}

/// Initialize the key-value table.
pub fn init_storage(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE if not exists kv (
                  key             TEXT PRIMARY KEY,
                  value           TEXT NOT NULL,
                  updated_at      TEXT NOT NULL
                  )",
        [],
    )
    .context("Failed to create kv table.")?;
    Ok(())
}

impl KeyValueStore for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES(?1, ?2, ?3)",
            params![key, value, Utc::now()],
        )?;
        tracing::trace!(key, bytes = value.len(), "stored value");
        Ok(())
    }
}

#[cfg(test)]
pub use self::memory::MemoryStorage;

#[cfg(test)]
mod memory {
    use super::{KeyValueStore, StorageError};
    use std::collections::HashMap;

    /// In-memory stand-in for the sqlite storage.
    #[derive(Debug, Default)]
    pub struct MemoryStorage {
        pub values: HashMap<String, String>,
        pub writes: usize,
    }

    impl KeyValueStore for MemoryStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.values.get(key).cloned())
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.writes += 1;
            self.values.insert(key.to_string(), value.to_string());
            Ok(())
        }
    }
}
