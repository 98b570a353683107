//! Client-local key-value storage backed by the `kv_store` table.

use std::sync::Arc;

use rusqlite::OptionalExtension;

use voicio_core::error::VoicioError;
use voicio_core::ports::KeyValueStore;

use crate::db::Database;

pub struct SqliteKeyValueStore {
    db: Arc<Database>,
}

impl SqliteKeyValueStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, VoicioError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| VoicioError::Storage(e.to_string()))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), VoicioError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = strftime('%s', 'now')",
                rusqlite::params![key, value],
            )
            .map_err(|e| VoicioError::Storage(format!("Failed to write {}: {}", key, e)))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<(), VoicioError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])
                .map_err(|e| VoicioError::Storage(format!("Failed to remove {}: {}", key, e)))?;
            Ok(())
        })
    }
}
