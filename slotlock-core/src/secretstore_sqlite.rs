//! SQLite-backed secret store.
//! Plain upsert writes; exclusivity comes from the engine's lease gate,
//! not from this layer.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::secretstore::SecretStore;

pub struct SqliteSecretStore {
    conn: Mutex<Connection>,
}

impl SqliteSecretStore {
    /// Open (or create) the secret database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::backend(format!("opening secret database '{path}'"), e))?;

        conn.busy_timeout(crate::lockstore_sqlite::BUSY_TIMEOUT)
            .map_err(|e| Error::backend("setting busy_timeout", e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| Error::backend("setting journal_mode", e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS secrets (
                name  TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| Error::backend("creating secrets schema", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn guard(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SecretStore for SqliteSecretStore {
    fn read(&self, name: &str) -> Result<String> {
        self.guard()
            .query_row(
                "SELECT value FROM secrets WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::backend(format!("reading secret '{name}'"), e))?
            .ok_or_else(|| Error::SecretNotFound {
                name: name.to_string(),
            })
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        self.guard()
            .execute(
                "INSERT INTO secrets (name, value) VALUES (?1, ?2)
                 ON CONFLICT (name) DO UPDATE SET value = excluded.value",
                params![name, value],
            )
            .map_err(|e| Error::backend(format!("writing secret '{name}'"), e))?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
