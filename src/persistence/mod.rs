//! Transactional embedded persistence: a `rusqlite`-backed store with
//! foreign keys, unique constraints, and a single-writer lock.
//!
//! `rusqlite` gives this layer real transactions and foreign-key
//! enforcement, which a pure search-index backend wouldn't provide on
//! its own.

pub mod schema;

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::{CoreError, StorageError};

/// Single-writer, multi-reader-snapshot store. Readers and writers both go
/// through the same mutex-guarded connection — SQLite's own file locking
/// would allow more concurrency, but writers are meant to serialize on the
/// storage layer's own lock, so we take that literally.
pub struct SqlitePersistence {
    conn: Mutex<Connection>,
}

impl SqlitePersistence {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| CoreError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let conn = Connection::open(path.as_ref()).map_err(|e| StorageError::db("open", e))?;
        conn.execute_batch(schema::SCHEMA)
            .map_err(|e| StorageError::db("apply schema", e))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store, used by tests and anywhere a throwaway database is
    /// wanted.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::db("open", e))?;
        conn.execute_batch(schema::SCHEMA)
            .map_err(|e| StorageError::db("apply schema", e))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Run `f` inside one transaction; commits on `Ok`, rolls back on `Err`.
    /// All multi-row writes in `symbol::repository`, `alias` and
    /// `documents::indexer` go through this.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut guard = self.conn.lock();
        let tx = guard.transaction().map_err(|e| StorageError::db("begin transaction", e))?;
        let result = f(&tx)?;
        tx.commit().map_err(|e| StorageError::db("commit", e))?;
        Ok(result)
    }

    /// Direct access for single-row reads and range queries that don't need
    /// transactional isolation across multiple statements.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T, CoreError>) -> Result<T, CoreError> {
        let guard = self.conn.lock();
        f(&guard)
    }
}
