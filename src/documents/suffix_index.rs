//! Suffix Index: maps trailing dotted suffixes of active symbol display
//! names to candidate stable ids, rebuilt atomically when the active set
//! changes.

use rusqlite::params;

use crate::error::{CoreResult, StorageError};
use crate::normalize::trailing_suffixes;
use crate::persistence::SqlitePersistence;
use crate::symbol::repository::{ListFilter, SymbolRepository};
use crate::symbol::SymbolState;
use crate::types::StableId;

const VERSION_KEY: &str = "symbol-index-version";

pub struct SuffixIndexEntry {
    pub suffix: String,
    pub symbol_id: StableId,
    pub segment_count: usize,
}

pub struct SuffixIndex<'a> {
    store: &'a SqlitePersistence,
}

impl<'a> SuffixIndex<'a> {
    pub fn new(store: &'a SqlitePersistence) -> Self {
        Self { store }
    }

    /// Truncate and repopulate in one transaction, bumping the version key.
    /// Called whenever the active symbol set changes.
    pub fn rebuild(&self, repository: &SymbolRepository<'_>, new_version: &str) -> CoreResult<usize> {
        let active = repository.list(&ListFilter {
            state: Some(SymbolState::Active),
            ..Default::default()
        })?;

        let mut entries = Vec::new();
        for record in &active {
            let display = record.canonical_display();
            for suffix in trailing_suffixes(&display) {
                let segment_count = crate::normalize::segment_count(&suffix);
                entries.push(SuffixIndexEntry {
                    suffix,
                    symbol_id: record.stable_id.clone(),
                    segment_count,
                });
            }
        }

        let count = entries.len();
        self.store.with_transaction(|tx| {
            tx.execute("DELETE FROM symbol_suffixes", [])
                .map_err(|e| StorageError::db("truncate suffixes", e))?;
            for entry in &entries {
                tx.execute(
                    "INSERT OR IGNORE INTO symbol_suffixes (suffix, symbol_id, segment_count) VALUES (?1, ?2, ?3)",
                    params![entry.suffix, entry.symbol_id.as_str(), entry.segment_count as i64],
                )
                .map_err(|e| StorageError::db("insert suffix", e))?;
            }
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![VERSION_KEY, new_version],
            )
            .map_err(|e| StorageError::db("bump version", e))?;
            Ok(())
        })?;
        Ok(count)
    }

    pub fn current_version(&self) -> CoreResult<Option<String>> {
        self.store.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![VERSION_KEY],
                |row| row.get(0),
            )
            .optional_version()
        })
    }

    /// Candidates for a given suffix key (e.g. the mention's last two
    /// segments joined by `.`), ordered by stable id for determinism.
    pub fn lookup(&self, suffix: &str) -> CoreResult<Vec<StableId>> {
        self.store.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT symbol_id FROM symbol_suffixes WHERE suffix = ?1 ORDER BY symbol_id ASC")
                .map_err(|e| StorageError::db("prepare suffix lookup", e))?;
            let rows = stmt
                .query_map(params![suffix], |row| row.get::<_, String>(0))
                .map_err(|e| StorageError::db("suffix lookup", e))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(StableId::new(row.map_err(|e| StorageError::db("suffix row", e))?));
            }
            Ok(out)
        })
    }
}

trait OptionalVersion {
    fn optional_version(self) -> CoreResult<Option<String>>;
}

impl OptionalVersion for rusqlite::Result<String> {
    fn optional_version(self) -> CoreResult<Option<String>> {
        use rusqlite::OptionalExtension;
        self.optional().map_err(|e| StorageError::db("read version", e).into())
    }
}
