//! Error types for the symbol identity and documentation linkage core.
//!
//! One `thiserror` enum per concern, plus an umbrella type most public APIs
//! return. Resolver results are *not* represented here — `ResolvedSymbol`
//! carries its own error variants as data, never as an exception.

use thiserror::Error;

use crate::types::StableId;

/// Raised by any write path that enforces a data-model invariant.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("validation failed for field '{field}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// The three resolver-specific outcomes that are errors. Always returned as
/// data inside `ResolvedSymbol::Error`, never thrown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveErrorKind {
    SymbolNotFound,
    AliasCycle,
    AliasChainTooDeep,
}

/// Errors from the persistence layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error during {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("write to {table} affected {affected} rows, expected exactly one")]
    UnexpectedRowCount { table: &'static str, affected: usize },

    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

impl StorageError {
    pub fn db(operation: &'static str, source: rusqlite::Error) -> Self {
        Self::Database { operation, source }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(source: rusqlite::Error) -> Self {
        StorageError::db("row decode", source).into()
    }
}

/// Per-file scan failures. Collected by the doc indexer rather than aborting
/// the whole run — other files continue to be scanned.
#[derive(Error, Debug)]
#[error("failed to scan '{path}': {reason}")]
pub struct ScanError {
    pub path: String,
    pub reason: String,
}

/// Umbrella error type most public APIs return.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("symbol not found: {0}")]
    SymbolNotFound(StableId),

    #[error("alias already references a different symbol: {old} -> {existing} (attempted {attempted})")]
    AliasConflict {
        old: StableId,
        existing: StableId,
        attempted: StableId,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("I/O error accessing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
