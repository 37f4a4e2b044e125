//! DDL for the seven required tables and five required indexes.
//!
//! Applied once at `SqliteStore::open`. Kept as a single idempotent batch
//! (`CREATE TABLE IF NOT EXISTS`) rather than a migration chain — this
//! crate ships one schema version.

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS symbols (
    stable_id               TEXT PRIMARY KEY,
    backend_id              TEXT,
    container               TEXT NOT NULL,
    name                    TEXT NOT NULL,
    kind                    TEXT NOT NULL,
    arity                   INTEGER,
    normalized_signature    TEXT,
    path                    TEXT NOT NULL,
    start_line              INTEGER NOT NULL,
    start_column            INTEGER NOT NULL,
    end_line                INTEGER,
    end_column              INTEGER,
    location_freshness      TEXT NOT NULL,
    state                   TEXT NOT NULL,
    definition_version_id   TEXT NOT NULL,
    definition_version_kind TEXT NOT NULL,
    last_verified_at        TEXT NOT NULL,
    last_verified_state     TEXT NOT NULL,
    deleted_at              TEXT,
    deleted_in_state        TEXT
);

CREATE INDEX IF NOT EXISTS symbols_by_backend_id
    ON symbols (backend_id)
    WHERE backend_id IS NOT NULL AND backend_id != '' AND state = 'active';

CREATE TABLE IF NOT EXISTS aliases (
    old_stable_id  TEXT NOT NULL REFERENCES symbols (stable_id),
    new_stable_id  TEXT NOT NULL REFERENCES symbols (stable_id),
    reason         TEXT NOT NULL,
    confidence     REAL NOT NULL,
    created_at     TEXT NOT NULL,
    created_in_state TEXT NOT NULL,
    PRIMARY KEY (old_stable_id, new_stable_id)
);

CREATE TABLE IF NOT EXISTS documents (
    path               TEXT PRIMARY KEY,
    doc_type           TEXT NOT NULL,
    title              TEXT NOT NULL,
    content_hash       TEXT NOT NULL,
    last_indexed_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS documents_by_path ON documents (path);

CREATE TABLE IF NOT EXISTS document_references (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_path           TEXT NOT NULL REFERENCES documents (path) ON DELETE CASCADE,
    raw_text           TEXT NOT NULL,
    normalized_text    TEXT NOT NULL,
    line               INTEGER NOT NULL,
    column             INTEGER NOT NULL,
    context_snippet    TEXT NOT NULL,
    detection_method   TEXT NOT NULL,
    resolution_status  TEXT NOT NULL,
    resolved_symbol_id TEXT,
    resolved_display_name TEXT,
    candidates         TEXT NOT NULL,
    confidence         REAL NOT NULL,
    last_resolved_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS references_by_symbol_id
    ON document_references (resolved_symbol_id);
CREATE INDEX IF NOT EXISTS references_by_doc_path
    ON document_references (doc_path);

CREATE TABLE IF NOT EXISTS document_modules (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    doc_path  TEXT NOT NULL REFERENCES documents (path) ON DELETE CASCADE,
    module_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS symbol_suffixes (
    suffix         TEXT NOT NULL,
    symbol_id      TEXT NOT NULL REFERENCES symbols (stable_id),
    segment_count  INTEGER NOT NULL,
    PRIMARY KEY (suffix, symbol_id)
);

CREATE INDEX IF NOT EXISTS suffixes_by_suffix ON symbol_suffixes (suffix);

CREATE TABLE IF NOT EXISTS metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
