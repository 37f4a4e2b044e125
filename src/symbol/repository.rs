//! CRUD over symbol records: the persistence-facing half of the symbol
//! module.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::backend::{classify_backend_id, BackendRole};
use crate::config::Settings;
use crate::error::{CoreError, CoreResult, StorageError};
use crate::fingerprint::{SymbolFingerprint, SymbolKind};
use crate::persistence::SqlitePersistence;
use crate::types::{RepoStateId, StableId};

use super::{DefinitionVersionKind, Location, LocationFreshness, SymbolRecord, SymbolState, Tombstone};

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub state: Option<SymbolState>,
    pub kind: Option<SymbolKind>,
    pub backend_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub struct SymbolRepository<'a> {
    store: &'a SqlitePersistence,
    settings: &'a Settings,
}

impl<'a> SymbolRepository<'a> {
    pub fn new(store: &'a SqlitePersistence, settings: &'a Settings) -> Self {
        Self { store, settings }
    }

    pub fn get(&self, stable_id: &StableId) -> CoreResult<Option<SymbolRecord>> {
        self.store.with_connection(|conn| {
            conn.query_row(
                "SELECT * FROM symbols WHERE stable_id = ?1",
                params![stable_id.as_str()],
                |row| Ok(row_to_record(row)),
            )
            .optional()
            .map_err(|e| StorageError::db("get", e))?
            .transpose()
        })
    }

    /// Matches only `state = active`; an empty backend id never matches
    /// anything (callers should not even call this with one).
    pub fn get_by_backend_id(&self, backend_id: &str) -> CoreResult<Option<SymbolRecord>> {
        if backend_id.is_empty() {
            return Ok(None);
        }
        self.store.with_connection(|conn| {
            conn.query_row(
                "SELECT * FROM symbols WHERE backend_id = ?1 AND state = 'active'",
                params![backend_id],
                |row| Ok(row_to_record(row)),
            )
            .optional()
            .map_err(|e| StorageError::db("get_by_backend_id", e))?
            .transpose()
        })
    }

    pub fn create(&self, record: &SymbolRecord) -> CoreResult<()> {
        record.validate()?;
        let backend_id = self.anchored_backend_id(record);
        self.store.with_transaction(|tx| {
            insert_record(tx, record, backend_id.as_deref())?;
            Ok(())
        })
    }

    pub fn update(&self, record: &SymbolRecord) -> CoreResult<()> {
        record.validate()?;
        let backend_id = self.anchored_backend_id(record);
        self.store.with_transaction(|tx| {
            let affected = tx
                .execute(
                    UPDATE_SQL,
                    rusqlite::params_from_iter(update_params(record, backend_id.as_deref())),
                )
                .map_err(|e| StorageError::db("update", e))?;
            if affected != 1 {
                return Err(StorageError::UnexpectedRowCount {
                    table: "symbols",
                    affected,
                }
                .into());
            }
            Ok(())
        })
    }

    /// A resolver-only backend id is never stored: it plays no role in
    /// rename anchoring and would otherwise sit in the backend-id index and
    /// `get_by_backend_id` lookups as if it did.
    fn anchored_backend_id(&self, record: &SymbolRecord) -> Option<String> {
        record
            .backend_id
            .as_deref()
            .filter(|id| classify_backend_id(id, self.settings) == BackendRole::Anchor)
            .map(|id| id.to_string())
    }

    pub fn mark_deleted(&self, stable_id: &StableId, state_id: &RepoStateId) -> CoreResult<()> {
        let now = Utc::now();
        self.store.with_transaction(|tx| {
            let affected = tx
                .execute(
                    "UPDATE symbols SET state = 'deleted', deleted_at = ?2, deleted_in_state = ?3 \
                     WHERE stable_id = ?1",
                    params![stable_id.as_str(), now.to_rfc3339(), state_id.as_str()],
                )
                .map_err(|e| StorageError::db("mark_deleted", e))?;
            if affected != 1 {
                return Err(StorageError::UnexpectedRowCount {
                    table: "symbols",
                    affected,
                }
                .into());
            }
            Ok(())
        })
    }

    /// Ordered by stable id ascending for determinism.
    pub fn list(&self, filter: &ListFilter) -> CoreResult<Vec<SymbolRecord>> {
        self.store.with_connection(|conn| {
            let mut sql = String::from("SELECT * FROM symbols WHERE 1 = 1");
            let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(state) = filter.state {
                sql.push_str(" AND state = ?");
                args.push(Box::new(state_tag(state).to_string()));
            }
            if let Some(kind) = filter.kind {
                sql.push_str(" AND kind = ?");
                args.push(Box::new(kind_tag(kind).to_string()));
            }
            if let Some(backend_id) = &filter.backend_id {
                sql.push_str(" AND backend_id = ?");
                args.push(Box::new(backend_id.clone()));
            }
            sql.push_str(" ORDER BY stable_id ASC");
            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            if let Some(offset) = filter.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }

            let mut stmt = conn.prepare(&sql).map_err(|e| StorageError::db("list", e))?;
            let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
            let rows = stmt
                .query_map(param_refs.as_slice(), |row| Ok(row_to_record(row)))
                .map_err(|e| StorageError::db("list", e))?;

            let mut out = Vec::new();
            for row in rows {
                let record = row.map_err(|e| StorageError::db("list row", e))??;
                out.push(record);
            }
            Ok(out)
        })
    }

    /// Used by the fuzzy-match alias scorer, which only ever compares
    /// against active records.
    pub fn find_active_by_display_name(&self, display_name: &str) -> CoreResult<Vec<SymbolRecord>> {
        let all = self.list(&ListFilter {
            state: Some(SymbolState::Active),
            ..Default::default()
        })?;
        Ok(all
            .into_iter()
            .filter(|r| r.canonical_display() == display_name)
            .collect())
    }
}

fn state_tag(state: SymbolState) -> &'static str {
    match state {
        SymbolState::Active => "active",
        SymbolState::Deleted => "deleted",
        SymbolState::Unknown => "unknown",
    }
}

fn state_from_tag(tag: &str) -> SymbolState {
    match tag {
        "active" => SymbolState::Active,
        "deleted" => SymbolState::Deleted,
        _ => SymbolState::Unknown,
    }
}

fn freshness_tag(freshness: LocationFreshness) -> &'static str {
    match freshness {
        LocationFreshness::Fresh => "fresh",
        LocationFreshness::MayBeStale => "may-be-stale",
    }
}

fn freshness_from_tag(tag: &str) -> LocationFreshness {
    match tag {
        "fresh" => LocationFreshness::Fresh,
        _ => LocationFreshness::MayBeStale,
    }
}

fn version_kind_tag(kind: DefinitionVersionKind) -> &'static str {
    match kind {
        DefinitionVersionKind::BackendDefinitionHash => "backend-definition-hash",
        DefinitionVersionKind::StructuralSignatureHash => "structural-signature-hash",
        DefinitionVersionKind::Unknown => "unknown",
    }
}

fn version_kind_from_tag(tag: &str) -> DefinitionVersionKind {
    match tag {
        "backend-definition-hash" => DefinitionVersionKind::BackendDefinitionHash,
        "structural-signature-hash" => DefinitionVersionKind::StructuralSignatureHash,
        _ => DefinitionVersionKind::Unknown,
    }
}

pub(crate) fn kind_tag(kind: SymbolKind) -> &'static str {
    use SymbolKind::*;
    match kind {
        Function => "function",
        Method => "method",
        Class => "class",
        Interface => "interface",
        Struct => "struct",
        Enum => "enum",
        Variable => "variable",
        Constant => "constant",
        Field => "field",
        Property => "property",
        Namespace => "namespace",
        Module => "module",
        Package => "package",
        Type => "type",
        Parameter => "parameter",
        Unknown => "unknown",
    }
}

fn kind_from_tag(tag: &str) -> SymbolKind {
    use SymbolKind::*;
    match tag {
        "function" => Function,
        "method" => Method,
        "class" => Class,
        "interface" => Interface,
        "struct" => Struct,
        "enum" => Enum,
        "variable" => Variable,
        "constant" => Constant,
        "field" => Field,
        "property" => Property,
        "namespace" => Namespace,
        "module" => Module,
        "package" => Package,
        "type" => Type,
        "parameter" => Parameter,
        _ => Unknown,
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_record(row: &Row<'_>) -> CoreResult<SymbolRecord> {
    let fingerprint = SymbolFingerprint {
        container: row.get("container")?,
        name: row.get("name")?,
        kind: kind_from_tag(&row.get::<_, String>("kind")?),
        arity: row.get::<_, Option<i64>>("arity")?.map(|v| v as u32),
        normalized_signature: row.get("normalized_signature")?,
    };

    let location = Location {
        path: row.get("path")?,
        start_line: row.get::<_, i64>("start_line")? as u32,
        start_column: row.get::<_, i64>("start_column")? as u32,
        end_line: row.get::<_, Option<i64>>("end_line")?.map(|v| v as u32),
        end_column: row.get::<_, Option<i64>>("end_column")?.map(|v| v as u32),
    };

    let state = state_from_tag(&row.get::<_, String>("state")?);
    let deleted_at: Option<String> = row.get("deleted_at")?;
    let deleted_in_state: Option<String> = row.get("deleted_in_state")?;
    let tombstone = match (deleted_at, deleted_in_state) {
        (Some(at), Some(state_id)) => Some(Tombstone {
            deleted_at: parse_timestamp(&at),
            deleted_in_state: RepoStateId::new(state_id),
        }),
        _ => None,
    };

    Ok(SymbolRecord {
        stable_id: StableId::new(row.get::<_, String>("stable_id")?),
        backend_id: row.get("backend_id")?,
        fingerprint,
        location,
        location_freshness: freshness_from_tag(&row.get::<_, String>("location_freshness")?),
        state,
        definition_version_id: row.get("definition_version_id")?,
        definition_version_kind: version_kind_from_tag(&row.get::<_, String>("definition_version_kind")?),
        last_verified_at: parse_timestamp(&row.get::<_, String>("last_verified_at")?),
        last_verified_state: RepoStateId::new(row.get::<_, String>("last_verified_state")?),
        tombstone,
    })
}

const UPDATE_SQL: &str = "UPDATE symbols SET \
    backend_id = ?2, container = ?3, name = ?4, kind = ?5, arity = ?6, normalized_signature = ?7, \
    path = ?8, start_line = ?9, start_column = ?10, end_line = ?11, end_column = ?12, \
    location_freshness = ?13, state = ?14, definition_version_id = ?15, definition_version_kind = ?16, \
    last_verified_at = ?17, last_verified_state = ?18, deleted_at = ?19, deleted_in_state = ?20 \
    WHERE stable_id = ?1";

fn update_params(record: &SymbolRecord, backend_id: Option<&str>) -> Vec<Box<dyn rusqlite::ToSql>> {
    let (deleted_at, deleted_in_state) = match &record.tombstone {
        Some(t) => (Some(t.deleted_at.to_rfc3339()), Some(t.deleted_in_state.as_str().to_string())),
        None => (None, None),
    };
    vec![
        Box::new(record.stable_id.as_str().to_string()),
        Box::new(backend_id.map(|id| id.to_string())),
        Box::new(record.fingerprint.container.clone()),
        Box::new(record.fingerprint.name.clone()),
        Box::new(kind_tag(record.fingerprint.kind).to_string()),
        Box::new(record.fingerprint.arity.map(|a| a as i64)),
        Box::new(record.fingerprint.normalized_signature.clone()),
        Box::new(record.location.path.clone()),
        Box::new(record.location.start_line as i64),
        Box::new(record.location.start_column as i64),
        Box::new(record.location.end_line.map(|v| v as i64)),
        Box::new(record.location.end_column.map(|v| v as i64)),
        Box::new(freshness_tag(record.location_freshness).to_string()),
        Box::new(state_tag(record.state).to_string()),
        Box::new(record.definition_version_id.clone()),
        Box::new(version_kind_tag(record.definition_version_kind).to_string()),
        Box::new(record.last_verified_at.to_rfc3339()),
        Box::new(record.last_verified_state.as_str().to_string()),
        Box::new(deleted_at),
        Box::new(deleted_in_state),
    ]
}

fn insert_record(
    tx: &rusqlite::Transaction<'_>,
    record: &SymbolRecord,
    backend_id: Option<&str>,
) -> Result<(), CoreError> {
    let (deleted_at, deleted_in_state) = match &record.tombstone {
        Some(t) => (Some(t.deleted_at.to_rfc3339()), Some(t.deleted_in_state.as_str().to_string())),
        None => (None, None),
    };
    tx.execute(
        "INSERT INTO symbols (\
            stable_id, backend_id, container, name, kind, arity, normalized_signature, \
            path, start_line, start_column, end_line, end_column, \
            location_freshness, state, definition_version_id, definition_version_kind, \
            last_verified_at, last_verified_state, deleted_at, deleted_in_state\
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            record.stable_id.as_str(),
            backend_id,
            record.fingerprint.container,
            record.fingerprint.name,
            kind_tag(record.fingerprint.kind),
            record.fingerprint.arity.map(|a| a as i64),
            record.fingerprint.normalized_signature,
            record.location.path,
            record.location.start_line as i64,
            record.location.start_column as i64,
            record.location.end_line.map(|v| v as i64),
            record.location.end_column.map(|v| v as i64),
            freshness_tag(record.location_freshness),
            state_tag(record.state),
            record.definition_version_id,
            version_kind_tag(record.definition_version_kind),
            record.last_verified_at.to_rfc3339(),
            record.last_verified_state.as_str(),
            deleted_at,
            deleted_in_state,
        ],
    )
    .map_err(|e| StorageError::db("insert", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::SymbolKind;

    fn sample(id: &str, name: &str) -> SymbolRecord {
        SymbolRecord::new(
            StableId::new(id.to_string()),
            SymbolFingerprint::new("pkg.auth", name, SymbolKind::Function),
            Location::new("src/auth.rs", 1, 1),
            Utc::now(),
            RepoStateId::new("state-1"),
        )
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        let record = sample("sym:r:sym:a1", "Login");
        repo.create(&record).unwrap();

        let fetched = repo.get(&record.stable_id).unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn get_by_backend_id_only_matches_active() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        let mut record = sample("sym:r:sym:a2", "Login").with_backend_id("scip:abc");
        repo.create(&record).unwrap();

        assert!(repo.get_by_backend_id("scip:abc").unwrap().is_some());

        record.mark_deleted(Utc::now(), RepoStateId::new("state-2"));
        repo.update(&record).unwrap();
        assert!(repo.get_by_backend_id("scip:abc").unwrap().is_none());
    }

    #[test]
    fn empty_backend_id_never_matches() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        assert!(repo.get_by_backend_id("").unwrap().is_none());
    }

    #[test]
    fn mark_deleted_affects_exactly_one_row() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        let record = sample("sym:r:sym:a3", "Login");
        repo.create(&record).unwrap();

        repo.mark_deleted(&record.stable_id, &RepoStateId::new("state-2")).unwrap();
        let fetched = repo.get(&record.stable_id).unwrap().unwrap();
        assert_eq!(fetched.state, SymbolState::Deleted);
        assert!(fetched.tombstone.is_some());
    }

    #[test]
    fn mark_deleted_on_missing_id_errors() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        let result = repo.mark_deleted(&StableId::new("sym:r:sym:missing"), &RepoStateId::new("s"));
        assert!(result.is_err());
    }

    #[test]
    fn list_orders_by_stable_id_ascending() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        repo.create(&sample("sym:r:sym:c", "C")).unwrap();
        repo.create(&sample("sym:r:sym:a", "A")).unwrap();
        repo.create(&sample("sym:r:sym:b", "B")).unwrap();

        let listed = repo.list(&ListFilter::default()).unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.stable_id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["sym:r:sym:a", "sym:r:sym:b", "sym:r:sym:c"]);
    }

    #[test]
    fn list_filters_by_state() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        let mut deleted = sample("sym:r:sym:d", "D");
        repo.create(&deleted).unwrap();
        deleted.mark_deleted(Utc::now(), RepoStateId::new("s2"));
        repo.update(&deleted).unwrap();
        repo.create(&sample("sym:r:sym:e", "E")).unwrap();

        let active = repo
            .list(&ListFilter {
                state: Some(SymbolState::Active),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].stable_id.as_str(), "sym:r:sym:e");
    }

    #[test]
    fn resolver_only_backend_id_is_not_stored() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        let record = sample("sym:r:sym:f", "F").with_backend_id("lsp-session:12");
        repo.create(&record).unwrap();

        let fetched = repo.get(&record.stable_id).unwrap().unwrap();
        assert_eq!(fetched.backend_id, None);
        assert!(repo.get_by_backend_id("lsp-session:12").unwrap().is_none());
    }

    #[test]
    fn anchor_backend_id_is_stored() {
        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = Settings::default();
        let repo = SymbolRepository::new(&store, &settings);
        let record = sample("sym:r:sym:g", "G").with_backend_id("scip:xyz");
        repo.create(&record).unwrap();

        let fetched = repo.get(&record.stable_id).unwrap().unwrap();
        assert_eq!(fetched.backend_id.as_deref(), Some("scip:xyz"));
    }
}
