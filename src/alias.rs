//! Alias Creator: diffs the old active symbol set against a freshly
//! indexed new set, emitting rename aliases or tombstones.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::backend::{classify_backend_id, BackendRole};
use crate::config::Settings;
use crate::error::{CoreError, CoreResult, StorageError};
use crate::fingerprint::SymbolKind;
use crate::normalize::root_namespace;
use crate::persistence::SqlitePersistence;
use crate::symbol::repository::SymbolRepository;
use crate::symbol::SymbolRecord;
use crate::types::{Confidence, RepoStateId, StableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasReason {
    Renamed,
    Moved,
    Merged,
    FuzzyMatch,
}

impl AliasReason {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Renamed => "renamed",
            Self::Moved => "moved",
            Self::Merged => "merged",
            Self::FuzzyMatch => "fuzzy-match",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolAlias {
    pub old_stable_id: StableId,
    pub new_stable_id: StableId,
    pub reason: AliasReason,
    pub confidence: Confidence,
    pub created_at: chrono::DateTime<Utc>,
    pub created_in_state: RepoStateId,
}

/// Per-refresh outcome: how many aliases were emitted, how many pure
/// tombstones, and any per-record failures (collected, never aborting the
/// whole refresh).
#[derive(Debug, Clone, Default)]
pub struct AliasCreationReport {
    pub aliases_emitted: u32,
    pub pure_tombstones: u32,
    pub failures: Vec<String>,
}

pub struct AliasStore<'a> {
    store: &'a SqlitePersistence,
}

impl<'a> AliasStore<'a> {
    pub fn new(store: &'a SqlitePersistence) -> Self {
        Self { store }
    }

    /// Idempotent: a conflicting insert on the (old, new) pair is a no-op.
    pub fn insert(&self, tx: &rusqlite::Transaction<'_>, alias: &SymbolAlias) -> CoreResult<()> {
        if alias.old_stable_id == alias.new_stable_id {
            return Err(StorageError::ForeignKey(
                "alias old and new stable id must differ".to_string(),
            )
            .into());
        }
        tx.execute(
            "INSERT OR IGNORE INTO aliases \
                (old_stable_id, new_stable_id, reason, confidence, created_at, created_in_state) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                alias.old_stable_id.as_str(),
                alias.new_stable_id.as_str(),
                alias.reason.tag(),
                alias.confidence.value(),
                alias.created_at.to_rfc3339(),
                alias.created_in_state.as_str(),
            ],
        )
        .map_err(|e| StorageError::db("insert alias", e))?;
        Ok(())
    }

    /// Outgoing alias for a given old id, if any. The resolver's only read
    /// path into this table.
    pub fn outgoing(&self, old_stable_id: &StableId) -> CoreResult<Option<(StableId, AliasReason, Confidence)>> {
        self.store.with_connection(|conn| {
            conn.query_row(
                "SELECT new_stable_id, reason, confidence FROM aliases WHERE old_stable_id = ?1",
                params![old_stable_id.as_str()],
                |row| {
                    let new_id: String = row.get(0)?;
                    let reason: String = row.get(1)?;
                    let confidence: f64 = row.get(2)?;
                    Ok((new_id, reason, confidence))
                },
            )
            .optional()
            .map_err(CoreError::from)
            .map(|opt| {
                opt.map(|(new_id, reason, confidence)| {
                    (
                        StableId::new(new_id),
                        reason_from_tag(&reason),
                        Confidence::clamped(confidence),
                    )
                })
            })
        })
    }
}

fn reason_from_tag(tag: &str) -> AliasReason {
    match tag {
        "renamed" => AliasReason::Renamed,
        "moved" => AliasReason::Moved,
        "merged" => AliasReason::Merged,
        _ => AliasReason::FuzzyMatch,
    }
}

/// Fuzzy-match score between an old record and a new candidate, in `[0, 1]`.
/// Factors are additive, not else-if — a symbol that matches on kind, name,
/// root namespace, and path should score higher than one matching on just
/// name, which only holds if every matching factor contributes
/// independently.
fn fuzzy_score(old: &SymbolRecord, candidate: &SymbolRecord) -> f64 {
    let mut score = 0.0;

    if old.fingerprint.kind == candidate.fingerprint.kind {
        score += 0.30;
    }

    if old.fingerprint.name == candidate.fingerprint.name {
        score += 0.40;
    } else if normalize_for_loose_compare(&old.fingerprint.name)
        == normalize_for_loose_compare(&candidate.fingerprint.name)
    {
        score += 0.20;
    }

    if old.fingerprint.container == candidate.fingerprint.container {
        score += 0.20;
    } else if root_namespace(&old.fingerprint.container) == root_namespace(&candidate.fingerprint.container) {
        score += 0.10;
    }

    if old.location.path == candidate.location.path {
        score += 0.10;
    } else if old.location.directory() == candidate.location.directory() {
        score += 0.05;
    }

    score
}

fn normalize_for_loose_compare(name: &str) -> String {
    name.to_lowercase().replace('_', "")
}

pub struct AliasCreator<'a> {
    repository: &'a SymbolRepository<'a>,
    alias_store: &'a AliasStore<'a>,
    store: &'a SqlitePersistence,
    settings: &'a Settings,
}

impl<'a> AliasCreator<'a> {
    pub fn new(
        repository: &'a SymbolRepository<'a>,
        alias_store: &'a AliasStore<'a>,
        store: &'a SqlitePersistence,
        settings: &'a Settings,
    ) -> Self {
        Self {
            repository,
            alias_store,
            store,
            settings,
        }
    }

    /// Runs the two-strategy comparison for every old active record not
    /// present in `new_records` by stable id. Each old record's alias
    /// insert and tombstone update happen in a single transaction.
    pub fn create_aliases_on_refresh(
        &self,
        new_records: &[SymbolRecord],
        state_id: &RepoStateId,
    ) -> CoreResult<AliasCreationReport> {
        let old_active = self.repository.list(&crate::symbol::repository::ListFilter {
            state: Some(crate::symbol::SymbolState::Active),
            ..Default::default()
        })?;

        let new_ids: std::collections::HashSet<&str> =
            new_records.iter().map(|r| r.stable_id.as_str()).collect();

        let mut report = AliasCreationReport::default();

        for old in old_active.iter().filter(|r| !new_ids.contains(r.stable_id.as_str())) {
            match self.reconcile_one(old, new_records, state_id) {
                Ok(emitted_alias) => {
                    if emitted_alias {
                        report.aliases_emitted += 1;
                    } else {
                        report.pure_tombstones += 1;
                    }
                }
                Err(e) => report.failures.push(format!("{}: {e}", old.stable_id)),
            }
        }

        Ok(report)
    }

    fn reconcile_one(
        &self,
        old: &SymbolRecord,
        new_records: &[SymbolRecord],
        state_id: &RepoStateId,
    ) -> CoreResult<bool> {
        let anchor_backend_id = old
            .backend_id
            .as_deref()
            .filter(|b| classify_backend_id(b, self.settings) == BackendRole::Anchor);
        if let Some(backend_id) = anchor_backend_id {
            if let Some(matched) = new_records
                .iter()
                .find(|r| r.backend_id.as_deref() == Some(backend_id) && r.stable_id != old.stable_id)
            {
                self.emit_alias_and_tombstone(
                    old,
                    &matched.stable_id,
                    AliasReason::Renamed,
                    Confidence::clamped(self.settings.alias.anchor_alias_confidence),
                    state_id,
                )?;
                return Ok(true);
            }
        }

        let mut best: Option<(&SymbolRecord, f64)> = None;
        for candidate in new_records {
            let score = fuzzy_score(old, candidate);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }

        if let Some((candidate, score)) = best {
            if score >= self.settings.alias.fuzzy_match_threshold {
                self.emit_alias_and_tombstone(
                    old,
                    &candidate.stable_id,
                    AliasReason::FuzzyMatch,
                    Confidence::clamped(score),
                    state_id,
                )?;
                return Ok(true);
            }
        }

        self.repository.mark_deleted(&old.stable_id, state_id)?;
        Ok(false)
    }

    fn emit_alias_and_tombstone(
        &self,
        old: &SymbolRecord,
        new_id: &StableId,
        reason: AliasReason,
        confidence: Confidence,
        state_id: &RepoStateId,
    ) -> CoreResult<()> {
        let alias = SymbolAlias {
            old_stable_id: old.stable_id.clone(),
            new_stable_id: new_id.clone(),
            reason,
            confidence,
            created_at: Utc::now(),
            created_in_state: state_id.clone(),
        };
        self.store.with_transaction(|tx| {
            self.alias_store.insert(tx, &alias)?;
            let affected = tx
                .execute(
                    "UPDATE symbols SET state = 'deleted', deleted_at = ?2, deleted_in_state = ?3 \
                     WHERE stable_id = ?1",
                    params![old.stable_id.as_str(), Utc::now().to_rfc3339(), state_id.as_str()],
                )
                .map_err(|e| StorageError::db("tombstone old record", e))?;
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
}
