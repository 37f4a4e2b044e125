//! Symbol record data types: the central entity persisted by the symbol
//! repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::fingerprint::SymbolFingerprint;
use crate::types::{Confidence, RepoStateId, StableId};

pub mod repository;

/// Whether a stored location is known to still be accurate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationFreshness {
    Fresh,
    MayBeStale,
}

/// Lifecycle state of a symbol record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolState {
    Active,
    Deleted,
    Unknown,
}

/// What kind of hash backs `definition_version_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefinitionVersionKind {
    BackendDefinitionHash,
    StructuralSignatureHash,
    Unknown,
}

/// Repo-relative location, 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,
}

impl Location {
    pub fn new(path: impl Into<String>, start_line: u32, start_column: u32) -> Self {
        Self {
            path: path.into(),
            start_line,
            start_column,
            end_line: None,
            end_column: None,
        }
    }

    pub fn with_end(mut self, end_line: u32, end_column: u32) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    /// Directory component of the path, `""` for a bare filename.
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub deleted_at: DateTime<Utc>,
    pub deleted_in_state: RepoStateId,
}

/// The central entity: one symbol's identity, location and lifecycle state.
///
/// Invariant: `state == Deleted` iff `tombstone.is_some()`. Fingerprint and
/// location are never absent for a record that exists at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub stable_id: StableId,
    pub backend_id: Option<String>,
    pub fingerprint: SymbolFingerprint,
    pub location: Location,
    pub location_freshness: LocationFreshness,
    pub state: SymbolState,
    pub definition_version_id: String,
    pub definition_version_kind: DefinitionVersionKind,
    pub last_verified_at: DateTime<Utc>,
    pub last_verified_state: RepoStateId,
    pub tombstone: Option<Tombstone>,
}

impl SymbolRecord {
    pub fn new(
        stable_id: StableId,
        fingerprint: SymbolFingerprint,
        location: Location,
        last_verified_at: DateTime<Utc>,
        last_verified_state: RepoStateId,
    ) -> Self {
        Self {
            stable_id,
            backend_id: None,
            fingerprint,
            location,
            location_freshness: LocationFreshness::Fresh,
            state: SymbolState::Active,
            definition_version_id: String::new(),
            definition_version_kind: DefinitionVersionKind::Unknown,
            last_verified_at,
            last_verified_state,
            tombstone: None,
        }
    }

    pub fn with_backend_id(mut self, backend_id: impl Into<String>) -> Self {
        self.backend_id = Some(backend_id.into());
        self
    }

    pub fn with_definition_version(
        mut self,
        version_id: impl Into<String>,
        kind: DefinitionVersionKind,
    ) -> Self {
        self.definition_version_id = version_id.into();
        self.definition_version_kind = kind;
        self
    }

    pub fn mark_deleted(&mut self, deleted_at: DateTime<Utc>, deleted_in_state: RepoStateId) {
        self.state = SymbolState::Deleted;
        self.tombstone = Some(Tombstone {
            deleted_at,
            deleted_in_state,
        });
    }

    pub fn is_active(&self) -> bool {
        self.state == SymbolState::Active
    }

    /// The display form used by exact-match document resolution: container
    /// and name joined by `.`.
    pub fn canonical_display(&self) -> String {
        crate::normalize::canonical_display(&self.fingerprint.container, &self.fingerprint.name)
    }

    /// Enforce the tombstone ⇔ deleted invariant and non-null fingerprint
    /// fields before a repository write accepts this record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.state, &self.tombstone) {
            (SymbolState::Deleted, None) => {
                return Err(ValidationError::new(
                    "tombstone",
                    "state=deleted requires tombstone fields",
                ));
            }
            (SymbolState::Active | SymbolState::Unknown, Some(_)) => {
                return Err(ValidationError::new(
                    "tombstone",
                    "tombstone fields must be empty unless state=deleted",
                ));
            }
            _ => {}
        }
        if self.fingerprint.name.is_empty() {
            return Err(ValidationError::new("fingerprint.name", "must not be empty"));
        }
        if self.location.path.is_empty() {
            return Err(ValidationError::new("location.path", "must not be empty"));
        }
        Ok(())
    }
}

/// Confidence helper used by anchor-match aliasing, exposed here since
/// `SymbolRecord` and `SymbolAlias` both reference the same constant.
pub fn anchor_match_confidence() -> Confidence {
    Confidence::clamped(0.95)
}
