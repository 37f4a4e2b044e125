//! Identity Resolver: follows alias chains with cycle and depth guards.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::alias::{AliasReason, AliasStore};
use crate::config::Settings;
use crate::error::ResolveErrorKind;
use crate::symbol::repository::SymbolRepository;
use crate::symbol::{SymbolRecord, SymbolState};
use crate::types::{Confidence, StableId};

/// Tagged result of a resolve operation. A genuine enum, never a struct
/// with nullable fields standing in for a variant.
#[derive(Debug, Clone)]
pub enum ResolvedSymbol {
    Found {
        record: SymbolRecord,
    },
    FoundViaRedirect {
        record: SymbolRecord,
        original_id: StableId,
        reason: AliasReason,
        confidence: Confidence,
    },
    Deleted {
        deleted_at: DateTime<Utc>,
    },
    Error {
        kind: ResolveErrorKind,
        message: String,
    },
}

pub struct IdentityResolver<'a> {
    repository: &'a SymbolRepository<'a>,
    alias_store: &'a AliasStore<'a>,
    settings: &'a Settings,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(
        repository: &'a SymbolRepository<'a>,
        alias_store: &'a AliasStore<'a>,
        settings: &'a Settings,
    ) -> Self {
        Self {
            repository,
            alias_store,
            settings,
        }
    }

    pub fn resolve(&self, requested_id: &StableId) -> ResolvedSymbol {
        let mut visited = HashSet::new();
        match self.resolve_inner(requested_id, 0, &mut visited, None) {
            Ok(resolved) => resolved,
            Err(err) => err,
        }
    }

    /// `redirect` carries the first redirect's original id/reason/confidence
    /// once one has been encountered; deeper redirects must not overwrite it.
    fn resolve_inner(
        &self,
        id: &StableId,
        depth: u32,
        visited: &mut HashSet<StableId>,
        redirect: Option<(StableId, AliasReason, Confidence)>,
    ) -> Result<ResolvedSymbol, ResolvedSymbol> {
        if visited.contains(id) {
            return Err(ResolvedSymbol::Error {
                kind: ResolveErrorKind::AliasCycle,
                message: format!("cycle detected at {id}"),
            });
        }
        if depth > self.settings.alias.alias_chain_max_depth {
            return Err(ResolvedSymbol::Error {
                kind: ResolveErrorKind::AliasChainTooDeep,
                message: format!("alias chain exceeded depth {}", self.settings.alias.alias_chain_max_depth),
            });
        }

        let record = self.repository.get(id).map_err(|e| ResolvedSymbol::Error {
            kind: ResolveErrorKind::SymbolNotFound,
            message: e.to_string(),
        })?;

        match record {
            Some(record) if record.state == SymbolState::Active => {
                Ok(self.wrap(record, redirect))
            }
            Some(record) => {
                // Deleted: check for an outgoing alias before giving up.
                visited.insert(id.clone());
                match self.alias_store.outgoing(id).map_err(|e| ResolvedSymbol::Error {
                    kind: ResolveErrorKind::SymbolNotFound,
                    message: e.to_string(),
                })? {
                    Some((next_id, reason, confidence)) => {
                        let redirect = redirect.or(Some((id.clone(), reason, confidence)));
                        self.resolve_inner(&next_id, depth + 1, visited, redirect)
                    }
                    None => Ok(ResolvedSymbol::Deleted {
                        deleted_at: record.tombstone.map(|t| t.deleted_at).unwrap_or_else(Utc::now),
                    }),
                }
            }
            None => {
                visited.insert(id.clone());
                match self.alias_store.outgoing(id).map_err(|e| ResolvedSymbol::Error {
                    kind: ResolveErrorKind::SymbolNotFound,
                    message: e.to_string(),
                })? {
                    Some((next_id, reason, confidence)) => {
                        let redirect = redirect.or(Some((id.clone(), reason, confidence)));
                        self.resolve_inner(&next_id, depth + 1, visited, redirect)
                    }
                    None => Err(ResolvedSymbol::Error {
                        kind: ResolveErrorKind::SymbolNotFound,
                        message: format!("no symbol or alias found for {id}"),
                    }),
                }
            }
        }
    }

    fn wrap(
        &self,
        record: SymbolRecord,
        redirect: Option<(StableId, AliasReason, Confidence)>,
    ) -> ResolvedSymbol {
        match redirect {
            Some((original_id, reason, confidence)) => ResolvedSymbol::FoundViaRedirect {
                record,
                original_id,
                reason,
                confidence,
            },
            None => ResolvedSymbol::Found { record },
        }
    }
}
