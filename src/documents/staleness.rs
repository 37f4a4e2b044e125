//! Staleness Checker: read-only classification of document references
//! against the live symbol table.

use crate::normalize::last_two_segments;
use crate::resolver::{IdentityResolver, ResolvedSymbol};
use crate::symbol::repository::SymbolRepository;
use crate::types::{SourceLanguage, StableId};

use super::suffix_index::SuffixIndex;
use super::types::{DocumentReference, ResolutionStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum StalenessStatus {
    Valid,
    StaleRenamed {
        new_symbol_id: StableId,
        new_display_name: String,
    },
    StaleMissing {
        suggestions: Vec<StableId>,
    },
    StaleAmbiguous {
        suggestions: Vec<StableId>,
    },
    StaleIndexGap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StalenessReport {
    pub status: StalenessStatus,
}

pub struct StalenessChecker<'a> {
    resolver: &'a IdentityResolver<'a>,
    repository: &'a SymbolRepository<'a>,
    suffix_index: &'a SuffixIndex<'a>,
    /// Language-coverage predicate: returns false when the source language
    /// is known not to be indexed at the current capability tier, demoting
    /// `missing` to `index-gap`.
    covered_languages: &'a [SourceLanguage],
}

impl<'a> StalenessChecker<'a> {
    pub fn new(
        resolver: &'a IdentityResolver<'a>,
        repository: &'a SymbolRepository<'a>,
        suffix_index: &'a SuffixIndex<'a>,
        covered_languages: &'a [SourceLanguage],
    ) -> Self {
        Self {
            resolver,
            repository,
            suffix_index,
            covered_languages,
        }
    }

    pub fn classify(&self, reference: &DocumentReference) -> crate::error::CoreResult<Option<StalenessReport>> {
        if reference.resolution_status == ResolutionStatus::Ineligible {
            return Ok(None);
        }

        if let Some(symbol_id) = &reference.resolved_symbol_id {
            let active = self.repository.get(symbol_id)?.is_some_and(|r| r.is_active());
            if active {
                return Ok(Some(StalenessReport { status: StalenessStatus::Valid }));
            }

            return Ok(Some(match self.resolver.resolve(symbol_id) {
                ResolvedSymbol::FoundViaRedirect { record, .. } => StalenessReport {
                    status: StalenessStatus::StaleRenamed {
                        new_symbol_id: record.stable_id.clone(),
                        new_display_name: record.canonical_display(),
                    },
                },
                _ => StalenessReport {
                    status: StalenessStatus::StaleMissing {
                        suggestions: self.suggestions_for(&reference.normalized_text)?,
                    },
                },
            }));
        }

        let status = match reference.resolution_status {
            ResolutionStatus::Missing => {
                let suggestions = self.suggestions_for(&reference.normalized_text)?;
                if self.is_index_gap(&reference.normalized_text) {
                    StalenessStatus::StaleIndexGap
                } else {
                    StalenessStatus::StaleMissing { suggestions }
                }
            }
            ResolutionStatus::Ambiguous => StalenessStatus::StaleAmbiguous {
                suggestions: reference.candidates.clone(),
            },
            ResolutionStatus::Exact | ResolutionStatus::Suffix => StalenessStatus::Valid,
            ResolutionStatus::Ineligible => unreachable!("handled above"),
        };
        Ok(Some(StalenessReport { status }))
    }

    fn suggestions_for(&self, normalized: &str) -> crate::error::CoreResult<Vec<StableId>> {
        match last_two_segments(normalized) {
            Some(key) => self.suffix_index.lookup(&key),
            None => Ok(Vec::new()),
        }
    }

    fn is_index_gap(&self, normalized: &str) -> bool {
        let Some((_, ext)) = normalized.rsplit_once('.') else {
            return false;
        };
        let language = SourceLanguage::from_extension(ext);
        language != SourceLanguage::Unknown && !self.covered_languages.contains(&language)
    }
}
