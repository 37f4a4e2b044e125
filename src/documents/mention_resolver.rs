//! Mention Resolver: binds a raw document mention to a stable id using
//! exact match against canonical display names, then suffix lookup, with a
//! directive override that always wins.

use chrono::Utc;

use crate::config::Settings;
use crate::normalize::{last_two_segments, normalize_mention, segment_count};
use crate::symbol::repository::SymbolRepository;
use crate::types::{Confidence, StableId};

use super::scanner::RawMention;
use super::suffix_index::SuffixIndex;
use super::types::{DocumentReference, ResolutionStatus};

const SUFFIX_MATCH_CONFIDENCE: f64 = 0.9;

pub struct MentionResolution {
    pub reference: DocumentReference,
}

pub struct MentionResolver<'a> {
    repository: &'a SymbolRepository<'a>,
    suffix_index: &'a SuffixIndex<'a>,
    settings: &'a Settings,
}

impl<'a> MentionResolver<'a> {
    pub fn new(
        repository: &'a SymbolRepository<'a>,
        suffix_index: &'a SuffixIndex<'a>,
        settings: &'a Settings,
    ) -> Self {
        Self {
            repository,
            suffix_index,
            settings,
        }
    }

    pub fn resolve(&self, mention: &RawMention) -> crate::error::CoreResult<MentionResolution> {
        // A directive naming a stable id directly pins the result, always
        // beating ordinary resolution.
        if let Some(stable_id) = &mention.directive_stable_id {
            let id = StableId::new(stable_id.clone());
            let record = self.repository.get(&id)?;
            let reference = DocumentReference {
                raw_text: mention.raw_text.clone(),
                normalized_text: normalize_mention(&mention.raw_text),
                line: mention.line,
                column: mention.column,
                context_snippet: mention.context_snippet.clone(),
                detection_method: mention.detection_method,
                resolution_status: ResolutionStatus::Exact,
                resolved_symbol_id: Some(id),
                resolved_display_name: record.map(|r| r.canonical_display()),
                candidates: Vec::new(),
                confidence: Confidence::ONE,
                last_resolved_at: Utc::now(),
            };
            return Ok(MentionResolution { reference });
        }

        let normalized = normalize_mention(&mention.raw_text);

        if segment_count(&normalized) < 2 {
            let reference = DocumentReference {
                raw_text: mention.raw_text.clone(),
                normalized_text: normalized,
                line: mention.line,
                column: mention.column,
                context_snippet: mention.context_snippet.clone(),
                detection_method: mention.detection_method,
                resolution_status: ResolutionStatus::Ineligible,
                resolved_symbol_id: None,
                resolved_display_name: None,
                candidates: Vec::new(),
                confidence: Confidence::ZERO,
                last_resolved_at: Utc::now(),
            };
            return Ok(MentionResolution { reference });
        }

        let exact_matches = self.repository.find_active_by_display_name(&normalized)?;
        if exact_matches.len() == 1 {
            let record = &exact_matches[0];
            let reference = DocumentReference {
                raw_text: mention.raw_text.clone(),
                normalized_text: normalized,
                line: mention.line,
                column: mention.column,
                context_snippet: mention.context_snippet.clone(),
                detection_method: mention.detection_method,
                resolution_status: ResolutionStatus::Exact,
                resolved_symbol_id: Some(record.stable_id.clone()),
                resolved_display_name: Some(record.canonical_display()),
                candidates: Vec::new(),
                confidence: Confidence::ONE,
                last_resolved_at: Utc::now(),
            };
            return Ok(MentionResolution { reference });
        }

        if let Some(key) = last_two_segments(&normalized) {
            let candidates = self.suffix_index.lookup(&key)?;
            if candidates.len() == 1 {
                let id = candidates[0].clone();
                let display = self.repository.get(&id)?.map(|r| r.canonical_display());
                let reference = DocumentReference {
                    raw_text: mention.raw_text.clone(),
                    normalized_text: normalized,
                    line: mention.line,
                    column: mention.column,
                    context_snippet: mention.context_snippet.clone(),
                    detection_method: mention.detection_method,
                    resolution_status: ResolutionStatus::Suffix,
                    resolved_symbol_id: Some(id),
                    resolved_display_name: display,
                    candidates: Vec::new(),
                    confidence: Confidence::clamped(SUFFIX_MATCH_CONFIDENCE),
                    last_resolved_at: Utc::now(),
                };
                return Ok(MentionResolution { reference });
            }
            if candidates.len() > 1 {
                let capped: Vec<_> = candidates
                    .into_iter()
                    .take(self.settings.documents.suffix_candidate_cap)
                    .collect();
                let reference = DocumentReference {
                    raw_text: mention.raw_text.clone(),
                    normalized_text: normalized,
                    line: mention.line,
                    column: mention.column,
                    context_snippet: mention.context_snippet.clone(),
                    detection_method: mention.detection_method,
                    resolution_status: ResolutionStatus::Ambiguous,
                    resolved_symbol_id: None,
                    resolved_display_name: None,
                    candidates: capped,
                    confidence: Confidence::ZERO,
                    last_resolved_at: Utc::now(),
                };
                return Ok(MentionResolution { reference });
            }
        }

        let reference = DocumentReference {
            raw_text: mention.raw_text.clone(),
            normalized_text: normalized,
            line: mention.line,
            column: mention.column,
            context_snippet: mention.context_snippet.clone(),
            detection_method: mention.detection_method,
            resolution_status: ResolutionStatus::Missing,
            resolved_symbol_id: None,
            resolved_display_name: None,
            candidates: Vec::new(),
            confidence: Confidence::ZERO,
            last_resolved_at: Utc::now(),
        };
        Ok(MentionResolution { reference })
    }
}
