//! Document and document-reference data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Confidence, StableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    Markdown,
    ArchitectureDecisionRecord,
}

impl DocumentType {
    /// File basename prefixed with `adr-`/`adr_`, or a directory name
    /// containing `adr` or `decisions`, marks an ADR; everything else is
    /// plain markdown.
    pub fn detect(path: &str) -> Self {
        let basename = path.rsplit('/').next().unwrap_or(path).to_lowercase();
        if basename.starts_with("adr-") || basename.starts_with("adr_") {
            return Self::ArchitectureDecisionRecord;
        }
        let lowered_path = path.to_lowercase();
        if lowered_path.split('/').any(|seg| seg.contains("adr") || seg.contains("decisions")) {
            return Self::ArchitectureDecisionRecord;
        }
        Self::Markdown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    Backtick,
    Directive,
    Fence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStatus {
    Exact,
    Suffix,
    Ambiguous,
    Missing,
    Ineligible,
}

/// A documentation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub doc_type: DocumentType,
    pub title: String,
    pub content_hash: String,
    pub last_indexed_at: DateTime<Utc>,
}

impl Document {
    /// Content hash determines whether a re-scan is required; callers
    /// compare against a freshly computed hash before re-indexing.
    pub fn has_changed(&self, fresh_content_hash: &str) -> bool {
        self.content_hash != fresh_content_hash
    }
}

/// A single mention inside a document.
///
/// Invariant: `Exact`/`Suffix` ⇒ `resolved_symbol_id` is present;
/// `Ambiguous` ⇒ `candidates` non-empty; `Ineligible` ⇒ no resolution was
/// attempted at all (status is the only field that's meaningful).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub raw_text: String,
    pub normalized_text: String,
    pub line: u32,
    pub column: u32,
    pub context_snippet: String,
    pub detection_method: DetectionMethod,
    pub resolution_status: ResolutionStatus,
    pub resolved_symbol_id: Option<StableId>,
    pub resolved_display_name: Option<String>,
    pub candidates: Vec<StableId>,
    pub confidence: Confidence,
    pub last_resolved_at: DateTime<Utc>,
}

impl DocumentReference {
    pub fn validate(&self) -> Result<(), crate::error::ValidationError> {
        use crate::error::ValidationError;
        match self.resolution_status {
            ResolutionStatus::Exact | ResolutionStatus::Suffix => {
                if self.resolved_symbol_id.is_none() {
                    return Err(ValidationError::new(
                        "resolved_symbol_id",
                        "required when resolution status is exact or suffix",
                    ));
                }
            }
            ResolutionStatus::Ambiguous => {
                if self.candidates.is_empty() {
                    return Err(ValidationError::new(
                        "candidates",
                        "must be non-empty when resolution status is ambiguous",
                    ));
                }
            }
            ResolutionStatus::Missing | ResolutionStatus::Ineligible => {}
        }
        Ok(())
    }
}
