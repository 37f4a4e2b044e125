//! Shared value types used across the identity and documentation layers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// A content-addressed, repository-scoped symbol identifier.
///
/// Opaque to everything outside the core: format is
/// `<prefix>:<repo-slug>:sym:<hex-hash>`, but callers must never parse it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for StableId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifies one refresh/indexing run. Threaded through tombstones and aliases
/// so every mutation can be traced back to the state that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoStateId(String);

impl RepoStateId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A confidence score, always in `[0.0, 1.0]`.
///
/// Validated once at construction so every other site can treat the value
/// as trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const ONE: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            return Err(ValidationError::new(
                "confidence",
                format!("must be in [0.0, 1.0], got {value}"),
            ));
        }
        Ok(Self(value))
    }

    /// Clamp instead of reject. Used for internally-computed scores where the
    /// weighted sum is proven to stay in range but float rounding could nudge
    /// it by an epsilon.
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Closed set of source languages the staleness coverage predicate and the
/// doc scanner's extension-rejection list reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    Rust,
    Go,
    Python,
    JavaScript,
    TypeScript,
    Java,
    CSharp,
    Ruby,
    Unknown,
}

impl SourceLanguage {
    /// Guess a language from a file extension, e.g. as found trailing a
    /// mention that actually looks like a file path (`handler.go`).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Self::Rust,
            "go" => Self::Go,
            "py" | "pyi" => Self::Python,
            "js" | "jsx" | "mjs" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "java" => Self::Java,
            "cs" => Self::CSharp,
            "rb" => Self::Ruby,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_roundtrips_through_display() {
        let id = StableId::new("sym:my-repo:sym:abcdef");
        assert_eq!(id.to_string(), "sym:my-repo:sym:abcdef");
        assert_eq!(id.as_str(), "sym:my-repo:sym:abcdef");
    }

    #[test]
    fn confidence_rejects_out_of_range() {
        assert!(Confidence::new(-0.1).is_err());
        assert!(Confidence::new(1.1).is_err());
        assert!(Confidence::new(f64::NAN).is_err());
        assert!(Confidence::new(0.0).is_ok());
        assert!(Confidence::new(1.0).is_ok());
    }

    #[test]
    fn confidence_clamped_never_panics() {
        assert_eq!(Confidence::clamped(1.5).value(), 1.0);
        assert_eq!(Confidence::clamped(-1.5).value(), 0.0);
    }

    #[test]
    fn source_language_from_extension() {
        assert_eq!(SourceLanguage::from_extension("go"), SourceLanguage::Go);
        assert_eq!(SourceLanguage::from_extension("PY"), SourceLanguage::Python);
        assert_eq!(SourceLanguage::from_extension("zzz"), SourceLanguage::Unknown);
    }
}
