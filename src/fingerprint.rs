//! Canonical string construction and stable-id hashing.
//!
//! Small, synchronous, pure functions at the hashing boundary (no I/O, no
//! allocation beyond the canonical string itself) — see
//! `fingerprint::stable_id`'s doc comment for the exact byte layout this
//! must never drift from.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::StableId;

/// Enumerated symbol kinds. Closed set — new kinds require a deliberate
/// addition here, not a fallback catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Struct,
    Enum,
    Variable,
    Constant,
    Field,
    Property,
    Namespace,
    Module,
    Package,
    Type,
    Parameter,
    Unknown,
}

impl SymbolKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Field => "field",
            Self::Property => "property",
            Self::Namespace => "namespace",
            Self::Module => "module",
            Self::Package => "package",
            Self::Type => "type",
            Self::Parameter => "parameter",
            Self::Unknown => "unknown",
        }
    }
}

/// Value type fed into stable-id hashing. Never stored standalone — a
/// `SymbolRecord` owns one by value.
///
/// Invariant: two fingerprints that are field-equal must hash identically,
/// regardless of the order their fields were constructed or serialized in —
/// `canonical_string` sorts its tagged parts before joining specifically to
/// guarantee this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFingerprint {
    pub container: String,
    pub name: String,
    pub kind: SymbolKind,
    pub arity: Option<u32>,
    pub normalized_signature: Option<String>,
}

impl SymbolFingerprint {
    pub fn new(container: impl Into<String>, name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
            kind,
            arity: None,
            normalized_signature: None,
        }
    }

    pub fn with_arity(mut self, arity: u32) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn with_signature(mut self, raw_signature: &str) -> Self {
        self.normalized_signature = Some(normalize_signature(raw_signature));
        self
    }
}

/// Strip all whitespace from a raw signature string. Used both for the
/// fingerprint's `normalized_signature` field and, separately, to derive a
/// definition-version id that tracks signature edits independent of the
/// stable id.
pub fn normalize_signature(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Build the canonical byte string for a fingerprint: tagged fields,
/// lexicographically sorted, joined with a single `\x1f` (unit separator)
/// delimiter byte. Sorting before joining is what makes the hash immune to
/// field-construction or serialization order.
pub fn canonical_string(fp: &SymbolFingerprint) -> String {
    let mut parts = vec![
        format!("container:{}", fp.container),
        format!("name:{}", fp.name),
        format!("kind:{}", fp.kind.tag()),
    ];
    if let Some(arity) = fp.arity {
        parts.push(format!("arity:{arity}"));
    }
    if let Some(sig) = &fp.normalized_signature {
        parts.push(format!("sig:{sig}"));
    }
    parts.sort();
    parts.join("\x1f")
}

/// Lowercase hex SHA-256 of a byte string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Lowercase, replace `/`, `:` and `\` with `-`, trim leading/trailing
/// dashes; empty result becomes `unknown`.
pub fn repo_slug(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| if matches!(c, '/' | ':' | '\\') { '-' } else { c })
        .collect();
    let trimmed = replaced.trim_matches('-');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<prefix>:<repo-slug>:sym:<64 lowercase hex chars>`. Deterministic over
/// `(prefix, repo slug, fingerprint)`; a collision is treated as a bug, not
/// handled defensively here.
pub fn stable_id(prefix: &str, slug: &str, fp: &SymbolFingerprint) -> StableId {
    let hash = sha256_hex(&canonical_string(fp));
    StableId::new(format!("{prefix}:{slug}:sym:{hash}"))
}

/// Hash of the whitespace-stripped raw signature, distinct from the stable
/// id on purpose: this changes whenever the signature text changes, even
/// when container/name/kind/arity/normalized-signature (and hence the
/// stable id) do not.
pub fn definition_version_id(raw_signature: &str) -> String {
    sha256_hex(&normalize_signature(raw_signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SymbolFingerprint {
        SymbolFingerprint::new("pkg.auth", "Login", SymbolKind::Function)
            .with_arity(2)
            .with_signature("fn Login ( ctx   Context ) error")
    }

    #[test]
    fn stable_id_is_deterministic() {
        let fp = sample();
        let a = stable_id("sym", "my-repo", &fp);
        let b = stable_id("sym", "my-repo", &fp);
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_string_is_order_independent() {
        // Build the same logical fingerprint via a different field
        // construction order; the canonical string must be identical.
        let a = SymbolFingerprint {
            container: "pkg.auth".to_string(),
            name: "Login".to_string(),
            kind: SymbolKind::Function,
            arity: Some(2),
            normalized_signature: Some("fnLogin(ctxContext)error".to_string()),
        };
        let b = sample();
        assert_eq!(canonical_string(&a), canonical_string(&b));
    }

    #[test]
    fn different_fingerprints_hash_differently() {
        let a = sample();
        let mut b = sample();
        b.name = "Logout".to_string();
        assert_ne!(canonical_string(&a), canonical_string(&b));
        assert_ne!(
            stable_id("sym", "my-repo", &a),
            stable_id("sym", "my-repo", &b)
        );
    }

    #[test]
    fn repo_slug_normalizes() {
        assert_eq!(repo_slug("Github.com/Foo/Bar"), "github.com-foo-bar");
        assert_eq!(repo_slug("C:\\repo\\x"), "c-repo-x");
        assert_eq!(repo_slug("///"), "unknown");
        assert_eq!(repo_slug(""), "unknown");
    }

    #[test]
    fn definition_version_id_tracks_signature_only() {
        let v1 = definition_version_id("fn Login(ctx Context) error");
        let v2 = definition_version_id("fn   Login(ctx Context)   error");
        assert_eq!(v1, v2, "whitespace differences must not change the version id");

        let v3 = definition_version_id("fn Login(ctx Context, extra bool) error");
        assert_ne!(v1, v3);
    }

    #[test]
    fn stable_id_has_expected_shape() {
        let fp = sample();
        let id = stable_id("sym", "my-repo", &fp);
        let s = id.as_str();
        assert!(s.starts_with("sym:my-repo:sym:"));
        let hash_part = s.rsplit(':').next().unwrap();
        assert_eq!(hash_part.len(), 64);
        assert!(hash_part.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
