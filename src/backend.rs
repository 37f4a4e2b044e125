//! Backend-id classification: the one external collaborator contract the
//! repository consults before accepting a backend id as a rename anchor.

use crate::config::Settings;

/// Stability classification of a backend-supplied id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRole {
    /// Stable across restarts; eligible to anchor rename detection.
    Anchor,
    /// May change between restarts; usable by the resolver only, never
    /// stored as an anchor.
    ResolverOnly,
}

/// Classify a backend id by scheme prefix against the configured set of
/// anchor-stable prefixes. An empty id is always `ResolverOnly` — it can
/// never become an anchor.
pub fn classify_backend_id(backend_id: &str, settings: &Settings) -> BackendRole {
    if backend_id.is_empty() {
        return BackendRole::ResolverOnly;
    }
    if settings
        .alias
        .anchor_backend_prefixes
        .iter()
        .any(|prefix| backend_id.starts_with(prefix.as_str()))
    {
        BackendRole::Anchor
    } else {
        BackendRole::ResolverOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn empty_backend_id_is_never_an_anchor() {
        assert_eq!(classify_backend_id("", &settings()), BackendRole::ResolverOnly);
    }

    #[test]
    fn known_prefixes_are_anchors() {
        assert_eq!(
            classify_backend_id("scip:abc123", &settings()),
            BackendRole::Anchor
        );
        assert_eq!(
            classify_backend_id("lsif:xyz", &settings()),
            BackendRole::Anchor
        );
    }

    #[test]
    fn unknown_prefixes_are_resolver_only() {
        assert_eq!(
            classify_backend_id("lsp-session:12", &settings()),
            BackendRole::ResolverOnly
        );
        assert_eq!(
            classify_backend_id("file:///a.rs#L10", &settings()),
            BackendRole::ResolverOnly
        );
    }
}
