//! End-to-end scenarios wiring the symbol identity layer and the
//! documentation linkage layer together through `Engine`.

use std::io::Write;

use chrono::Utc;
use symlink_core::{
    CancellationToken, DocScanner, Engine, Location, MentionResolver, RepoStateId, Settings,
    StableId, StalenessChecker, StalenessStatus, SymbolFingerprint, SymbolKind, SymbolRecord,
};
use tempfile::TempDir;

fn record(id: &str, container: &str, name: &str, state: &str) -> SymbolRecord {
    SymbolRecord::new(
        StableId::new(id.to_string()),
        SymbolFingerprint::new(container, name, SymbolKind::Function),
        Location::new("src/auth.rs", 10, 1),
        Utc::now(),
        RepoStateId::new(state),
    )
}

/// A symbol is renamed across two refreshes; a doc mention pinned to the
/// old name should come back `stale:renamed` pointing at the new id.
#[test]
fn rename_across_refresh_marks_doc_mention_stale_renamed() {
    let engine = Engine::open_in_memory(Settings::default()).unwrap();

    let old = record("sym:r:sym:login-old", "pkg.auth", "Login", "state-1");
    engine.refresh(&[old.clone()], &RepoStateId::new("state-1"), "v1").unwrap();

    let repository = engine.repository();
    let suffix_index = engine.suffix_index();
    let settings = Settings::default();
    let mention_resolver = MentionResolver::new(&repository, &suffix_index, &settings);

    let scan = DocScanner::new(&settings).scan("docs/auth.md", b"Call `pkg.auth.Login` to sign in.\n");
    assert_eq!(scan.raw_mentions.len(), 1);
    let resolved = mention_resolver.resolve(&scan.raw_mentions[0]).unwrap();
    assert_eq!(resolved.reference.resolved_symbol_id.as_ref().unwrap(), &old.stable_id);

    // Same container+name+kind reappears under a new id: a backend-anchor-free
    // rename, caught by the fuzzy-match strategy.
    let renamed = record("sym:r:sym:login-new", "pkg.auth", "Login", "state-2");
    engine.refresh(&[renamed.clone()], &RepoStateId::new("state-2"), "v2").unwrap();

    let alias_store = engine.alias_store();
    let resolver = engine.identity_resolver(&repository, &alias_store);
    let covered: [symlink_core::SourceLanguage; 0] = [];
    let checker = StalenessChecker::new(&resolver, &repository, &suffix_index, &covered);

    let report = checker.classify(&resolved.reference).unwrap().unwrap();
    match report.status {
        StalenessStatus::StaleRenamed { new_symbol_id, .. } => {
            assert_eq!(new_symbol_id, renamed.stable_id);
        }
        other => panic!("expected StaleRenamed, got {other:?}"),
    }
}

/// A symbol that simply vanishes (no replacement) leaves a doc mention
/// `stale:missing`, with no suggestions once the suffix index no longer
/// carries it.
#[test]
fn removed_symbol_marks_doc_mention_stale_missing() {
    let engine = Engine::open_in_memory(Settings::default()).unwrap();

    let only = record("sym:r:sym:login", "pkg.auth", "Login", "state-1");
    engine.refresh(&[only.clone()], &RepoStateId::new("state-1"), "v1").unwrap();

    let repository = engine.repository();
    let suffix_index = engine.suffix_index();
    let settings = Settings::default();
    let mention_resolver = MentionResolver::new(&repository, &suffix_index, &settings);
    let scan = DocScanner::new(&settings).scan("docs/auth.md", b"Call `pkg.auth.Login` to sign in.\n");
    let resolved = mention_resolver.resolve(&scan.raw_mentions[0]).unwrap();

    engine.refresh(&[], &RepoStateId::new("state-2"), "v2").unwrap();

    let alias_store = engine.alias_store();
    let resolver = engine.identity_resolver(&repository, &alias_store);
    let covered: [symlink_core::SourceLanguage; 0] = [];
    let checker = StalenessChecker::new(&resolver, &repository, &suffix_index, &covered);

    let report = checker.classify(&resolved.reference).unwrap().unwrap();
    assert!(matches!(report.status, StalenessStatus::StaleMissing { .. }));
}

/// Indexing a documentation root end to end through `Engine::index_documentation`
/// persists a document and its references, and a forced re-run re-scans it.
#[test]
fn index_documentation_scans_and_persists_references() {
    let dir = TempDir::new().unwrap();
    std::fs::File::create(dir.path().join("guide.md"))
        .unwrap()
        .write_all(b"# Guide\n\nSee `pkg.auth.Login` for details.\n")
        .unwrap();

    let mut settings = Settings::default();
    settings.documents.doc_roots = vec![dir.path().to_path_buf()];
    let engine = Engine::open_in_memory(settings).unwrap();

    let login = record("sym:r:sym:login", "pkg.auth", "Login", "state-1");
    engine.refresh(&[login], &RepoStateId::new("state-1"), "v1").unwrap();

    let cancellation = CancellationToken::new();
    let stats = engine.index_documentation(false, &cancellation).unwrap();
    assert_eq!(stats.files_scanned, 1);
    assert_eq!(stats.exact, 1);

    let again = engine.index_documentation(false, &cancellation).unwrap();
    assert_eq!(again.files_skipped_unchanged, 1);

    let forced = engine.index_documentation(true, &cancellation).unwrap();
    assert_eq!(forced.files_scanned, 1);
    assert_eq!(forced.exact, 1);
}

/// A symbol moved to a sibling namespace and file, but keeping its name and
/// kind, scores kind (0.30) + name (0.40) + root-namespace (0.10) +
/// same-directory (0.05) = 0.85 — above the 0.60 default threshold, so the
/// fuzzy strategy still links it.
#[test]
fn fuzzy_match_links_symbol_moved_to_a_new_file_in_same_namespace() {
    let engine = Engine::open_in_memory(Settings::default()).unwrap();

    let old = record("sym:r:sym:old", "pkg.auth", "Login", "state-1");
    engine.refresh(&[old.clone()], &RepoStateId::new("state-1"), "v1").unwrap();

    let mut moved = record("sym:r:sym:moved", "pkg.session", "Login", "state-2");
    moved.location = Location::new("src/session.rs", 4, 1);
    let report = engine.refresh(&[moved.clone()], &RepoStateId::new("state-2"), "v2").unwrap();

    assert_eq!(report.aliases_emitted, 1);

    let repository = engine.repository();
    let alias_store = engine.alias_store();
    let resolver = engine.identity_resolver(&repository, &alias_store);
    match resolver.resolve(&old.stable_id) {
        symlink_core::ResolvedSymbol::FoundViaRedirect { record, .. } => {
            assert_eq!(record.stable_id, moved.stable_id);
        }
        other => panic!("expected FoundViaRedirect, got a different outcome: {other:?}"),
    }
}
