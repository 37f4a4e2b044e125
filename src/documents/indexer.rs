//! Doc Indexer: walks configured roots, scans changed files, and persists
//! documents plus their resolved references in one transaction per file.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rusqlite::params;

use crate::concurrency::CancellationToken;
use crate::config::Settings;
use crate::error::{CoreResult, StorageError};
use crate::persistence::SqlitePersistence;
use crate::symbol::repository::SymbolRepository;

use super::mention_resolver::MentionResolver;
use super::scanner::DocScanner;
use super::suffix_index::SuffixIndex;
use super::types::{Document, DocumentReference};

#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub files_scanned: u32,
    pub files_skipped_unchanged: u32,
    pub exact: u32,
    pub suffix: u32,
    pub ambiguous: u32,
    pub missing: u32,
    pub ineligible: u32,
    pub failures: Vec<String>,
}

pub struct DocIndexer<'a> {
    store: &'a SqlitePersistence,
    repository: &'a SymbolRepository<'a>,
    suffix_index: &'a SuffixIndex<'a>,
    settings: &'a Settings,
}

impl<'a> DocIndexer<'a> {
    pub fn new(
        store: &'a SqlitePersistence,
        repository: &'a SymbolRepository<'a>,
        suffix_index: &'a SuffixIndex<'a>,
        settings: &'a Settings,
    ) -> Self {
        Self {
            store,
            repository,
            suffix_index,
            settings,
        }
    }

    /// Walk configured roots, scan files that changed (or all, if `force`),
    /// and persist them. Bounded parallelism across files; cancellation is
    /// checked at each file boundary.
    pub fn index_all(&self, force: bool, cancellation: &CancellationToken) -> CoreResult<IndexStats> {
        let paths = self.discover_files()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.documents.scan_concurrency.max(1))
            .build()
            .map_err(|e| StorageError::ForeignKey(format!("failed to build scan pool: {e}")))?;

        let results: Vec<CoreResult<IndexStats>> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    if cancellation.is_cancelled() {
                        return Ok(IndexStats::default());
                    }
                    self.index_file_internal(path, force)
                })
                .collect()
        });

        let mut total = IndexStats::default();
        for result in results {
            match result {
                Ok(stats) => merge_stats(&mut total, stats),
                Err(e) => total.failures.push(e.to_string()),
            }
        }
        Ok(total)
    }

    pub fn index_file(&self, path: &Path) -> CoreResult<IndexStats> {
        self.index_file_internal(path, true)
    }

    fn index_file_internal(&self, path: &Path, force: bool) -> CoreResult<IndexStats> {
        let mut stats = IndexStats::default();
        let raw_bytes = std::fs::read(path).map_err(|source| crate::error::CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let repo_relative = path.to_string_lossy().to_string();

        let scanner = DocScanner::new(self.settings);
        let scan_result = scanner.scan(&repo_relative, &raw_bytes);

        if !force {
            if let Some(existing) = self.load_document(&repo_relative)? {
                if !existing.has_changed(&scan_result.document.content_hash) {
                    stats.files_skipped_unchanged = 1;
                    return Ok(stats);
                }
            }
        }

        let resolver = MentionResolver::new(self.repository, self.suffix_index, self.settings);
        let mut references = Vec::with_capacity(scan_result.raw_mentions.len());
        for mention in &scan_result.raw_mentions {
            let resolved = resolver.resolve(mention)?;
            tally(&mut stats, &resolved.reference);
            references.push(resolved.reference);
        }

        self.persist_document(&scan_result.document, &references, &scan_result.module_links)?;
        stats.files_scanned = 1;
        Ok(stats)
    }

    fn load_document(&self, path: &str) -> CoreResult<Option<Document>> {
        self.store.with_connection(|conn| {
            conn.query_row(
                "SELECT path, doc_type, title, content_hash, last_indexed_at FROM documents WHERE path = ?1",
                params![path],
                |row| {
                    Ok(Document {
                        path: row.get(0)?,
                        doc_type: doc_type_from_tag(&row.get::<_, String>(1)?),
                        title: row.get(2)?,
                        content_hash: row.get(3)?,
                        last_indexed_at: row
                            .get::<_, String>(4)?
                            .parse()
                            .unwrap_or_else(|_| chrono::Utc::now()),
                    })
                },
            )
            .optional_document()
        })
    }

    /// Delete-then-insert semantics: deleting a document row cascades (via
    /// foreign keys) to its references and module links.
    fn persist_document(
        &self,
        document: &Document,
        references: &[DocumentReference],
        module_links: &[String],
    ) -> CoreResult<()> {
        self.store.with_transaction(|tx| {
            tx.execute("DELETE FROM documents WHERE path = ?1", params![document.path])
                .map_err(|e| StorageError::db("delete document", e))?;

            tx.execute(
                "INSERT INTO documents (path, doc_type, title, content_hash, last_indexed_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    document.path,
                    doc_type_tag(document.doc_type),
                    document.title,
                    document.content_hash,
                    document.last_indexed_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StorageError::db("insert document", e))?;

            for reference in references {
                reference.validate()?;
                let candidates_json = serde_json::to_string(
                    &reference.candidates.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
                )
                .unwrap_or_else(|_| "[]".to_string());
                tx.execute(
                    "INSERT INTO document_references (\
                        doc_path, raw_text, normalized_text, line, column, context_snippet, \
                        detection_method, resolution_status, resolved_symbol_id, resolved_display_name, \
                        candidates, confidence, last_resolved_at\
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        document.path,
                        reference.raw_text,
                        reference.normalized_text,
                        reference.line as i64,
                        reference.column as i64,
                        reference.context_snippet,
                        detection_method_tag(reference.detection_method),
                        resolution_status_tag(reference.resolution_status),
                        reference.resolved_symbol_id.as_ref().map(|id| id.as_str().to_string()),
                        reference.resolved_display_name,
                        candidates_json,
                        reference.confidence.value(),
                        reference.last_resolved_at.to_rfc3339(),
                    ],
                )
                .map_err(|e| StorageError::db("insert reference", e))?;
            }

            for module_id in module_links {
                tx.execute(
                    "INSERT INTO document_modules (doc_path, module_id) VALUES (?1, ?2)",
                    params![document.path, module_id],
                )
                .map_err(|e| StorageError::db("insert module link", e))?;
            }

            Ok(())
        })
    }

    fn discover_files(&self) -> CoreResult<Vec<PathBuf>> {
        let mut out = Vec::new();
        for root in &self.settings.documents.doc_roots {
            if root.is_file() {
                out.push(root.clone());
                continue;
            }
            for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let has_doc_extension = self
                    .settings
                    .documents
                    .doc_extensions
                    .iter()
                    .any(|ext| path.to_string_lossy().ends_with(ext.as_str()));
                if has_doc_extension {
                    out.push(path.to_path_buf());
                }
            }
        }
        Ok(out)
    }
}

fn tally(stats: &mut IndexStats, reference: &DocumentReference) {
    use super::types::ResolutionStatus::*;
    match reference.resolution_status {
        Exact => stats.exact += 1,
        Suffix => stats.suffix += 1,
        Ambiguous => stats.ambiguous += 1,
        Missing => stats.missing += 1,
        Ineligible => stats.ineligible += 1,
    }
}

fn merge_stats(total: &mut IndexStats, part: IndexStats) {
    total.files_scanned += part.files_scanned;
    total.files_skipped_unchanged += part.files_skipped_unchanged;
    total.exact += part.exact;
    total.suffix += part.suffix;
    total.ambiguous += part.ambiguous;
    total.missing += part.missing;
    total.ineligible += part.ineligible;
    total.failures.extend(part.failures);
}

fn doc_type_tag(doc_type: super::types::DocumentType) -> &'static str {
    use super::types::DocumentType::*;
    match doc_type {
        Markdown => "markdown",
        ArchitectureDecisionRecord => "architecture-decision-record",
    }
}

fn doc_type_from_tag(tag: &str) -> super::types::DocumentType {
    use super::types::DocumentType::*;
    match tag {
        "architecture-decision-record" => ArchitectureDecisionRecord,
        _ => Markdown,
    }
}

fn detection_method_tag(method: super::types::DetectionMethod) -> &'static str {
    use super::types::DetectionMethod::*;
    match method {
        Backtick => "backtick",
        Directive => "directive",
        Fence => "fence",
    }
}

fn resolution_status_tag(status: super::types::ResolutionStatus) -> &'static str {
    use super::types::ResolutionStatus::*;
    match status {
        Exact => "exact",
        Suffix => "suffix",
        Ambiguous => "ambiguous",
        Missing => "missing",
        Ineligible => "ineligible",
    }
}

trait OptionalDocument {
    fn optional_document(self) -> CoreResult<Option<Document>>;
}

impl OptionalDocument for rusqlite::Result<Document> {
    fn optional_document(self) -> CoreResult<Option<Document>> {
        use rusqlite::OptionalExtension;
        self.optional().map_err(|e| StorageError::db("load document", e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn settings_with_root(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.documents.doc_roots = vec![dir.to_path_buf()];
        settings
    }

    #[test]
    fn index_all_skips_unchanged_files_unless_forced() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("readme.md");
        std::fs::File::create(&file_path)
            .unwrap()
            .write_all(b"# Title\n\nNo mentions here.\n")
            .unwrap();

        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = settings_with_root(dir.path());
        let repo = SymbolRepository::new(&store, &settings);
        let suffix_index = SuffixIndex::new(&store);
        let indexer = DocIndexer::new(&store, &repo, &suffix_index, &settings);
        let cancellation = CancellationToken::new();

        let first = indexer.index_all(false, &cancellation).unwrap();
        assert_eq!(first.files_scanned, 1);

        let second = indexer.index_all(false, &cancellation).unwrap();
        assert_eq!(second.files_skipped_unchanged, 1);
        assert_eq!(second.files_scanned, 0);

        let forced = indexer.index_all(true, &cancellation).unwrap();
        assert_eq!(forced.files_scanned, 1);
    }

    #[test]
    fn index_file_persists_references() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("doc.md");
        std::fs::File::create(&file_path)
            .unwrap()
            .write_all(b"See `pkg.auth.Login` for details.\n")
            .unwrap();

        let store = SqlitePersistence::open_in_memory().unwrap();
        let settings = settings_with_root(dir.path());
        let repo = SymbolRepository::new(&store, &settings);
        let suffix_index = SuffixIndex::new(&store);
        let indexer = DocIndexer::new(&store, &repo, &suffix_index, &settings);

        let stats = indexer.index_file(&file_path).unwrap();
        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.missing, 1); // no symbol registered yet
    }
}
