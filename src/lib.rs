//! Symbol Identity & Documentation Linkage Core.
//!
//! Two cooperating layers: a content-addressed symbol identity layer
//! (stable ids, alias chains, tombstones, identity resolution) and a
//! documentation linkage layer (scanning, mention resolution, staleness
//! detection) built on top of it.

pub mod alias;
pub mod backend;
pub mod concurrency;
pub mod config;
pub mod documents;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod normalize;
pub mod persistence;
pub mod resolver;
pub mod symbol;
pub mod types;

pub use alias::{AliasCreationReport, AliasCreator, AliasReason, AliasStore, SymbolAlias};
pub use backend::{classify_backend_id, BackendRole};
pub use concurrency::CancellationToken;
pub use config::Settings;
pub use documents::{
    DetectionMethod, DocIndexer, DocScanner, Document, DocumentReference, DocumentType, IndexStats,
    MentionResolver, ResolutionStatus, ScanResult, StalenessChecker, StalenessReport,
    StalenessStatus, SuffixIndex,
};
pub use error::{CoreError, CoreResult};
pub use fingerprint::{SymbolFingerprint, SymbolKind};
pub use persistence::SqlitePersistence;
pub use resolver::{IdentityResolver, ResolvedSymbol};
pub use symbol::repository::{ListFilter, SymbolRepository};
pub use symbol::{Location, SymbolRecord, SymbolState};
pub use types::{Confidence, RepoStateId, SourceLanguage, StableId};

use std::path::Path;

/// Ties the persistence layer, symbol repository, alias store, identity
/// resolver, suffix index and doc indexer together behind one handle, the
/// way a caller actually wires this system up end to end.
pub struct Engine {
    pub store: SqlitePersistence,
    pub settings: Settings,
}

impl Engine {
    pub fn open(settings: Settings) -> CoreResult<Self> {
        let store = SqlitePersistence::open(&settings.database_path)?;
        Ok(Self { store, settings })
    }

    pub fn open_in_memory(settings: Settings) -> CoreResult<Self> {
        let store = SqlitePersistence::open_in_memory()?;
        Ok(Self { store, settings })
    }

    pub fn repository(&self) -> SymbolRepository<'_> {
        SymbolRepository::new(&self.store, &self.settings)
    }

    pub fn alias_store(&self) -> AliasStore<'_> {
        AliasStore::new(&self.store)
    }

    pub fn suffix_index(&self) -> SuffixIndex<'_> {
        SuffixIndex::new(&self.store)
    }

    pub fn identity_resolver<'a>(
        &'a self,
        repository: &'a SymbolRepository<'a>,
        alias_store: &'a AliasStore<'a>,
    ) -> IdentityResolver<'a> {
        IdentityResolver::new(repository, alias_store, &self.settings)
    }

    pub fn doc_indexer<'a>(
        &'a self,
        repository: &'a SymbolRepository<'a>,
        suffix_index: &'a SuffixIndex<'a>,
    ) -> DocIndexer<'a> {
        DocIndexer::new(&self.store, repository, suffix_index, &self.settings)
    }

    /// Reconcile a freshly indexed symbol set against the live table: insert
    /// new records, emit rename/fuzzy aliases or tombstones for vanished
    /// ones, then rebuild the suffix index so document resolution sees the
    /// new active set immediately.
    pub fn refresh(
        &self,
        new_records: &[SymbolRecord],
        state_id: &RepoStateId,
        new_suffix_version: &str,
    ) -> CoreResult<AliasCreationReport> {
        let repository = self.repository();
        for record in new_records {
            if repository.get(&record.stable_id)?.is_some() {
                repository.update(record)?;
            } else {
                repository.create(record)?;
            }
        }

        let alias_store = self.alias_store();
        let creator = AliasCreator::new(&repository, &alias_store, &self.store, &self.settings);
        let report = creator.create_aliases_on_refresh(new_records, state_id)?;

        self.suffix_index().rebuild(&repository, new_suffix_version)?;
        Ok(report)
    }

    pub fn index_documentation(&self, force: bool, cancellation: &CancellationToken) -> CoreResult<IndexStats> {
        let repository = self.repository();
        let suffix_index = self.suffix_index();
        let indexer = self.doc_indexer(&repository, &suffix_index);
        indexer.index_all(force, cancellation)
    }

    pub fn index_documentation_file(&self, path: &Path) -> CoreResult<IndexStats> {
        let repository = self.repository();
        let suffix_index = self.suffix_index();
        let indexer = self.doc_indexer(&repository, &suffix_index);
        indexer.index_file(path)
    }
}
