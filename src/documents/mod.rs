//! Documentation Linkage: scans documentation files for symbol mentions,
//! resolves them against the symbol table, and tracks reference staleness.

pub mod indexer;
pub mod mention_resolver;
pub mod scanner;
pub mod staleness;
pub mod suffix_index;
pub mod types;

pub use indexer::{DocIndexer, IndexStats};
pub use mention_resolver::{MentionResolution, MentionResolver};
pub use scanner::{DocScanner, FenceIdentifierExtractor, NullExtractor, RawMention, ScanResult};
pub use staleness::{StalenessChecker, StalenessReport, StalenessStatus};
pub use suffix_index::{SuffixIndex, SuffixIndexEntry};
pub use types::{DetectionMethod, Document, DocumentReference, DocumentType, ResolutionStatus};
