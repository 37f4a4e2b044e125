//! Documentation Scanner: per-file extraction of mentions, directives, and
//! module links, plus content hashing for change detection.

use chrono::Utc;

use crate::config::Settings;
use crate::fingerprint::sha256_hex;
use crate::normalize::normalize_mention;
use crate::types::SourceLanguage;

use super::types::{DetectionMethod, Document, DocumentReference, DocumentType, ResolutionStatus};

/// Raw, unresolved mentions and module links extracted from one file. The
/// Mention Resolver turns `raw_mentions` into `DocumentReference`s; this
/// stage never touches the symbol table.
pub struct ScanResult {
    pub document: Document,
    pub raw_mentions: Vec<RawMention>,
    pub module_links: Vec<String>,
}

pub struct RawMention {
    pub raw_text: String,
    pub line: u32,
    pub column: u32,
    pub context_snippet: String,
    pub detection_method: DetectionMethod,
    /// Present only for `Directive` mentions whose directive named a stable
    /// id rather than a qualified name — overrides normal resolution.
    pub directive_stable_id: Option<String>,
}

/// Capability-gated hook for fenced-code identifier extraction. No
/// implementation is wired in by default — `NullExtractor` always returns
/// no identifiers, keeping the extension point real without a parsing
/// dependency.
pub trait FenceIdentifierExtractor {
    fn extract(&self, fence_language: &str, fence_body: &str) -> Vec<String>;
}

pub struct NullExtractor;

impl FenceIdentifierExtractor for NullExtractor {
    fn extract(&self, _fence_language: &str, _fence_body: &str) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceToken {
    Backtick,
    Tilde,
}

pub struct DocScanner<'a> {
    settings: &'a Settings,
    directive_namespace: String,
}

impl<'a> DocScanner<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        let directive_namespace = settings.documents.directive_namespace.clone();
        Self {
            settings,
            directive_namespace,
        }
    }

    pub fn scan(&self, path: &str, raw_bytes: &[u8]) -> ScanResult {
        let content_hash = sha256_hex(&String::from_utf8_lossy(raw_bytes));
        let text = String::from_utf8_lossy(raw_bytes);

        let mut title = String::new();
        let mut mentions = Vec::new();
        let mut module_links = Vec::new();
        let mut fence: Option<FenceToken> = None;

        for (line_idx, line) in text.lines().enumerate() {
            let line_no = (line_idx + 1) as u32;

            if title.is_empty() {
                if let Some(heading) = line.strip_prefix("# ") {
                    title = heading.trim().to_string();
                } else if line.trim() == "#" {
                    title = String::new();
                }
            }

            self.update_fence_state(line, &mut fence);

            self.extract_directives(line, line_no, &mut mentions, &mut module_links);
            self.extract_backtick_mentions(line, line_no, &mut mentions);
        }

        let document = Document {
            path: path.to_string(),
            doc_type: DocumentType::detect(path),
            title,
            content_hash,
            last_indexed_at: Utc::now(),
        };

        ScanResult {
            document,
            raw_mentions: mentions,
            module_links,
        }
    }

    /// A fence is opened by a line starting with ``` or ~~~ and closed only
    /// by the same token; mixed-delimiter nesting collapses to the outer
    /// fence's kind (we never look for a second opener while one is active).
    fn update_fence_state(&self, line: &str, fence: &mut Option<FenceToken>) {
        let trimmed = line.trim_start();
        let token = if trimmed.starts_with("```") {
            Some(FenceToken::Backtick)
        } else if trimmed.starts_with("~~~") {
            Some(FenceToken::Tilde)
        } else {
            None
        };
        match (fence.as_ref(), token) {
            (None, Some(opened)) => *fence = Some(opened),
            (Some(open), Some(seen)) if *open == seen => *fence = None,
            _ => {}
        }
    }

    fn extract_directives(
        &self,
        line: &str,
        line_no: u32,
        mentions: &mut Vec<RawMention>,
        module_links: &mut Vec<String>,
    ) {
        let symbol_prefix = format!("<!-- {}:symbol ", self.directive_namespace);
        let module_prefix = format!("<!-- {}:module ", self.directive_namespace);

        if let Some(rest) = line.trim().strip_prefix(&symbol_prefix) {
            if let Some(value) = rest.strip_suffix("-->").map(|s| s.trim()) {
                let looks_like_stable_id = value.matches(':').count() >= 2;
                mentions.push(RawMention {
                    raw_text: value.to_string(),
                    line: line_no,
                    column: 1,
                    context_snippet: truncate_snippet(line),
                    detection_method: DetectionMethod::Directive,
                    directive_stable_id: looks_like_stable_id.then(|| value.to_string()),
                });
            }
        }

        if let Some(rest) = line.trim().strip_prefix(&module_prefix) {
            if let Some(value) = rest.strip_suffix("-->").map(|s| s.trim()) {
                module_links.push(value.to_string());
            }
        }
    }

    /// Identifiers of the shape `<ident>(<sep><ident>)+`, scanned inside and
    /// outside fences. A mention whose trailing segment looks like a known
    /// source-file extension is rejected to avoid matching file paths.
    fn extract_backtick_mentions(&self, line: &str, line_no: u32, mentions: &mut Vec<RawMention>) {
        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'`' {
                if let Some(end) = line[i + 1..].find('`') {
                    let candidate = &line[i + 1..i + 1 + end];
                    if is_qualified_identifier(candidate) && !looks_like_source_file(candidate) {
                        mentions.push(RawMention {
                            raw_text: candidate.to_string(),
                            line: line_no,
                            column: (i + 1) as u32,
                            context_snippet: truncate_snippet(line),
                            detection_method: DetectionMethod::Backtick,
                            directive_stable_id: None,
                        });
                    }
                    i += end + 2;
                    continue;
                }
            }
            i += 1;
        }
    }
}

fn is_qualified_identifier(candidate: &str) -> bool {
    let normalized = normalize_mention(candidate);
    crate::normalize::segment_count(&normalized) >= 2
        && normalized
            .split('.')
            .all(|seg| !seg.is_empty() && is_identifier(seg))
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn looks_like_source_file(candidate: &str) -> bool {
    match candidate.rsplit_once('.') {
        Some((_, ext)) => SourceLanguage::from_extension(ext) != SourceLanguage::Unknown,
        None => false,
    }
}

fn truncate_snippet(line: &str) -> String {
    if line.chars().count() <= 100 {
        line.to_string()
    } else {
        let truncated: String = line.chars().take(100).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn extracts_title_from_level_one_heading() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan("README.md", b"# My Title\n\nBody text.\n");
        assert_eq!(result.document.title, "My Title");
    }

    #[test]
    fn missing_heading_leaves_title_empty() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan("README.md", b"No heading here.\n");
        assert_eq!(result.document.title, "");
    }

    #[test]
    fn extracts_backtick_mentions_with_dotted_path() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan("doc.md", b"Call `pkg.auth.Login` to authenticate.\n");
        assert_eq!(result.raw_mentions.len(), 1);
        assert_eq!(result.raw_mentions[0].raw_text, "pkg.auth.Login");
    }

    #[test]
    fn rejects_mentions_with_source_file_extension() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan("doc.md", b"See `pkg.handler.go` for details.\n");
        assert!(result.raw_mentions.is_empty());
    }

    #[test]
    fn single_segment_mention_is_not_extracted() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan("doc.md", b"The `Login` function.\n");
        assert!(result.raw_mentions.is_empty());
    }

    #[test]
    fn directive_symbol_mention_is_detected() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan(
            "doc.md",
            b"<!-- docidx:symbol pkg.auth.Login -->\nSome text.\n",
        );
        assert_eq!(result.raw_mentions.len(), 1);
        assert_eq!(result.raw_mentions[0].detection_method as u8, DetectionMethod::Directive as u8);
    }

    #[test]
    fn directive_module_link_is_detected() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan("doc.md", b"<!-- docidx:module pkg.auth -->\n");
        assert_eq!(result.module_links, vec!["pkg.auth".to_string()]);
    }

    #[test]
    fn mentions_inside_fences_are_still_extracted() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan(
            "doc.md",
            b"```go\nresult := `pkg.auth.Login`\n```\n",
        );
        assert_eq!(result.raw_mentions.len(), 1);
    }

    #[test]
    fn mixed_delimiter_fence_closes_only_on_matching_token() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        // Opens with backtick fence; a tilde line inside does not close it.
        let result = scanner.scan(
            "doc.md",
            b"```\n~~~\n`pkg.auth.Login`\n```\n",
        );
        // the mention line is still inside the (still-open) backtick fence,
        // but fenced mentions are extracted too, not skipped.
        assert_eq!(result.raw_mentions.len(), 1);
    }

    #[test]
    fn content_hash_changes_with_content() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let a = scanner.scan("doc.md", b"hello");
        let b = scanner.scan("doc.md", b"world");
        assert_ne!(a.document.content_hash, b.document.content_hash);
    }

    #[test]
    fn adr_filename_detected_as_doc_type() {
        let settings_value = settings();
        let scanner = DocScanner::new(&settings_value);
        let result = scanner.scan("docs/adr-0001-db.md", b"# Pick a database\n");
        assert_eq!(result.document.doc_type, DocumentType::ArchitectureDecisionRecord);
    }

    #[test]
    fn null_extractor_yields_no_identifiers() {
        let extractor = NullExtractor;
        assert!(extractor.extract("go", "func main() {}").is_empty());
    }
}
