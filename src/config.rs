//! Layered configuration: defaults → TOML file → environment variables.
//!
//! Environment variables are prefixed with `SYMCORE_` and use double
//! underscores to separate nested levels, e.g. `SYMCORE_ALIAS__FUZZY_MATCH_THRESHOLD=0.5`.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Prefix used in every stable id: `<prefix>:<repo-slug>:sym:<hash>`.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Repo slug fed to the fingerprint layer for this workspace.
    #[serde(default = "default_repo_slug")]
    pub repo_slug: String,

    /// Alias/fuzzy-match tuning.
    #[serde(default)]
    pub alias: AliasConfig,

    /// Document scanning and resolution tuning.
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Where the SQLite database lives, relative to the workspace root.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AliasConfig {
    /// Scheme prefixes treated as stable rename anchors.
    #[serde(default = "default_anchor_prefixes")]
    pub anchor_backend_prefixes: Vec<String>,

    /// Confidence assigned to backend-anchor aliases.
    #[serde(default = "default_anchor_confidence")]
    pub anchor_alias_confidence: f64,

    /// Minimum fuzzy-match score to emit an alias.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_match_threshold: f64,

    /// Maximum hops the resolver follows before reporting a too-deep chain.
    #[serde(default = "default_chain_depth")]
    pub alias_chain_max_depth: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DocumentsConfig {
    /// Directories scanned for documentation, relative to the workspace root.
    #[serde(default)]
    pub doc_roots: Vec<PathBuf>,

    /// File extensions considered documentation.
    #[serde(default = "default_doc_extensions")]
    pub doc_extensions: Vec<String>,

    /// HTML-comment directive namespace, e.g. `<!-- docidx:pin ... -->`.
    #[serde(default = "default_directive_namespace")]
    pub directive_namespace: String,

    /// Maximum ambiguous candidates a suffix match may return before being
    /// classified `stale:ambiguous` instead of resolved.
    #[serde(default = "default_suffix_candidate_cap")]
    pub suffix_candidate_cap: usize,

    /// Worker count for bounded parallel file scanning.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` if set.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit ANSI color codes.
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_prefix() -> String {
    "sym".to_string()
}
fn default_repo_slug() -> String {
    "unknown".to_string()
}
fn default_anchor_prefixes() -> Vec<String> {
    vec!["scip:".to_string(), "lsif:".to_string()]
}
fn default_anchor_confidence() -> f64 {
    0.95
}
fn default_fuzzy_threshold() -> f64 {
    0.60
}
fn default_chain_depth() -> u32 {
    3
}
fn default_doc_extensions() -> Vec<String> {
    vec![".md".to_string(), ".mdx".to_string()]
}
fn default_directive_namespace() -> String {
    "docidx".to_string()
}
fn default_suffix_candidate_cap() -> usize {
    5
}
fn default_scan_concurrency() -> usize {
    4
}
fn default_database_path() -> PathBuf {
    PathBuf::from(".symbol-index/index.db")
}
fn default_log_filter() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            repo_slug: default_repo_slug(),
            alias: AliasConfig::default(),
            documents: DocumentsConfig::default(),
            database_path: default_database_path(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            anchor_backend_prefixes: default_anchor_prefixes(),
            anchor_alias_confidence: default_anchor_confidence(),
            fuzzy_match_threshold: default_fuzzy_threshold(),
            alias_chain_max_depth: default_chain_depth(),
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            doc_roots: Vec::new(),
            doc_extensions: default_doc_extensions(),
            directive_namespace: default_directive_namespace(),
            suffix_candidate_cap: default_suffix_candidate_cap(),
            scan_concurrency: default_scan_concurrency(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            ansi: true,
        }
    }
}

impl Settings {
    /// Load from workspace-relative `.symbol-index/settings.toml`, layering
    /// environment variables on top.
    pub fn load() -> Result<Self, figment::Error> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".symbol-index/settings.toml"));
        Self::load_from(config_path)
    }

    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SYMCORE_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".symbol-index");
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }
        None
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("invalid path")?;
        std::fs::create_dir_all(parent)?;
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_match_spec_constants() {
        let settings = Settings::default();
        assert_eq!(settings.prefix, "sym");
        assert_eq!(settings.alias.fuzzy_match_threshold, 0.60);
        assert_eq!(settings.alias.anchor_alias_confidence, 0.95);
        assert_eq!(settings.alias.alias_chain_max_depth, 3);
        assert_eq!(settings.documents.scan_concurrency, 4);
        assert_eq!(settings.documents.suffix_candidate_cap, 5);
    }

    #[test]
    fn load_from_toml_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
repo_slug = "my-repo"

[alias]
fuzzy_match_threshold = 0.75
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.repo_slug, "my-repo");
        assert_eq!(settings.alias.fuzzy_match_threshold, 0.75);
        // untouched defaults remain
        assert_eq!(settings.alias.anchor_alias_confidence, 0.95);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.repo_slug = "acme-widgets".to_string();
        settings.save(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.repo_slug, "acme-widgets");
    }

    #[test]
    fn env_vars_override_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "repo_slug = \"from-file\"\n").unwrap();

        unsafe {
            std::env::set_var("SYMCORE_REPO_SLUG", "from-env");
        }
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.repo_slug, "from-env");
        unsafe {
            std::env::remove_var("SYMCORE_REPO_SLUG");
        }
    }
}
