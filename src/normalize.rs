//! Delimiter normalization shared by symbol display names and document
//! mentions, so a qualified name written with `::`, `#`, `->` or `/` lines
//! up with the dotted form stored in the suffix index.

/// Replace the recognized separator alphabet with `.`, then trim leading and
/// trailing dots. Does not strip backticks — callers that may receive
/// backtick-wrapped text (raw document mentions) do that first.
pub fn normalize_delimiters(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if raw[i..].starts_with("::") {
            out.push('.');
            i += 2;
        } else if raw[i..].starts_with("->") {
            out.push('.');
            i += 2;
        } else if bytes[i] == b'#' || bytes[i] == b'/' {
            out.push('.');
            i += 1;
        } else {
            // copy one char (handles multi-byte UTF-8 correctly)
            let ch = raw[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    out.trim_matches('.').to_string()
}

/// Strip a single layer of surrounding backticks, then normalize delimiters.
/// Used to turn a raw document mention into its canonical comparison form.
pub fn normalize_mention(raw: &str) -> String {
    let stripped = raw.trim_matches('`');
    normalize_delimiters(stripped)
}

/// Number of non-empty dot-separated segments.
pub fn segment_count(normalized: &str) -> usize {
    normalized.split('.').filter(|s| !s.is_empty()).count()
}

/// The last two dot-separated segments, joined by `.`. This is the suffix
/// index's query key — note this joins literally with `.` even when the
/// original delimiter was `::` or `#` (see DESIGN.md).
pub fn last_two_segments(normalized: &str) -> Option<String> {
    let segments: Vec<&str> = normalized.split('.').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return None;
    }
    Some(segments[segments.len() - 2..].join("."))
}

/// Every non-empty trailing dotted suffix of a normalized name, longest
/// first. For `pkg.auth.Login` this is `["pkg.auth.Login", "auth.Login",
/// "Login"]`.
pub fn trailing_suffixes(normalized: &str) -> Vec<String> {
    let segments: Vec<&str> = normalized.split('.').filter(|s| !s.is_empty()).collect();
    (0..segments.len()).map(|i| segments[i..].join(".")).collect()
}

/// The display form of a symbol's qualified name: container and name joined
/// by `.`, with the container's own delimiters normalized first so it lines
/// up with document mentions regardless of source-language punctuation.
pub fn canonical_display(container: &str, name: &str) -> String {
    let norm_container = normalize_delimiters(container);
    if norm_container.is_empty() {
        name.to_string()
    } else {
        format!("{norm_container}.{name}")
    }
}

/// First dotted segment of a qualified container, used by the fuzzy matcher
/// for the "same root namespace" factor.
pub fn root_namespace(container: &str) -> &str {
    let normalized_len = container.find('.').unwrap_or(container.len());
    &container[..normalized_len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_all_delimiter_styles() {
        assert_eq!(normalize_delimiters("pkg::auth::Login"), "pkg.auth.Login");
        assert_eq!(normalize_delimiters("pkg#auth#Login"), "pkg.auth.Login");
        assert_eq!(normalize_delimiters("pkg/auth/Login"), "pkg.auth.Login");
        assert_eq!(normalize_delimiters("pkg->auth->Login"), "pkg.auth.Login");
    }

    #[test]
    fn normalize_mention_strips_backticks_and_trims_dots() {
        assert_eq!(normalize_mention("`auth.Login`"), "auth.Login");
        assert_eq!(normalize_mention(".auth.Login."), "auth.Login");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_mention("`pkg::auth::Login`");
        let twice = normalize_mention(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn segment_count_counts_non_empty_segments() {
        assert_eq!(segment_count("auth.Login"), 2);
        assert_eq!(segment_count("Login"), 1);
        assert_eq!(segment_count(""), 0);
    }

    #[test]
    fn last_two_segments_joins_with_dot() {
        assert_eq!(
            last_two_segments("pkg.auth.Login").as_deref(),
            Some("auth.Login")
        );
        assert_eq!(last_two_segments("Login"), None);
    }

    #[test]
    fn trailing_suffixes_enumerates_longest_first() {
        assert_eq!(
            trailing_suffixes("pkg.auth.Login"),
            vec!["pkg.auth.Login", "auth.Login", "Login"]
        );
    }

    #[test]
    fn canonical_display_joins_container_and_name() {
        assert_eq!(canonical_display("pkg.auth", "Login"), "pkg.auth.Login");
        assert_eq!(canonical_display("", "Login"), "Login");
        assert_eq!(canonical_display("pkg::auth", "Login"), "pkg.auth.Login");
    }

    #[test]
    fn root_namespace_takes_first_segment() {
        assert_eq!(root_namespace("api.V2Server"), "api");
        assert_eq!(root_namespace("api"), "api");
    }
}
