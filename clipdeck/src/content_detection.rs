//! Content type detection for clipboard items
//!
//! Maps captured text to an [`EntryKind`]. Rules are checked in order and the
//! first match wins: web link, filesystem path, code, plain text.

use crate::interface::EntryKind;
use url::Url;

/// Schemes accepted as links. Everything else (mailto:, file:, custom-app://)
/// falls through to the later rules.
const LINK_SCHEMES: &[&str] = &["http", "https"];

/// Substrings that mark a snippet as code. Case-sensitive on purpose:
/// "select " in prose should stay text.
const CODE_MARKERS: &[&str] = &[
    "{", "}", "=>", "import ", "func ", "class ", "let ", "const ", "SELECT ", "#!/",
];

/// SQL keywords that add database search hints to code entries.
/// Matched against the uppercased content.
const SQL_MARKERS: &[&str] = &[
    "SELECT ", "FROM ", "WHERE ", "JOIN ", "INSERT ", "UPDATE ", "DELETE ", "GROUP BY",
    "ORDER BY",
];

/// Check if a string parses as an http(s) URL
fn is_web_url(trimmed: &str) -> bool {
    match Url::parse(trimmed) {
        Ok(url) => LINK_SCHEMES.contains(&url.scheme()),
        Err(_) => false,
    }
}

/// Check if a string looks like an absolute or home-relative path
fn is_path(trimmed: &str) -> bool {
    trimmed.starts_with('/') || trimmed.starts_with("~/")
}

fn has_code_marker(trimmed: &str) -> bool {
    CODE_MARKERS.iter().any(|marker| trimmed.contains(marker))
}

/// Classify captured text. Pure and total: every input maps to exactly one
/// of `Text`, `Link`, `Code` or `Path`.
pub fn classify(text: &str) -> EntryKind {
    let trimmed = text.trim();

    if is_web_url(trimmed) {
        return EntryKind::Link;
    }

    if is_path(trimmed) {
        return EntryKind::Path;
    }

    if has_code_marker(trimmed) {
        return EntryKind::Code;
    }

    EntryKind::Text
}

/// Case-insensitive probe for SQL keywords
pub fn contains_sql(text: &str) -> bool {
    let upper = text.to_uppercase();
    SQL_MARKERS.iter().any(|marker| upper.contains(marker))
}
