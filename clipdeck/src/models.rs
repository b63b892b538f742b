//! Core data model helpers for clipboard entries
//!
//! `ClipboardEntry` itself lives in `interface` so UniFFI can export it; this
//! module adds the constructors and derived text used for ranking and display.

use crate::content_detection::{classify, contains_sql};
use crate::interface::{ClipboardEntry, EntryKind};

/// Max chars of the one-line title for text-like entries
const TITLE_LIMIT: usize = 96;
/// Max chars of the one-line title built from an AI image title
const IMAGE_TITLE_LIMIT: usize = 90;

/// Fresh opaque entry id
pub fn new_entry_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ClipboardEntry {
    /// Create a text entry (kind auto-detected)
    pub fn new_text(content: String, source_app: Option<String>, captured_at_ms: i64) -> Self {
        let kind = classify(&content);
        Self::plain(new_entry_id(), content, kind, source_app, captured_at_ms)
    }

    /// Create a path entry from a file/URL list (one path per line)
    pub fn new_paths(paths: &[String], source_app: Option<String>, captured_at_ms: i64) -> Self {
        Self::plain(
            new_entry_id(),
            paths.join("\n"),
            EntryKind::Path,
            source_app,
            captured_at_ms,
        )
    }

    /// Create an image entry whose bytes are already persisted at `image_path`.
    /// Both enrichments start pending.
    pub fn new_image(
        id: String,
        image_path: String,
        source_app: Option<String>,
        captured_at_ms: i64,
    ) -> Self {
        Self {
            id,
            content: String::new(),
            captured_at_ms,
            source_app,
            kind: EntryKind::Image,
            image_path: Some(image_path),
            ocr_text: String::new(),
            ocr_pending: true,
            ai_title: String::new(),
            ai_title_pending: true,
        }
    }

    fn plain(
        id: String,
        content: String,
        kind: EntryKind,
        source_app: Option<String>,
        captured_at_ms: i64,
    ) -> Self {
        Self {
            id,
            content,
            captured_at_ms,
            source_app,
            kind,
            image_path: None,
            ocr_text: String::new(),
            ocr_pending: false,
            ai_title: String::new(),
            ai_title_pending: false,
        }
    }

    /// Matching-only keywords for the entry's kind. Never displayed.
    pub fn search_hints(&self) -> String {
        let mut hints: Vec<&str> = vec![];
        let label = self.kind.label().to_lowercase();

        match self.kind {
            EntryKind::Code => {
                hints.extend(["snippet", "command", "query"]);
                if contains_sql(&self.content) {
                    hints.extend(["sql", "database", "query", "postgres", "mysql"]);
                }
            }
            EntryKind::Image => hints.extend(["photo", "screenshot", "picture"]),
            EntryKind::Link => hints.extend(["url", "web", "website"]),
            EntryKind::Path => hints.extend(["file", "directory", "folder"]),
            EntryKind::Text => hints.extend(["note", "plain"]),
            EntryKind::All => {}
        }

        std::iter::once(label.as_str())
            .chain(hints)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Lowercased haystack the fuzzy ranker searches:
    /// content, OCR text, AI title, source app, kind label and hints.
    pub fn searchable_text(&self) -> String {
        [
            self.content.as_str(),
            self.ocr_text.as_str(),
            self.ai_title.as_str(),
            self.source_app.as_deref().unwrap_or(""),
            self.kind.label(),
            self.search_hints().as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }

    /// One-line title for list display
    pub fn title_line(&self) -> String {
        match self.kind {
            EntryKind::Image => {
                let title = self.ai_title.trim();
                if !title.is_empty() {
                    return compact_line(title, IMAGE_TITLE_LIMIT);
                }
                self.image_summary()
            }
            _ => compact_line(&self.content, TITLE_LIMIT),
        }
    }

    /// Fallback image title: "Image", the pixel size when the file is
    /// readable, and the source app when known
    fn image_summary(&self) -> String {
        let mut parts = vec!["Image".to_string()];
        if let Some((width, height)) = self
            .image_path
            .as_deref()
            .and_then(|path| image::image_dimensions(path).ok())
        {
            parts.push(format!("({}×{})", width, height));
        }
        if let Some(app) = self.source_app.as_deref().filter(|app| !app.is_empty()) {
            parts.push(format!("· {}", app));
        }
        parts.join(" ")
    }

    pub fn is_image(&self) -> bool {
        self.kind == EntryKind::Image
    }
}

/// List title for an entry, computed on the Rust side so the shell and the
/// search index agree
#[uniffi::export]
pub fn entry_title(entry: ClipboardEntry) -> String {
    entry.title_line()
}

/// SF Symbol name shown next to entries and filter items of `kind`
#[uniffi::export]
pub fn kind_symbol(kind: EntryKind) -> String {
    kind.symbol().to_string()
}

/// Collapse newlines, trim, and truncate to `limit` chars with an ellipsis
pub fn compact_line(text: &str, limit: usize) -> String {
    let one_line = text.replace('\n', " ");
    let one_line = one_line.trim();
    if one_line.chars().count() <= limit {
        return one_line.to_string();
    }
    let mut truncated: String = one_line.chars().take(limit).collect();
    truncated.push('…');
    truncated
}
