//! clipdeck FFI Interface Definition
//!
//! This file defines the public interface exposed to the native shell via UniFFI.
//! It acts as the source of truth for shared types.

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Content category of a clipboard entry.
///
/// `All` is the filter pseudo-kind: it is never assigned to a captured entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, uniffi::Enum)]
pub enum EntryKind {
    #[default]
    All,
    Text,
    Link,
    Code,
    Path,
    Image,
}

impl EntryKind {
    /// Every kind, in menu order.
    pub const ALL_KINDS: [EntryKind; 6] = [
        EntryKind::All,
        EntryKind::Text,
        EntryKind::Link,
        EntryKind::Code,
        EntryKind::Path,
        EntryKind::Image,
    ];

    /// Display label, also the persisted form
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::All => "All",
            EntryKind::Text => "Text",
            EntryKind::Link => "Link",
            EntryKind::Code => "Code",
            EntryKind::Path => "Path",
            EntryKind::Image => "Image",
        }
    }

    /// Parse a persisted label. Unknown labels fall back to `Text`.
    pub fn from_label(label: &str) -> Self {
        Self::ALL_KINDS
            .into_iter()
            .find(|k| *k != EntryKind::All && k.label() == label)
            .unwrap_or(EntryKind::Text)
    }

    /// SF Symbol name for the kind
    pub fn symbol(self) -> &'static str {
        match self {
            EntryKind::All => "square.stack.3d.up",
            EntryKind::Text => "text.quote",
            EntryKind::Link => "link",
            EntryKind::Code => "chevron.left.forwardslash.chevron.right",
            EntryKind::Path => "folder",
            EntryKind::Image => "photo",
        }
    }

    /// Whether an entry of kind `kind` passes this filter
    pub fn admits(self, kind: EntryKind) -> bool {
        self == EntryKind::All || self == kind
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// One captured clipboard item.
///
/// `id`, `content`, `captured_at_ms`, `source_app`, `kind` and `image_path` are
/// fixed at capture. The OCR and AI-title fields are filled in later by the
/// enrichers, for image entries only.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct ClipboardEntry {
    pub id: String,
    /// Raw text payload (empty for images)
    pub content: String,
    /// Capture time, unix milliseconds
    pub captured_at_ms: i64,
    pub source_app: Option<String>,
    pub kind: EntryKind,
    /// Persisted image file; set iff `kind == Image`
    pub image_path: Option<String>,
    pub ocr_text: String,
    pub ocr_pending: bool,
    pub ai_title: String,
    pub ai_title_pending: bool,
}

/// Raw pasteboard contents as reported by the host.
///
/// Probed in order: `text` (if non-blank), then `file_paths`, then `image_data`.
#[derive(Debug, Clone, PartialEq, Default, uniffi::Record)]
pub struct ClipboardSnapshot {
    pub text: Option<String>,
    pub file_paths: Vec<String>,
    /// Encoded image bytes. PNG is stored as-is; TIFF (the macOS pasteboard
    /// default), JPEG, GIF and WebP are converted to PNG. Other formats drop the capture.
    pub image_data: Option<Vec<u8>>,
    /// Frontmost application at capture time
    pub source_app: Option<String>,
}

/// Everything the presentation layer needs to draw the history list.
#[derive(Debug, Clone, PartialEq, Default, uniffi::Record)]
pub struct StoreView {
    /// Ranked entries for the active filter + query
    pub entries: Vec<ClipboardEntry>,
    pub query: String,
    pub filter: EntryKind,
    pub search_in_progress: bool,
    pub can_undo: bool,
    /// Most recently restored entry, for UI focus
    pub last_restored_id: Option<String>,
    pub backend_available: bool,
}

/// Error type for clipdeck operations
#[derive(Debug, Error, uniffi::Error)]
pub enum ClipDeckError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Store is shut down")]
    ShutDown,
}

// ═══════════════════════════════════════════════════════════════════════════════
// FOREIGN COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// System clipboard, implemented by the host (NSPasteboard on macOS).
#[uniffi::export(with_foreign)]
pub trait ClipboardSource: Send + Sync {
    /// Monotonically increasing counter, bumped on every pasteboard write
    fn change_count(&self) -> i64;

    /// Read the current pasteboard contents
    fn snapshot(&self) -> ClipboardSnapshot;
}

/// Image-to-text recognizer (Vision on macOS).
///
/// Best-effort: returns an empty string on any failure. Called on a blocking
/// worker thread, never on the coordinator.
#[uniffi::export(with_foreign)]
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image_path: String) -> String;
}

impl From<crate::database::DatabaseError> for ClipDeckError {
    fn from(e: crate::database::DatabaseError) -> Self {
        ClipDeckError::DatabaseError(e.to_string())
    }
}

impl From<crate::config::ConfigError> for ClipDeckError {
    fn from(e: crate::config::ConfigError) -> Self {
        ClipDeckError::ConfigError(e.to_string())
    }
}

impl From<std::io::Error> for ClipDeckError {
    fn from(e: std::io::Error) -> Self {
        ClipDeckError::IoError(e.to_string())
    }
}
