//! Store settings
//!
//! Read from a JSON file with camelCase keys. Every key is optional and
//! falls back to the default below.

use crate::search::{SearchThresholds, KEYWORD_MIN_CHARS, SEMANTIC_MIN_CHARS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_IMAGE_TITLE_MODEL: &str = "openai-codex/gpt-5.1-codex-mini";
pub const DEFAULT_QMD_COLLECTION: &str = "cbmanager";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Root for the database, image files and backend documents
    pub data_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub undo_window_secs: u64,
    pub keyword_debounce_ms: u64,
    pub semantic_debounce_ms: u64,
    pub keyword_min_chars: usize,
    pub semantic_min_chars: usize,
    pub keyword_limit: usize,
    pub semantic_limit: usize,
    pub title_timeout_secs: u64,
    pub image_titles_enabled: bool,
    pub image_title_model: String,
    pub auto_prune_enabled: bool,
    pub auto_prune_days: u32,
    pub qmd_collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            poll_interval_ms: 150,
            undo_window_secs: 20,
            keyword_debounce_ms: 400,
            semantic_debounce_ms: 1200,
            keyword_min_chars: KEYWORD_MIN_CHARS,
            semantic_min_chars: SEMANTIC_MIN_CHARS,
            keyword_limit: 220,
            semantic_limit: 120,
            title_timeout_secs: 12,
            image_titles_enabled: true,
            image_title_model: DEFAULT_IMAGE_TITLE_MODEL.to_string(),
            auto_prune_enabled: false,
            auto_prune_days: 90,
            qmd_collection: DEFAULT_QMD_COLLECTION.to_string(),
        }
    }
}

/// `<platform data dir>/clipdeck`, or `./clipdeck` when the platform has none
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("clipdeck"))
        .unwrap_or_else(|| PathBuf::from("clipdeck"))
}

impl StoreConfig {
    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("clipboard.sqlite")
    }

    pub fn image_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.data_dir.join("qmd-docs")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo_window_secs)
    }

    pub fn keyword_debounce(&self) -> Duration {
        Duration::from_millis(self.keyword_debounce_ms)
    }

    pub fn semantic_debounce(&self) -> Duration {
        Duration::from_millis(self.semantic_debounce_ms)
    }

    pub fn title_timeout(&self) -> Duration {
        Duration::from_secs(self.title_timeout_secs)
    }

    pub fn thresholds(&self) -> SearchThresholds {
        SearchThresholds {
            keyword_min_chars: self.keyword_min_chars,
            semantic_min_chars: self.semantic_min_chars,
        }
    }

    /// Auto-prune age, never below one day
    pub fn resolved_auto_prune_days(&self) -> u32 {
        self.auto_prune_days.max(1)
    }
}
