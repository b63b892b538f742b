//! External search backend
//!
//! The store mirrors every entry into an external full-text/semantic index and
//! asks it for matching ids. `QmdBackend` drives the `qmd` CLI over a
//! directory of markdown documents; `NullBackend` is used when no backend is
//! wanted. Every failure degrades to "no results".

use crate::interface::ClipboardEntry;
use crate::subprocess::{locate_binary, run_captured};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::AbortOnDropHandle;

const QMD_BINARY: &str = "qmd";

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Whether the backend can be used at all. Probed once by the store.
    async fn is_available(&self) -> bool;
    async fn keyword_search(&self, query: &str, limit: usize) -> HashSet<String>;
    async fn semantic_search(&self, query: &str, limit: usize) -> HashSet<String>;
    async fn upsert_document(&self, entry: &ClipboardEntry);
    async fn remove_document(&self, id: &str);
    /// Index the full history on startup
    async fn bootstrap(&self, entries: &[ClipboardEntry]);
}

/// Backend that is never available
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[async_trait]
impl SearchBackend for NullBackend {
    async fn is_available(&self) -> bool {
        false
    }

    async fn keyword_search(&self, _query: &str, _limit: usize) -> HashSet<String> {
        HashSet::new()
    }

    async fn semantic_search(&self, _query: &str, _limit: usize) -> HashSet<String> {
        HashSet::new()
    }

    async fn upsert_document(&self, _entry: &ClipboardEntry) {}

    async fn remove_document(&self, _id: &str) {}

    async fn bootstrap(&self, _entries: &[ClipboardEntry]) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// qmd
// ─────────────────────────────────────────────────────────────────────────────

/// Delays for the index maintenance commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QmdTimings {
    /// Quiet period before `qmd update` after a document change
    pub update_debounce: Duration,
    /// Quiet period before `qmd embed` after a document change
    pub embed_debounce: Duration,
    /// Delay before the first `qmd embed` after bootstrap
    pub bootstrap_embed_delay: Duration,
}

impl Default for QmdTimings {
    fn default() -> Self {
        Self {
            update_debounce: Duration::from_millis(420),
            embed_debounce: Duration::from_secs(10),
            bootstrap_embed_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QmdSearchRow {
    file: Option<String>,
}

/// Extract entry ids from `qmd search --json` output.
///
/// Each row's `file` is a path or URI ending in `<id>.md`. Malformed output
/// yields an empty set.
pub fn parse_ids(output: &str) -> HashSet<String> {
    let rows: Vec<QmdSearchRow> = match serde_json::from_str(output.trim()) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable qmd output");
            return HashSet::new();
        }
    };

    rows.into_iter()
        .filter_map(|row| row.file)
        .filter_map(|file| {
            let last = file.rsplit('/').next().unwrap_or(&file);
            let id = last.strip_suffix(".md").unwrap_or(last);
            (!id.is_empty()).then(|| id.to_string())
        })
        .collect()
}

/// Markdown document mirrored into the qmd collection for one entry
pub fn render_document(entry: &ClipboardEntry) -> String {
    format!(
        "# Clipboard Entry {id}\n\
         \n\
         - kind: {kind}\n\
         - source: {source}\n\
         - created_at: {created_at:.3}\n\
         \n\
         ## Content\n\
         {content}\n\
         \n\
         ## Title\n\
         {title}\n\
         \n\
         ## OCR\n\
         {ocr}\n\
         \n\
         ## Search Hints\n\
         {hints}\n",
        id = entry.id,
        kind = entry.kind.label(),
        source = entry.source_app.as_deref().unwrap_or("Unknown"),
        created_at = entry.captured_at_ms as f64 / 1000.0,
        content = entry.content,
        title = entry.ai_title,
        ocr = entry.ocr_text,
        hints = entry.search_hints(),
    )
}

/// State shared with the debounced maintenance tasks
struct QmdInner {
    /// `None` inside the cell means "looked, not installed"
    program: OnceCell<Option<PathBuf>>,
    /// Arguments placed before every qmd subcommand
    base_args: Vec<String>,
    docs_dir: PathBuf,
    collection: String,
    collection_ready: tokio::sync::OnceCell<()>,
}

impl QmdInner {
    async fn program(&self) -> Option<PathBuf> {
        if let Some(program) = self.program.get() {
            return program.clone();
        }
        let resolved = tokio::task::spawn_blocking(|| locate_binary(QMD_BINARY))
            .await
            .unwrap_or(None);
        self.program.get_or_init(|| resolved).clone()
    }

    /// Run a qmd subcommand. `None` when qmd is missing, fails to spawn, or
    /// exits non-zero without printing anything.
    async fn run(&self, args: &[&str]) -> Option<String> {
        let program = self.program().await?;
        let full_args: Vec<String> = self
            .base_args
            .iter()
            .cloned()
            .chain(args.iter().map(|a| a.to_string()))
            .collect();

        let output = run_captured(&program, &full_args).await?;
        if !output.success && output.stdout.trim().is_empty() {
            tracing::debug!(command = ?args.first(), "qmd failed");
            return None;
        }
        Some(output.stdout)
    }

    /// Register the docs directory as a collection, once per backend
    async fn ensure_collection(&self) {
        self.collection_ready
            .get_or_init(|| async {
                let docs = self.docs_dir.to_string_lossy().into_owned();
                let args = [
                    "collection",
                    "add",
                    docs.as_str(),
                    "--name",
                    self.collection.as_str(),
                ];
                self.run(&args).await;
            })
            .await;
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.docs_dir.join(format!("{}.md", id))
    }

    async fn write_document(&self, entry: &ClipboardEntry) {
        if let Err(e) = tokio::fs::create_dir_all(&self.docs_dir).await {
            tracing::warn!(error = %e, "could not create qmd docs directory");
            return;
        }
        let path = self.document_path(&entry.id);
        if let Err(e) = tokio::fs::write(&path, render_document(entry)).await {
            tracing::warn!(id = %entry.id, error = %e, "could not write qmd document");
        }
    }

    async fn search(&self, subcommand: &str, query: &str, limit: usize) -> HashSet<String> {
        let limit = limit.to_string();
        let args = [
            subcommand,
            query,
            "-c",
            self.collection.as_str(),
            "--json",
            "-n",
            limit.as_str(),
        ];
        match self.run(&args).await {
            Some(output) => parse_ids(&output),
            None => HashSet::new(),
        }
    }
}

/// Search backend backed by the `qmd` CLI
pub struct QmdBackend {
    inner: Arc<QmdInner>,
    timings: QmdTimings,
    update_task: Mutex<Option<AbortOnDropHandle<()>>>,
    embed_task: Mutex<Option<AbortOnDropHandle<()>>>,
}

impl QmdBackend {
    /// Backend over `docs_dir`, locating `qmd` on the login shell `PATH`
    pub fn new(docs_dir: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self::build(docs_dir.into(), collection.into(), OnceCell::new(), Vec::new())
    }

    /// Backend invoking `program base_args... <subcommand>` instead of a
    /// located `qmd`
    pub fn with_program(
        docs_dir: impl Into<PathBuf>,
        collection: impl Into<String>,
        program: impl Into<PathBuf>,
        base_args: Vec<String>,
    ) -> Self {
        Self::build(
            docs_dir.into(),
            collection.into(),
            OnceCell::with_value(Some(program.into())),
            base_args,
        )
    }

    fn build(
        docs_dir: PathBuf,
        collection: String,
        program: OnceCell<Option<PathBuf>>,
        base_args: Vec<String>,
    ) -> Self {
        Self {
            inner: Arc::new(QmdInner {
                program,
                base_args,
                docs_dir,
                collection,
                collection_ready: tokio::sync::OnceCell::new(),
            }),
            timings: QmdTimings::default(),
            update_task: Mutex::new(None),
            embed_task: Mutex::new(None),
        }
    }

    pub fn with_timings(mut self, timings: QmdTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Run `qmd <command>` after `delay`, replacing any pending run in `slot`.
    /// Only the wait is cancelled; a command that already started runs to completion.
    fn schedule(
        &self,
        slot: &Mutex<Option<AbortOnDropHandle<()>>>,
        delay: Duration,
        command: &'static str,
    ) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(async move {
                inner.run(&[command]).await;
            });
        });
        *slot.lock() = Some(AbortOnDropHandle::new(handle));
    }

    fn schedule_update(&self) {
        self.schedule(&self.update_task, self.timings.update_debounce, "update");
    }

    fn schedule_embed(&self, delay: Duration) {
        self.schedule(&self.embed_task, delay, "embed");
    }
}

#[async_trait]
impl SearchBackend for QmdBackend {
    async fn is_available(&self) -> bool {
        self.inner.program().await.is_some()
    }

    async fn keyword_search(&self, query: &str, limit: usize) -> HashSet<String> {
        self.inner.search("search", query, limit).await
    }

    async fn semantic_search(&self, query: &str, limit: usize) -> HashSet<String> {
        self.inner.search("vsearch", query, limit).await
    }

    async fn upsert_document(&self, entry: &ClipboardEntry) {
        self.inner.ensure_collection().await;
        self.inner.write_document(entry).await;
        self.schedule_update();
        self.schedule_embed(self.timings.embed_debounce);
    }

    async fn remove_document(&self, id: &str) {
        self.inner.ensure_collection().await;
        let path = self.inner.document_path(id);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(id, error = %e, "could not remove qmd document");
            }
        }
        self.schedule_update();
    }

    async fn bootstrap(&self, entries: &[ClipboardEntry]) {
        self.inner.ensure_collection().await;
        for entry in entries {
            self.inner.write_document(entry).await;
        }
        self.inner.run(&["update"]).await;
        self.schedule_embed(self.timings.bootstrap_embed_delay);
        tracing::info!(documents = entries.len(), "qmd bootstrap complete");
    }
}
