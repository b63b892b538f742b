//! ClipboardStore - Main API for the native shell, designed for UniFFI export.
//!
//! Architecture: a single coordinator task owns the entry list, the search
//! state and the undo buffer. Everything else (the clipboard poller, backend
//! searches, OCR and title enrichment, backend index maintenance) runs in its
//! own task and reports back to the coordinator over a command channel, so all
//! mutation is serialized without locks.
//!
//! The presentation layer never touches coordinator state: every mutation
//! publishes a fresh `StoreView` through a `watch` channel, and `view()` just
//! clones the latest one.
//!
//! Cancellation: debounced searches are held in `AbortOnDropHandle`s. Replacing
//! a handle aborts the sleep or the running search, and any child process it
//! spawned is killed on drop.

use crate::backend::{NullBackend, QmdBackend, SearchBackend};
use crate::capture::{build_candidate, is_duplicate_of_latest};
use crate::config::StoreConfig;
use crate::database::{Database, Persistence};
use crate::enrichment::{PiTitleGenerator, TitleGenerator};
use crate::interface::{
    ClipDeckError, ClipboardEntry, ClipboardSnapshot, ClipboardSource, EntryKind, StoreView,
    TextRecognizer,
};
use crate::search::{self, normalize_query, SearchPlan, SearchState, SearchTier};
use crate::undo::UndoBuffer;
use chrono::Utc;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

/// Global fallback Tokio runtime for when the store is created outside any runtime.
/// Shared across all ClipboardStore instances and never dropped.
/// Used by UniFFI, which doesn't provide a tokio runtime.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("clipdeck-worker")
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

const SETTINGS_FILE: &str = "settings.json";
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Unix millis `days` days before now. Saturates instead of overflowing.
fn cutoff_days_ago(days: u32) -> i64 {
    now_ms().saturating_sub(i64::from(days).saturating_mul(MS_PER_DAY))
}

/// Everything the store talks to
pub struct Collaborators {
    /// Polled for changes; `None` when the host pushes snapshots itself
    pub clipboard: Option<Arc<dyn ClipboardSource>>,
    pub persistence: Arc<dyn Persistence>,
    pub backend: Arc<dyn SearchBackend>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub titles: Arc<dyn TitleGenerator>,
}

impl Collaborators {
    /// Default collaborators for `config`: SQLite persistence, the qmd backend
    /// and the pi title generator
    pub fn standard(
        config: &StoreConfig,
        clipboard: Option<Arc<dyn ClipboardSource>>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Result<Self, ClipDeckError> {
        let database = Database::open(config.database_path())?;
        let titles = PiTitleGenerator::new(config.title_timeout());
        titles.set_model(&config.image_title_model);

        Ok(Self {
            clipboard,
            persistence: Arc::new(database),
            backend: Arc::new(QmdBackend::new(config.docs_dir(), config.qmd_collection.clone())),
            recognizer,
            titles: Arc::new(titles),
        })
    }

    /// Collaborators that never reach outside the process
    pub fn offline(persistence: Arc<dyn Persistence>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            clipboard: None,
            persistence,
            backend: Arc::new(NullBackend),
            recognizer,
            titles: Arc::new(DisabledTitles),
        }
    }
}

/// Title generator used by offline stores
struct DisabledTitles;

#[async_trait::async_trait]
impl TitleGenerator for DisabledTitles {
    async fn generate(&self, _image_path: &str) -> Option<String> {
        None
    }

    fn set_model(&self, _model: &str) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────────────────────────

enum Command {
    Ingest(ClipboardSnapshot),
    SetQuery(String),
    SetFilter(EntryKind),
    Delete(String),
    Undo(oneshot::Sender<Option<ClipboardEntry>>),
    Prune {
        cutoff_ms: i64,
        reply: oneshot::Sender<u64>,
    },
    ConfigureTitles {
        enabled: bool,
        model: String,
    },
    OcrCompleted {
        id: String,
        text: String,
    },
    TitleCompleted {
        id: String,
        title: String,
    },
    BackendProbed(bool),
    SearchResolved {
        generation: u64,
        tier: SearchTier,
        query: String,
        ids: HashSet<String>,
    },
    Flush(oneshot::Sender<()>),
}

/// Index maintenance, applied in order by a dedicated worker
enum BackendJob {
    Bootstrap(Vec<ClipboardEntry>),
    Upsert(ClipboardEntry),
    Remove(String),
}

struct Coordinator {
    config: StoreConfig,
    image_dir: PathBuf,
    entries: Vec<ClipboardEntry>,
    query: String,
    filter: EntryKind,
    search: SearchState,
    plan: SearchPlan,
    /// Bumped on every search re-run; results tagged with an older value are dropped
    search_generation: u64,
    keyword_task: Option<AbortOnDropHandle<()>>,
    semantic_task: Option<AbortOnDropHandle<()>>,
    undo: UndoBuffer,
    last_restored_id: Option<String>,
    backend_available: bool,
    image_titles_enabled: bool,
    persistence: Arc<dyn Persistence>,
    backend: Arc<dyn SearchBackend>,
    recognizer: Arc<dyn TextRecognizer>,
    titles: Arc<dyn TitleGenerator>,
    commands: mpsc::UnboundedSender<Command>,
    backend_jobs: mpsc::UnboundedSender<BackendJob>,
    view_tx: watch::Sender<StoreView>,
}

impl Coordinator {
    fn handle(&mut self, command: Command) {
        let changed = match command {
            Command::Ingest(snapshot) => self.ingest(snapshot),
            Command::SetQuery(query) => self.set_query(query),
            Command::SetFilter(filter) => {
                let changed = self.filter != filter;
                self.filter = filter;
                changed
            }
            Command::Delete(id) => self.delete(&id),
            Command::Undo(reply) => {
                let restored = self.undo();
                let _ = reply.send(restored);
                true
            }
            Command::Prune { cutoff_ms, reply } => {
                let removed = self.prune_older_than(cutoff_ms);
                let _ = reply.send(removed);
                removed > 0
            }
            Command::ConfigureTitles { enabled, model } => {
                self.image_titles_enabled = enabled;
                self.titles.set_model(&model);
                false
            }
            Command::OcrCompleted { id, text } => self.complete_ocr(&id, text),
            Command::TitleCompleted { id, title } => self.complete_title(&id, title),
            Command::BackendProbed(available) => self.backend_probed(available),
            Command::SearchResolved {
                generation,
                tier,
                query,
                ids,
            } => self.search_resolved(generation, tier, &query, ids),
            Command::Flush(reply) => {
                let _ = reply.send(());
                false
            }
        };

        if changed {
            self.publish();
        }
    }

    // ── view ────────────────────────────────────────────────────────

    fn build_view(&self) -> StoreView {
        let normalized = normalize_query(&self.query);
        StoreView {
            entries: search::merge(&self.entries, &self.query, self.filter, &self.search)
                .into_iter()
                .cloned()
                .collect(),
            query: self.query.clone(),
            filter: self.filter,
            search_in_progress: self.search.in_progress(&normalized, &self.plan),
            can_undo: self.undo.can_undo(),
            last_restored_id: self.last_restored_id.clone(),
            backend_available: self.backend_available,
        }
    }

    fn publish(&self) {
        let view = self.build_view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    // ── capture ─────────────────────────────────────────────────────

    fn ingest(&mut self, snapshot: ClipboardSnapshot) -> bool {
        // Keep list order and timestamps in agreement even if the clock steps back
        let captured_at_ms = self
            .entries
            .first()
            .map_or(now_ms(), |head| now_ms().max(head.captured_at_ms));

        let candidate = match build_candidate(snapshot, &self.image_dir, captured_at_ms) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "dropping clipboard capture");
                return false;
            }
        };

        if is_duplicate_of_latest(&candidate, self.entries.first()) {
            tracing::debug!(kind = candidate.kind.label(), "duplicate of latest entry");
            if let Some(path) = &candidate.image_path {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::debug!(path = %path, error = %e, "could not remove duplicate image");
                }
            }
            return false;
        }

        tracing::info!(id = %candidate.id, kind = candidate.kind.label(), "captured entry");
        self.entries.insert(0, candidate.clone());
        if let Err(e) = self.persistence.upsert(&candidate) {
            tracing::warn!(id = %candidate.id, error = %e, "failed to persist entry");
        }
        self.mirror(BackendJob::Upsert(candidate.clone()));

        if candidate.is_image() {
            self.dispatch_enrichment(&candidate);
        }

        self.rerun_search();
        true
    }

    fn dispatch_enrichment(&mut self, entry: &ClipboardEntry) {
        let Some(path) = entry.image_path.clone() else {
            return;
        };

        let recognizer = Arc::clone(&self.recognizer);
        let commands = self.commands.clone();
        let id = entry.id.clone();
        let ocr_path = path.clone();
        tokio::spawn(async move {
            let text = if Path::new(&ocr_path).exists() {
                tokio::task::spawn_blocking(move || recognizer.recognize(ocr_path))
                    .await
                    .unwrap_or_default()
            } else {
                String::new()
            };
            let _ = commands.send(Command::OcrCompleted { id, text });
        });

        if !self.image_titles_enabled {
            self.complete_title(&entry.id, String::new());
            return;
        }

        let titles = Arc::clone(&self.titles);
        let commands = self.commands.clone();
        let id = entry.id.clone();
        tokio::spawn(async move {
            let title = titles.generate(&path).await.unwrap_or_default();
            let _ = commands.send(Command::TitleCompleted { id, title });
        });
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn complete_ocr(&mut self, id: &str, text: String) -> bool {
        let Some(idx) = self.position(id) else {
            tracing::debug!(id, "ocr finished for a removed entry");
            return false;
        };

        tracing::debug!(id, chars = text.chars().count(), "ocr completed");
        if let Err(e) = self.persistence.update_ocr(id, &text, false) {
            tracing::warn!(id, error = %e, "failed to persist ocr text");
        }
        let entry = &mut self.entries[idx];
        entry.ocr_text = text;
        entry.ocr_pending = false;
        let updated = entry.clone();

        self.mirror(BackendJob::Upsert(updated));
        self.rerun_search();
        true
    }

    fn complete_title(&mut self, id: &str, title: String) -> bool {
        let Some(idx) = self.position(id) else {
            tracing::debug!(id, "title finished for a removed entry");
            return false;
        };

        tracing::debug!(id, title = %title, "title completed");
        if let Err(e) = self.persistence.update_ai_title(id, &title, false) {
            tracing::warn!(id, error = %e, "failed to persist image title");
        }
        let entry = &mut self.entries[idx];
        entry.ai_title = title;
        entry.ai_title_pending = false;
        let updated = entry.clone();

        self.mirror(BackendJob::Upsert(updated));
        self.rerun_search();
        true
    }

    // ── delete / undo / prune ───────────────────────────────────────

    fn delete(&mut self, id: &str) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };

        let removed = self.entries.remove(idx);
        self.undo.push(removed, idx, Instant::now());
        self.last_restored_id = None;

        if let Err(e) = self.persistence.delete(id) {
            tracing::warn!(id, error = %e, "failed to delete entry");
        }
        self.mirror(BackendJob::Remove(id.to_string()));
        self.rerun_search();
        true
    }

    fn undo(&mut self) -> Option<ClipboardEntry> {
        let Some(snapshot) = self.undo.pop(Instant::now()) else {
            tracing::info!("nothing to undo");
            return None;
        };

        let entry = snapshot.entry;
        let idx = snapshot.index.min(self.entries.len());
        self.entries.insert(idx, entry.clone());

        if let Err(e) = self.persistence.upsert(&entry) {
            tracing::warn!(id = %entry.id, error = %e, "failed to restore entry");
        }
        self.mirror(BackendJob::Upsert(entry.clone()));
        self.last_restored_id = Some(entry.id.clone());
        tracing::info!(id = %entry.id, index = idx, "restored entry");

        self.rerun_search();
        Some(entry)
    }

    fn prune_older_than(&mut self, cutoff_ms: i64) -> u64 {
        let mut removed = match self.persistence.delete_older_than(cutoff_ms) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, "failed to prune database");
                Vec::new()
            }
        };

        // Entries the database never saw still go
        let mut removed_ids: HashSet<String> = removed.iter().map(|e| e.id.clone()).collect();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.captured_at_ms < cutoff_ms || removed_ids.contains(&entry.id) {
                if removed_ids.insert(entry.id.clone()) {
                    removed.push(entry);
                }
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;

        for entry in &removed {
            if let Some(path) = &entry.image_path {
                self.undo.forget_path(path);
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::debug!(path = %path, error = %e, "could not remove pruned image");
                }
            }
            self.mirror(BackendJob::Remove(entry.id.clone()));
        }

        if !removed.is_empty() {
            tracing::info!(removed = removed.len(), "pruned old entries");
            self.rerun_search();
        }
        removed.len() as u64
    }

    fn sweep(&mut self) {
        let now = Instant::now();
        let trimmed = self.undo.trim_expired(now);
        self.undo.sweep_due(now);
        if trimmed {
            self.publish();
        }
    }

    // ── search ──────────────────────────────────────────────────────

    fn set_query(&mut self, query: String) -> bool {
        if self.query == query {
            return false;
        }
        self.query = query;
        self.rerun_search();
        true
    }

    /// Cancel in-flight backend searches and schedule new ones for the live query
    fn rerun_search(&mut self) {
        self.keyword_task = None;
        self.semantic_task = None;
        self.search_generation += 1;

        let normalized = normalize_query(&self.query);
        self.search.reset(&normalized);
        self.plan = SearchPlan::for_query(
            &normalized,
            self.backend_available,
            &self.config.thresholds(),
        );

        if self.plan.keyword {
            self.keyword_task = Some(self.spawn_search(
                SearchTier::Keyword,
                normalized.clone(),
                self.config.keyword_debounce(),
                self.config.keyword_limit,
            ));
        }
        if self.plan.semantic {
            self.semantic_task = Some(self.spawn_search(
                SearchTier::Semantic,
                normalized,
                self.config.semantic_debounce(),
                self.config.semantic_limit,
            ));
        }
    }

    fn spawn_search(
        &self,
        tier: SearchTier,
        query: String,
        delay: Duration,
        limit: usize,
    ) -> AbortOnDropHandle<()> {
        let backend = Arc::clone(&self.backend);
        let commands = self.commands.clone();
        let generation = self.search_generation;

        AbortOnDropHandle::new(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let ids = match tier {
                SearchTier::Keyword => backend.keyword_search(&query, limit).await,
                SearchTier::Semantic => backend.semantic_search(&query, limit).await,
            };
            tracing::debug!(?tier, query = %query, hits = ids.len(), "backend search finished");
            let _ = commands.send(Command::SearchResolved {
                generation,
                tier,
                query,
                ids,
            });
        }))
    }

    fn search_resolved(
        &mut self,
        generation: u64,
        tier: SearchTier,
        query: &str,
        ids: HashSet<String>,
    ) -> bool {
        if generation != self.search_generation {
            return false;
        }
        let live = normalize_query(&self.query);
        self.search.resolve(&live, tier, query, ids)
    }

    // ── backend ─────────────────────────────────────────────────────

    fn mirror(&self, job: BackendJob) {
        if self.backend_available {
            let _ = self.backend_jobs.send(job);
        }
    }

    fn backend_probed(&mut self, available: bool) -> bool {
        tracing::info!(available, "search backend probed");
        self.backend_available = available;
        if available {
            let _ = self.backend_jobs.send(BackendJob::Bootstrap(self.entries.clone()));
        }
        self.rerun_search();
        true
    }

    // ── lifecycle ───────────────────────────────────────────────────

    fn startup(&mut self) {
        if self.config.auto_prune_enabled {
            let days = self.config.resolved_auto_prune_days();
            let removed = self.prune_older_than(cutoff_days_ago(days));
            tracing::info!(days, removed, "auto-prune on startup");
        }
        self.publish();
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, token: CancellationToken) {
        self.startup();

        let mut sweep = tokio::time::interval(self.config.poll_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sweep.tick() => self.sweep(),
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        tracing::debug!("store coordinator stopped");
    }
}

async fn run_backend_jobs(backend: Arc<dyn SearchBackend>, mut jobs: mpsc::UnboundedReceiver<BackendJob>) {
    while let Some(job) = jobs.recv().await {
        match job {
            BackendJob::Bootstrap(entries) => backend.bootstrap(&entries).await,
            BackendJob::Upsert(entry) => backend.upsert_document(&entry).await,
            BackendJob::Remove(id) => backend.remove_document(&id).await,
        }
    }
}

async fn probe_backend(backend: Arc<dyn SearchBackend>, commands: mpsc::UnboundedSender<Command>) {
    let available = backend.is_available().await;
    let _ = commands.send(Command::BackendProbed(available));
}

/// Watch the clipboard change counter and forward new snapshots
async fn poll_clipboard(
    source: Arc<dyn ClipboardSource>,
    mut last_change_count: i64,
    interval: Duration,
    commands: mpsc::UnboundedSender<Command>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let change_count = source.change_count();
        if change_count == last_change_count {
            continue;
        }
        last_change_count = change_count;

        if commands.send(Command::Ingest(source.snapshot())).is_err() {
            break;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public store
// ─────────────────────────────────────────────────────────────────────────────

/// Live clipboard history with hybrid search
///
/// Concurrency Model:
/// - One coordinator task serializes every mutation
/// - Reads are lock-free clones of the last published `StoreView`
/// - Uses global FALLBACK_RUNTIME when created outside any runtime (e.g., from UniFFI)
#[derive(uniffi::Object)]
pub struct ClipboardStore {
    commands: mpsc::UnboundedSender<Command>,
    view_rx: watch::Receiver<StoreView>,
    shutdown: CancellationToken,
}

// Internal implementation (not exported via FFI)
impl ClipboardStore {
    /// Start a store with explicit collaborators
    pub fn start(config: StoreConfig, collaborators: Collaborators) -> Result<Self, ClipDeckError> {
        let image_dir = config.image_dir();
        std::fs::create_dir_all(&image_dir)?;

        let entries = collaborators.persistence.load_all()?;
        tracing::info!(entries = entries.len(), data_dir = %config.data_dir.display(), "opening clipboard store");

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(StoreView::default());
        let shutdown = CancellationToken::new();

        let coordinator = Coordinator {
            image_dir,
            entries,
            query: String::new(),
            filter: EntryKind::All,
            search: SearchState::default(),
            plan: SearchPlan::default(),
            search_generation: 0,
            keyword_task: None,
            semantic_task: None,
            undo: UndoBuffer::new(config.undo_window()),
            last_restored_id: None,
            backend_available: false,
            image_titles_enabled: config.image_titles_enabled,
            persistence: collaborators.persistence,
            backend: Arc::clone(&collaborators.backend),
            recognizer: collaborators.recognizer,
            titles: collaborators.titles,
            commands: commands_tx.clone(),
            backend_jobs: jobs_tx,
            view_tx,
            config,
        };
        // Visible before the coordinator gets scheduled
        coordinator.publish();
        let poll_interval = coordinator.config.poll_interval();

        let runtime = runtime_handle();
        runtime.spawn(run_backend_jobs(Arc::clone(&collaborators.backend), jobs_rx));
        runtime.spawn(probe_backend(collaborators.backend, commands_tx.clone()));
        if let Some(source) = collaborators.clipboard {
            // Whatever is on the clipboard at startup is not a new copy
            let baseline = source.change_count();
            runtime.spawn(poll_clipboard(
                source,
                baseline,
                poll_interval,
                commands_tx.clone(),
                shutdown.clone(),
            ));
        }
        runtime.spawn(coordinator.run(commands_rx, shutdown.clone()));

        Ok(Self {
            commands: commands_tx,
            view_rx,
            shutdown,
        })
    }

    /// Receiver notified after every published change
    pub fn subscribe(&self) -> watch::Receiver<StoreView> {
        self.view_rx.clone()
    }

    /// Wait until every command sent before this call has been applied
    pub async fn flush(&self) -> Result<(), ClipDeckError> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Flush(reply))?;
        done.await.map_err(|_| ClipDeckError::ShutDown)
    }

    /// Remove entries captured before `cutoff_ms` (unix millis). Returns the count.
    pub async fn prune_older_than(&self, cutoff_ms: i64) -> Result<u64, ClipDeckError> {
        let (reply, removed) = oneshot::channel();
        self.send(Command::Prune { cutoff_ms, reply })?;
        removed.await.map_err(|_| ClipDeckError::ShutDown)
    }

    fn send(&self, command: Command) -> Result<(), ClipDeckError> {
        if self.shutdown.is_cancelled() {
            return Err(ClipDeckError::ShutDown);
        }
        self.commands.send(command).map_err(|_| ClipDeckError::ShutDown)
    }

    /// Fire-and-forget send; commands after shutdown are dropped
    fn post(&self, command: Command) {
        if self.send(command).is_err() {
            tracing::debug!("store is shut down, ignoring command");
        }
    }
}

// FFI-exported constructor (must be in standalone impl block)
#[uniffi::export]
impl ClipboardStore {
    /// Open the store rooted at `data_dir`, reading `settings.json` there if present
    #[uniffi::constructor]
    pub fn new(
        data_dir: String,
        clipboard: Arc<dyn ClipboardSource>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Result<Self, ClipDeckError> {
        let data_dir = PathBuf::from(data_dir);
        let mut config = StoreConfig::load(&data_dir.join(SETTINGS_FILE))?;
        config.data_dir = data_dir;

        let collaborators = Collaborators::standard(&config, Some(clipboard), recognizer)?;
        Self::start(config, collaborators)
    }
}

#[uniffi::export]
impl ClipboardStore {
    /// Latest published view
    pub fn view(&self) -> StoreView {
        self.view_rx.borrow().clone()
    }

    pub fn set_query(&self, query: String) {
        self.post(Command::SetQuery(query));
    }

    pub fn set_filter(&self, filter: EntryKind) {
        self.post(Command::SetFilter(filter));
    }

    /// Delete an entry; reversible with `undo_delete` within the undo window
    pub fn delete_entry(&self, id: String) {
        self.post(Command::Delete(id));
    }

    /// Restore the most recent deletion. `None` when there is nothing to undo.
    pub async fn undo_delete(&self) -> Result<Option<ClipboardEntry>, ClipDeckError> {
        let (reply, restored) = oneshot::channel();
        self.send(Command::Undo(reply))?;
        restored.await.map_err(|_| ClipDeckError::ShutDown)
    }

    /// Remove every entry older than `days` days. Returns the removed count.
    pub async fn prune_older_than_days(&self, days: u32) -> Result<u64, ClipDeckError> {
        self.prune_older_than(cutoff_days_ago(days)).await
    }

    /// Capture a snapshot pushed by the host instead of the poller
    pub fn ingest_snapshot(&self, snapshot: ClipboardSnapshot) {
        self.post(Command::Ingest(snapshot));
    }

    pub fn configure_image_titles(&self, enabled: bool, model: String) {
        self.post(Command::ConfigureTitles { enabled, model });
    }

    /// Stop polling and background work. Later calls are ignored.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for ClipboardStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
