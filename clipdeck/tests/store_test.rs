//! End-to-end behaviour of ClipboardStore with in-process fakes for every
//! collaborator. Time is paused so debounces and the undo window run instantly.

use async_trait::async_trait;
use clipdeck::backend::SearchBackend;
use clipdeck::database::{Database, Persistence};
use clipdeck::enrichment::TitleGenerator;
use clipdeck::{
    ClipboardEntry, ClipboardSnapshot, ClipboardStore, Collaborators, EntryKind, StoreConfig,
    StoreView, TextRecognizer,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Fakes
// ─────────────────────────────────────────────────────────────────────────────

/// Index held in memory. `keyword_rules` maps a query to a content needle;
/// a keyword search returns every indexed entry whose content holds the needle.
#[derive(Default)]
struct FakeBackend {
    delay: Duration,
    documents: Mutex<HashMap<String, ClipboardEntry>>,
    removed: Mutex<Vec<String>>,
    keyword_rules: Mutex<HashMap<String, String>>,
}

impl FakeBackend {
    fn with_rule(query: &str, needle: &str) -> Self {
        let backend = Self::default();
        backend
            .keyword_rules
            .lock()
            .insert(query.to_string(), needle.to_string());
        backend
    }
}

#[async_trait]
impl SearchBackend for FakeBackend {
    async fn is_available(&self) -> bool {
        true
    }

    async fn keyword_search(&self, query: &str, _limit: usize) -> HashSet<String> {
        tokio::time::sleep(self.delay).await;
        let Some(needle) = self.keyword_rules.lock().get(query).cloned() else {
            return HashSet::new();
        };
        self.documents
            .lock()
            .values()
            .filter(|e| e.content.contains(&needle))
            .map(|e| e.id.clone())
            .collect()
    }

    async fn semantic_search(&self, _query: &str, _limit: usize) -> HashSet<String> {
        tokio::time::sleep(self.delay).await;
        HashSet::new()
    }

    async fn upsert_document(&self, entry: &ClipboardEntry) {
        self.documents.lock().insert(entry.id.clone(), entry.clone());
    }

    async fn remove_document(&self, id: &str) {
        self.documents.lock().remove(id);
        self.removed.lock().push(id.to_string());
    }

    async fn bootstrap(&self, entries: &[ClipboardEntry]) {
        let mut documents = self.documents.lock();
        for entry in entries {
            documents.insert(entry.id.clone(), entry.clone());
        }
    }
}

struct FixedRecognizer(&'static str);

impl TextRecognizer for FixedRecognizer {
    fn recognize(&self, _image_path: String) -> String {
        self.0.to_string()
    }
}

struct FixedTitles(Option<&'static str>);

#[async_trait]
impl TitleGenerator for FixedTitles {
    async fn generate(&self, _image_path: &str) -> Option<String> {
        self.0.map(String::from)
    }

    fn set_model(&self, _model: &str) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

struct Harness {
    store: ClipboardStore,
    db: Arc<Database>,
    backend: Arc<FakeBackend>,
    dir: tempfile::TempDir,
}

fn harness_with(
    backend: FakeBackend,
    recognizer: Arc<dyn TextRecognizer>,
    titles: Arc<dyn TitleGenerator>,
    configure: impl FnOnce(&mut StoreConfig),
    seed: &[ClipboardEntry],
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StoreConfig::with_data_dir(dir.path());
    configure(&mut config);

    let db = Arc::new(Database::open(config.database_path()).unwrap());
    for entry in seed {
        db.upsert(entry).unwrap();
    }
    let backend = Arc::new(backend);

    let collaborators = Collaborators {
        clipboard: None,
        persistence: db.clone(),
        backend: backend.clone(),
        recognizer,
        titles,
    };
    let store = ClipboardStore::start(config, collaborators).unwrap();
    Harness {
        store,
        db,
        backend,
        dir,
    }
}

fn harness(backend: FakeBackend) -> Harness {
    harness_with(
        backend,
        Arc::new(FixedRecognizer("")),
        Arc::new(FixedTitles(None)),
        |_| {},
        &[],
    )
}

/// Wait until the published view satisfies `predicate`
async fn wait_for(store: &ClipboardStore, predicate: impl Fn(&StoreView) -> bool) -> StoreView {
    let mut rx = store.subscribe();
    let waited = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            {
                let view = rx.borrow_and_update();
                if predicate(&view) {
                    return view.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await;
    waited.expect("view never reached the expected state")
}

fn text(content: &str) -> ClipboardSnapshot {
    ClipboardSnapshot {
        text: Some(content.to_string()),
        ..Default::default()
    }
}

fn png_snapshot() -> ClipboardSnapshot {
    let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([200, 10, 10, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    ClipboardSnapshot {
        image_data: Some(bytes),
        source_app: Some("Preview".into()),
        ..Default::default()
    }
}

fn contents(view: &StoreView) -> Vec<&str> {
    view.entries.iter().map(|e| e.content.as_str()).collect()
}

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_backend_hits_follow_fuzzy_hits() {
    let h = harness(FakeBackend::with_rule("alpha", "charlie"));
    h.store.ingest_snapshot(text("charlie text"));
    h.store.ingest_snapshot(text("bravo"));
    h.store.ingest_snapshot(text("alpha notes"));
    wait_for(&h.store, |v| v.backend_available).await;

    h.store.set_query("alpha".into());
    h.store.flush().await.unwrap();
    assert!(h.store.view().search_in_progress);

    let view = wait_for(&h.store, |v| !v.search_in_progress).await;
    assert_eq!(contents(&view), vec!["alpha notes", "charlie text"]);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_query_results_never_surface() {
    let mut backend = FakeBackend::with_rule("alpha", "charlie");
    backend.delay = Duration::from_secs(1);
    let h = harness(backend);
    h.store.ingest_snapshot(text("charlie text"));
    h.store.ingest_snapshot(text("bravo"));
    h.store.ingest_snapshot(text("alpha notes"));
    wait_for(&h.store, |v| v.backend_available).await;

    h.store.set_query("alpha".into());
    // Keyword search for "alpha" is now in flight
    tokio::time::sleep(Duration::from_millis(600)).await;
    h.store.set_query("bravo".into());

    let view = wait_for(&h.store, |v| v.query == "bravo" && !v.search_in_progress).await;
    assert_eq!(contents(&view), vec!["bravo"]);
}

#[tokio::test(start_paused = true)]
async fn test_short_queries_stay_local() {
    let h = harness(FakeBackend::with_rule("al", "charlie"));
    h.store.ingest_snapshot(text("charlie text"));
    h.store.ingest_snapshot(text("alpha notes"));
    wait_for(&h.store, |v| v.backend_available).await;

    h.store.set_query("al".into());
    h.store.flush().await.unwrap();
    let view = h.store.view();
    assert!(!view.search_in_progress);

    assert_eq!(contents(&view), vec!["alpha notes", "charlie text"]);

    // No backend search was scheduled, so nothing changes later
    tokio::time::sleep(Duration::from_secs(5)).await;
    h.store.flush().await.unwrap();
    assert_eq!(h.store.view(), view);
}

#[tokio::test(start_paused = true)]
async fn test_filter_applies_to_backend_hits() {
    let h = harness(FakeBackend::with_rule("alpha", "example.com"));
    h.store.ingest_snapshot(text("https://example.com/docs"));
    h.store.ingest_snapshot(text("alpha notes"));
    wait_for(&h.store, |v| v.backend_available).await;

    h.store.set_query("alpha".into());
    let view = wait_for(&h.store, |v| !v.search_in_progress).await;
    assert_eq!(contents(&view), vec!["alpha notes", "https://example.com/docs"]);

    h.store.set_filter(EntryKind::Text);
    h.store.flush().await.unwrap();
    assert_eq!(contents(&h.store.view()), vec!["alpha notes"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Delete / undo
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_delete_and_undo_restores_position() {
    let h = harness(FakeBackend::default());
    for content in ["one", "two", "three"] {
        h.store.ingest_snapshot(text(content));
    }
    h.store.flush().await.unwrap();
    let middle = h.store.view().entries[1].clone();
    assert_eq!(middle.content, "two");

    h.store.delete_entry(middle.id.clone());
    h.store.flush().await.unwrap();
    let view = h.store.view();
    assert_eq!(contents(&view), vec!["three", "one"]);
    assert!(view.can_undo);
    assert_eq!(h.db.load_all().unwrap().len(), 2);

    let restored = h.store.undo_delete().await.unwrap();
    assert_eq!(restored.as_ref(), Some(&middle));

    let view = h.store.view();
    assert_eq!(contents(&view), vec!["three", "two", "one"]);
    assert_eq!(view.last_restored_id.as_deref(), Some(middle.id.as_str()));
    assert!(!view.can_undo);

    let stored = h.db.load_all().unwrap();
    assert_eq!(stored.len(), 3);
    let restored_row = stored.into_iter().find(|e| e.id == middle.id).unwrap();
    assert_eq!(restored_row, middle);
}

#[tokio::test(start_paused = true)]
async fn test_undo_is_lifo() {
    let h = harness(FakeBackend::default());
    for content in ["one", "two", "three"] {
        h.store.ingest_snapshot(text(content));
    }
    h.store.flush().await.unwrap();
    let ids: Vec<String> = h.store.view().entries.iter().map(|e| e.id.clone()).collect();

    h.store.delete_entry(ids[0].clone());
    h.store.delete_entry(ids[2].clone());
    let first = h.store.undo_delete().await.unwrap().unwrap();
    let second = h.store.undo_delete().await.unwrap().unwrap();
    assert_eq!(first.content, "one");
    assert_eq!(second.content, "three");
    assert_eq!(contents(&h.store.view()), vec!["three", "two", "one"]);
    assert_eq!(h.store.undo_delete().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_undo_window_expires_and_removes_image() {
    let h = harness_with(
        FakeBackend::default(),
        Arc::new(FixedRecognizer("")),
        Arc::new(FixedTitles(None)),
        |c| c.undo_window_secs = 5,
        &[],
    );
    h.store.ingest_snapshot(png_snapshot());
    let view = wait_for(&h.store, |v| v.entries.len() == 1).await;
    let image = view.entries[0].clone();
    let path = image.image_path.clone().unwrap();
    assert!(Path::new(&path).exists());

    h.store.delete_entry(image.id.clone());
    h.store.flush().await.unwrap();
    assert!(h.store.view().can_undo);
    // File survives while the deletion can still be undone
    assert!(Path::new(&path).exists());

    let view = wait_for(&h.store, |v| !v.can_undo).await;
    assert!(view.entries.is_empty());
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.store.flush().await.unwrap();
    assert!(!Path::new(&path).exists());
    assert_eq!(h.store.undo_delete().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_undo_keeps_image_file() {
    let h = harness(FakeBackend::default());
    h.store.ingest_snapshot(png_snapshot());
    let view = wait_for(&h.store, |v| v.entries.len() == 1).await;
    let image = view.entries[0].clone();
    let path = image.image_path.clone().unwrap();

    h.store.delete_entry(image.id.clone());
    tokio::time::sleep(Duration::from_secs(3)).await;
    let restored = h.store.undo_delete().await.unwrap().unwrap();
    assert_eq!(restored.id, image.id);

    tokio::time::sleep(Duration::from_secs(60)).await;
    h.store.flush().await.unwrap();
    assert!(Path::new(&path).exists());
}

// ─────────────────────────────────────────────────────────────────────────────
// Enrichment
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_image_enrichment_feeds_search_and_storage() {
    let h = harness_with(
        FakeBackend::default(),
        Arc::new(FixedRecognizer("invoice total 42")),
        Arc::new(FixedTitles(Some("Receipt from the hardware store"))),
        |_| {},
        &[],
    );
    wait_for(&h.store, |v| v.backend_available).await;
    h.store.ingest_snapshot(text("unrelated note"));
    h.store.ingest_snapshot(png_snapshot());

    let view = wait_for(&h.store, |v| {
        v.entries
            .first()
            .is_some_and(|e| e.is_image() && !e.ocr_pending && !e.ai_title_pending)
    })
    .await;
    let image = &view.entries[0];
    assert_eq!(image.ocr_text, "invoice total 42");
    assert_eq!(image.ai_title, "Receipt from the hardware store");
    assert_eq!(image.source_app.as_deref(), Some("Preview"));

    let stored = h
        .db
        .load_all()
        .unwrap()
        .into_iter()
        .find(|e| e.id == image.id)
        .unwrap();
    assert_eq!(&stored, image);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        h.backend.documents.lock().get(&image.id).map(|e| e.ocr_text.clone()),
        Some("invoice total 42".to_string())
    );

    h.store.set_query("invoice".into());
    h.store.flush().await.unwrap();
    let view = h.store.view();
    assert_eq!(view.entries.len(), 1);
    assert_eq!(view.entries[0].id, image.id);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_titles_complete_empty() {
    let h = harness_with(
        FakeBackend::default(),
        Arc::new(FixedRecognizer("")),
        Arc::new(FixedTitles(Some("should not be used"))),
        |c| c.image_titles_enabled = false,
        &[],
    );
    h.store.ingest_snapshot(png_snapshot());
    h.store.flush().await.unwrap();

    let image = h.store.view().entries[0].clone();
    assert!(!image.ai_title_pending);
    assert_eq!(image.ai_title, "");

    let view = wait_for(&h.store, |v| !v.entries[0].ocr_pending).await;
    assert_eq!(view.entries[0].ocr_text, "");

    h.store.configure_image_titles(true, "some/model".into());
    h.store.ingest_snapshot(text("spacer"));
    h.store.ingest_snapshot(png_snapshot());
    let view = wait_for(&h.store, |v| {
        v.entries.len() == 3 && !v.entries[0].ai_title_pending
    })
    .await;
    assert_eq!(view.entries[0].ai_title, "should not be used");
}

#[tokio::test(start_paused = true)]
async fn test_failed_title_completes_empty() {
    let h = harness_with(
        FakeBackend::default(),
        Arc::new(FixedRecognizer("")),
        Arc::new(FixedTitles(None)),
        |_| {},
        &[],
    );
    h.store.ingest_snapshot(png_snapshot());
    let view = wait_for(&h.store, |v| {
        v.entries.first().is_some_and(|e| !e.ai_title_pending && !e.ocr_pending)
    })
    .await;
    assert_eq!(view.entries[0].ai_title, "");
    assert_eq!(view.entries[0].title_line(), "Image (3×2) · Preview");
}

// ─────────────────────────────────────────────────────────────────────────────
// Capture & prune
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_duplicate_image_file_is_removed() {
    let h = harness(FakeBackend::default());
    h.store.ingest_snapshot(png_snapshot());
    h.store.ingest_snapshot(png_snapshot());
    h.store.flush().await.unwrap();

    let view = h.store.view();
    assert_eq!(view.entries.len(), 1);
    let kept = view.entries[0].image_path.clone().unwrap();

    let files: Vec<_> = std::fs::read_dir(h.dir.path().join("images"))
        .unwrap()
        .map(|f| f.unwrap().path())
        .collect();
    assert_eq!(files, vec![Path::new(&kept).to_path_buf()]);
}

#[tokio::test(start_paused = true)]
async fn test_capture_priority_and_dedup() {
    let h = harness(FakeBackend::default());
    h.store.ingest_snapshot(ClipboardSnapshot {
        text: Some("   ".into()),
        file_paths: vec!["/tmp/a.txt".into(), "/tmp/b.txt".into()],
        ..Default::default()
    });
    h.store.ingest_snapshot(ClipboardSnapshot {
        file_paths: vec!["/tmp/a.txt".into(), "/tmp/b.txt".into()],
        ..Default::default()
    });
    h.store.ingest_snapshot(ClipboardSnapshot::default());
    h.store.flush().await.unwrap();

    let view = h.store.view();
    assert_eq!(view.entries.len(), 1);
    assert_eq!(view.entries[0].kind, EntryKind::Path);
    assert_eq!(view.entries[0].content, "/tmp/a.txt\n/tmp/b.txt");
}

#[tokio::test(start_paused = true)]
async fn test_prune_removes_old_entries_everywhere() {
    let mut old = ClipboardEntry::new_text("ancient".into(), None, now_ms() - 40 * DAY_MS);
    old.id = "old".into();
    let mut recent = ClipboardEntry::new_text("recent".into(), None, now_ms() - DAY_MS);
    recent.id = "recent".into();

    let h = harness_with(
        FakeBackend::default(),
        Arc::new(FixedRecognizer("")),
        Arc::new(FixedTitles(None)),
        |_| {},
        &[recent, old],
    );
    wait_for(&h.store, |v| v.backend_available).await;
    assert_eq!(contents(&h.store.view()), vec!["recent", "ancient"]);

    assert_eq!(h.store.prune_older_than_days(30).await.unwrap(), 1);
    assert_eq!(contents(&h.store.view()), vec!["recent"]);
    assert_eq!(h.db.load_all().unwrap().len(), 1);

    h.store.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(h.backend.removed.lock().contains(&"old".to_string()));

    assert_eq!(h.store.prune_older_than_days(30).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_auto_prune_on_startup() {
    let old = ClipboardEntry::new_text("ancient".into(), None, now_ms() - 10 * DAY_MS);
    let recent = ClipboardEntry::new_text("recent".into(), None, now_ms() - 2 * DAY_MS);

    let h = harness_with(
        FakeBackend::default(),
        Arc::new(FixedRecognizer("")),
        Arc::new(FixedTitles(None)),
        |c| {
            c.auto_prune_enabled = true;
            c.auto_prune_days = 7;
        },
        &[recent, old],
    );
    let view = wait_for(&h.store, |v| v.entries.len() == 1).await;
    assert_eq!(contents(&view), vec!["recent"]);
    assert_eq!(h.db.load_all().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deletes_are_mirrored_to_backend() {
    let h = harness(FakeBackend::default());
    wait_for(&h.store, |v| v.backend_available).await;
    h.store.ingest_snapshot(text("to be removed"));
    h.store.flush().await.unwrap();
    let id = h.store.view().entries[0].id.clone();

    h.store.delete_entry(id.clone());
    h.store.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(h.backend.removed.lock().contains(&id));
    assert!(!h.backend.documents.lock().contains_key(&id));
}
