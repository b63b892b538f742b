//! SQLite persistence for clipboard history
//!
//! One flat `clipboard_entries` table keyed by the entry's string id.
//! Uses r2d2 connection pooling to allow concurrent reads without mutex blocking.

use crate::interface::{ClipboardEntry, EntryKind};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Row storage consumed by the store coordinator.
///
/// Every call is synchronous and short; the coordinator logs failures and
/// carries on with its in-memory state.
pub trait Persistence: Send + Sync {
    /// All entries, newest first
    fn load_all(&self) -> DatabaseResult<Vec<ClipboardEntry>>;
    /// Insert or replace by id
    fn upsert(&self, entry: &ClipboardEntry) -> DatabaseResult<()>;
    fn update_ocr(&self, id: &str, text: &str, pending: bool) -> DatabaseResult<()>;
    fn update_ai_title(&self, id: &str, title: &str, pending: bool) -> DatabaseResult<()>;
    fn delete(&self, id: &str) -> DatabaseResult<()>;
    /// Remove entries captured strictly before `cutoff_ms`, returning them
    fn delete_older_than(&self, cutoff_ms: i64) -> DatabaseResult<Vec<ClipboardEntry>>;
}

const SELECT_COLUMNS: &str = "id, created_at, source_app, kind, content, image_path, \
                              ocr_text, ocr_pending, ai_title, ai_title_pending";

fn ms_to_secs(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

fn secs_to_ms(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

/// Thread-safe database wrapper using connection pooling
///
/// WAL mode lets the store write while other readers (e.g. a bindings
/// consumer listing rows) proceed without blocking.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA cache_size=-8000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (tests and benchmarks)
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory();

        // In-memory needs single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS clipboard_entries (
                id TEXT PRIMARY KEY,
                created_at REAL NOT NULL,
                source_app TEXT,
                kind TEXT NOT NULL,
                content TEXT,
                image_path TEXT,
                ocr_text TEXT,
                ocr_pending INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_clipboard_entries_created_at
                ON clipboard_entries(created_at DESC);
        "#,
        )?;

        Self::migrate_columns(&conn)
    }

    /// Add columns introduced after the first schema. Databases created before
    /// image titles existed lack the `ai_title` pair.
    fn migrate_columns(conn: &rusqlite::Connection) -> DatabaseResult<()> {
        for (column, definition) in [
            ("ocr_pending", "INTEGER NOT NULL DEFAULT 0"),
            ("ai_title", "TEXT NOT NULL DEFAULT ''"),
            ("ai_title_pending", "INTEGER NOT NULL DEFAULT 0"),
        ] {
            let exists = conn
                .prepare(&format!("SELECT {} FROM clipboard_entries LIMIT 0", column))
                .is_ok();
            if !exists {
                tracing::info!(column, "migrating clipboard_entries");
                conn.execute_batch(&format!(
                    "ALTER TABLE clipboard_entries ADD COLUMN {} {}",
                    column, definition
                ))?;
            }
        }
        Ok(())
    }

    /// Get total number of entries in the database
    pub fn count(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM clipboard_entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<ClipboardEntry> {
        let kind: Option<String> = row.get(3)?;
        Ok(ClipboardEntry {
            id: row.get(0)?,
            captured_at_ms: secs_to_ms(row.get(1)?),
            source_app: row.get(2)?,
            kind: kind
                .as_deref()
                .map(EntryKind::from_label)
                .unwrap_or(EntryKind::Text),
            content: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            image_path: row.get(5)?,
            ocr_text: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            ocr_pending: row.get::<_, i64>(7)? != 0,
            ai_title: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            ai_title_pending: row.get::<_, i64>(9)? != 0,
        })
    }
}

impl Persistence for Database {
    fn load_all(&self) -> DatabaseResult<Vec<ClipboardEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM clipboard_entries ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))?;
        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn upsert(&self, entry: &ClipboardEntry) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO clipboard_entries
               (id, created_at, source_app, kind, content, image_path, ocr_text, ocr_pending, ai_title, ai_title_pending)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                entry.id,
                ms_to_secs(entry.captured_at_ms),
                entry.source_app,
                entry.kind.label(),
                entry.content,
                entry.image_path,
                entry.ocr_text,
                entry.ocr_pending as i64,
                entry.ai_title,
                entry.ai_title_pending as i64,
            ],
        )?;
        Ok(())
    }

    fn update_ocr(&self, id: &str, text: &str, pending: bool) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE clipboard_entries SET ocr_text = ?1, ocr_pending = ?2 WHERE id = ?3",
            params![text, pending as i64, id],
        )?;
        Ok(())
    }

    fn update_ai_title(&self, id: &str, title: &str, pending: bool) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE clipboard_entries SET ai_title = ?1, ai_title_pending = ?2 WHERE id = ?3",
            params![title, pending as i64, id],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM clipboard_entries WHERE id = ?1", [id])?;
        Ok(())
    }

    fn delete_older_than(&self, cutoff_ms: i64) -> DatabaseResult<Vec<ClipboardEntry>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let cutoff = ms_to_secs(cutoff_ms);

        let removed = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM clipboard_entries WHERE created_at < ?1 ORDER BY created_at DESC",
                SELECT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([cutoff], Self::row_to_entry)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        tx.execute("DELETE FROM clipboard_entries WHERE created_at < ?1", [cutoff])?;
        tx.commit()?;

        Ok(removed)
    }
}
