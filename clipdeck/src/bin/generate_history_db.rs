//! Generate a synthetic clipboard history database.
//!
//! Writes through the native `Database` code so the schema always matches
//! what the store opens. Useful for profiling startup and ranking against a
//! realistically sized history.
//!
//! Usage:
//!     cargo run --release --bin generate-history-db -- --count 5000 --db-path history.sqlite

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use clipdeck::database::{Database, Persistence};
use clipdeck::ClipboardEntry;
use rand::prelude::*;
use rand::rngs::StdRng;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of entries to generate
    #[arg(short, long, default_value_t = 2_000)]
    count: usize,

    /// Path of the SQLite database to write
    #[arg(short, long, default_value = "clipboard.sqlite")]
    db_path: String,

    /// History span in days; capture times are spread across it
    #[arg(long, default_value_t = 120)]
    days: i64,

    /// Seed for reproducible output
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

const SOURCE_APPS: &[&str] = &["Terminal", "Safari", "Xcode", "Slack", "Notes", "Finder"];

const SHELL_COMMANDS: &[&str] = &[
    "kubectl config current-context",
    "kubectl get pods -n staging",
    "git checkout -b feature/search-debounce",
    "git rebase -i origin/main",
    "docker compose up --build",
    "cargo build --release",
    "ssh deploy@build-01.internal",
];

const LINKS: &[&str] = &[
    "https://docs.rs/tokio/latest/tokio/sync/watch/index.html",
    "https://github.com/rusqlite/rusqlite/issues",
    "https://sqlite.org/wal.html",
    "https://developer.apple.com/documentation/vision",
];

const SNIPPETS: &[&str] = &[
    "fn main() {\n    println!(\"hello\");\n}",
    "SELECT id, created_at FROM clipboard_entries ORDER BY created_at DESC;",
    "const result = await fetch(url).then((r) => r.json());",
    "impl Drop for Guard {\n    fn drop(&mut self) {}\n}",
];

const PATHS: &[&str] = &[
    "/Users/demo/Documents/quarterly-report.pdf",
    "/Users/demo/Downloads/screenshot-2024-03-11.png",
    "/Users/demo/Projects/clipdeck/Cargo.toml",
];

const WORDS: &[&str] = &[
    "meeting", "notes", "invoice", "deadline", "review", "follow", "up", "budget", "draft",
    "release", "customer", "ticket", "friday", "agenda", "summary",
];

fn prose(rng: &mut StdRng) -> String {
    let len = rng.gen_range(4..24);
    (0..len)
        .map(|_| *WORDS.choose(rng).unwrap_or(&"note"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn random_entry(rng: &mut StdRng, captured_at_ms: i64) -> ClipboardEntry {
    let app = SOURCE_APPS.choose(rng).map(|s| s.to_string());
    let pick = |rng: &mut StdRng, pool: &[&str]| pool.choose(rng).copied().unwrap_or_default().to_string();

    match rng.gen_range(0..10) {
        0..=2 => ClipboardEntry::new_text(pick(rng, SHELL_COMMANDS), app, captured_at_ms),
        3..=4 => ClipboardEntry::new_text(pick(rng, LINKS), app, captured_at_ms),
        5 => ClipboardEntry::new_text(pick(rng, SNIPPETS), app, captured_at_ms),
        6 => ClipboardEntry::new_paths(&[pick(rng, PATHS)], app, captured_at_ms),
        _ => ClipboardEntry::new_text(prose(rng), app, captured_at_ms),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let db = Database::open(&args.db_path)
        .with_context(|| format!("Failed to open database at {}", args.db_path))?;

    let now_ms = Utc::now().timestamp_millis();
    let span_ms = args.days.max(1) * 24 * 60 * 60 * 1000;

    let mut captured: Vec<i64> = (0..args.count)
        .map(|_| now_ms - rng.gen_range(0..span_ms))
        .collect();
    captured.sort_unstable();

    for (i, captured_at_ms) in captured.into_iter().enumerate() {
        let entry = random_entry(&mut rng, captured_at_ms);
        db.upsert(&entry).context("Failed to insert entry")?;
        if (i + 1) % 500 == 0 {
            println!("  {} / {}", i + 1, args.count);
        }
    }

    println!("Wrote {} entries to {}", db.count()?, args.db_path);
    Ok(())
}
