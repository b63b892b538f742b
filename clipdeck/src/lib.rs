//! ClipDeck Core - Rust business logic for a clipboard history manager
//!
//! Captures clipboard changes into a SQLite-backed history, enriches images
//! with OCR text and generated titles, and answers queries by merging local
//! fuzzy ranking with an optional external keyword/semantic index.
//!
//! Types are exported via UniFFI proc-macros (#[derive(uniffi::Record/Enum)]).

pub mod backend;
pub mod capture;
pub mod config;
pub mod content_detection;
pub mod database;
pub mod enrichment;
pub mod interface;
pub mod models;
pub mod ranking;
pub mod search;
mod store;
mod subprocess;
pub mod undo;

pub use config::StoreConfig;
pub use interface::*;
pub use store::{ClipboardStore, Collaborators};

uniffi::setup_scaffolding!("clipdeck");
