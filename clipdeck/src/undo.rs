//! Time-windowed undo for deletions
//!
//! Deleted entries are kept on a LIFO stack for the undo window. Image files
//! of deleted entries are not removed right away: they are scheduled for
//! deletion at the end of the window and rescued if the entry is restored.

use crate::interface::ClipboardEntry;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A deleted entry and where it used to live in the list
#[derive(Debug, Clone)]
pub struct DeletedSnapshot {
    pub entry: ClipboardEntry,
    pub index: usize,
    pub deleted_at: Instant,
}

#[derive(Debug)]
pub struct UndoBuffer {
    window: Duration,
    stack: Vec<DeletedSnapshot>,
    /// image path -> time the file may be removed
    pending_deletions: HashMap<String, Instant>,
}

impl UndoBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stack: Vec::new(),
            pending_deletions: HashMap::new(),
        }
    }

    /// Remember a deleted entry and schedule its image file for removal
    pub fn push(&mut self, entry: ClipboardEntry, index: usize, now: Instant) {
        if let Some(path) = &entry.image_path {
            self.pending_deletions.insert(path.clone(), now + self.window);
        }
        self.stack.push(DeletedSnapshot {
            entry,
            index,
            deleted_at: now,
        });
        self.trim_expired(now);
    }

    /// Drop snapshots whose window has run out. Their images become due now.
    /// Returns true if anything was dropped.
    pub fn trim_expired(&mut self, now: Instant) -> bool {
        let window = self.window;
        let before = self.stack.len();
        let pending = &mut self.pending_deletions;

        self.stack.retain(|snapshot| {
            let expired = now.saturating_duration_since(snapshot.deleted_at) >= window;
            if expired {
                if let Some(path) = &snapshot.entry.image_path {
                    pending.insert(path.clone(), now);
                }
            }
            !expired
        });

        self.stack.len() != before
    }

    /// Remove image files whose scheduled time has passed.
    /// Returns the paths taken off the schedule.
    pub fn sweep_due(&mut self, now: Instant) -> Vec<String> {
        let due: Vec<String> = self
            .pending_deletions
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(path, _)| path.clone())
            .collect();

        for path in &due {
            self.pending_deletions.remove(path);
            if let Err(e) = std::fs::remove_file(path) {
                tracing::debug!(path = %path, error = %e, "could not remove expired image");
            }
        }

        due
    }

    /// Pop the most recent snapshot still inside the window and rescue its image
    pub fn pop(&mut self, now: Instant) -> Option<DeletedSnapshot> {
        self.trim_expired(now);
        self.sweep_due(now);

        let snapshot = self.stack.pop()?;
        if let Some(path) = &snapshot.entry.image_path {
            self.pending_deletions.remove(path);
        }
        Some(snapshot)
    }

    /// Take a path off the deletion schedule (the caller removes the file)
    pub fn forget_path(&mut self, path: &str) {
        self.pending_deletions.remove(path);
    }

    pub fn can_undo(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn is_scheduled(&self, path: &str) -> bool {
        self.pending_deletions.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(20);

    fn text(content: &str) -> ClipboardEntry {
        ClipboardEntry::new_text(content.into(), None, 1)
    }

    fn image_on_disk(dir: &std::path::Path, id: &str) -> ClipboardEntry {
        let path = dir.join(format!("{}.png", id));
        std::fs::write(&path, b"png").unwrap();
        ClipboardEntry::new_image(id.into(), path.to_string_lossy().into_owned(), None, 1)
    }

    #[test]
    fn test_lifo_order() {
        let start = Instant::now();
        let mut buffer = UndoBuffer::new(WINDOW);
        buffer.push(text("a"), 0, start);
        buffer.push(text("b"), 3, start);

        let snap = buffer.pop(start).unwrap();
        assert_eq!(snap.entry.content, "b");
        assert_eq!(snap.index, 3);
        assert_eq!(buffer.pop(start).unwrap().entry.content, "a");
        assert!(buffer.pop(start).is_none());
        assert!(!buffer.can_undo());
    }

    #[test]
    fn test_expired_snapshots_are_dropped() {
        let start = Instant::now();
        let mut buffer = UndoBuffer::new(WINDOW);
        buffer.push(text("old"), 0, start);
        buffer.push(text("recent"), 0, start + Duration::from_secs(15));

        let later = start + Duration::from_secs(21);
        assert_eq!(buffer.pop(later).unwrap().entry.content, "recent");
        assert!(buffer.pop(later).is_none());
    }

    #[test]
    fn test_window_boundary_is_expired() {
        let start = Instant::now();
        let mut buffer = UndoBuffer::new(WINDOW);
        buffer.push(text("x"), 0, start);
        assert!(buffer.pop(start + WINDOW).is_none());
    }

    #[test]
    fn test_undo_rescues_image() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut buffer = UndoBuffer::new(WINDOW);
        let entry = image_on_disk(dir.path(), "img");
        let path = entry.image_path.clone().unwrap();

        buffer.push(entry, 0, start);
        assert!(buffer.is_scheduled(&path));

        buffer.pop(start + Duration::from_secs(5)).unwrap();
        assert!(!buffer.is_scheduled(&path));
        assert!(buffer.sweep_due(start + Duration::from_secs(60)).is_empty());
        assert!(std::path::Path::new(&path).exists());
    }

    #[test]
    fn test_sweep_removes_due_files() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut buffer = UndoBuffer::new(WINDOW);
        let entry = image_on_disk(dir.path(), "img");
        let path = entry.image_path.clone().unwrap();
        buffer.push(entry, 0, start);

        assert!(buffer.sweep_due(start + Duration::from_secs(19)).is_empty());
        assert!(std::path::Path::new(&path).exists());

        assert_eq!(buffer.sweep_due(start + WINDOW), vec![path.clone()]);
        assert!(!std::path::Path::new(&path).exists());
    }

    #[test]
    fn test_undo_after_window_deletes_image() {
        let dir = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut buffer = UndoBuffer::new(WINDOW);
        let entry = image_on_disk(dir.path(), "img");
        let path = entry.image_path.clone().unwrap();
        buffer.push(entry, 0, start);

        assert!(buffer.pop(start + Duration::from_secs(30)).is_none());
        assert!(!std::path::Path::new(&path).exists());
    }

    #[test]
    fn test_forget_path() {
        let start = Instant::now();
        let mut buffer = UndoBuffer::new(WINDOW);
        let entry = ClipboardEntry::new_image("i".into(), "/nonexistent/i.png".into(), None, 1);
        buffer.push(entry, 0, start);
        buffer.forget_path("/nonexistent/i.png");
        assert!(!buffer.is_scheduled("/nonexistent/i.png"));
    }
}
