//! Turning clipboard snapshots into candidate entries
//!
//! Probes the snapshot in order (text, file list, image), persists image
//! payloads as PNG under the image directory, and decides whether a candidate
//! duplicates the newest entry.

use crate::interface::{ClipboardEntry, ClipboardSnapshot};
use crate::models::new_entry_id;
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// First 8 bytes of every PNG file
const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),
}

/// Build the entry a snapshot would produce, or `None` when it holds nothing
/// usable. Image bytes are written to `<image_dir>/<id>.png` as a side effect.
pub fn build_candidate(
    snapshot: ClipboardSnapshot,
    image_dir: &Path,
    captured_at_ms: i64,
) -> Result<Option<ClipboardEntry>, CaptureError> {
    let ClipboardSnapshot {
        text,
        file_paths,
        image_data,
        source_app,
    } = snapshot;

    if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
        return Ok(Some(ClipboardEntry::new_text(text, source_app, captured_at_ms)));
    }

    if !file_paths.is_empty() {
        return Ok(Some(ClipboardEntry::new_paths(
            &file_paths,
            source_app,
            captured_at_ms,
        )));
    }

    if let Some(bytes) = image_data.filter(|b| !b.is_empty()) {
        let id = new_entry_id();
        let path = persist_image(&bytes, image_dir, &id)?;
        return Ok(Some(ClipboardEntry::new_image(
            id,
            path.to_string_lossy().into_owned(),
            source_app,
            captured_at_ms,
        )));
    }

    Ok(None)
}

/// Write image bytes as `<image_dir>/<id>.png`.
/// PNG input is written verbatim; other formats are decoded and re-encoded.
pub fn persist_image(bytes: &[u8], image_dir: &Path, id: &str) -> Result<PathBuf, CaptureError> {
    std::fs::create_dir_all(image_dir)?;
    let destination = image_dir.join(format!("{}.png", id));

    if bytes.starts_with(PNG_SIGNATURE) {
        std::fs::write(&destination, bytes)?;
        return Ok(destination);
    }

    let decoded = image::load_from_memory(bytes)?;
    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    std::fs::write(&destination, png)?;
    Ok(destination)
}

/// Whether `candidate` repeats `latest`, the current head of the list.
///
/// Non-images compare kind and content. Images compare file size first, then
/// the full bytes; unreadable files never count as duplicates.
pub fn is_duplicate_of_latest(candidate: &ClipboardEntry, latest: Option<&ClipboardEntry>) -> bool {
    let Some(latest) = latest else {
        return false;
    };

    match (candidate.is_image(), latest.is_image()) {
        (false, false) => candidate.kind == latest.kind && candidate.content == latest.content,
        (true, true) => match (candidate.image_path.as_deref(), latest.image_path.as_deref()) {
            (Some(new_path), Some(old_path)) => same_file_contents(new_path, old_path),
            _ => false,
        },
        _ => false,
    }
}

fn same_file_contents(a: &str, b: &str) -> bool {
    let (Ok(meta_a), Ok(meta_b)) = (std::fs::metadata(a), std::fs::metadata(b)) else {
        return false;
    };
    if meta_a.len() != meta_b.len() {
        return false;
    }
    match (std::fs::read(a), std::fs::read(b)) {
        (Ok(bytes_a), Ok(bytes_b)) => bytes_a == bytes_b,
        _ => false,
    }
}

/// Encode a solid-color RGBA image, used by tests to fake pasteboard images
#[cfg(test)]
pub(crate) fn encode_test_image(format: ImageFormat, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba(rgba));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), format)
        .unwrap();
    out
}
