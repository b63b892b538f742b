//! Image enrichers
//!
//! OCR and AI titles are produced outside the store and written back into
//! image entries once they finish. Both are best-effort: a failure completes
//! the enrichment with an empty value.

use crate::config::DEFAULT_IMAGE_TITLE_MODEL;
use crate::subprocess::{locate_binary, run_captured};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

pub use crate::interface::TextRecognizer;

const PI_BINARY: &str = "pi";
const TESSERACT_BINARY: &str = "tesseract";

const TITLE_PROMPT: &str = "You are generating a title for a clipboard entry in a clipboard manager app. \
The title appears as a single line in a list of recent clipboard items, helping the user \
quickly identify what they copied. Write one short, descriptive sentence (under 80 characters \
if possible) that captures what this image shows. Be specific and concrete: mention key \
subjects, UI elements, text, or context visible in the image. Output ONLY the title, \
nothing else. No quotes, no prefix, no explanation.";

/// Produces a one-line description of an image
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    /// `None` on any failure
    async fn generate(&self, image_path: &str) -> Option<String>;

    /// Change the model used for later generations. Blank values are ignored.
    fn set_model(&self, model: &str);
}

/// Title generator driving the `pi` CLI
pub struct PiTitleGenerator {
    model: RwLock<String>,
    timeout: Duration,
    program: OnceCell<Option<PathBuf>>,
    /// Arguments placed before the pi flags
    base_args: Vec<String>,
}

impl PiTitleGenerator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            model: RwLock::new(DEFAULT_IMAGE_TITLE_MODEL.to_string()),
            timeout,
            program: OnceCell::new(),
            base_args: Vec::new(),
        }
    }

    /// Generator invoking `program base_args... <pi flags>` instead of a located `pi`
    pub fn with_program(timeout: Duration, program: impl Into<PathBuf>, base_args: Vec<String>) -> Self {
        Self {
            program: OnceCell::with_value(Some(program.into())),
            base_args,
            ..Self::new(timeout)
        }
    }

    pub fn model(&self) -> String {
        self.model.read().clone()
    }

    async fn program(&self) -> Option<PathBuf> {
        if let Some(program) = self.program.get() {
            return program.clone();
        }
        let resolved = tokio::task::spawn_blocking(|| locate_binary(PI_BINARY))
            .await
            .unwrap_or(None);
        self.program.get_or_init(|| resolved).clone()
    }

    fn arguments(&self, image_path: &str) -> Vec<String> {
        let model = self.model();
        self.base_args
            .iter()
            .cloned()
            .chain(
                [
                    "-p",
                    "--model",
                    model.as_str(),
                    "--no-tools",
                    "--no-extensions",
                    "--no-skills",
                    "--no-session",
                    "--thinking",
                    "off",
                ]
                .into_iter()
                .map(String::from),
            )
            .chain([format!("@{}", image_path), TITLE_PROMPT.to_string()])
            .collect()
    }
}

#[async_trait]
impl TitleGenerator for PiTitleGenerator {
    async fn generate(&self, image_path: &str) -> Option<String> {
        let program = self.program().await?;
        let args = self.arguments(image_path);

        // Losing branch is dropped; dropping the output future kills pi
        let output = tokio::select! {
            output = run_captured(&program, &args) => output?,
            _ = tokio::time::sleep(self.timeout) => {
                tracing::debug!(path = image_path, "title generation timed out");
                return None;
            }
        };

        if !output.success {
            return None;
        }
        let title = output.stdout.trim();
        (!title.is_empty()).then(|| title.to_string())
    }

    fn set_model(&self, model: &str) {
        let trimmed = model.trim();
        if !trimmed.is_empty() {
            *self.model.write() = trimmed.to_string();
        }
    }
}

/// OCR through the `tesseract` CLI (`tesseract <image> stdout`)
#[derive(Debug, Default)]
pub struct CommandTextRecognizer {
    program: OnceCell<Option<PathBuf>>,
}

impl CommandTextRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: OnceCell::with_value(Some(program.into())),
        }
    }
}

impl TextRecognizer for CommandTextRecognizer {
    fn recognize(&self, image_path: String) -> String {
        let Some(program) = self
            .program
            .get_or_init(|| locate_binary(TESSERACT_BINARY))
            .clone()
        else {
            return String::new();
        };

        match std::process::Command::new(&program)
            .args([image_path.as_str(), "stdout"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
            Ok(out) => {
                tracing::debug!(path = %image_path, status = %out.status, "ocr failed");
                String::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to spawn ocr command");
                String::new()
            }
        }
    }
}

/// Recognizer that never finds text
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTextRecognizer;

impl TextRecognizer for NoopTextRecognizer {
    fn recognize(&self, _image_path: String) -> String {
        String::new()
    }
}
