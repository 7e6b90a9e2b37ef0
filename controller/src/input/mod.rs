pub mod acquire;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

pub use acquire::{InputAcquisition, InsertOutcome};

pub const CLIPBOARD_BLOCKED_ADVISORY: &str =
    "Clipboard access blocked. Click in the editor and press Ctrl+V / Cmd+V.";
pub const MANUAL_PASTE_PROMPT: &str =
    "Press Ctrl+V (Cmd+V on Mac) now to paste. We will insert it into the editor.";
pub const REVIEW_EXTRACTED_CODE_ADVISORY: &str =
    "Please check your code for accuracy before optimizing.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard permission denied")]
    PermissionDenied,
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("clipboard operation failed: {0}")]
    Clipboard(#[from] ClipboardError),
}

/// System clipboard as exposed by the hosting view.
#[async_trait]
pub trait ClipboardAccess: Send + Sync {
    async fn read_text(&self) -> Result<String, ClipboardError>;

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Events raised by the hidden capture surface during a manual paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Paste intercepted; `None` when the event carried no text payload.
    Paste(Option<String>),
    /// Focus left the capture surface without a paste.
    Blur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionSource {
    Clipboard,
    ManualCapture,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredText {
    pub text: String,
    pub source: AcquisitionSource,
}

impl AcquiredText {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Normalizes line endings and strips control characters other than
/// whitespace from pasted or extracted text.
pub fn clean_source_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .filter(|ch| !ch.is_control() || ch.is_whitespace())
        .collect()
}

static PYTHON_HINTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^\s*(def|class|import|from|if|for|while|try|except|with)\b",
        r"\b(True|False|None)\b",
        r"(?m)^[ \t]*#[^\n]*$",
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Cheap check that `source` resembles Python. Used for a warning only.
pub fn looks_pythonic(source: &str) -> bool {
    PYTHON_HINTS.iter().any(|hint| hint.is_match(source))
}
