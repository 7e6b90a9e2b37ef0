use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    AcquiredText, AcquisitionSource, CLIPBOARD_BLOCKED_ADVISORY, CaptureEvent, ClipboardAccess,
    InputError, MANUAL_PASTE_PROMPT, REVIEW_EXTRACTED_CODE_ADVISORY, clean_source_text,
};
use crate::config::ControllerConfig;
use crate::error::AnalysisError;
use crate::metrics::fields::text;
use crate::network::{
    AnalysisTransport, IMAGE_TO_CODE_PATH, IMAGE_UPLOAD_FIELD, ImageUpload, TransportResponse,
    server_error,
};
use crate::reveal::TypewriterReveal;
use crate::surface::Surfaces;
use crate::timer::TimerService;

/// Where extracted code ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Written into the rich editor after `retries` waits.
    Editor { retries: u32 },
    /// Editor never attached; revealed into the raw fallback area instead.
    FallbackReveal,
}

/// Owns writes to the input surface: clipboard paste, manual capture and
/// image-to-code extraction.
pub struct InputAcquisition {
    surfaces: Surfaces,
    clipboard: Arc<dyn ClipboardAccess>,
    transport: Arc<dyn AnalysisTransport>,
    reveal: Arc<TypewriterReveal>,
    timers: TimerService,
    retry_attempts: u32,
    retry_interval: Duration,
    reveal_interval: Duration,
    capture_tx: mpsc::UnboundedSender<CaptureEvent>,
    capture_rx: Mutex<mpsc::UnboundedReceiver<CaptureEvent>>,
    shutdown: CancellationToken,
}

impl InputAcquisition {
    pub fn new(
        surfaces: Surfaces,
        clipboard: Arc<dyn ClipboardAccess>,
        transport: Arc<dyn AnalysisTransport>,
        reveal: Arc<TypewriterReveal>,
        timers: TimerService,
        config: &ControllerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        Self {
            surfaces,
            clipboard,
            transport,
            reveal,
            timers,
            retry_attempts: config.editor_retry_attempts,
            retry_interval: config.editor_retry_interval(),
            reveal_interval: config.reveal_interval(),
            capture_tx,
            capture_rx: Mutex::new(capture_rx),
            shutdown,
        }
    }

    /// Clipboard text, falling back to a manual paste into the capture
    /// surface when access is refused. Resolves to empty text when the user
    /// abandons the manual paste.
    pub async fn acquire_clipboard_text(&self) -> AcquiredText {
        match self.clipboard.read_text().await {
            Ok(text) => AcquiredText {
                text,
                source: AcquisitionSource::Clipboard,
            },
            Err(err) => {
                warn!("clipboard read refused, using manual capture: {err}");
                AcquiredText {
                    text: self.manual_capture().await,
                    source: AcquisitionSource::ManualCapture,
                }
            }
        }
    }

    async fn manual_capture(&self) -> String {
        let Some(capture) = self.surfaces.capture.clone() else {
            self.surfaces.view.show_advisory(CLIPBOARD_BLOCKED_ADVISORY);
            self.surfaces.active_input().focus();
            return String::new();
        };

        let mut events = self.capture_rx.lock().await;
        while events.try_recv().is_ok() {}

        capture.clear();
        capture.focus_and_select();
        self.surfaces.view.show_advisory(MANUAL_PASTE_PROMPT);

        let text = tokio::select! {
            event = events.recv() => match event {
                Some(CaptureEvent::Paste(Some(text))) => text,
                Some(CaptureEvent::Paste(None)) => capture.value(),
                Some(CaptureEvent::Blur) | None => {
                    debug!("manual paste abandoned");
                    String::new()
                }
            },
            _ = self.shutdown.cancelled() => String::new(),
        };
        capture.clear();
        text
    }

    /// Forwards an event from the capture surface to a pending manual paste.
    pub fn deliver_capture_event(&self, event: CaptureEvent) {
        if self.capture_tx.send(event).is_err() {
            debug!("capture event dropped; no receiver");
        }
    }

    /// Pastes at the input selection. The paste trigger hides once text has
    /// actually been acquired.
    pub async fn paste(&self) -> AcquiredText {
        let mut acquired = self.acquire_clipboard_text().await;
        acquired.text = clean_source_text(&acquired.text);
        self.insert_text(&acquired.text);
        if !acquired.is_empty() {
            self.surfaces.view.set_paste_control_visible(false);
            info!(chars = acquired.text.chars().count(), "pasted into input");
        }
        acquired
    }

    /// Replaces the current selection of the active input surface. Empty
    /// text only focuses it.
    pub fn insert_text(&self, text: &str) {
        let input = self.surfaces.active_input();
        if !text.is_empty() {
            input.replace_selection(text);
        }
        input.focus();
    }

    /// Direct typing or pasting into the input hides both acquisition
    /// triggers.
    pub fn input_edited(&self) {
        self.surfaces.set_acquisition_controls_visible(false);
    }

    pub async fn extract_code_from_image(
        &self,
        upload: ImageUpload,
    ) -> Result<String, AnalysisError> {
        let result = self.request_extraction(&upload).await;
        let code = match result {
            Ok(code) => code,
            Err(err) => {
                warn!(file = %upload.file_name, "image extraction failed: {err}");
                self.surfaces.output.set_value(&err.user_message());
                return Err(err);
            }
        };

        let outcome = self.place_extracted_code(&code).await;
        info!(?outcome, chars = code.chars().count(), "extracted code placed");
        self.surfaces.set_acquisition_controls_visible(false);
        self.surfaces.view.show_advisory(REVIEW_EXTRACTED_CODE_ADVISORY);
        Ok(code)
    }

    async fn request_extraction(&self, upload: &ImageUpload) -> Result<String, AnalysisError> {
        let response = self
            .transport
            .post_file(IMAGE_TO_CODE_PATH, IMAGE_UPLOAD_FIELD, upload)
            .await?;
        classify_extraction(&response)
    }

    /// Writes `code` into the editor, waiting for it to attach. Gives up
    /// after the configured retries and reveals into the fallback area.
    pub async fn place_extracted_code(&self, code: &str) -> InsertOutcome {
        for attempt in 0..=self.retry_attempts {
            if let Some(editor) = self.surfaces.editor.get() {
                editor.set_value(code);
                editor.focus();
                return InsertOutcome::Editor { retries: attempt };
            }
            if attempt < self.retry_attempts {
                debug!(attempt = attempt + 1, "input editor not ready, retrying");
                self.timers.delay(self.retry_interval).await;
            }
        }

        warn!("input editor never attached, revealing into fallback area");
        self.reveal.reveal(
            Arc::clone(&self.surfaces.input_fallback),
            code,
            self.reveal_interval,
        );
        InsertOutcome::FallbackReveal
    }

    pub async fn copy_output(&self) -> Result<(), InputError> {
        let text = self.surfaces.output.value();
        self.clipboard.write_text(&text).await?;
        Ok(())
    }
}

fn classify_extraction(response: &TransportResponse) -> Result<String, AnalysisError> {
    let body = response.json()?;
    if text(&body, &["error"]).is_some() {
        return Err(server_error(&body));
    }
    if !response.is_success() {
        return Err(AnalysisError::Server {
            message: format!("HTTP error! status: {}", response.status),
            details: Vec::new(),
        });
    }
    match text(&body, &["code"]) {
        Some(code) => Ok(clean_source_text(&code)),
        None => Err(AnalysisError::ExtractionFailure),
    }
}
