//! Entry points for the hosting view. One `Controller` owns the surfaces,
//! timers and request bookkeeping for a single page.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ControllerConfig, SubmitOptions};
use crate::error::{AnalysisError, AppError};
use crate::input::{AcquiredText, CaptureEvent, ClipboardAccess, InputAcquisition, looks_pythonic};
use crate::lifecycle::RequestLifecycle;
use crate::network::{AnalysisTransport, HttpTransport, ImageUpload};
use crate::notify::Notifier;
use crate::reveal::TypewriterReveal;
use crate::state::{ControllerEvent, RequestId, RequestKind, RequestState, RuntimeState};
use crate::surface::Surfaces;
use crate::timer::TimerService;

/// A key event forwarded by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Ctrl+Enter or Cmd+Enter. Plain Enter belongs to the editor.
    pub fn is_submit_shortcut(&self) -> bool {
        self.key == "Enter" && (self.ctrl || self.meta)
    }
}

pub struct Controller {
    config: ControllerConfig,
    surfaces: Surfaces,
    runtime: Arc<RuntimeState>,
    timers: TimerService,
    reveal: Arc<TypewriterReveal>,
    notifier: Arc<Notifier>,
    lifecycle: Arc<RequestLifecycle>,
    input: InputAcquisition,
    shutdown: CancellationToken,
}

impl Controller {
    /// Wires the controller to the view's surfaces. Must run inside a tokio
    /// runtime; requests and timers are spawned onto it.
    pub fn init(
        surfaces: Surfaces,
        transport: Arc<dyn AnalysisTransport>,
        clipboard: Arc<dyn ClipboardAccess>,
        config: ControllerConfig,
    ) -> Result<Self, AppError> {
        let config = config.validate()?;
        tokio::runtime::Handle::try_current()
            .map_err(|err| AppError::Runtime(format!("no tokio runtime: {err}")))?;

        let runtime = Arc::new(RuntimeState::new());
        let timers = TimerService::new();
        let shutdown = CancellationToken::new();
        let reveal = Arc::new(TypewriterReveal::new(timers.clone()));
        let notifier = Arc::new(Notifier::new(
            timers.clone(),
            Arc::clone(&surfaces.view),
            Arc::clone(&runtime),
            config.toast_duration(),
        ));
        let lifecycle = Arc::new(RequestLifecycle::new(
            Arc::clone(&runtime),
            surfaces.clone(),
            Arc::clone(&transport),
            Arc::clone(&notifier),
        ));
        let input = InputAcquisition::new(
            surfaces.clone(),
            clipboard,
            transport,
            Arc::clone(&reveal),
            timers.clone(),
            &config,
            shutdown.clone(),
        );

        info!(base_url = %config.base_url, "controller initialized");
        Ok(Self {
            config,
            surfaces,
            runtime,
            timers,
            reveal,
            notifier,
            lifecycle,
            input,
            shutdown,
        })
    }

    /// [`Controller::init`] with the HTTP transport for `config.base_url`.
    pub fn connect(
        surfaces: Surfaces,
        clipboard: Arc<dyn ClipboardAccess>,
        config: ControllerConfig,
    ) -> Result<Self, AppError> {
        let config = config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::init(surfaces, transport, clipboard, config)
    }

    /// Cancels every timer, reveal and pending manual paste. In-flight
    /// requests still settle, but new submissions are refused.
    pub fn dispose(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        self.reveal.cancel_all();
        self.notifier.dismiss();
        self.timers.cancel_all();
        info!("controller disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Sends the current input text. The outcome arrives as a
    /// [`ControllerEvent::RequestSettled`].
    pub fn submit(
        &self,
        kind: RequestKind,
        options: SubmitOptions,
    ) -> Result<RequestId, AppError> {
        if self.is_disposed() {
            return Err(AppError::Disposed(kind));
        }
        let code = self.surfaces.active_input().value();
        if !looks_pythonic(&code) {
            warn!(%kind, "input does not look like Python; sending anyway");
        }
        Ok(self.lifecycle.submit(kind, code, options))
    }

    /// Submits an optimize request on Ctrl+Enter / Cmd+Enter. Returns `None`
    /// when the key was not the shortcut.
    pub fn handle_key(
        &self,
        key: &KeyPress,
        options: SubmitOptions,
    ) -> Result<Option<RequestId>, AppError> {
        if !key.is_submit_shortcut() {
            return Ok(None);
        }
        self.submit(RequestKind::Optimize, options).map(Some)
    }

    pub async fn paste(&self) -> AcquiredText {
        self.input.paste().await
    }

    pub fn deliver_capture_event(&self, event: CaptureEvent) {
        self.input.deliver_capture_event(event);
    }

    pub fn input_edited(&self) {
        self.input.input_edited();
    }

    pub async fn upload_image(&self, upload: ImageUpload) -> Result<String, AnalysisError> {
        self.input.extract_code_from_image(upload).await
    }

    pub async fn copy_output(&self) {
        if let Err(err) = self.input.copy_output().await {
            warn!("copy to clipboard failed: {err}");
        }
    }

    pub fn toast_clicked(&self) -> bool {
        self.notifier.click()
    }

    /// Empties both surfaces and brings back the acquisition triggers.
    pub fn clear(&self) {
        self.reveal.cancel_all();
        if let Some(editor) = self.surfaces.editor.get() {
            editor.set_value("");
        }
        self.surfaces.input_fallback.set_value("");
        self.surfaces.output.set_value("");
        self.surfaces.set_acquisition_controls_visible(true);
        self.surfaces.view.render_revisions(&[]);
    }

    pub fn state(&self, kind: RequestKind) -> RequestState {
        self.runtime.state(kind)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.runtime.subscribe()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.dispose();
    }
}
