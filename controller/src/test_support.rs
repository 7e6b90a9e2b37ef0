//! Recording fakes for the view seams and the transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::input::{ClipboardAccess, ClipboardError};
use crate::metrics::MetricsReport;
use crate::network::{AnalysisTransport, ImageUpload, NetworkError, TransportResponse};
use crate::state::{RequestKind, RuntimeState, lock};
use crate::surface::{
    CaptureSurface, EditableSurface, HostView, SurfaceId, SurfaceSlot, Surfaces,
};
use crate::timer::TimerService;

/// Lets every ready task run before the caller resumes.
pub async fn flush() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Set(String),
    Append(String),
    Replace(String),
    Focus,
    Busy(bool),
}

pub struct RecordingSurface {
    id: SurfaceId,
    value: Mutex<String>,
    ops: Mutex<Vec<SurfaceOp>>,
}

impl RecordingSurface {
    pub fn new(id: SurfaceId) -> Arc<Self> {
        Arc::new(Self {
            id,
            value: Mutex::new(String::new()),
            ops: Mutex::new(Vec::new()),
        })
    }

    pub fn value(&self) -> String {
        lock(&self.value).clone()
    }

    pub fn set_value(&self, text: &str) {
        *lock(&self.value) = text.to_string();
        self.record(SurfaceOp::Set(text.to_string()));
    }

    pub fn ops(&self) -> Vec<SurfaceOp> {
        lock(&self.ops).clone()
    }

    pub fn appended(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SurfaceOp::Append(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn busy_changes(&self) -> Vec<bool> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SurfaceOp::Busy(busy) => Some(busy),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: SurfaceOp) {
        lock(&self.ops).push(op);
    }
}

impl EditableSurface for RecordingSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn value(&self) -> String {
        RecordingSurface::value(self)
    }

    fn set_value(&self, text: &str) {
        RecordingSurface::set_value(self, text);
    }

    fn append(&self, text: &str) {
        lock(&self.value).push_str(text);
        self.record(SurfaceOp::Append(text.to_string()));
    }

    // Cursor sits at the end; there is never a selection.
    fn replace_selection(&self, text: &str) {
        lock(&self.value).push_str(text);
        self.record(SurfaceOp::Replace(text.to_string()));
    }

    fn focus(&self) {
        self.record(SurfaceOp::Focus);
    }

    fn set_busy(&self, busy: bool) {
        self.record(SurfaceOp::Busy(busy));
    }
}

#[derive(Default)]
pub struct RecordingCapture {
    value: Mutex<String>,
    focused: AtomicUsize,
}

impl RecordingCapture {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn focus_count(&self) -> usize {
        self.focused.load(Ordering::SeqCst)
    }

    pub fn type_text(&self, text: &str) {
        lock(&self.value).push_str(text);
    }

    pub fn value(&self) -> String {
        lock(&self.value).clone()
    }
}

impl CaptureSurface for RecordingCapture {
    fn focus_and_select(&self) {
        self.focused.fetch_add(1, Ordering::SeqCst);
    }

    fn value(&self) -> String {
        RecordingCapture::value(self)
    }

    fn clear(&self) {
        lock(&self.value).clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewOp {
    TriggerBusy(RequestKind, bool),
    PasteVisible(bool),
    UploadVisible(bool),
    Advisory(String),
    Toast(bool),
    ScrollMetrics,
    Revisions(Vec<String>),
    Metrics(MetricsReport),
}

#[derive(Default)]
pub struct RecordingView {
    ops: Mutex<Vec<ViewOp>>,
}

impl RecordingView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ops(&self) -> Vec<ViewOp> {
        lock(&self.ops).clone()
    }

    pub fn count(&self, op: &ViewOp) -> usize {
        lock(&self.ops).iter().filter(|seen| *seen == op).count()
    }

    /// Last toast visibility the view was told about.
    pub fn toast_visible(&self) -> Option<bool> {
        lock(&self.ops).iter().rev().find_map(|op| match op {
            ViewOp::Toast(visible) => Some(*visible),
            _ => None,
        })
    }

    pub fn toast_shown(&self) -> bool {
        self.count(&ViewOp::Toast(true)) > 0
    }

    pub fn trigger_busy_changes(&self, kind: RequestKind) -> Vec<bool> {
        lock(&self.ops)
            .iter()
            .filter_map(|op| match op {
                ViewOp::TriggerBusy(seen, busy) if *seen == kind => Some(*busy),
                _ => None,
            })
            .collect()
    }

    pub fn revisions(&self) -> Vec<Vec<String>> {
        lock(&self.ops)
            .iter()
            .filter_map(|op| match op {
                ViewOp::Revisions(lines) => Some(lines.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_metrics(&self) -> Option<MetricsReport> {
        lock(&self.ops).iter().rev().find_map(|op| match op {
            ViewOp::Metrics(report) => Some(report.clone()),
            _ => None,
        })
    }

    fn record(&self, op: ViewOp) {
        lock(&self.ops).push(op);
    }
}

impl HostView for RecordingView {
    fn set_trigger_busy(&self, kind: RequestKind, busy: bool) {
        self.record(ViewOp::TriggerBusy(kind, busy));
    }

    fn set_paste_control_visible(&self, visible: bool) {
        self.record(ViewOp::PasteVisible(visible));
    }

    fn set_upload_control_visible(&self, visible: bool) {
        self.record(ViewOp::UploadVisible(visible));
    }

    fn show_advisory(&self, message: &str) {
        self.record(ViewOp::Advisory(message.to_string()));
    }

    fn set_toast_visible(&self, visible: bool) {
        self.record(ViewOp::Toast(visible));
    }

    fn scroll_metrics_into_view(&self) {
        self.record(ViewOp::ScrollMetrics);
    }

    fn render_revisions(&self, lines: &[String]) {
        self.record(ViewOp::Revisions(lines.to_vec()));
    }

    fn render_metrics(&self, report: &MetricsReport) {
        self.record(ViewOp::Metrics(report.clone()));
    }
}

pub struct FakeClipboard {
    contents: Result<String, ClipboardError>,
    written: Mutex<Vec<String>>,
}

impl FakeClipboard {
    pub fn with_text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            contents: Ok(text.to_string()),
            written: Mutex::new(Vec::new()),
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            contents: Err(ClipboardError::PermissionDenied),
            written: Mutex::new(Vec::new()),
        })
    }

    pub fn written(&self) -> Vec<String> {
        lock(&self.written).clone()
    }
}

#[async_trait]
impl ClipboardAccess for FakeClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        self.contents.clone()
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.contents.as_ref().map_err(Clone::clone)?;
        lock(&self.written).push(text.to_string());
        Ok(())
    }
}

type Reply = Result<TransportResponse, NetworkError>;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub body: Option<Value>,
    pub upload: Option<ImageUpload>,
}

/// Answers from a queue of scripted replies. With the queue empty a call
/// stays pending until the test resolves it by index.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
    pending: Mutex<Vec<Option<oneshot::Sender<Reply>>>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply_with(&self, reply: Reply) {
        lock(&self.replies).push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub async fn wait_for_calls(&self, count: usize) {
        while lock(&self.calls).len() < count {
            tokio::task::yield_now().await;
        }
    }

    /// Completes the `index`-th call that was left pending.
    pub fn resolve(&self, index: usize, reply: Reply) {
        let sender = lock(&self.pending).get_mut(index).and_then(Option::take);
        if let Some(sender) = sender {
            let _ = sender.send(reply);
        }
    }

    async fn answer(&self, call: RecordedCall) -> Reply {
        lock(&self.calls).push(call);
        if let Some(reply) = lock(&self.replies).pop_front() {
            return reply;
        }
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).push(Some(tx));
        rx.await
            .unwrap_or_else(|_| Err(NetworkError::Request("call abandoned".to_string())))
    }
}

#[async_trait]
impl AnalysisTransport for ScriptedTransport {
    async fn post_json(&self, path: &str, body: &Value) -> Reply {
        self.answer(RecordedCall {
            path: path.to_string(),
            body: Some(body.clone()),
            upload: None,
        })
        .await
    }

    async fn post_file(&self, path: &str, _field: &str, upload: &ImageUpload) -> Reply {
        self.answer(RecordedCall {
            path: path.to_string(),
            body: None,
            upload: Some(upload.clone()),
        })
        .await
    }
}

/// One set of surfaces wired to recording fakes.
pub struct Harness {
    pub editor: Option<Arc<RecordingSurface>>,
    pub editor_slot: SurfaceSlot,
    pub input_fallback: Arc<RecordingSurface>,
    pub output: Arc<RecordingSurface>,
    pub capture: Option<Arc<RecordingCapture>>,
    pub view: Arc<RecordingView>,
    pub clipboard: Arc<FakeClipboard>,
    pub transport: Arc<ScriptedTransport>,
    pub timers: TimerService,
    pub runtime: Arc<RuntimeState>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            editor: None,
            editor_slot: SurfaceSlot::new(),
            input_fallback: RecordingSurface::new(SurfaceId::InputFallback),
            output: RecordingSurface::new(SurfaceId::Output),
            capture: None,
            view: RecordingView::new(),
            clipboard: FakeClipboard::with_text(""),
            transport: ScriptedTransport::new(),
            timers: TimerService::new(),
            runtime: Arc::new(RuntimeState::new()),
        }
    }

    pub fn with_editor(mut self) -> Self {
        let editor = RecordingSurface::new(SurfaceId::Input);
        self.editor_slot.attach(editor.clone());
        self.editor = Some(editor);
        self
    }

    pub fn with_capture(mut self, capture: Arc<RecordingCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<FakeClipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_transport(mut self, transport: Arc<ScriptedTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn surfaces(&self) -> Surfaces {
        Surfaces {
            editor: self.editor_slot.clone(),
            input_fallback: self.input_fallback.clone(),
            output: self.output.clone(),
            capture: self
                .capture
                .clone()
                .map(|capture| capture as Arc<dyn CaptureSurface>),
            view: self.view.clone(),
        }
    }
}
