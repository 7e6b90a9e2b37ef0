//! Seams to the hosting view. The view owns every surface and control; the
//! controller only holds shared references to them.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::metrics::MetricsReport;
use crate::state::RequestKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    /// Rich code editor for the source text. May attach late.
    Input,
    /// Raw text area behind the editor, always present.
    InputFallback,
    Output,
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Input => "input",
            Self::InputFallback => "input-fallback",
            Self::Output => "output",
        };
        f.write_str(label)
    }
}

pub trait EditableSurface: Send + Sync {
    fn id(&self) -> SurfaceId;

    fn value(&self) -> String;

    fn set_value(&self, text: &str);

    fn append(&self, text: &str) {
        let mut current = self.value();
        current.push_str(text);
        self.set_value(&current);
    }

    /// Inserts at the cursor, replacing the selected range if any.
    fn replace_selection(&self, text: &str);

    fn focus(&self) {}

    /// Shimmer indicator while a request is in flight.
    fn set_busy(&self, _busy: bool) {}
}

/// Off-screen text area that receives a manual paste when clipboard access is
/// blocked.
pub trait CaptureSurface: Send + Sync {
    fn focus_and_select(&self);

    fn value(&self) -> String;

    fn clear(&self);
}

pub trait HostView: Send + Sync {
    /// Disables the trigger and shows its shimmer while `busy`.
    fn set_trigger_busy(&self, kind: RequestKind, busy: bool);

    fn set_paste_control_visible(&self, visible: bool);

    fn set_upload_control_visible(&self, visible: bool);

    fn show_advisory(&self, message: &str);

    fn set_toast_visible(&self, visible: bool);

    fn scroll_metrics_into_view(&self);

    fn render_revisions(&self, lines: &[String]);

    fn render_metrics(&self, report: &MetricsReport);
}

/// Late-bound slot for the rich input editor, which the view constructs
/// asynchronously.
#[derive(Clone, Default)]
pub struct SurfaceSlot {
    inner: Arc<RwLock<Option<Arc<dyn EditableSurface>>>>,
}

impl SurfaceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, surface: Arc<dyn EditableSurface>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(surface);
    }

    pub fn detach(&self) -> Option<Arc<dyn EditableSurface>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn get(&self) -> Option<Arc<dyn EditableSurface>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }
}

/// Everything the controller writes to, handed over once at init.
#[derive(Clone)]
pub struct Surfaces {
    pub editor: SurfaceSlot,
    pub input_fallback: Arc<dyn EditableSurface>,
    pub output: Arc<dyn EditableSurface>,
    pub capture: Option<Arc<dyn CaptureSurface>>,
    pub view: Arc<dyn HostView>,
}

impl Surfaces {
    /// The editor when attached, otherwise the raw fallback area.
    pub fn active_input(&self) -> Arc<dyn EditableSurface> {
        self.editor
            .get()
            .unwrap_or_else(|| Arc::clone(&self.input_fallback))
    }

    pub fn set_acquisition_controls_visible(&self, visible: bool) {
        self.view.set_paste_control_visible(visible);
        self.view.set_upload_control_visible(visible);
    }
}
