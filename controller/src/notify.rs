use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::state::{ControllerEvent, RuntimeState, lock};
use crate::surface::HostView;
use crate::timer::{TimerHandle, TimerService};

#[derive(Debug, Default)]
struct ToastState {
    visible: bool,
    expiry: Option<TimerHandle>,
}

/// "Metrics ready" toast with auto-dismiss. Re-arming restarts the expiry
/// instead of stacking timers.
pub struct Notifier {
    timers: TimerService,
    view: Arc<dyn HostView>,
    runtime: Arc<RuntimeState>,
    duration: Duration,
    state: Arc<Mutex<ToastState>>,
}

impl Notifier {
    pub fn new(
        timers: TimerService,
        view: Arc<dyn HostView>,
        runtime: Arc<RuntimeState>,
        duration: Duration,
    ) -> Self {
        Self {
            timers,
            view,
            runtime,
            duration,
            state: Arc::new(Mutex::new(ToastState::default())),
        }
    }

    pub fn arm(&self) {
        let mut state = lock(&self.state);
        if let Some(previous) = state.expiry.take() {
            self.timers.cancel(previous);
        }

        let shared = Arc::clone(&self.state);
        let view = Arc::clone(&self.view);
        let runtime = Arc::clone(&self.runtime);
        let expiry = self.timers.schedule_once(self.duration, move || {
            {
                let mut state = lock(&shared);
                state.visible = false;
                state.expiry = None;
            }
            view.set_toast_visible(false);
            runtime.emit(ControllerEvent::ToastHidden);
            debug!("toast expired");
        });

        let was_visible = std::mem::replace(&mut state.visible, true);
        state.expiry = Some(expiry);
        drop(state);

        self.view.set_toast_visible(true);
        if !was_visible {
            self.runtime.emit(ControllerEvent::ToastShown);
        }
    }

    /// Dismisses a visible toast and scrolls the metrics into view. Returns
    /// `false` and does nothing when the toast is already hidden.
    pub fn click(&self) -> bool {
        {
            let mut state = lock(&self.state);
            if !state.visible {
                return false;
            }
            state.visible = false;
            if let Some(expiry) = state.expiry.take() {
                self.timers.cancel(expiry);
            }
        }

        self.view.set_toast_visible(false);
        self.view.scroll_metrics_into_view();
        self.runtime.emit(ControllerEvent::ToastHidden);
        true
    }

    /// Hides the toast without scrolling.
    pub fn dismiss(&self) {
        let was_visible = {
            let mut state = lock(&self.state);
            if let Some(expiry) = state.expiry.take() {
                self.timers.cancel(expiry);
            }
            std::mem::replace(&mut state.visible, false)
        };
        if was_visible {
            self.view.set_toast_visible(false);
            self.runtime.emit(ControllerEvent::ToastHidden);
        }
    }

    pub fn is_visible(&self) -> bool {
        lock(&self.state).visible
    }
}
