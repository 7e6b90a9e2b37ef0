//! Typewriter reveal: one character appended per tick, at most one live
//! reveal per surface.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::state::lock;
use crate::surface::{EditableSurface, SurfaceId};
use crate::timer::{TimerHandle, TimerService};

pub struct TypewriterReveal {
    timers: TimerService,
    active: Mutex<HashMap<SurfaceId, TimerHandle>>,
}

impl TypewriterReveal {
    pub fn new(timers: TimerService) -> Self {
        Self {
            timers,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Clears `surface` and reveals `text` into it. Any reveal already
    /// running against the same surface is cancelled first. Returns `None`
    /// when there is nothing to reveal.
    pub fn reveal(
        &self,
        surface: Arc<dyn EditableSurface>,
        text: &str,
        interval: Duration,
    ) -> Option<TimerHandle> {
        let id = surface.id();
        let mut active = lock(&self.active);
        if let Some(previous) = active.remove(&id) {
            if self.timers.cancel(previous) {
                debug!(surface = %id, "superseded running reveal");
            }
        }

        surface.set_value("");
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return None;
        }

        let mut cursor = 0;
        let mut unit = [0_u8; 4];
        let handle = self.timers.schedule_repeating(interval, move || {
            let Some(ch) = chars.get(cursor) else {
                return ControlFlow::Break(());
            };
            surface.append(ch.encode_utf8(&mut unit));
            cursor += 1;
            if cursor == chars.len() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        active.insert(id, handle);
        Some(handle)
    }

    /// Stops the reveal on `surface`, leaving what was already revealed.
    pub fn cancel(&self, surface: SurfaceId) -> bool {
        lock(&self.active)
            .remove(&surface)
            .is_some_and(|handle| self.timers.cancel(handle))
    }

    pub fn cancel_all(&self) {
        let handles: Vec<TimerHandle> = lock(&self.active).drain().map(|(_, h)| h).collect();
        for handle in handles {
            self.timers.cancel(handle);
        }
    }

    pub fn is_revealing(&self, surface: SurfaceId) -> bool {
        lock(&self.active)
            .get(&surface)
            .is_some_and(|handle| self.timers.is_live(*handle))
    }
}
