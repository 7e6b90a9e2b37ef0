//! Delayed and repeating callbacks on the tokio runtime, cancellable by
//! handle. A cancelled callback never runs.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::state::lock;

const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Default)]
struct TimerRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, AbortHandle>>,
}

impl TimerRegistry {
    fn claim(&self, id: u64) -> bool {
        lock(&self.live).remove(&id).is_some()
    }

    fn is_live(&self, id: u64) -> bool {
        lock(&self.live).contains_key(&id)
    }
}

/// Cancellable callbacks on the tokio clock.
///
/// Cancellation assumes the single-threaded runtime the controller runs on:
/// a repeating callback checks liveness and then runs without yielding, so
/// `cancel` cannot land in between. On a multi-thread runtime a cancelled
/// repeating timer may still fire once.
#[derive(Clone, Default)]
pub struct TimerService {
    registry: Arc<TimerRegistry>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `callback` once after `delay` unless cancelled first.
    pub fn schedule_once<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.registry);

        // Held across spawn so the task cannot claim its entry before it exists.
        let mut live = lock(&self.registry.live);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if registry.claim(id) {
                callback();
            }
        });
        live.insert(id, task.abort_handle());
        TimerHandle(id)
    }

    /// Runs `callback` every `period` until it returns `Break` or the handle
    /// is cancelled. The first call happens one full period after scheduling.
    pub fn schedule_repeating<F>(&self, period: Duration, mut callback: F) -> TimerHandle
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.registry);
        let period = period.max(MIN_PERIOD);

        let mut live = lock(&self.registry.live);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !registry.is_live(id) {
                    break;
                }
                if callback().is_break() {
                    registry.claim(id);
                    break;
                }
            }
        });
        live.insert(id, task.abort_handle());
        TimerHandle(id)
    }

    /// Returns `true` if the timer was still scheduled.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        match lock(&self.registry.live).remove(&handle.0) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let drained: Vec<AbortHandle> = lock(&self.registry.live)
            .drain()
            .map(|(_, task)| task)
            .collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "cancelling all live timers");
        }
        for task in drained {
            task.abort();
        }
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.registry.is_live(handle.0)
    }

    pub fn live_count(&self) -> usize {
        lock(&self.registry.live).len()
    }

    /// Suspends the caller for `duration` on the same clock the timers use.
    pub async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
