use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::AnalysisError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Optimize,
    Measure,
    Analyze,
}

impl RequestKind {
    pub const ALL: [RequestKind; 3] = [Self::Optimize, Self::Measure, Self::Analyze];

    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Optimize => "/optimize",
            Self::Measure => "/measure",
            Self::Analyze => "/analyze",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Optimize => 0,
            Self::Measure => 1,
            Self::Analyze => 2,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Optimize => "optimize",
            Self::Measure => "measure",
            Self::Analyze => "analyze",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type Outcome = Result<Value, AnalysisError>;

/// Status of one request kind. `Settled` is the idle state that remembers the
/// last applied outcome.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Pending {
        request_id: RequestId,
    },
    Settled {
        request_id: RequestId,
        outcome: Outcome,
    },
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Idle => None,
            Self::Pending { request_id } | Self::Settled { request_id, .. } => Some(*request_id),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    RequestStarted {
        kind: RequestKind,
        request_id: RequestId,
    },
    RequestSettled {
        kind: RequestKind,
        request_id: RequestId,
        outcome: Outcome,
    },
    StaleDiscarded {
        kind: RequestKind,
        request_id: RequestId,
        latest: RequestId,
    },
    ToastShown,
    ToastHidden,
}

#[derive(Default)]
struct RequestSlot {
    latest: AtomicU64,
    state: Mutex<RequestState>,
}

/// Shared request bookkeeping. Ids come from one counter across all kinds;
/// each kind remembers the latest id it issued.
pub struct RuntimeState {
    next_id: AtomicU64,
    slots: [RequestSlot; 3],
    events: broadcast::Sender<ControllerEvent>,
}

impl RuntimeState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            next_id: AtomicU64::new(1),
            slots: Default::default(),
            events,
        }
    }

    /// Issues a new id for `kind` and moves it to Pending, superseding any
    /// earlier pending request of the same kind.
    pub fn begin(&self, kind: RequestKind) -> RequestId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = &self.slots[kind.index()];
        slot.latest.store(id, Ordering::Release);
        *lock(&slot.state) = RequestState::Pending {
            request_id: RequestId(id),
        };
        RequestId(id)
    }

    pub fn latest(&self, kind: RequestKind) -> Option<RequestId> {
        match self.slots[kind.index()].latest.load(Ordering::Acquire) {
            0 => None,
            id => Some(RequestId(id)),
        }
    }

    pub fn is_latest(&self, kind: RequestKind, request_id: RequestId) -> bool {
        self.latest(kind) == Some(request_id)
    }

    /// Records the outcome if `request_id` is still the latest for `kind`.
    /// Returns `false` when the settlement is stale and was discarded.
    pub fn settle(&self, kind: RequestKind, request_id: RequestId, outcome: Outcome) -> bool {
        let slot = &self.slots[kind.index()];
        let mut state = lock(&slot.state);
        if slot.latest.load(Ordering::Acquire) != request_id.0 {
            return false;
        }
        *state = RequestState::Settled {
            request_id,
            outcome,
        };
        true
    }

    /// Drops `request_id` back to Idle if it is still the pending latest
    /// request, for a request that ended without settling.
    pub fn abandon(&self, kind: RequestKind, request_id: RequestId) {
        let mut state = lock(&self.slots[kind.index()].state);
        if *state == (RequestState::Pending { request_id }) {
            *state = RequestState::Idle;
        }
    }

    /// Whether a request other than `request_id`, of any kind, is pending.
    pub fn has_other_pending(&self, request_id: RequestId) -> bool {
        self.slots.iter().any(|slot| {
            let state = lock(&slot.state);
            matches!(*state, RequestState::Pending { request_id: id } if id != request_id)
        })
    }

    pub fn state(&self, kind: RequestKind) -> RequestState {
        lock(&self.slots[kind.index()].state).clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
