//! Submit/settle cycle for optimize, measure and analyze requests.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SubmitOptions;
use crate::metrics::fields::{has_any_number, string_list, text};
use crate::metrics::summary::{analysis_summary, measurement_summary};
use crate::metrics::{MetricsReport, MetricsSnapshot, normalize};
use crate::network::{AnalysisTransport, TransportResponse, build_request_body, server_error};
use crate::notify::Notifier;
use crate::state::{ControllerEvent, Outcome, RequestId, RequestKind, RuntimeState};
use crate::surface::Surfaces;

pub const PENDING_PLACEHOLDER: &str = "Please wait while your code is being generated...";
pub const NO_OPTIMIZED_CODE: &str = "No optimized code returned.";
pub const NO_CHANGES: &str = "No changes made.";

/// Busy indicators for one request. Dropping the guard reverts them, but
/// only while the request is still the latest of its kind; a superseded
/// request leaves them to its successor. The output shimmer is shared by
/// every kind and stays on while any other request is pending.
struct BusyGuard {
    runtime: Arc<RuntimeState>,
    surfaces: Surfaces,
    kind: RequestKind,
    request_id: RequestId,
}

impl BusyGuard {
    fn arm(
        runtime: Arc<RuntimeState>,
        surfaces: Surfaces,
        kind: RequestKind,
        request_id: RequestId,
    ) -> Self {
        surfaces.view.set_trigger_busy(kind, true);
        surfaces.output.set_busy(true);
        Self {
            runtime,
            surfaces,
            kind,
            request_id,
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if !self.runtime.is_latest(self.kind, self.request_id) {
            debug!(request_id = %self.request_id, kind = %self.kind, "superseded; busy state kept");
            return;
        }
        // Ended without settling, e.g. a panic while applying the outcome.
        self.runtime.abandon(self.kind, self.request_id);

        self.surfaces.view.set_trigger_busy(self.kind, false);
        if self.runtime.has_other_pending(self.request_id) {
            debug!(request_id = %self.request_id, "output shimmer kept for another request");
        } else {
            self.surfaces.output.set_busy(false);
        }
    }
}

pub struct RequestLifecycle {
    runtime: Arc<RuntimeState>,
    surfaces: Surfaces,
    transport: Arc<dyn AnalysisTransport>,
    notifier: Arc<Notifier>,
}

impl RequestLifecycle {
    pub fn new(
        runtime: Arc<RuntimeState>,
        surfaces: Surfaces,
        transport: Arc<dyn AnalysisTransport>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            runtime,
            surfaces,
            transport,
            notifier,
        }
    }

    /// Starts a request and returns its id without waiting. The outcome is
    /// applied to the surfaces and broadcast once the service answers.
    pub fn submit(
        self: &Arc<Self>,
        kind: RequestKind,
        code: String,
        options: SubmitOptions,
    ) -> RequestId {
        let request_id = self.runtime.begin(kind);
        info!(%request_id, %kind, chars = code.chars().count(), "request submitted");
        self.runtime.emit(ControllerEvent::RequestStarted { kind, request_id });

        let guard = BusyGuard::arm(
            Arc::clone(&self.runtime),
            self.surfaces.clone(),
            kind,
            request_id,
        );
        self.surfaces.output.set_value(PENDING_PLACEHOLDER);

        let lifecycle = Arc::clone(self);
        tokio::spawn(async move {
            let _busy = guard;
            let outcome = lifecycle.execute(kind, &code, &options).await;
            lifecycle.settle(kind, request_id, outcome);
        });
        request_id
    }

    async fn execute(&self, kind: RequestKind, code: &str, options: &SubmitOptions) -> Outcome {
        let body = build_request_body(kind, code, options)?;
        let response = match self.transport.post_json(kind.endpoint(), &body).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%kind, "transport failure: {err}");
                return Err(err.into());
            }
        };
        classify_response(kind, &response)
    }

    fn settle(&self, kind: RequestKind, request_id: RequestId, outcome: Outcome) {
        if !self.runtime.settle(kind, request_id, outcome.clone()) {
            let latest = self.runtime.latest(kind).unwrap_or(request_id);
            debug!(%request_id, %latest, %kind, "stale settlement discarded");
            self.runtime.emit(ControllerEvent::StaleDiscarded {
                kind,
                request_id,
                latest,
            });
            return;
        }

        match &outcome {
            Ok(payload) => self.apply_success(kind, payload),
            Err(err) => {
                info!(%request_id, %kind, "request failed: {err}");
                self.surfaces.output.set_value(&err.user_message());
            }
        }
        self.runtime.emit(ControllerEvent::RequestSettled {
            kind,
            request_id,
            outcome,
        });
    }

    fn apply_success(&self, kind: RequestKind, payload: &Value) {
        let snapshot = normalize(payload);
        debug!(%kind, shape = ?snapshot.shape, "metrics normalized");

        let primary = match kind {
            RequestKind::Optimize => {
                self.surfaces.view.render_revisions(&revision_lines(payload));
                optimized_code(payload).unwrap_or_else(|| NO_OPTIMIZED_CODE.to_string())
            }
            RequestKind::Measure => measurement_summary(payload, &snapshot),
            RequestKind::Analyze => primary_analysis_text(payload, &snapshot),
        };
        self.surfaces.output.set_value(&primary);

        self.surfaces
            .view
            .render_metrics(&MetricsReport::from_snapshot(&snapshot));
        if !snapshot.is_empty() {
            self.notifier.arm();
        }
    }
}

fn primary_analysis_text(payload: &Value, snapshot: &MetricsSnapshot) -> String {
    let summary = analysis_summary(snapshot);
    if summary.is_empty() {
        measurement_summary(payload, snapshot)
    } else {
        summary
    }
}

pub fn optimized_code(payload: &Value) -> Option<String> {
    text(payload, &["optimized_code"]).or_else(|| text(payload, &["code"]))
}

fn revision_lines(payload: &Value) -> Vec<String> {
    let changes = string_list(payload, &["changes"]);
    if changes.is_empty() {
        vec![NO_CHANGES.to_string()]
    } else {
        changes
    }
}

/// Maps a completed exchange to an outcome. Failure statuses, and success
/// bodies that report an error without the result their kind expects,
/// become server errors.
pub fn classify_response(kind: RequestKind, response: &TransportResponse) -> Outcome {
    let body = response.json()?;
    if !response.is_success() {
        return Err(server_error(&body));
    }
    if text(&body, &["error"]).is_some() && !carries_result(kind, &body) {
        return Err(server_error(&body));
    }
    Ok(body)
}

fn carries_result(kind: RequestKind, body: &Value) -> bool {
    match kind {
        RequestKind::Optimize => optimized_code(body).is_some(),
        RequestKind::Analyze => has_any_number(body, &["emissions_gco2", "eco_score"]),
        RequestKind::Measure => true,
    }
}
