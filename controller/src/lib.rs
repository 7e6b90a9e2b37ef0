pub mod config;
pub mod controller;
pub mod error;
pub mod input;
pub mod lifecycle;
pub mod metrics;
pub mod network;
pub mod notify;
pub mod reveal;
pub mod state;
pub mod surface;
pub mod timer;

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

pub use config::{ControllerConfig, SubmitOptions};
pub use controller::{Controller, KeyPress};
pub use error::{AnalysisError, AppError};
pub use input::{AcquiredText, CaptureEvent, ClipboardAccess, ClipboardError};
pub use metrics::{MetricsReport, MetricsSnapshot, normalize, to_scientific};
pub use network::{AnalysisTransport, HttpTransport, ImageUpload};
pub use state::{ControllerEvent, RequestId, RequestKind, RequestState};
pub use surface::{CaptureSurface, EditableSurface, HostView, SurfaceId, SurfaceSlot, Surfaces};

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_logging() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| AppError::LoggingInit(err.to_string()))
}
