pub mod http_client;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::SubmitOptions;
use crate::error::AnalysisError;
use crate::metrics::fields::{string_list, text};
use crate::state::RequestKind;

pub use http_client::HttpTransport;

pub const IMAGE_TO_CODE_PATH: &str = "/image-to-code";
pub const IMAGE_UPLOAD_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("failed to connect: {0}")]
    ConnectFailed(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to serialize request payload: {0}")]
    Serialize(String),
}

impl From<NetworkError> for AnalysisError {
    fn from(err: NetworkError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Status and undecoded body of one completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, AnalysisError> {
        serde_json::from_str(&self.body)
            .map_err(|err| AnalysisError::MalformedResponse(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// The remote analysis service. Implementations perform exactly one HTTP
/// exchange per call and never retry.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    async fn post_json(&self, path: &str, body: &Value) -> Result<TransportResponse, NetworkError>;

    async fn post_file(
        &self,
        path: &str,
        field: &str,
        upload: &ImageUpload,
    ) -> Result<TransportResponse, NetworkError>;
}

#[derive(Debug, Serialize)]
struct OptimizeRequest<'a> {
    code: &'a str,
    input_size_n: u64,
    runs_per_year: u64,
    keep_comments: bool,
    keep_fstrings: bool,
}

#[derive(Debug, Serialize)]
struct MeasureRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    code: &'a str,
    input_size_n: u64,
    runs_per_year: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lon: Option<f64>,
}

/// JSON body for `kind`, carrying only the fields that endpoint accepts.
pub fn build_request_body(
    kind: RequestKind,
    code: &str,
    options: &SubmitOptions,
) -> Result<Value, NetworkError> {
    let body = match kind {
        RequestKind::Optimize => serde_json::to_value(OptimizeRequest {
            code,
            input_size_n: options.input_size_n,
            runs_per_year: options.runs_per_year,
            keep_comments: options.keep_comments,
            keep_fstrings: options.keep_fstrings,
        }),
        RequestKind::Measure => serde_json::to_value(MeasureRequest { code }),
        RequestKind::Analyze => serde_json::to_value(AnalyzeRequest {
            code,
            input_size_n: options.input_size_n,
            runs_per_year: options.runs_per_year,
            lat: options.lat,
            lon: options.lon,
        }),
    };
    body.map_err(|err| NetworkError::Serialize(err.to_string()))
}

/// Server error built from whichever error fields the body carries.
pub fn server_error(body: &Value) -> AnalysisError {
    let message = text(body, &["error"])
        .or_else(|| text(body, &["message"]))
        .unwrap_or_default();

    let mut details = string_list(body, &["details"]);
    if let Some(original) = text(body, &["original_error"]) {
        details.push(format!("Original code error: {original}"));
    }
    if let Some(optimized) = text(body, &["optimized_error"]) {
        details.push(format!("Optimized code error: {optimized}"));
    }

    AnalysisError::Server { message, details }
}
