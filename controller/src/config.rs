use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 10;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 6_000;
pub const DEFAULT_EDITOR_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_EDITOR_RETRY_INTERVAL_MS: u64 = 500;
pub const DEFAULT_INPUT_SIZE_N: u64 = 1_000_000;
pub const DEFAULT_RUNS_PER_YEAR: u64 = 1_000;

const SERVICE_URL_ENV_KEYS: [&str; 2] = ["OPTIPY_SERVICE_URL", "OPTIPY_API_URL"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_reveal_interval_ms")]
    pub reveal_interval_ms: u64,
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
    #[serde(default = "default_editor_retry_attempts")]
    pub editor_retry_attempts: u32,
    #[serde(default = "default_editor_retry_interval_ms")]
    pub editor_retry_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            reveal_interval_ms: default_reveal_interval_ms(),
            toast_duration_ms: default_toast_duration_ms(),
            editor_retry_attempts: default_editor_retry_attempts(),
            editor_retry_interval_ms: default_editor_retry_interval_ms(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_reveal_interval_ms() -> u64 {
    DEFAULT_REVEAL_INTERVAL_MS
}

fn default_toast_duration_ms() -> u64 {
    DEFAULT_TOAST_DURATION_MS
}

fn default_editor_retry_attempts() -> u32 {
    DEFAULT_EDITOR_RETRY_ATTEMPTS
}

fn default_editor_retry_interval_ms() -> u64 {
    DEFAULT_EDITOR_RETRY_INTERVAL_MS
}

fn read_service_url_from_environment() -> Option<String> {
    for key_name in SERVICE_URL_ENV_KEYS {
        if let Ok(value) = std::env::var(key_name) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    None
}

impl ControllerConfig {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(url) = read_service_url_from_environment() {
            config.base_url = url;
        }
        config.validate()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: ControllerConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        if let Some(url) = read_service_url_from_environment() {
            info!("service url overridden from environment");
            config.base_url = url;
        }
        Ok(config.validate()?)
    }

    pub fn validate(mut self) -> Result<Self, AppError> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "base url must be http(s), got `{}`",
                self.base_url
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.reveal_interval_ms == 0 || self.editor_retry_interval_ms == 0 {
            return Err(AppError::Config(
                "timer intervals must be greater than zero".to_string(),
            ));
        }
        self.base_url = trimmed;
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn editor_retry_interval(&self) -> Duration {
        Duration::from_millis(self.editor_retry_interval_ms)
    }
}

/// Per-request options sent alongside the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOptions {
    #[serde(default = "default_input_size_n")]
    pub input_size_n: u64,
    #[serde(default = "default_runs_per_year")]
    pub runs_per_year: u64,
    #[serde(default = "default_true")]
    pub keep_comments: bool,
    #[serde(default = "default_true")]
    pub keep_fstrings: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            input_size_n: default_input_size_n(),
            runs_per_year: default_runs_per_year(),
            keep_comments: default_true(),
            keep_fstrings: default_true(),
            lat: None,
            lon: None,
        }
    }
}

fn default_input_size_n() -> u64 {
    DEFAULT_INPUT_SIZE_N
}

fn default_runs_per_year() -> u64 {
    DEFAULT_RUNS_PER_YEAR
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{"baseUrl":"https://eco.example.org/"}"#).expect("parse");
        let config = config.validate().expect("valid config");
        assert_eq!(config.base_url, "https://eco.example.org");
        assert_eq!(config.toast_duration_ms, DEFAULT_TOAST_DURATION_MS);
        assert_eq!(config.editor_retry_attempts, 3);
        assert_eq!(config.editor_retry_interval(), Duration::from_millis(500));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let config = ControllerConfig {
            base_url: "ftp://service".to_string(),
            ..ControllerConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = ControllerConfig {
            reveal_interval_ms: 0,
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn submit_options_defaults_match_service_contract() {
        let options: SubmitOptions = serde_json::from_str("{}").expect("parse");
        assert_eq!(options.input_size_n, 1_000_000);
        assert_eq!(options.runs_per_year, 1_000);
        assert!(options.keep_comments);
        assert!(options.keep_fstrings);
        assert_eq!(options, SubmitOptions::default());
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let err = ControllerConfig::load(Path::new("/nonexistent/optipy.json"))
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("/nonexistent/optipy.json"));
    }
}
