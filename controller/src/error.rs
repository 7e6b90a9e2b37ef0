use thiserror::Error;

use crate::network::NetworkError;
use crate::state::RequestKind;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("controller has been disposed; {0} request refused")]
    Disposed(RequestKind),
    #[error("failed to set up transport: {0}")]
    Transport(#[from] NetworkError),
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Terminal reason of one settled request. Every variant ends the current
/// request only.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("server error: {message}")]
    Server {
        message: String,
        details: Vec<String>,
    },
    #[error("no code could be extracted from the image")]
    ExtractionFailure,
}

pub const TRANSPORT_ERROR_MESSAGE: &str = "Error connecting to the server. Please try again.";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Server returned invalid JSON.";
pub const EXTRACTION_FAILURE_MESSAGE: &str =
    "No code could be extracted from the image. Please try a clearer image.";
const UNKNOWN_SERVER_ERROR: &str = "Unknown error";

impl AnalysisError {
    /// Deterministic text written into the output surface for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => TRANSPORT_ERROR_MESSAGE.to_string(),
            Self::MalformedResponse(_) => MALFORMED_RESPONSE_MESSAGE.to_string(),
            Self::ExtractionFailure => EXTRACTION_FAILURE_MESSAGE.to_string(),
            Self::Server { message, details } => {
                let message = if message.trim().is_empty() {
                    UNKNOWN_SERVER_ERROR
                } else {
                    message.as_str()
                };
                let mut rendered = format!("Error: {message}");
                if !details.is_empty() {
                    rendered.push_str("\n\nDetails:\n");
                    rendered.push_str(&details.join("\n"));
                }
                rendered
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_renders_message_and_details() {
        let err = AnalysisError::Server {
            message: "Code refactoring failed".to_string(),
            details: vec!["line 3: bad indent".to_string(), "line 9: eof".to_string()],
        };
        assert_eq!(
            err.user_message(),
            "Error: Code refactoring failed\n\nDetails:\nline 3: bad indent\nline 9: eof"
        );
    }

    #[test]
    fn server_error_without_message_uses_fallback() {
        let err = AnalysisError::Server {
            message: String::new(),
            details: Vec::new(),
        };
        assert_eq!(err.user_message(), "Error: Unknown error");
    }

    #[test]
    fn transport_and_malformed_messages_are_fixed() {
        assert_eq!(
            AnalysisError::Transport("connection refused".to_string()).user_message(),
            TRANSPORT_ERROR_MESSAGE
        );
        assert_eq!(
            AnalysisError::MalformedResponse("expected value".to_string()).user_message(),
            MALFORMED_RESPONSE_MESSAGE
        );
    }
}
