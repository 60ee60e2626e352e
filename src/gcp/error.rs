use serde::Deserialize;
use thiserror::Error;

/// Errors raised by the Google Cloud REST wrappers
#[derive(Debug, Error)]
pub enum GcpError {
    /// The API answered with a non-success status
    #[error("HTTP {status} ({reason}): {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation {name} failed: {message}")]
    OperationFailed { name: String, message: String },

    #[error("Operation {0} did not complete in time")]
    OperationTimeout(String),
}

impl GcpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GcpError::Api { status, .. } => Some(*status),
            GcpError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Builds an API error from a Google error envelope, falling back to the raw body
    pub fn from_response_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: ErrorBody,
        }

        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            message: String,
            #[serde(default)]
            status: String,
        }

        match serde_json::from_str::<Envelope>(body) {
            Ok(envelope) => GcpError::Api {
                status,
                reason: if envelope.error.status.is_empty() {
                    "UNKNOWN".to_string()
                } else {
                    envelope.error.status
                },
                message: envelope.error.message,
            },
            Err(_) => GcpError::Api {
                status,
                reason: "UNKNOWN".to_string(),
                message: body.trim().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_google_error_envelope() {
        let body = r#"{"error":{"code":400,"message":"Invalid page range 15-28","status":"INVALID_ARGUMENT"}}"#;
        let err = GcpError::from_response_body(400, body);
        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.to_string(),
            "HTTP 400 (INVALID_ARGUMENT): Invalid page range 15-28"
        );
    }

    #[test]
    fn test_falls_back_to_raw_body() {
        let err = GcpError::from_response_body(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502 (UNKNOWN): Bad Gateway");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found() {
        let err = GcpError::from_response_body(404, r#"{"error":{"message":"No such bucket"}}"#);
        assert!(err.is_not_found());
    }
}
