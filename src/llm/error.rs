//! LLM backend errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to an LLM provider
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    #[error("API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Request timed out after the specified duration (in seconds)
    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    /// Invalid or malformed response from the LLM
    #[error("Invalid response from LLM: {message}")]
    InvalidResponse { message: String },

    /// Missing API keys, unknown provider and similar
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Generic error for other cases
    #[error("Error: {message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let with_code = BackendError::ApiError {
            message: "quota exhausted".to_string(),
            status_code: Some(429),
        };
        assert_eq!(with_code.to_string(), "API error: quota exhausted");

        let without_code = BackendError::ApiError {
            message: "boom".to_string(),
            status_code: None,
        };
        assert_eq!(without_code.to_string(), "API error: boom");
    }

    #[test]
    fn test_timeout_display() {
        let err = BackendError::TimeoutError { seconds: 60 };
        assert_eq!(err.to_string(), "Request timed out after 60 seconds");
    }
}
