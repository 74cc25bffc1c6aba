//! Error types for the LLM crate.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Backend/API error from the provider.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Network/connectivity error.
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error (API key missing, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Authentication failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// A generation call failed. This is the only error a
    /// [`GenerationProvider`](crate::GenerationProvider) surfaces.
    #[error("Generation failed ({provider}): {reason}")]
    GenerationFailed { provider: String, reason: String },
}

impl LlmError {
    /// Create a rate limit error from a message and an optional `Retry-After` header.
    pub fn rate_limit(message: impl Into<String>, retry_after_header: Option<&str>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after: retry_after_header.and_then(parse_retry_after_header),
        }
    }

    /// Wrap any error as a generation failure attributed to `provider`.
    pub fn generation_failed(provider: impl Into<String>, reason: impl ToString) -> Self {
        Self::GenerationFailed {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Get the retry-after duration if this is a rate limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns true if the provider was reachable but refused the call.
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }
}

/// Parse a Retry-After header value given in seconds.
fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            LlmError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            LlmError::Serialization(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}
