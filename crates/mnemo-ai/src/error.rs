//! Errors surfaced by text-generation clients.

use std::time::Duration;
use thiserror::Error;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} returned HTTP {status}: {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::LlmHttp { status, .. } => *status == 429 || *status >= 500,
            AiError::Http(e) => e.is_timeout() || e.is_connect(),
            AiError::Llm(message) => {
                let lower = message.to_lowercase();
                lower.contains("rate limit") || lower.contains("timeout") || lower.contains("overloaded")
            }
            AiError::InvalidFormat(_) | AiError::Json(_) => false,
        }
    }

    /// Delay requested by the server through `Retry-After`.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AiError::LlmHttp { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
