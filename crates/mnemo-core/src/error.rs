//! Error taxonomy for the memory pipeline.

use mnemo_ai::AiError;
use thiserror::Error;

/// Errors surfaced by the memory pipeline.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A required field was empty or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The storage backend failed.
    #[error("Persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),

    /// The text-generation call failed or returned unusable output.
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The manager or backend has been closed.
    #[error("Memory backend is closed")]
    Closed,
}

impl MemoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error is caused by caller input rather than the system.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<AiError> for MemoryError {
    fn from(err: AiError) -> Self {
        Self::Generation(err.to_string())
    }
}

pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

/// Reject empty (or whitespace-only) required fields.
pub(crate) fn require_non_empty(field: &str, value: &str) -> MemoryResult<()> {
    if value.trim().is_empty() {
        return Err(MemoryError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("user_id", "alice").is_ok());

        let err = require_non_empty("user_id", "  ").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Validation error: user_id must not be empty");
    }

    #[test]
    fn test_ai_error_maps_to_generation() {
        let err: MemoryError = AiError::Llm("boom".to_string()).into();
        assert!(matches!(err, MemoryError::Generation(msg) if msg.contains("boom")));
    }

    #[test]
    fn test_persistence_error_keeps_context() {
        let err: MemoryError = anyhow::anyhow!("disk full").context("saving memory").into();
        let rendered = err.to_string();
        assert!(rendered.contains("saving memory"));
        assert!(rendered.contains("disk full"));
    }
}
