//! Error kinds for the reasoning and memory system.
//!
//! Mirrors the error-kind taxonomy of the spec: each external-facing failure
//! is one of a small, closed set of kinds, each with an explicit
//! recoverability classification that the retry envelope consults.

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for the reasoning and memory system.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Inputs violated a schema or invariant. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Storage backend read/write failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Embedding provider failed.
    #[error("embedding error for text prefix {text_prefix:?} (model {model}): {message}")]
    Embedding {
        /// First ≤100 chars of the offending text.
        text_prefix: String,
        /// Identifier of the embedding model in use.
        model: String,
        /// Underlying failure description.
        message: String,
    },

    /// The LLM oracle call failed permanently (retry envelope exhausted).
    #[error("LLM generation failed: {0}")]
    LlmGeneration(String),

    /// Judge or extraction output could not be parsed as the expected JSON shape.
    #[error("failed to parse JSON payload: {0}")]
    JsonParse(String),

    /// Cache failure. Never surfaced externally; degrades to bypass.
    #[error("cache error: {0}")]
    Cache(String),

    /// Startup authentication probe failed. Fatal.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// An operation that requires explicit confirmation was attempted without it.
    #[error("confirmation required: {0}")]
    ConfirmationRequired(String),

    /// Serialization/deserialization failure not specific to the judge/extraction path.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure (backup/restore/migration paths, local persistence).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error class is eligible for retry with backoff.
    ///
    /// Only transient classes (storage I/O, LLM transport failures) are
    /// recoverable; validation, parse, and confirmation failures are not —
    /// retrying them cannot change the outcome.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::LlmGeneration(_) | Error::Io(_)
        )
    }

    /// Whether this is the kind of error a caller must explicitly confirm past.
    #[must_use]
    pub fn is_confirmation_required(&self) -> bool {
        matches!(self, Error::ConfirmationRequired(_))
    }

    /// Build an [`Error::Embedding`], truncating the text to a 100-char prefix.
    #[must_use]
    pub fn embedding(text: &str, model: impl Into<String>, message: impl Into<String>) -> Self {
        let text_prefix: String = text.chars().take(100).collect();
        Error::Embedding {
            text_prefix,
            model: model.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_recoverable() {
        assert!(Error::Storage("disk full".into()).is_recoverable());
    }

    #[test]
    fn validation_errors_are_not_recoverable() {
        assert!(!Error::Validation("task too short".into()).is_recoverable());
    }

    #[test]
    fn json_parse_errors_are_not_recoverable() {
        assert!(!Error::JsonParse("not an object".into()).is_recoverable());
    }

    #[test]
    fn embedding_error_truncates_text_prefix() {
        let long_text = "x".repeat(500);
        let err = Error::embedding(&long_text, "local-384", "boom");
        match err {
            Error::Embedding { text_prefix, .. } => assert_eq!(text_prefix.chars().count(), 100),
            _ => panic!("expected Embedding variant"),
        }
    }

    #[test]
    fn confirmation_required_is_detected() {
        let err = Error::ConfirmationRequired("workspace delete needs confirm=true".into());
        assert!(err.is_confirmation_required());
        assert!(!err.is_recoverable());
    }
}
