use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider request failed: {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("embedding transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed embedding response: {reason}")]
    MalformedResponse { reason: String },

    #[error("nothing to embed: input text is empty")]
    EmptyInput,

    #[error("invalid embedding provider configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("embedding request was cancelled")]
    Cancelled,
}

impl EmbeddingError {
    /// Returns `true` for the expected cancellation outcome.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EmbeddingError::Cancelled)
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        EmbeddingError::MalformedResponse {
            reason: reason.into(),
        }
    }
}
