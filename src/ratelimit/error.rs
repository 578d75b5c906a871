use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limiter capacity must be positive, got {capacity}")]
    InvalidCapacity { capacity: u32 },

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    Exceeded { retry_after: Duration },

    #[error("wait for a rate limit token was cancelled")]
    Cancelled,

    #[error("rate limiter has been disposed")]
    Disposed,
}

impl RateLimitError {
    /// Suggested wait before retrying, if the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RateLimitError::Exceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

pub type RateLimitResult<T> = Result<T, RateLimitError>;
