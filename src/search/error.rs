use thiserror::Error;

use crate::config::ConfigError;
use crate::ratelimit::RateLimitError;

/// Failures a search reports as errors rather than as a [`SearchStatus`](super::SearchStatus).
///
/// Provider trouble and rate limiting degrade the result set instead; these variants are
/// misuse that the caller has to fix.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The limiter cannot be used (for example, it was disposed).
    #[error("rate limiter unusable: {0}")]
    Limiter(#[from] RateLimitError),

    #[error("invalid search configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
