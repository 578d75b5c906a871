//! Cross-cutting, shared constants.
//!
//! Defaults for the search engine, cache, rate limiter and sanitizer live here so the
//! configuration layer and the individual modules agree on them.
//!
//! # Dimension Invariants
//!
//! Embedding vectors coming from a provider are expected to share one dimension for the
//! lifetime of a cache. Use [`validate_embedding_dim`] at the points where a query vector
//! meets item vectors to catch provider/model mix-ups early instead of silently scoring `0.0`.

use std::time::Duration;

/// Minimum cosine similarity for an item to count as a semantic match.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;

/// Below this many semantic matches the text fallback may kick in.
pub const DEFAULT_MIN_SEMANTIC_MATCHES: usize = 3;

/// Longest query (in chars) for which the text fallback is attempted.
pub const DEFAULT_TEXT_FALLBACK_MAX_QUERY_LEN: usize = 10;

/// Score assigned to text-fallback matches (ranks below genuine semantic matches).
pub const DEFAULT_TEXT_FALLBACK_SCORE: f32 = 0.4;

/// Max chars of text sent to the embedding provider.
pub const DEFAULT_MAX_INPUT_LEN: usize = 8000;
pub const MIN_MAX_INPUT_LEN: usize = 100;
pub const MAX_MAX_INPUT_LEN: usize = 32_000;

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Interval between opportunistic expiry sweeps triggered by searches.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_ITEM_CONCURRENCY: usize = 8;

pub const DEFAULT_PREWARM_BATCH_SIZE: usize = 32;
pub const DEFAULT_PREWARM_PARALLELISM: usize = 4;

/// Window over which a limiter's capacity is granted.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Longest stylesheet value the sanitizer will look at.
pub const DEFAULT_SANITIZER_MAX_LEN: usize = 200;

/// Wall-clock budget for the pattern-matching stages of one sanitizer call.
pub const DEFAULT_REGEX_TIMEOUT: Duration = Duration::from_millis(100);

/// Max chars of a rejected value echoed into logs.
pub const AUDIT_LOG_TRUNCATE_LEN: usize = 50;

/// Error returned when an embedding dimension check fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that an embedding dimension is non-zero and matches the expected dimension.
///
/// # Example
///
/// ```
/// use typeahead::constants::validate_embedding_dim;
///
/// // Item vectors must match the query vector they are scored against.
/// validate_embedding_dim(384, 384).unwrap();
/// assert!(validate_embedding_dim(768, 384).is_err());
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if expected == 0 || actual == 0 {
        return Err(DimValidationError::ZeroDimension);
    }
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
