//! Typeahead library crate (used by the CLI and integration tests).
//!
//! # Public API Surface
//!
//! The semantic-search data path behind a typeahead control, organized by module:
//!
//! ## Search
//! - [`SemanticSearchEngine`] - Query/item embedding, similarity ranking, text fallback
//! - [`SearchOutcome`], [`SearchResult`], [`SearchStatus`] - Results and how a search ended
//! - [`MatchStrategy`], [`TextMatcher`] - Text-fallback matching
//! - [`PrewarmReport`] - Bulk cache population summary
//!
//! ## Infrastructure
//! - [`EmbeddingCache`] - TTL + LRU cache with single-flight computation
//! - [`TokenBucketLimiter`] - Per-minute rate gate for the embedding provider
//! - [`EmbeddingProvider`], [`OpenAiEmbeddingProvider`], [`HashEmbedder`] - Embedding sources
//!
//! ## Sanitizer
//! - [`CssSanitizer`] and the `sanitize_*` functions - Allow-list stylesheet values
//! - [`clean_input_text`], [`redact_secrets`] - Text hygiene on the embedding path
//!
//! ## Configuration
//! - [`SearchConfig`], [`ConfigError`] - `TYPEAHEAD_*` environment configuration
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod ratelimit;
pub mod sanitize;
pub mod search;

pub use cache::{CacheCapacity, CacheEntry, CacheStats, EmbeddingCache, EmbeddingKey};
pub use config::{ConfigError, SearchConfig};
pub use constants::{DimValidationError, validate_embedding_dim};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbeddingProvider;
pub use embedding::{
    EmbeddingError, EmbeddingProvider, EmbeddingVector, HashEmbedder, OpenAiConfig,
    OpenAiEmbeddingProvider, cosine_similarity,
};
pub use ratelimit::{RateLimitError, RateLimitResult, TokenBucketLimiter};
pub use sanitize::{
    CssSanitizer, SanitizerConfig, ValueKind, clean_input_text, redact_secrets,
    sanitize_color, sanitize_font_family, sanitize_generic, sanitize_length, sanitize_shadow,
    sanitize_time, truncate_for_log,
};
pub use search::{
    ItemAccessors, MatchSource, MatchStrategy, PrewarmReport, SearchError, SearchOutcome,
    SearchResult, SearchStatus, SemanticSearchEngine, TextMatcher,
};
