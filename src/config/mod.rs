//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `TYPEAHEAD_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheCapacity;
use crate::constants::{
    DEFAULT_CACHE_TTL, DEFAULT_CLEANUP_INTERVAL, DEFAULT_ITEM_CONCURRENCY, DEFAULT_MAX_INPUT_LEN,
    DEFAULT_MIN_SEMANTIC_MATCHES, DEFAULT_PREWARM_BATCH_SIZE, DEFAULT_PREWARM_PARALLELISM,
    DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TEXT_FALLBACK_MAX_QUERY_LEN, DEFAULT_TEXT_FALLBACK_SCORE,
    MAX_MAX_INPUT_LEN, MIN_MAX_INPUT_LEN,
};

/// Search engine configuration.
///
/// Use [`SearchConfig::from_env`] to read `TYPEAHEAD_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Minimum cosine similarity for a semantic match. Default: `0.5`.
    pub similarity_threshold: f32,

    /// Below this many semantic matches the text fallback may run. Default: `3`.
    pub min_semantic_matches: usize,

    /// Whether the text fallback is enabled at all. Default: `true`.
    pub text_fallback: bool,

    /// Longest query (chars) eligible for the text fallback. Default: `10`.
    pub text_fallback_max_query_len: usize,

    /// Score given to text-fallback matches. Default: `0.4`.
    pub text_fallback_score: f32,

    /// Max chars of query/item text sent to the provider. Default: `8000` (100..=32000).
    pub max_input_len: usize,

    /// Cap on returned results. Default: unlimited.
    pub max_results: Option<usize>,

    /// Embedding cache size bound. Default: `1000` entries.
    pub cache_capacity: CacheCapacity,

    /// Embedding cache entry lifetime. Default: one hour.
    pub cache_ttl: Duration,

    /// Provider requests allowed per minute; `None` disables rate limiting. Default: `None`.
    pub max_requests_per_minute: Option<u32>,

    /// How long a search may wait for a limiter token. Default: zero (fail fast).
    pub rate_limit_wait: Duration,

    /// Item embeddings fetched concurrently within one search. Default: `8`.
    pub item_concurrency: usize,

    /// Items per provider call during pre-warm. Default: `32`.
    pub prewarm_batch_size: usize,

    /// Pre-warm batches in flight at once. Default: `4`.
    pub prewarm_parallelism: usize,

    /// Minimum time between opportunistic expiry sweeps. Default: five minutes.
    pub cleanup_interval: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_semantic_matches: DEFAULT_MIN_SEMANTIC_MATCHES,
            text_fallback: true,
            text_fallback_max_query_len: DEFAULT_TEXT_FALLBACK_MAX_QUERY_LEN,
            text_fallback_score: DEFAULT_TEXT_FALLBACK_SCORE,
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            max_results: None,
            cache_capacity: CacheCapacity::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            max_requests_per_minute: None,
            rate_limit_wait: Duration::ZERO,
            item_concurrency: DEFAULT_ITEM_CONCURRENCY,
            prewarm_batch_size: DEFAULT_PREWARM_BATCH_SIZE,
            prewarm_parallelism: DEFAULT_PREWARM_PARALLELISM,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl SearchConfig {
    pub const ENV_SIMILARITY_THRESHOLD: &'static str = "TYPEAHEAD_SIMILARITY_THRESHOLD";
    pub const ENV_MIN_SEMANTIC_MATCHES: &'static str = "TYPEAHEAD_MIN_SEMANTIC_MATCHES";
    pub const ENV_TEXT_FALLBACK: &'static str = "TYPEAHEAD_TEXT_FALLBACK";
    pub const ENV_TEXT_FALLBACK_MAX_QUERY_LEN: &'static str =
        "TYPEAHEAD_TEXT_FALLBACK_MAX_QUERY_LEN";
    pub const ENV_TEXT_FALLBACK_SCORE: &'static str = "TYPEAHEAD_TEXT_FALLBACK_SCORE";
    pub const ENV_MAX_INPUT_LEN: &'static str = "TYPEAHEAD_MAX_INPUT_LEN";
    pub const ENV_MAX_RESULTS: &'static str = "TYPEAHEAD_MAX_RESULTS";
    pub const ENV_CACHE_CAPACITY: &'static str = "TYPEAHEAD_CACHE_CAPACITY";
    pub const ENV_CACHE_TTL_SECS: &'static str = "TYPEAHEAD_CACHE_TTL_SECS";
    pub const ENV_MAX_REQUESTS_PER_MINUTE: &'static str = "TYPEAHEAD_MAX_REQUESTS_PER_MINUTE";
    pub const ENV_RATE_LIMIT_WAIT_MS: &'static str = "TYPEAHEAD_RATE_LIMIT_WAIT_MS";
    pub const ENV_ITEM_CONCURRENCY: &'static str = "TYPEAHEAD_ITEM_CONCURRENCY";
    pub const ENV_PREWARM_BATCH_SIZE: &'static str = "TYPEAHEAD_PREWARM_BATCH_SIZE";
    pub const ENV_PREWARM_PARALLELISM: &'static str = "TYPEAHEAD_PREWARM_PARALLELISM";

    /// Loads configuration from environment variables (falling back to defaults), then
    /// validates it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_capacity = match Self::parse_from_env::<i64>(Self::ENV_CACHE_CAPACITY)? {
            Some(raw) => CacheCapacity::from_raw(raw).ok_or_else(|| ConfigError::InvalidValue {
                name: Self::ENV_CACHE_CAPACITY,
                value: raw.to_string(),
                reason: "expected a positive entry count or -1 for unbounded".to_string(),
            })?,
            None => defaults.cache_capacity,
        };

        let config = Self {
            similarity_threshold: Self::parse_from_env(Self::ENV_SIMILARITY_THRESHOLD)?
                .unwrap_or(defaults.similarity_threshold),
            min_semantic_matches: Self::parse_from_env(Self::ENV_MIN_SEMANTIC_MATCHES)?
                .unwrap_or(defaults.min_semantic_matches),
            text_fallback: Self::parse_bool_from_env(Self::ENV_TEXT_FALLBACK)?
                .unwrap_or(defaults.text_fallback),
            text_fallback_max_query_len: Self::parse_from_env(
                Self::ENV_TEXT_FALLBACK_MAX_QUERY_LEN,
            )?
            .unwrap_or(defaults.text_fallback_max_query_len),
            text_fallback_score: Self::parse_from_env(Self::ENV_TEXT_FALLBACK_SCORE)?
                .unwrap_or(defaults.text_fallback_score),
            max_input_len: Self::parse_from_env(Self::ENV_MAX_INPUT_LEN)?
                .unwrap_or(defaults.max_input_len),
            // 0 means "no cap".
            max_results: match Self::parse_from_env::<usize>(Self::ENV_MAX_RESULTS)? {
                Some(0) => None,
                Some(n) => Some(n),
                None => defaults.max_results,
            },
            cache_capacity,
            cache_ttl: Self::parse_from_env(Self::ENV_CACHE_TTL_SECS)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            // 0 disables the limiter.
            max_requests_per_minute: match Self::parse_from_env::<u32>(
                Self::ENV_MAX_REQUESTS_PER_MINUTE,
            )? {
                Some(0) => None,
                Some(n) => Some(n),
                None => defaults.max_requests_per_minute,
            },
            rate_limit_wait: Self::parse_from_env(Self::ENV_RATE_LIMIT_WAIT_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.rate_limit_wait),
            item_concurrency: Self::parse_from_env(Self::ENV_ITEM_CONCURRENCY)?
                .unwrap_or(defaults.item_concurrency),
            prewarm_batch_size: Self::parse_from_env(Self::ENV_PREWARM_BATCH_SIZE)?
                .unwrap_or(defaults.prewarm_batch_size),
            prewarm_parallelism: Self::parse_from_env(Self::ENV_PREWARM_PARALLELISM)?
                .unwrap_or(defaults.prewarm_parallelism),
            cleanup_interval: defaults.cleanup_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges. Errors name the environment variable of the bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.similarity_threshold.is_finite() || !(-1.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(ConfigError::out_of_range(
                Self::ENV_SIMILARITY_THRESHOLD,
                format!("{} is not within -1.0..=1.0", self.similarity_threshold),
            ));
        }

        if !self.text_fallback_score.is_finite() || !(0.0..=1.0).contains(&self.text_fallback_score)
        {
            return Err(ConfigError::out_of_range(
                Self::ENV_TEXT_FALLBACK_SCORE,
                format!("{} is not within 0.0..=1.0", self.text_fallback_score),
            ));
        }

        if !(MIN_MAX_INPUT_LEN..=MAX_MAX_INPUT_LEN).contains(&self.max_input_len) {
            return Err(ConfigError::out_of_range(
                Self::ENV_MAX_INPUT_LEN,
                format!(
                    "{} is not within {}..={}",
                    self.max_input_len, MIN_MAX_INPUT_LEN, MAX_MAX_INPUT_LEN
                ),
            ));
        }

        if self.max_results == Some(0) {
            return Err(ConfigError::out_of_range(
                Self::ENV_MAX_RESULTS,
                "must be at least 1 (use None for no cap)",
            ));
        }

        if self.cache_ttl.is_zero() {
            return Err(ConfigError::out_of_range(
                Self::ENV_CACHE_TTL_SECS,
                "must be greater than zero",
            ));
        }

        if self.max_requests_per_minute == Some(0) {
            return Err(ConfigError::out_of_range(
                Self::ENV_MAX_REQUESTS_PER_MINUTE,
                "must be at least 1 (use None to disable rate limiting)",
            ));
        }

        for (name, value) in [
            (Self::ENV_ITEM_CONCURRENCY, self.item_concurrency),
            (Self::ENV_PREWARM_BATCH_SIZE, self.prewarm_batch_size),
            (Self::ENV_PREWARM_PARALLELISM, self.prewarm_parallelism),
        ] {
            if value == 0 {
                return Err(ConfigError::out_of_range(name, "must be at least 1"));
            }
        }

        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::out_of_range(
                "cleanup_interval",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_min_semantic_matches(mut self, min: usize) -> Self {
        self.min_semantic_matches = min;
        self
    }

    pub fn with_text_fallback(mut self, enabled: bool) -> Self {
        self.text_fallback = enabled;
        self
    }

    pub fn with_text_fallback_max_query_len(mut self, max_chars: usize) -> Self {
        self.text_fallback_max_query_len = max_chars;
        self
    }

    pub fn with_text_fallback_score(mut self, score: f32) -> Self {
        self.text_fallback_score = score;
        self
    }

    pub fn with_max_input_len(mut self, max_chars: usize) -> Self {
        self.max_input_len = max_chars;
        self
    }

    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: CacheCapacity) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_requests_per_minute(mut self, max: Option<u32>) -> Self {
        self.max_requests_per_minute = max;
        self
    }

    pub fn with_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.rate_limit_wait = wait;
        self
    }

    pub fn with_item_concurrency(mut self, concurrency: usize) -> Self {
        self.item_concurrency = concurrency;
        self
    }

    pub fn with_prewarm_batch_size(mut self, batch_size: usize) -> Self {
        self.prewarm_batch_size = batch_size;
        self
    }

    pub fn with_prewarm_parallelism(mut self, parallelism: usize) -> Self {
        self.prewarm_parallelism = parallelism;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    fn parse_from_env<V>(name: &'static str) -> Result<Option<V>, ConfigError>
    where
        V: FromStr,
        V::Err: Display,
    {
        match env::var(name) {
            Ok(raw) => {
                let value = raw.trim();
                if value.is_empty() {
                    return Ok(None);
                }
                value
                    .parse()
                    .map(Some)
                    .map_err(|e: V::Err| ConfigError::InvalidValue {
                        name,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })
            }
            Err(_) => Ok(None),
        }
    }

    fn parse_bool_from_env(name: &'static str) -> Result<Option<bool>, ConfigError> {
        match env::var(name) {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(ConfigError::InvalidValue {
                    name,
                    value: raw,
                    reason: "expected true/false".to_string(),
                }),
            },
            Err(_) => Ok(None),
        }
    }
}
