//! Semantic search over caller-supplied items.
//!
//! A search cleans the query, takes a limiter token, embeds the query and every item
//! through the shared [`EmbeddingCache`], keeps items whose cosine similarity clears the
//! threshold and tops sparse result sets up with plain text matches.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::SearchError;
use super::matcher::MatchStrategy;
use super::types::{ItemAccessors, MatchSource, SearchOutcome, SearchResult, SearchStatus};
use crate::cache::{EmbeddingCache, EmbeddingKey};
use crate::config::SearchConfig;
use crate::constants::validate_embedding_dim;
use crate::embedding::{EmbeddingError, EmbeddingProvider, EmbeddingVector};
use crate::ratelimit::{RateLimitError, RateLimitResult, TokenBucketLimiter};
use crate::sanitize::{clean_input_text, redact_secrets};

/// Ranks items against free-text queries by embedding similarity.
///
/// Safe to share across tasks; independent searches may run concurrently.
pub struct SemanticSearchEngine<T> {
    pub(super) provider: Arc<dyn EmbeddingProvider>,
    pub(super) cache: Arc<EmbeddingCache<EmbeddingKey>>,
    pub(super) limiter: Option<Arc<TokenBucketLimiter>>,
    pub(super) accessors: ItemAccessors<T>,
    pub(super) config: SearchConfig,
    strategy: MatchStrategy,
    /// Item key -> score from the most recent search.
    scores: RwLock<HashMap<String, f32>>,
    status: watch::Sender<Option<String>>,
    last_cleanup: Mutex<Instant>,
    latest: Mutex<Option<CancellationToken>>,
}

/// A kept item, by position in the input slice.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    index: usize,
    similarity: f32,
    source: MatchSource,
}

impl<T> SemanticSearchEngine<T>
where
    T: Clone + Send + Sync,
{
    /// Creates an engine with its own cache and, when configured, its own limiter.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        accessors: ItemAccessors<T>,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let cache = Arc::new(EmbeddingCache::with_config(
            config.cache_capacity,
            config.cache_ttl,
        ));
        let limiter = config
            .max_requests_per_minute
            .map(TokenBucketLimiter::new)
            .transpose()?
            .map(Arc::new);
        let (status, _) = watch::channel(None);

        info!(
            provider = provider.name(),
            capacity = ?config.cache_capacity,
            ttl = ?config.cache_ttl,
            max_requests_per_minute = ?config.max_requests_per_minute,
            "Semantic search engine ready"
        );

        Ok(Self {
            provider,
            cache,
            limiter,
            accessors,
            config,
            strategy: MatchStrategy::default(),
            scores: RwLock::new(HashMap::new()),
            status,
            last_cleanup: Mutex::new(Instant::now()),
            latest: Mutex::new(None),
        })
    }

    /// Sets the text-fallback strategy.
    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replaces the limiter (e.g. to share one across engines). `None` disables limiting.
    pub fn with_limiter(mut self, limiter: Option<Arc<TokenBucketLimiter>>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replaces the cache (e.g. to share one across engines).
    pub fn with_cache(mut self, cache: Arc<EmbeddingCache<EmbeddingKey>>) -> Self {
        self.cache = cache;
        self
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[inline]
    pub fn strategy(&self) -> &MatchStrategy {
        &self.strategy
    }

    #[inline]
    pub fn cache(&self) -> &Arc<EmbeddingCache<EmbeddingKey>> {
        &self.cache
    }

    #[inline]
    pub fn limiter(&self) -> Option<&Arc<TokenBucketLimiter>> {
        self.limiter.as_ref()
    }

    /// Ranks `items` against `query`.
    ///
    /// Rate limiting, provider failures and cancellation are reported through
    /// [`SearchOutcome::status`] with an empty or partial result set. Only misuse (a
    /// disposed limiter) is an error.
    pub async fn search(
        &self,
        query: &str,
        items: &[T],
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome<T>, SearchError> {
        let query = clean_input_text(query, self.config.max_input_len);
        if query.is_empty() {
            return Ok(self.empty_outcome(SearchStatus::EmptyQuery));
        }

        if let Some(status) = self.admit(cancel).await? {
            return Ok(self.empty_outcome(status));
        }

        let query_vector = match self
            .embed(EmbeddingKey::Query(query.clone()), &query, cancel)
            .await
        {
            Ok(vector) => vector,
            Err(err) if err.is_cancelled() => {
                return Ok(self.empty_outcome(SearchStatus::Cancelled));
            }
            Err(err) => {
                let message = redact_secrets(&err.to_string());
                warn!(
                    provider = self.provider.name(),
                    error = %message,
                    "Query embedding failed"
                );
                let status = SearchStatus::ProviderFailed { message };
                self.publish(status.message());
                return Ok(self.empty_outcome(status));
            }
        };

        let (mut ranked, cancelled) = self.score_items(&query_vector, items, cancel).await;
        let semantic = ranked.len();
        if !cancelled {
            self.apply_text_fallback(&query, items, &mut ranked);
        }

        // Stable, ties keep input order.
        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.index.cmp(&b.index))
        });
        if let Some(max) = self.config.max_results {
            ranked.truncate(max);
        }

        self.record_scores(items, &ranked);

        let status = if cancelled {
            SearchStatus::Cancelled
        } else {
            self.publish(None);
            SearchStatus::Completed
        };

        debug!(
            items = items.len(),
            semantic,
            returned = ranked.len(),
            %status,
            "Search finished"
        );

        self.maybe_cleanup();

        Ok(SearchOutcome {
            results: ranked
                .into_iter()
                .map(|r| SearchResult {
                    item: items[r.index].clone(),
                    similarity: r.similarity,
                    source: r.source,
                })
                .collect(),
            status,
        })
    }

    /// Like [`search`](Self::search), but cancels the previous `search_latest` call that is
    /// still running, so only the newest query keeps consuming the provider.
    pub async fn search_latest(
        &self,
        query: &str,
        items: &[T],
    ) -> Result<SearchOutcome<T>, SearchError> {
        let token = CancellationToken::new();
        if let Some(previous) = self.latest.lock().replace(token.clone()) {
            previous.cancel();
        }
        self.search(query, items, &token).await
    }

    /// Cancels the running `search_latest` call, if any.
    pub fn cancel_latest(&self) {
        if let Some(token) = self.latest.lock().take() {
            token.cancel();
        }
    }

    /// Score `item` received in the most recent search, `0.0` if it was not returned.
    pub fn similarity_score(&self, item: &T) -> f32 {
        let key = self.accessors.key_of(item);
        self.scores.read().get(&key).copied().unwrap_or(0.0)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Embedding cache cleared");
    }

    /// Drops expired embeddings now and returns how many were removed.
    pub fn cleanup_expired_cache(&self) -> usize {
        self.cache.cleanup_expired()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_hit_rate(&self) -> f64 {
        self.cache.hit_rate()
    }

    pub fn reset_cache_stats(&self) {
        self.cache.reset_stats();
    }

    /// The current user-facing failure message, if the last search failed.
    pub fn last_error(&self) -> Option<String> {
        self.status.borrow().clone()
    }

    /// Change notifications for [`last_error`](Self::last_error).
    pub fn subscribe_status(&self) -> watch::Receiver<Option<String>> {
        self.status.subscribe()
    }

    /// Takes a limiter token. `Ok(Some(status))` means the search must stop with `status`.
    async fn admit(&self, cancel: &CancellationToken) -> Result<Option<SearchStatus>, SearchError> {
        let Some(limiter) = &self.limiter else {
            return Ok(None);
        };

        match self.take_token(limiter, cancel).await {
            Ok(()) => Ok(None),
            Err(RateLimitError::Exceeded { retry_after }) => {
                warn!(?retry_after, "Search rate limited");
                let status = SearchStatus::RateLimited { retry_after };
                self.publish(status.message());
                Ok(Some(status))
            }
            Err(RateLimitError::Cancelled) => Ok(Some(SearchStatus::Cancelled)),
            Err(err) => Err(err.into()),
        }
    }

    /// Fails fast when `rate_limit_wait` is zero, otherwise waits up to that long.
    pub(super) async fn take_token(
        &self,
        limiter: &TokenBucketLimiter,
        cancel: &CancellationToken,
    ) -> RateLimitResult<()> {
        if self.config.rate_limit_wait.is_zero() {
            if limiter.try_acquire()? {
                return Ok(());
            }
            return Err(RateLimitError::Exceeded {
                retry_after: limiter.time_until_next_token()?,
            });
        }
        limiter.acquire(self.config.rate_limit_wait, cancel).await
    }

    /// Cached embedding of already-cleaned `text`.
    pub(super) async fn embed(
        &self,
        key: EmbeddingKey,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<EmbeddingVector, EmbeddingError> {
        self.cache
            .get_or_create(key, cancel, || self.provider.generate_one(text))
            .await
    }

    async fn embed_item(
        &self,
        item: &T,
        cancel: &CancellationToken,
    ) -> Result<EmbeddingVector, EmbeddingError> {
        let text = clean_input_text(&self.accessors.text_of(item), self.config.max_input_len);
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        self.embed(EmbeddingKey::Item(self.accessors.key_of(item)), &text, cancel)
            .await
    }

    /// Embeds items with bounded concurrency, consuming results in input order.
    /// Returns the semantic matches and whether cancellation cut the pass short.
    async fn score_items(
        &self,
        query_vector: &EmbeddingVector,
        items: &[T],
        cancel: &CancellationToken,
    ) -> (Vec<Ranked>, bool) {
        let threshold = self.config.similarity_threshold;
        let mut matches = Vec::new();
        let mut cancelled = false;
        let mut failed = 0usize;

        let mut embeddings = stream::iter(items.iter().enumerate())
            .map(move |(index, item)| async move { (index, self.embed_item(item, cancel).await) })
            .buffered(self.config.item_concurrency);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = embeddings.next() => next,
            };
            let Some((index, result)) = next else {
                break;
            };

            match result {
                Ok(vector) => {
                    if let Err(err) = validate_embedding_dim(vector.dim(), query_vector.dim()) {
                        warn!(index, error = %err, "Skipping item with incompatible embedding");
                        failed += 1;
                        continue;
                    }
                    let similarity = query_vector.cosine_similarity(&vector);
                    if similarity >= threshold {
                        matches.push(Ranked {
                            index,
                            similarity,
                            source: MatchSource::Semantic,
                        });
                    }
                }
                Err(err) if err.is_cancelled() => {
                    cancelled = true;
                    break;
                }
                Err(err) => {
                    failed += 1;
                    debug!(
                        index,
                        error = %redact_secrets(&err.to_string()),
                        "Skipping item whose embedding failed"
                    );
                }
            }
        }

        if failed > 0 {
            warn!(failed, total = items.len(), "Some items could not be embedded");
        }
        (matches, cancelled)
    }

    fn apply_text_fallback(&self, query: &str, items: &[T], ranked: &mut Vec<Ranked>) {
        if !self.config.text_fallback
            || ranked.len() >= self.config.min_semantic_matches
            || query.chars().count() > self.config.text_fallback_max_query_len
        {
            return;
        }

        let matched: HashSet<usize> = ranked.iter().map(|r| r.index).collect();
        let before = ranked.len();

        for (index, item) in items.iter().enumerate() {
            if matched.contains(&index) {
                continue;
            }
            if self.strategy.matches(&self.accessors.text_of(item), query) {
                ranked.push(Ranked {
                    index,
                    similarity: self.config.text_fallback_score,
                    source: MatchSource::TextFallback,
                });
            }
        }

        debug!(
            added = ranked.len() - before,
            strategy = ?self.strategy,
            "Applied text fallback"
        );
    }

    fn record_scores(&self, items: &[T], ranked: &[Ranked]) {
        let scores = ranked
            .iter()
            .map(|r| (self.accessors.key_of(&items[r.index]), r.similarity))
            .collect();
        *self.scores.write() = scores;
    }

    /// A search that returned nothing still replaces the previous search's scores.
    fn empty_outcome(&self, status: SearchStatus) -> SearchOutcome<T> {
        self.scores.write().clear();
        SearchOutcome::empty(status)
    }

    /// Publishes `message` to status subscribers when it differs from the current one.
    fn publish(&self, message: Option<String>) {
        self.status.send_if_modified(move |current| {
            if *current == message {
                return false;
            }
            *current = message;
            true
        });
    }

    /// Sweeps expired cache entries at most once per `cleanup_interval`.
    fn maybe_cleanup(&self) {
        {
            let mut last = self.last_cleanup.lock();
            if last.elapsed() < self.config.cleanup_interval {
                return;
            }
            *last = Instant::now();
        }

        if let Some(removed) = self.cache.try_cleanup_expired() {
            debug!(removed, remaining = self.cache.len(), "Periodic embedding cache cleanup");
        }
    }
}

impl<T> fmt::Debug for SemanticSearchEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticSearchEngine")
            .field("provider", &self.provider.name())
            .field("cache", &self.cache)
            .field("limiter", &self.limiter)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
