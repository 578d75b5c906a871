//! Bulk population of the embedding cache ahead of the first search.

use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::engine::SemanticSearchEngine;
use super::types::PrewarmReport;
use crate::cache::EmbeddingKey;
use crate::ratelimit::RateLimitError;
use crate::sanitize::{clean_input_text, redact_secrets};

impl<T> SemanticSearchEngine<T>
where
    T: Clone + Send + Sync,
{
    /// Embeds every item not already cached, one provider call per batch.
    ///
    /// Batches of `prewarm_batch_size` run up to `prewarm_parallelism` at a time. After
    /// each finished batch `progress` receives the completed share of items (0..=100).
    /// Item failures are logged and counted; they never abort the run. Cancellation stops
    /// scheduling new work and is reported in [`PrewarmReport::cancelled`].
    pub async fn prewarm<P>(
        &self,
        items: &[T],
        cancel: &CancellationToken,
        progress: P,
    ) -> PrewarmReport
    where
        P: Fn(f64),
    {
        let total = items.len();
        let mut report = PrewarmReport {
            total,
            ..PrewarmReport::default()
        };
        if total == 0 {
            progress(100.0);
            return report;
        }

        info!(
            total,
            batch_size = self.config.prewarm_batch_size,
            parallelism = self.config.prewarm_parallelism,
            "Pre-warming embedding cache"
        );

        let mut batches = stream::iter(items.chunks(self.config.prewarm_batch_size))
            .map(move |batch| async move { (batch.len(), self.prewarm_batch(batch, cancel).await) })
            .buffer_unordered(self.config.prewarm_parallelism);

        let mut completed = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                next = batches.next() => next,
            };
            let Some((size, batch)) = next else {
                break;
            };

            completed += size;
            report.absorb(&batch);
            progress(completed as f64 * 100.0 / total as f64);
        }

        info!(
            embedded = report.embedded,
            already_cached = report.already_cached,
            failed = report.failed,
            cancelled = report.cancelled,
            "Pre-warm finished"
        );
        report
    }

    async fn prewarm_batch(&self, batch: &[T], cancel: &CancellationToken) -> PrewarmReport {
        let mut tally = PrewarmReport::default();

        let mut pending: Vec<(EmbeddingKey, String)> = Vec::with_capacity(batch.len());
        for item in batch {
            let key = EmbeddingKey::Item(self.accessors.key_of(item));
            if self.cache.contains(&key) {
                tally.already_cached += 1;
                continue;
            }
            let text = clean_input_text(&self.accessors.text_of(item), self.config.max_input_len);
            if text.is_empty() {
                debug!(?key, "Skipping item with no text");
                tally.failed += 1;
                continue;
            }
            pending.push((key, text));
        }
        if pending.is_empty() {
            return tally;
        }

        if let Some(limiter) = &self.limiter {
            match self.take_token(limiter, cancel).await {
                Ok(()) => {}
                Err(RateLimitError::Cancelled) => {
                    tally.cancelled = true;
                    return tally;
                }
                Err(err) => {
                    warn!(items = pending.len(), error = %err, "Pre-warm batch skipped");
                    tally.failed += pending.len();
                    return tally;
                }
            }
        }

        let texts: Vec<String> = pending.iter().map(|(_, text)| text.clone()).collect();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tally.cancelled = true;
                return tally;
            }
            result = self.provider.generate(&texts) => result,
        };

        let reason = match result {
            Ok(vectors) if vectors.len() == pending.len() => {
                for ((key, _), vector) in pending.into_iter().zip(vectors) {
                    if vector.is_empty() {
                        warn!(?key, "Provider returned an empty embedding, not caching");
                        tally.failed += 1;
                        continue;
                    }
                    self.cache.insert(key, vector);
                    tally.embedded += 1;
                }
                return tally;
            }
            Ok(vectors) => format!(
                "expected {} embeddings, got {}",
                pending.len(),
                vectors.len()
            ),
            Err(err) => redact_secrets(&err.to_string()),
        };

        warn!(
            items = pending.len(),
            error = %reason,
            "Pre-warm batch failed, retrying items one by one"
        );
        for (key, text) in pending {
            match self.embed(key, &text, cancel).await {
                Ok(_) => tally.embedded += 1,
                Err(err) if err.is_cancelled() => {
                    tally.cancelled = true;
                    break;
                }
                Err(err) => {
                    tally.failed += 1;
                    warn!(error = %redact_secrets(&err.to_string()), "Pre-warm item failed");
                }
            }
        }
        tally
    }
}
