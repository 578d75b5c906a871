//! TTL + LRU embedding cache with single-flight computation.
//!
//! Entries live in an [`LruCache`] behind a `parking_lot` mutex that is never held across
//! an `.await`. Computation for a missing key is serialized per key through an in-flight
//! gate, so concurrent lookups of the same text trigger one provider call.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::types::{CacheCapacity, CacheEntry, CacheStats};
use crate::constants::DEFAULT_CACHE_TTL;
use crate::embedding::{EmbeddingError, EmbeddingVector};

/// Memoizes `key -> embedding` with bounded size and bounded staleness.
pub struct EmbeddingCache<K> {
    entries: Mutex<LruCache<K, CacheEntry<K>>>,
    in_flight: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
    capacity: CacheCapacity,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    cleaning: AtomicBool,
}

impl<K> EmbeddingCache<K>
where
    K: Hash + Eq + Clone + Debug + Send + Sync,
{
    /// Creates a cache with the default capacity and TTL.
    pub fn new() -> Self {
        Self::with_config(CacheCapacity::default(), DEFAULT_CACHE_TTL)
    }

    pub fn with_config(capacity: CacheCapacity, ttl: Duration) -> Self {
        let entries = match capacity {
            CacheCapacity::Unbounded => LruCache::unbounded(),
            CacheCapacity::Bounded(limit) => LruCache::new(limit),
        };

        Self {
            entries: Mutex::new(entries),
            in_flight: Mutex::new(HashMap::new()),
            capacity,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            cleaning: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn capacity(&self) -> CacheCapacity {
        self.capacity
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached embedding for `key`, computing and storing it on a miss.
    ///
    /// A live entry is returned without calling `compute` and becomes most recently used.
    /// If `compute` fails or `cancel` fires first, nothing is stored and the error
    /// ([`EmbeddingError::Cancelled`] for cancellation) is returned unchanged. Every call
    /// that gets past the cancellation check counts exactly one hit or one miss.
    pub async fn get_or_create<F, Fut>(
        &self,
        key: K,
        cancel: &CancellationToken,
        compute: F,
    ) -> Result<EmbeddingVector, EmbeddingError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<EmbeddingVector, EmbeddingError>>,
    {
        if cancel.is_cancelled() {
            return Err(EmbeddingError::Cancelled);
        }

        if let Some(value) = self.lookup(&key, Instant::now()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let slot = InFlightSlot::register(self, &key);
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EmbeddingError::Cancelled),
            permit = slot.gate.lock() => permit,
        };

        // Another caller may have filled the entry while we waited for the gate.
        if let Some(value) = self.lookup(&key, Instant::now()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(?key, "Embedding cache miss");

        let value = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EmbeddingError::Cancelled),
            result = compute() => result?,
        };

        self.store(key, value.clone());
        Ok(value)
    }

    /// Reads a live entry (counts a hit or a miss, refreshes recency).
    pub fn get(&self, key: &K) -> Option<EmbeddingVector> {
        let found = self.lookup(key, Instant::now());
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: K, value: EmbeddingVector) {
        self.store(key, value);
    }

    /// Returns `true` if a live entry exists. Does not touch recency or statistics.
    pub fn contains(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .peek(key)
            .is_some_and(|entry| !self.is_expired(entry, now))
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        self.purge_expired(&mut entries, now)
    }

    /// Like [`cleanup_expired`](Self::cleanup_expired), but returns `None` right away when
    /// another cleanup is already running.
    pub fn try_cleanup_expired(&self) -> Option<usize> {
        if self
            .cleaning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("Cleanup already in progress, skipping");
            return None;
        }

        let removed = self.cleanup_expired();
        self.cleaning.store(false, Ordering::Release);
        Some(removed)
    }

    /// Drops every entry. Statistics are kept.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries (expired ones count until they are swept).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// `hits / (hits + misses)`, `0.0` before any access.
    pub fn hit_rate(&self) -> f64 {
        self.stats().hit_rate()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }

    /// Snapshot of live entries, most recently used first.
    pub fn entries(&self) -> Vec<CacheEntry<K>> {
        let now = Instant::now();
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| !self.is_expired(entry, now))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    #[inline]
    fn is_expired(&self, entry: &CacheEntry<K>, now: Instant) -> bool {
        now.saturating_duration_since(entry.created_at) >= self.ttl
    }

    fn lookup(&self, key: &K, now: Instant) -> Option<EmbeddingVector> {
        let mut entries = self.entries.lock();

        let expired = match entries.get_mut(key) {
            Some(entry) => {
                if !self.is_expired(entry, now) {
                    entry.last_accessed = now;
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };

        if expired {
            entries.pop(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            trace!(?key, "Dropped expired embedding on read");
        }
        None
    }

    fn store(&self, key: K, value: EmbeddingVector) {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        // Prefer dropping stale entries over evicting a live one.
        if let Some(limit) = self.capacity.limit()
            && entries.len() >= limit
            && !entries.contains(&key)
        {
            self.purge_expired(&mut entries, now);
        }

        let entry = CacheEntry {
            key: key.clone(),
            value,
            created_at: now,
            last_accessed: now,
        };

        if let Some((evicted, _)) = entries.push(key.clone(), entry)
            && evicted != key
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = ?evicted, "Evicted least recently used embedding");
        }
    }

    fn purge_expired(&self, entries: &mut LruCache<K, CacheEntry<K>>, now: Instant) -> usize {
        let expired: Vec<K> = entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        if !expired.is_empty() {
            self.expirations
                .fetch_add(expired.len() as u64, Ordering::Relaxed);
            debug!(removed = expired.len(), "Removed expired embeddings");
        }
        expired.len()
    }
}

impl<K> Default for EmbeddingCache<K>
where
    K: Hash + Eq + Clone + Debug + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Debug for EmbeddingCache<K>
where
    K: Hash + Eq,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("entries", &self.entries.lock().len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Registration in the in-flight map. The gate is removed once its last holder drops.
struct InFlightSlot<'a, K>
where
    K: Hash + Eq,
{
    cache: &'a EmbeddingCache<K>,
    key: K,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl<'a, K> InFlightSlot<'a, K>
where
    K: Hash + Eq + Clone,
{
    fn register(cache: &'a EmbeddingCache<K>, key: &K) -> Self {
        let gate = Arc::clone(
            cache
                .in_flight
                .lock()
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        );
        Self {
            cache,
            key: key.clone(),
            gate,
        }
    }
}

impl<K> Drop for InFlightSlot<'_, K>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        let mut in_flight = self.cache.in_flight.lock();
        // One reference in the map plus ours: nobody else is waiting on this key.
        if Arc::strong_count(&self.gate) <= 2 {
            in_flight.remove(&self.key);
        }
    }
}
