use std::num::NonZeroUsize;

use tokio::time::Instant;

use crate::constants::DEFAULT_CACHE_CAPACITY;
use crate::embedding::EmbeddingVector;

/// Size bound of an [`EmbeddingCache`](super::EmbeddingCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCapacity {
    Unbounded,
    Bounded(NonZeroUsize),
}

impl CacheCapacity {
    /// Raw value meaning "no limit" in configuration sources.
    pub const UNBOUNDED_SENTINEL: i64 = -1;

    /// `None` for zero.
    pub fn bounded(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(CacheCapacity::Bounded)
    }

    /// Maps `-1` to [`CacheCapacity::Unbounded`] and positive values to a hard cap.
    /// Anything else is invalid.
    pub fn from_raw(raw: i64) -> Option<Self> {
        if raw == Self::UNBOUNDED_SENTINEL {
            return Some(CacheCapacity::Unbounded);
        }
        usize::try_from(raw).ok().and_then(Self::bounded)
    }

    /// The entry limit, or `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        match self {
            CacheCapacity::Unbounded => None,
            CacheCapacity::Bounded(n) => Some(n.get()),
        }
    }
}

impl Default for CacheCapacity {
    fn default() -> Self {
        CacheCapacity::Bounded(
            NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        )
    }
}

/// Key space of the engine's cache. Queries and items never collide even when an item
/// key equals some query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EmbeddingKey {
    Query(String),
    Item(String),
}

/// A cached embedding with its bookkeeping timestamps.
#[derive(Debug, Clone)]
pub struct CacheEntry<K> {
    pub key: K,
    pub value: EmbeddingVector,
    pub created_at: Instant,
    pub last_accessed: Instant,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or `0.0` before any access.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
