//! Embedding cache (TTL + LRU) shared by the search engine.

pub mod embedding_cache;
pub mod types;

#[cfg(test)]
mod embedding_cache_tests;

pub use embedding_cache::EmbeddingCache;
pub use types::{CacheCapacity, CacheEntry, CacheStats, EmbeddingKey};
