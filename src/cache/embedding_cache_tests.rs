use super::embedding_cache::EmbeddingCache;
use super::types::{CacheCapacity, CacheStats, EmbeddingKey};
use crate::embedding::{EmbeddingError, EmbeddingVector};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

const HOUR: Duration = Duration::from_secs(3600);

fn vector(seed: f32) -> EmbeddingVector {
    EmbeddingVector::new(vec![seed, seed + 1.0, seed + 2.0])
}

fn bounded(limit: usize, ttl: Duration) -> EmbeddingCache<String> {
    EmbeddingCache::with_config(CacheCapacity::bounded(limit).unwrap(), ttl)
}

async fn fill(cache: &EmbeddingCache<String>, key: &str, seed: f32) -> EmbeddingVector {
    cache
        .get_or_create(key.to_string(), &CancellationToken::new(), || async move {
            Ok(vector(seed))
        })
        .await
        .expect("compute should succeed")
}

#[test]
fn test_capacity_from_raw() {
    assert_eq!(CacheCapacity::from_raw(-1), Some(CacheCapacity::Unbounded));
    assert_eq!(CacheCapacity::from_raw(5), CacheCapacity::bounded(5));
    assert_eq!(CacheCapacity::from_raw(0), None);
    assert_eq!(CacheCapacity::from_raw(-2), None);
    assert_eq!(CacheCapacity::Unbounded.limit(), None);
    assert_eq!(CacheCapacity::bounded(7).unwrap().limit(), Some(7));
}

#[test]
fn test_stats_hit_rate_empty() {
    assert_eq!(CacheStats::default().hit_rate(), 0.0);

    let cache: EmbeddingCache<String> = EmbeddingCache::new();
    assert_eq!(cache.hit_rate(), 0.0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_get_or_create_second_call_is_hit() {
    let cache = bounded(10, HOUR);
    let calls = AtomicUsize::new(0);
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let value = cache
            .get_or_create("phone".to_string(), &cancel, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vector(1.0))
            })
            .await
            .unwrap();
        assert_eq!(value, vector(1.0));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(cache.hit_rate(), 0.5);
}

#[tokio::test]
async fn test_lru_eviction_drops_oldest() {
    let cache = bounded(2, HOUR);

    fill(&cache, "A", 1.0).await;
    fill(&cache, "B", 2.0).await;
    fill(&cache, "C", 3.0).await;

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&"A".to_string()));
    assert!(cache.contains(&"B".to_string()));
    assert!(cache.contains(&"C".to_string()));
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test]
async fn test_read_refreshes_recency() {
    let cache = bounded(2, HOUR);

    fill(&cache, "A", 1.0).await;
    fill(&cache, "B", 2.0).await;
    assert!(cache.get(&"A".to_string()).is_some());
    fill(&cache, "C", 3.0).await;

    assert!(cache.contains(&"A".to_string()));
    assert!(!cache.contains(&"B".to_string()));
    assert!(cache.contains(&"C".to_string()));
}

#[tokio::test]
async fn test_eviction_bound_removes_least_recent() {
    let capacity = 5;
    let extra = 3;
    let cache = bounded(capacity, HOUR);

    for i in 0..capacity + extra {
        fill(&cache, &format!("key-{}", i), i as f32).await;
        assert!(cache.len() <= capacity);
    }

    for i in 0..extra {
        assert!(!cache.contains(&format!("key-{}", i)));
    }
    for i in extra..capacity + extra {
        assert!(cache.contains(&format!("key-{}", i)));
    }
}

#[tokio::test]
async fn test_unbounded_capacity() {
    let cache: EmbeddingCache<String> =
        EmbeddingCache::with_config(CacheCapacity::Unbounded, HOUR);

    for i in 0..500 {
        fill(&cache, &format!("k{}", i), i as f32).await;
    }
    assert_eq!(cache.len(), 500);
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_is_miss() {
    let cache = bounded(10, Duration::from_secs(60));
    let calls = AtomicUsize::new(0);
    let cancel = CancellationToken::new();

    let compute = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vector(1.0))
    };

    cache.get_or_create("q".to_string(), &cancel, compute).await.unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(cache.contains(&"q".to_string()));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(!cache.contains(&"q".to_string()));
    assert!(cache.get(&"q".to_string()).is_none());

    cache.get_or_create("q".to_string(), &cancel, compute).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_expired_removes_only_stale() {
    let cache = bounded(10, Duration::from_secs(60));

    fill(&cache, "old-1", 1.0).await;
    fill(&cache, "old-2", 2.0).await;
    tokio::time::advance(Duration::from_secs(45)).await;
    fill(&cache, "fresh", 3.0).await;
    tokio::time::advance(Duration::from_secs(30)).await;

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.cleanup_expired(), 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&"fresh".to_string()));
    assert_eq!(cache.stats().expirations, 2);

    assert_eq!(cache.try_cleanup_expired(), Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_full_cache_prefers_dropping_expired() {
    let cache = bounded(2, Duration::from_secs(10));

    fill(&cache, "stale", 1.0).await;
    tokio::time::advance(Duration::from_secs(8)).await;
    fill(&cache, "live", 2.0).await;
    tokio::time::advance(Duration::from_secs(5)).await;
    fill(&cache, "new", 3.0).await;

    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&"live".to_string()));
    assert!(cache.contains(&"new".to_string()));
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test]
async fn test_failed_compute_is_not_cached() {
    let cache = bounded(10, HOUR);
    let cancel = CancellationToken::new();

    let err = cache
        .get_or_create("bad".to_string(), &cancel, || async {
            Err(EmbeddingError::Provider {
                status: Some(503),
                message: "unavailable".to_string(),
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EmbeddingError::Provider {
            status: Some(503),
            ..
        }
    ));
    assert!(cache.is_empty());

    let value = fill(&cache, "bad", 4.0).await;
    assert_eq!(value, vector(4.0));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let cache = bounded(10, HOUR);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = cache
        .get_or_create("x".to_string(), &cancel, || async { Ok(vector(0.0)) })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(cache.is_empty());
    assert_eq!(cache.stats().misses, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_compute_stores_nothing() {
    let cache = bounded(10, HOUR);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let err = cache
        .get_or_create("slow".to_string(), &cancel, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vector(9.0))
        })
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!cache.contains(&"slow".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_same_key_computes_once() {
    let cache = bounded(10, HOUR);
    let calls = AtomicUsize::new(0);
    let cancel = CancellationToken::new();

    let compute = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(vector(2.0))
    };

    let (a, b, c) = tokio::join!(
        cache.get_or_create("shared".to_string(), &cancel, compute),
        cache.get_or_create("shared".to_string(), &cancel, compute),
        cache.get_or_create("shared".to_string(), &cancel, compute),
    );

    assert_eq!(a.unwrap(), vector(2.0));
    assert_eq!(b.unwrap(), vector(2.0));
    assert_eq!(c.unwrap(), vector(2.0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}

#[tokio::test(start_paused = true)]
async fn test_waiter_recomputes_after_leader_fails() {
    let cache = bounded(10, HOUR);
    let calls = AtomicUsize::new(0);
    let cancel = CancellationToken::new();

    let compute = || async {
        let attempt = calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if attempt == 0 {
            Err(EmbeddingError::Provider {
                status: None,
                message: "first attempt fails".to_string(),
            })
        } else {
            Ok(vector(5.0))
        }
    };

    let (first, second) = tokio::join!(
        cache.get_or_create("flaky".to_string(), &cancel, compute),
        cache.get_or_create("flaky".to_string(), &cancel, compute),
    );

    assert!(first.is_err());
    assert_eq!(second.unwrap(), vector(5.0));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.contains(&"flaky".to_string()));
}

#[tokio::test]
async fn test_clear_and_reset_stats() {
    let cache = bounded(10, HOUR);
    fill(&cache, "a", 1.0).await;
    fill(&cache, "a", 1.0).await;

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.stats().hits, 1);

    cache.reset_stats();
    assert_eq!(cache.stats(), CacheStats::default());
}

#[tokio::test]
async fn test_entries_snapshot_mru_first() {
    let cache = bounded(10, HOUR);
    fill(&cache, "first", 1.0).await;
    fill(&cache, "second", 2.0).await;
    cache.get(&"first".to_string());

    let keys: Vec<String> = cache.entries().into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn test_query_and_item_keys_do_not_collide() {
    let cache: EmbeddingCache<EmbeddingKey> = EmbeddingCache::new();
    let cancel = CancellationToken::new();

    cache
        .get_or_create(EmbeddingKey::Query("apple".into()), &cancel, || async {
            Ok(vector(1.0))
        })
        .await
        .unwrap();
    let item = cache
        .get_or_create(EmbeddingKey::Item("apple".into()), &cancel, || async {
            Ok(vector(7.0))
        })
        .await
        .unwrap();

    assert_eq!(item, vector(7.0));
    assert_eq!(cache.len(), 2);
}
