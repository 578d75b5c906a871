use super::*;
use crate::cache::EmbeddingKey;
use crate::config::SearchConfig;
use crate::embedding::MockEmbeddingProvider;
use crate::ratelimit::RateLimitError;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

fn catalog_provider() -> MockEmbeddingProvider {
    MockEmbeddingProvider::new()
        .with_vector("phone", vec![1.0, 0.0, 0.0])
        .with_vector("mobi", vec![1.0, 0.0, 0.0])
        .with_vector("laptop", vec![0.0, 1.0, 0.0])
        .with_vector("Mobile Phone", vec![0.9, 0.1, 0.0])
        .with_vector("Smartphone", vec![0.8, 0.6, 0.0])
        .with_vector("Laptop", vec![0.0, 1.0, 0.0])
        .with_vector("Automobile", vec![0.0, 0.0, 1.0])
}

fn catalog() -> Vec<String> {
    ["Mobile Phone", "Smartphone", "Laptop", "Automobile"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn engine_with(
    provider: MockEmbeddingProvider,
    config: SearchConfig,
) -> (Arc<MockEmbeddingProvider>, SemanticSearchEngine<String>) {
    let provider = Arc::new(provider);
    let engine = SemanticSearchEngine::new(provider.clone(), ItemAccessors::identity(), config)
        .expect("valid config");
    (provider, engine)
}

fn names(outcome: &SearchOutcome<String>) -> Vec<&str> {
    outcome.items().map(String::as_str).collect()
}

#[tokio::test]
async fn test_ranks_semantic_matches() {
    let (_, engine) = engine_with(catalog_provider(), SearchConfig::default());
    let items = catalog();

    let outcome = engine
        .search("phone", &items, &CancellationToken::new())
        .await
        .expect("search runs");

    assert_eq!(outcome.status, SearchStatus::Completed);
    assert_eq!(names(&outcome), vec!["Mobile Phone", "Smartphone"]);
    assert!(outcome.results[0].similarity > outcome.results[1].similarity);
    assert!(
        outcome
            .results
            .iter()
            .all(|r| r.source == MatchSource::Semantic)
    );

    assert!(engine.similarity_score(&"Mobile Phone".to_string()) > 0.99);
    assert_eq!(engine.similarity_score(&"Laptop".to_string()), 0.0);
    assert_eq!(engine.last_error(), None);
}

#[tokio::test]
async fn test_blank_query_is_a_no_op() {
    let (provider, engine) = engine_with(catalog_provider(), SearchConfig::default());

    for query in ["", "   ", "\u{1}\n"] {
        let outcome = engine
            .search(query, &catalog(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.status, SearchStatus::EmptyQuery);
        assert!(outcome.is_empty());
    }
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_short_query_adds_text_fallback() {
    let (_, engine) = engine_with(catalog_provider(), SearchConfig::default());

    let outcome = engine
        .search("mobi", &catalog(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        names(&outcome),
        vec!["Mobile Phone", "Smartphone", "Automobile"]
    );
    let fallback = &outcome.results[2];
    assert_eq!(fallback.source, MatchSource::TextFallback);
    assert_eq!(fallback.similarity, 0.4);
}

#[tokio::test]
async fn test_fallback_skipped_for_long_queries() {
    let provider = catalog_provider().with_vector("mobile devices", vec![0.0, 0.0, -1.0]);
    let (_, engine) = engine_with(provider, SearchConfig::default());
    let items = vec!["mobile devices rack".to_string()];

    let outcome = engine
        .search("mobile devices", &items, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, SearchStatus::Completed);
    assert!(outcome.is_empty());
}

#[tokio::test]
async fn test_fallback_disabled_by_config() {
    let (_, engine) = engine_with(
        catalog_provider(),
        SearchConfig::default().with_text_fallback(false),
    );

    let outcome = engine
        .search("mobi", &catalog(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(names(&outcome), vec!["Mobile Phone", "Smartphone"]);
}

#[tokio::test]
async fn test_fallback_uses_configured_strategy() {
    let (_, engine) = engine_with(catalog_provider(), SearchConfig::default());
    let engine = engine.with_strategy(MatchStrategy::StartsWith);

    let outcome = engine
        .search("mobi", &catalog(), &CancellationToken::new())
        .await
        .unwrap();
    // "Automobile" contains but does not start with the query.
    assert_eq!(names(&outcome), vec!["Mobile Phone", "Smartphone"]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_limiter_skips_provider() {
    let config = SearchConfig::default().with_max_requests_per_minute(Some(2));
    let (provider, engine) = engine_with(catalog_provider(), config);

    let limiter = engine.limiter().expect("limiter configured");
    assert!(limiter.try_acquire().unwrap());
    assert!(limiter.try_acquire().unwrap());

    let outcome = engine
        .search("phone", &catalog(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.is_empty());
    match &outcome.status {
        SearchStatus::RateLimited { retry_after } => {
            assert!(*retry_after > Duration::ZERO);
            assert!(*retry_after <= Duration::from_secs(30));
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
    let message = engine.last_error().expect("status message published");
    assert!(message.starts_with("rate limited, retry after"));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_limiter_wait_grants_after_refill() {
    let config = SearchConfig::default()
        .with_max_requests_per_minute(Some(1))
        .with_rate_limit_wait(Duration::from_secs(90));
    let (_, engine) = engine_with(catalog_provider(), config);
    let cancel = CancellationToken::new();

    engine.search("phone", &catalog(), &cancel).await.unwrap();
    let started = tokio::time::Instant::now();
    let outcome = engine.search("phone", &catalog(), &cancel).await.unwrap();

    assert_eq!(outcome.status, SearchStatus::Completed);
    assert!(started.elapsed() >= Duration::from_secs(59));
}

#[tokio::test]
async fn test_rate_limited_search_resets_scores() {
    let config = SearchConfig::default().with_max_requests_per_minute(Some(1));
    let (_, engine) = engine_with(catalog_provider(), config);
    let items = catalog();
    let phone = "Mobile Phone".to_string();

    let first = engine
        .search("phone", &items, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.status, SearchStatus::Completed);
    assert!(engine.similarity_score(&phone) > 0.99);

    let second = engine
        .search("phone", &items, &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(second.status, SearchStatus::RateLimited { .. }));
    assert_eq!(engine.similarity_score(&phone), 0.0);
}

#[tokio::test]
async fn test_blank_query_resets_scores() {
    let (_, engine) = engine_with(catalog_provider(), SearchConfig::default());
    let items = catalog();
    let phone = "Mobile Phone".to_string();

    engine.search("phone", &items, &CancellationToken::new()).await.unwrap();
    assert!(engine.similarity_score(&phone) > 0.99);

    engine.search("  ", &items, &CancellationToken::new()).await.unwrap();
    assert_eq!(engine.similarity_score(&phone), 0.0);
}

#[tokio::test]
async fn test_disposed_limiter_is_an_error() {
    let config = SearchConfig::default().with_max_requests_per_minute(Some(5));
    let (_, engine) = engine_with(catalog_provider(), config);
    engine.limiter().unwrap().dispose();

    let err = engine
        .search("phone", &catalog(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Limiter(RateLimitError::Disposed)));
}

#[tokio::test]
async fn test_provider_failure_is_redacted_and_published() {
    let provider = MockEmbeddingProvider::new()
        .failing("Incorrect API key provided: sk-live-abcdefghijklmnop1234");
    let (_, engine) = engine_with(provider, SearchConfig::default());
    let mut status = engine.subscribe_status();

    let outcome = engine
        .search("phone", &catalog(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.is_empty());
    let SearchStatus::ProviderFailed { message } = &outcome.status else {
        panic!("expected ProviderFailed, got {:?}", outcome.status);
    };
    assert!(!message.contains("abcdefghijklmnop"));
    assert!(message.contains("[REDACTED]"));

    assert!(status.has_changed().unwrap());
    let published = status.borrow_and_update().clone().expect("message published");
    assert!(!published.contains("abcdefghijklmnop"));
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let config = SearchConfig::default().with_max_requests_per_minute(Some(1));
    let (_, engine) = engine_with(catalog_provider(), config);
    let cancel = CancellationToken::new();

    engine.search("phone", &catalog(), &cancel).await.unwrap();
    engine.search("phone", &catalog(), &cancel).await.unwrap();
    assert!(engine.last_error().is_some());

    engine.limiter().unwrap().reset().unwrap();
    engine.search("phone", &catalog(), &cancel).await.unwrap();
    assert_eq!(engine.last_error(), None);
}

#[tokio::test]
async fn test_failed_item_is_skipped() {
    let provider = catalog_provider().with_failure("Smartphone");
    let (_, engine) = engine_with(provider, SearchConfig::default());

    let outcome = engine
        .search("phone", &catalog(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, SearchStatus::Completed);
    // Only reachable through the text fallback now.
    assert_eq!(names(&outcome), vec!["Mobile Phone", "Smartphone"]);
    assert_eq!(outcome.results[1].source, MatchSource::TextFallback);
    assert!(!engine.cache().contains(&EmbeddingKey::Item("Smartphone".into())));
}

#[tokio::test]
async fn test_incompatible_dimension_is_skipped() {
    // Unscripted texts fall back to a 256-dim hash vector; the query is 3-dim.
    let (_, engine) = engine_with(catalog_provider(), SearchConfig::default());
    let items = vec!["Mobile Phone".to_string(), "Unknown gadget".to_string()];

    let outcome = engine
        .search("phone", &items, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(names(&outcome), vec!["Mobile Phone"]);
}

#[tokio::test]
async fn test_second_search_uses_cache() {
    let (provider, engine) = engine_with(catalog_provider(), SearchConfig::default());
    let items = catalog();
    let cancel = CancellationToken::new();

    engine.search("phone", &items, &cancel).await.unwrap();
    let calls = provider.call_count();
    assert_eq!(calls, 5);
    assert_eq!(engine.cache_len(), 5);

    engine.search("phone", &items, &cancel).await.unwrap();
    assert_eq!(provider.call_count(), calls);
    assert_eq!(engine.cache_hit_rate(), 0.5);

    engine.reset_cache_stats();
    assert_eq!(engine.cache_hit_rate(), 0.0);
    engine.clear_cache();
    assert_eq!(engine.cache_len(), 0);
}

#[tokio::test]
async fn test_equal_scores_keep_input_order() {
    let provider = MockEmbeddingProvider::new()
        .with_vector("q", vec![1.0, 0.0])
        .with_vector("b-item", vec![1.0, 0.0])
        .with_vector("a-item", vec![1.0, 0.0])
        .with_vector("c-item", vec![1.0, 0.0]);
    let (_, engine) = engine_with(provider, SearchConfig::default());
    let items: Vec<String> = ["b-item", "a-item", "c-item"].map(String::from).to_vec();

    let outcome = engine
        .search("q", &items, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(names(&outcome), vec!["b-item", "a-item", "c-item"]);
}

#[tokio::test]
async fn test_max_results_truncates() {
    let (_, engine) = engine_with(
        catalog_provider(),
        SearchConfig::default().with_max_results(Some(1)),
    );

    let outcome = engine
        .search("mobi", &catalog(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(names(&outcome), vec!["Mobile Phone"]);
    assert_eq!(engine.similarity_score(&"Smartphone".to_string()), 0.0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let (provider, engine) = engine_with(catalog_provider(), SearchConfig::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = engine.search("phone", &catalog(), &cancel).await.unwrap();
    assert_eq!(outcome.status, SearchStatus::Cancelled);
    assert!(outcome.is_empty());
    assert_eq!(provider.call_count(), 0);
    assert_eq!(engine.last_error(), None);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_search_keeps_partial_results() {
    let provider = catalog_provider().with_latency(Duration::from_millis(10));
    let (_, engine) = engine_with(provider, SearchConfig::default().with_item_concurrency(1));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(35)).await;
        trigger.cancel();
    });

    // Query at 10ms, then one item every 10ms: the third item is in flight at 35ms.
    let outcome = engine.search("phone", &catalog(), &cancel).await.unwrap();

    assert_eq!(outcome.status, SearchStatus::Cancelled);
    assert_eq!(names(&outcome), vec!["Mobile Phone", "Smartphone"]);
    assert!(!engine.cache().contains(&EmbeddingKey::Item("Laptop".into())));
}

#[tokio::test(start_paused = true)]
async fn test_search_latest_supersedes_previous() {
    let provider = catalog_provider().with_latency(Duration::from_millis(10));
    let (_, engine) = engine_with(provider, SearchConfig::default());
    let items = catalog();

    let (first, second) = tokio::join!(engine.search_latest("phone", &items), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        engine.search_latest("laptop", &items).await
    });

    assert_eq!(first.unwrap().status, SearchStatus::Cancelled);
    let second = second.unwrap();
    assert_eq!(second.status, SearchStatus::Completed);
    assert_eq!(names(&second)[0], "Laptop");
}

#[tokio::test(start_paused = true)]
async fn test_periodic_cleanup_drops_expired_entries() {
    let config = SearchConfig::default()
        .with_cache_ttl(Duration::from_secs(60))
        .with_cleanup_interval(Duration::from_secs(300));
    let (_, engine) = engine_with(catalog_provider(), config);
    let cancel = CancellationToken::new();

    engine.search("phone", &catalog(), &cancel).await.unwrap();
    assert_eq!(engine.cache_len(), 5);

    tokio::time::advance(Duration::from_secs(301)).await;
    engine.search("laptop", &[], &cancel).await.unwrap();

    assert_eq!(engine.cache_len(), 1);
    assert!(engine.cache().contains(&EmbeddingKey::Query("laptop".into())));
}

#[tokio::test]
async fn test_prewarm_fills_cache_and_reports_progress() {
    let (provider, engine) = engine_with(
        catalog_provider(),
        SearchConfig::default().with_prewarm_batch_size(2),
    );
    let mut items = catalog();
    items.push("Tablet".to_string());
    let seen = Mutex::new(Vec::new());

    let report = engine
        .prewarm(&items, &CancellationToken::new(), |p| seen.lock().push(p))
        .await;

    assert_eq!(report.total, 5);
    assert_eq!(report.embedded, 5);
    assert_eq!(report.failed, 0);
    assert!(!report.cancelled);
    assert_eq!(provider.call_count(), 3);
    assert_eq!(engine.cache_len(), 5);

    let seen = seen.lock().clone();
    assert_eq!(seen.len(), 3);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(seen.last().copied(), Some(100.0));

    let again = engine
        .prewarm(&items, &CancellationToken::new(), |_| {})
        .await;
    assert_eq!(again.already_cached, 5);
    assert_eq!(again.embedded, 0);
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_prewarm_retries_failed_batch_per_item() {
    let provider = catalog_provider().with_failure("Laptop");
    let (provider, engine) = engine_with(
        provider,
        SearchConfig::default().with_prewarm_batch_size(4),
    );

    let report = engine
        .prewarm(&catalog(), &CancellationToken::new(), |_| {})
        .await;

    assert_eq!(report.embedded, 3);
    assert_eq!(report.failed, 1);
    // One batch call plus one retry per item.
    assert_eq!(provider.call_count(), 5);
    assert!(!engine.cache().contains(&EmbeddingKey::Item("Laptop".into())));
}

#[tokio::test]
async fn test_prewarm_does_not_cache_empty_embeddings() {
    let provider = catalog_provider().with_vector("Hollow", Vec::new());
    let (_, engine) = engine_with(provider, SearchConfig::default());
    let items = vec!["Laptop".to_string(), "Hollow".to_string()];

    let report = engine.prewarm(&items, &CancellationToken::new(), |_| {}).await;

    assert_eq!(report.embedded, 1);
    assert_eq!(report.failed, 1);
    assert!(engine.cache().contains(&EmbeddingKey::Item("Laptop".to_string())));
    assert!(!engine.cache().contains(&EmbeddingKey::Item("Hollow".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_prewarm_counts_rate_limited_batches_as_failed() {
    let config = SearchConfig::default()
        .with_prewarm_batch_size(2)
        .with_max_requests_per_minute(Some(1));
    let (provider, engine) = engine_with(catalog_provider(), config);

    let report = engine
        .prewarm(&catalog(), &CancellationToken::new(), |_| {})
        .await;

    assert_eq!(report.embedded, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_prewarm_cancelled() {
    let (provider, engine) = engine_with(catalog_provider(), SearchConfig::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = engine.prewarm(&catalog(), &cancel, |_| {}).await;
    assert!(report.cancelled);
    assert_eq!(report.embedded, 0);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_prewarm_empty_input_reports_done() {
    let (_, engine) = engine_with(catalog_provider(), SearchConfig::default());
    let seen = Mutex::new(Vec::new());

    let report = engine
        .prewarm(&[], &CancellationToken::new(), |p| seen.lock().push(p))
        .await;

    assert_eq!(report, PrewarmReport::default());
    assert_eq!(*seen.lock(), vec![100.0]);
}

#[test]
fn test_invalid_config_rejected() {
    let result = SemanticSearchEngine::new(
        Arc::new(MockEmbeddingProvider::new()),
        ItemAccessors::identity(),
        SearchConfig::default().with_item_concurrency(0),
    );
    assert!(matches!(result, Err(SearchError::InvalidConfig(_))));
}

#[test]
fn test_status_messages() {
    let limited = SearchStatus::RateLimited {
        retry_after: Duration::from_millis(1500),
    };
    assert_eq!(
        limited.message().as_deref(),
        Some("rate limited, retry after 1.5s")
    );
    assert_eq!(SearchStatus::Completed.message(), None);
    assert_eq!(SearchStatus::Cancelled.message(), None);
}
