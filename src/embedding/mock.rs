//! Scriptable provider for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::EmbeddingError;
use super::hashed::HashEmbedder;
use super::provider::EmbeddingProvider;
use super::vector::EmbeddingVector;

/// Returns scripted vectors per text and falls back to a [`HashEmbedder`] for the rest.
///
/// A batch containing a failing text fails as a whole, like a real API call would.
pub struct MockEmbeddingProvider {
    vectors: HashMap<String, Vec<f32>>,
    failing_texts: HashSet<String>,
    fail_all: Option<String>,
    latency: Option<Duration>,
    fallback: HashEmbedder,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            failing_texts: HashSet::new(),
            fail_all: None,
            latency: None,
            fallback: HashEmbedder::default(),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Scripts the vector returned for `text`.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Makes any batch containing `text` fail.
    pub fn with_failure(mut self, text: impl Into<String>) -> Self {
        self.failing_texts.insert(text.into());
        self
    }

    /// Makes every call fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_all = Some(message.into());
        self
    }

    /// Delays every call (honors a paused tokio clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `generate` calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text requested so far, in request order.
    pub fn requested_texts(&self) -> Vec<String> {
        self.requested.lock().clone()
    }

    /// How many times `text` was sent to the provider.
    pub fn times_requested(&self, text: &str) -> usize {
        self.requested.lock().iter().filter(|t| *t == text).count()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn generate(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().extend(texts.iter().cloned());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = &self.fail_all {
            return Err(EmbeddingError::Provider {
                status: Some(500),
                message: message.clone(),
            });
        }

        if let Some(bad) = texts.iter().find(|t| self.failing_texts.contains(*t)) {
            return Err(EmbeddingError::Provider {
                status: None,
                message: format!("mock failure for '{}'", bad),
            });
        }

        Ok(texts
            .iter()
            .map(|text| match self.vectors.get(text) {
                Some(values) => EmbeddingVector::new(values.clone()),
                None => self.fallback.embed(text),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
