use async_trait::async_trait;

use super::error::EmbeddingError;
use super::vector::EmbeddingVector;

/// A source of embeddings (remote API, local model, test double).
///
/// Providers are treated as untrusted and costly: callers cache results, rate limit
/// requests and redact error text before showing it to anyone.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `texts`, returning one vector per input in the same order.
    ///
    /// An empty input yields an empty output without contacting the backend.
    async fn generate(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError>;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Embeds a single text.
    async fn generate_one(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let mut vectors = self.generate(&[text.to_string()]).await?;
        ensure_count(1, vectors.len())?;
        Ok(vectors.swap_remove(0))
    }
}

/// Checks that a provider answered with one vector per input.
pub(crate) fn ensure_count(expected: usize, actual: usize) -> Result<(), EmbeddingError> {
    if expected != actual {
        return Err(EmbeddingError::malformed(format!(
            "expected {} embeddings, got {}",
            expected, actual
        )));
    }
    Ok(())
}
