//! Deterministic feature-hashing embedder.
//!
//! No model and no network: words, word bigrams and character trigrams are hashed with
//! BLAKE3 into a fixed number of signed buckets, then L2-normalized. Texts sharing words or
//! word fragments land close together, which is enough for offline use, demos and tests.

use async_trait::async_trait;

use super::error::EmbeddingError;
use super::provider::EmbeddingProvider;
use super::vector::{EmbeddingVector, l2_normalize};

pub const DEFAULT_HASH_DIM: usize = 256;

/// Buckets touched per feature.
const PROBES_PER_FEATURE: usize = 4;

const WORD_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;
const TRIGRAM_WEIGHT: f32 = 0.35;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dim: DEFAULT_HASH_DIM,
        }
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self, EmbeddingError> {
        if dim == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "hash embedder dimension must be greater than 0".to_string(),
            });
        }
        Ok(Self { dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embeds one text. Text without any word characters maps to the zero vector.
    pub fn embed(&self, text: &str) -> EmbeddingVector {
        let mut values = vec![0.0f32; self.dim];
        let words = tokenize(text);

        for word in &words {
            self.accumulate(&mut values, b'w', word, WORD_WEIGHT);

            let padded: Vec<char> = format!("^{}$", word).chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.accumulate(&mut values, b't', &gram, TRIGRAM_WEIGHT);
            }
        }

        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut values, b'b', &bigram, BIGRAM_WEIGHT);
        }

        l2_normalize(&mut values);
        EmbeddingVector::new(values)
    }

    fn accumulate(&self, values: &mut [f32], kind: u8, feature: &str, weight: f32) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[kind]);
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();

        for probe in bytes.chunks_exact(8).take(PROBES_PER_FEATURE) {
            let mut word = [0u8; 8];
            word.copy_from_slice(probe);
            let bits = u64::from_le_bytes(word);
            let bucket = ((bits >> 1) % self.dim as u64) as usize;
            let sign = if bits & 1 == 0 { weight } else { -weight };
            values[bucket] += sign;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn generate(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    fn name(&self) -> &str {
        "hash"
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}
