//! Embedding providers and vector math.
//!
//! - [`EmbeddingProvider`] is the capability the search engine consumes.
//! - [`OpenAiEmbeddingProvider`] talks to an OpenAI-compatible HTTP endpoint.
//! - [`HashEmbedder`] is a deterministic offline provider.
//! - [`EmbeddingVector`] and [`cosine_similarity`] do the scoring.

mod error;
/// Feature-hashing embedder (no model files).
pub mod hashed;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
/// OpenAI-compatible HTTP provider.
pub mod openai;
mod provider;
/// Embedding vector type and similarity kernels.
pub mod vector;

pub use error::EmbeddingError;
pub use hashed::{DEFAULT_HASH_DIM, HashEmbedder};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingProvider;
pub use openai::{OpenAiConfig, OpenAiEmbeddingProvider};
pub use provider::EmbeddingProvider;
pub use vector::{EmbeddingVector, cosine_similarity, l2_normalize};
