//! Embedding vector type and similarity math.

use std::sync::Arc;

/// Accumulator width for the similarity kernels. Eight independent lanes let the
/// compiler map the inner loop onto 256-bit SIMD registers.
const LANES: usize = 8;

/// Immutable embedding; clones share the underlying buffer.
#[derive(Clone, PartialEq)]
pub struct EmbeddingVector(Arc<[f32]>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into())
    }

    /// Number of components.
    #[inline]
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Cosine similarity against another embedding (see [`cosine_similarity`]).
    #[inline]
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> f32 {
        cosine_similarity(&self.0, &other.0)
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl std::fmt::Debug for EmbeddingVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let preview: Vec<f32> = self.0.iter().take(4).copied().collect();
        f.debug_struct("EmbeddingVector")
            .field("dim", &self.dim())
            .field("head", &preview)
            .finish()
    }
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns `0.0` when the lengths differ, either vector is empty, or either norm is zero.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = [0.0f32; LANES];
    let mut norm_a = [0.0f32; LANES];
    let mut norm_b = [0.0f32; LANES];

    let chunks_a = a.chunks_exact(LANES);
    let chunks_b = b.chunks_exact(LANES);
    let tail_a = chunks_a.remainder();
    let tail_b = chunks_b.remainder();

    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..LANES {
            dot[lane] += ca[lane] * cb[lane];
            norm_a[lane] += ca[lane] * ca[lane];
            norm_b[lane] += cb[lane] * cb[lane];
        }
    }

    let mut dot: f32 = dot.iter().sum();
    let mut norm_a_sq: f32 = norm_a.iter().sum();
    let mut norm_b_sq: f32 = norm_b.iter().sum();

    for (&av, &bv) in tail_a.iter().zip(tail_b.iter()) {
        dot += av * bv;
        norm_a_sq += av * av;
        norm_b_sq += bv * bv;
    }

    let norm_a = norm_a_sq.sqrt();
    let norm_b = norm_b_sq.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Scales `values` to unit length in place (no-op for the zero vector).
pub fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}
