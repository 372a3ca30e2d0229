//! Embedding function: `encode(text) → ℝ^384`, deterministic, cold-loaded once.
//!
//! The concrete embedding model is an external collaborator (spec §1); this
//! module defines the trait seam and ships a deterministic stand-in
//! (mirroring the teacher's hash-based pseudo-embedding module) so the rest
//! of the system — and every test — has something pure and cheap to call.

mod deterministic;

pub use deterministic::DeterministicEmbedder;

use crate::error::Result;

/// A pure, deterministic `text → ℝ^d` mapping.
///
/// Implementations MUST be deterministic: the same input text always
/// produces the same vector. Callers do not cache embeddings explicitly —
/// the cost of calling this on every store/query is assumed to be
/// acceptable, per spec §4.4.
pub trait EmbeddingProvider: Send + Sync {
    /// Encode `text` into a vector of [`crate::constants::EMBEDDING_DIM`] dimensions.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier used in error messages and metadata (e.g. `"deterministic-384"`).
    fn model_id(&self) -> &str;
}

/// Cosine similarity between two equal-length vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty or mismatched-length inputs, or when either
/// vector has zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Cosine similarity rescaled from `[-1, 1]` into the `[0, 1]` range that the
/// storage contract requires adapters to return.
#[must_use]
pub fn cosine_similarity_unit(a: &[f32], b: &[f32]) -> f32 {
    (cosine_similarity(a, b) + 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![0.3, 0.1, 0.9];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn mismatched_length_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }
}
