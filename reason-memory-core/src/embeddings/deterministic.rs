//! Deterministic, hash-based stand-in for a real neural embedder.
//!
//! **This is not semantically meaningful.** It is fast, pure, and
//! deterministic, which is all the contract in spec §4.4 requires of it, and
//! all that this exercise's tests need. A real embedding model is a drop-in
//! replacement behind [`crate::embeddings::EmbeddingProvider`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::constants::EMBEDDING_DIM;
use crate::error::Result;

use super::EmbeddingProvider;

/// Hash-based embedder, cold-loaded once via [`DeterministicEmbedder::global`].
pub struct DeterministicEmbedder {
    model_id: String,
}

impl DeterministicEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            model_id: "deterministic-384".to_string(),
        }
    }

    /// Process-wide lazily-initialized instance, matching the "loaded lazily
    /// on first use" contract in spec §4.4.
    pub fn global() -> &'static DeterministicEmbedder {
        static INSTANCE: OnceLock<DeterministicEmbedder> = OnceLock::new();
        INSTANCE.get_or_init(DeterministicEmbedder::new)
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for DeterministicEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(text_to_embedding(text))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Deterministic hash-of-shingles embedding, unit-normalized.
///
/// Each dimension is seeded by mixing the dimension index into a shingle
/// hash, so nearby texts sharing shingles land closer together under cosine
/// similarity than two unrelated texts — enough structure for composite
/// scoring and retrieval tests to be meaningful without a real model.
#[must_use]
pub fn text_to_embedding(text: &str) -> Vec<f32> {
    let normalized = text.to_lowercase();
    let shingles: Vec<&str> = normalized.split_whitespace().collect();
    let mut vector = vec![0.0f32; EMBEDDING_DIM];

    if shingles.is_empty() {
        return vector;
    }

    for shingle in &shingles {
        for (dim, slot) in vector.iter_mut().enumerate() {
            let mut hasher = DefaultHasher::new();
            dim.hash(&mut hasher);
            shingle.hash(&mut hasher);
            let h = hasher.finish();
            // Map the hash into [-1, 1] and accumulate.
            let signed = ((h % 2000) as f32 - 1000.0) / 1000.0;
            *slot += signed;
        }
    }

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    #[test]
    fn same_text_yields_same_embedding() {
        let a = text_to_embedding("fetch a url with a timeout");
        let b = text_to_embedding("fetch a url with a timeout");
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_has_expected_dimension() {
        assert_eq!(text_to_embedding("anything").len(), EMBEDDING_DIM);
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        assert_eq!(text_to_embedding(""), vec![0.0f32; EMBEDDING_DIM]);
    }

    #[test]
    fn shared_shingles_are_more_similar_than_unrelated_text() {
        let a = text_to_embedding("fetch a url with a 5 second timeout");
        let b = text_to_embedding("fetch a url with a timeout of five seconds");
        let c = text_to_embedding("bake a loaf of sourdough bread");
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }
}
