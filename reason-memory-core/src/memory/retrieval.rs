//! Composite-scored retrieval (spec §4.5.1).

use chrono::Utc;

use crate::constants::{
    CANDIDATE_MULTIPLIER, ERROR_CONTEXT_BOOST, EVOLUTION_BONUS_CAP, EVOLUTION_BONUS_PER_STAGE,
    RECENCY_WINDOW_DAYS, WEIGHT_BOOST, WEIGHT_RECENCY, WEIGHT_RELEVANCE,
};
use crate::error::Result;
use crate::storage::{SimilarityFilters, SimilarityMetric, StorageBackend};
use crate::types::{ScoredMemory, WorkspaceId};

/// Parameters for a single retrieval call.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    pub k: usize,
    pub include_failures: bool,
    pub domain_filter: Option<String>,
    pub pattern_tags: Option<Vec<String>>,
    pub min_score: f64,
    pub boost_error_warnings: bool,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            k: 5,
            include_failures: true,
            domain_filter: None,
            pattern_tags: None,
            min_score: 0.0,
            boost_error_warnings: true,
        }
    }
}

/// Output of a retrieval call: memories in descending composite-score order.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub memories: Vec<ScoredMemory>,
}

fn relevance_from_distance(distance: f32, metric: SimilarityMetric) -> f64 {
    let similarity = match metric {
        SimilarityMetric::L2Reciprocal => 1.0 / (1.0 + distance.max(0.0)),
        SimilarityMetric::CosineComplement => (1.0 - distance).clamp(0.0, 1.0),
    };
    f64::from(similarity.clamp(0.0, 1.0))
}

fn recency_score(created_at: chrono::DateTime<Utc>) -> f64 {
    let age_days = (Utc::now() - created_at).num_seconds() as f64 / 86_400.0;
    (1.0 - age_days / RECENCY_WINDOW_DAYS).max(0.0)
}

fn composite_score(
    relevance: f64,
    recency: f64,
    has_error_context: bool,
    evolution_stage: u32,
    boost_error_warnings: bool,
) -> f64 {
    let error_boost = if has_error_context && boost_error_warnings {
        ERROR_CONTEXT_BOOST
    } else {
        0.0
    };
    let evolution_bonus =
        (EVOLUTION_BONUS_PER_STAGE * f64::from(evolution_stage)).min(EVOLUTION_BONUS_CAP);
    let score = WEIGHT_RELEVANCE * relevance
        + WEIGHT_RECENCY * recency
        + WEIGHT_BOOST * (error_boost + evolution_bonus);
    score.clamp(0.0, 1.0)
}

/// Runs the full composite-scored retrieval pipeline described in spec
/// §4.5.1: over-fetch `3k` candidates, score each, filter by `min_score`,
/// sort descending with a deterministic tie-break, and truncate to `k`.
pub async fn retrieve(
    storage: &dyn StorageBackend,
    task: &str,
    params: RetrievalParams,
    workspace: Option<&WorkspaceId>,
) -> Result<RetrievalResult> {
    let filters = SimilarityFilters {
        include_failures: params.include_failures,
        domain_filter: params.domain_filter.clone(),
        pattern_tags: params.pattern_tags.clone(),
        min_similarity: None,
    };

    let candidates = storage
        .query_similar_memories(task, params.k * CANDIDATE_MULTIPLIER, &filters, workspace)
        .await?;

    let metric = storage.similarity_metric();

    let mut scored: Vec<ScoredMemory> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let embedding_dim_ok = candidate
                .memory
                .content_embedding
                .as_ref()
                .map(|e| e.len() == crate::constants::EMBEDDING_DIM)
                .unwrap_or(false);
            if !embedding_dim_ok {
                // Spec §3 invariant: missing/wrong-dim embedding is excluded.
                return None;
            }
            let relevance = relevance_from_distance(candidate.distance, metric);
            let recency = recency_score(candidate.memory.created_at);
            let score = composite_score(
                relevance,
                recency,
                candidate.memory.is_error_learning(),
                candidate.memory.evolution_stage,
                params.boost_error_warnings,
            );
            Some(ScoredMemory {
                memory: candidate.memory,
                score,
                relevance,
                recency,
            })
        })
        .filter(|scored| scored.score >= params.min_score)
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
            .then_with(|| a.memory.id.cmp(&b.memory.id))
    });
    scored.truncate(params.k);

    Ok(RetrievalResult { memories: scored })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_context_boost_increases_score() {
        let base = composite_score(0.8, 0.5, false, 0, true);
        let boosted = composite_score(0.8, 0.5, true, 0, true);
        assert!(boosted > base);
    }

    #[test]
    fn boost_is_disabled_when_flag_is_false() {
        let with_flag_off = composite_score(0.8, 0.5, true, 0, false);
        let no_error = composite_score(0.8, 0.5, false, 0, false);
        assert!((with_flag_off - no_error).abs() < 1e-12);
    }

    #[test]
    fn evolution_bonus_is_capped() {
        let at_cap = composite_score(0.5, 0.5, false, 5, true);
        let beyond_cap = composite_score(0.5, 0.5, false, 50, true);
        assert!((at_cap - beyond_cap).abs() < 1e-12);
    }

    #[test]
    fn score_is_always_clamped_to_unit_interval() {
        let score = composite_score(1.0, 1.0, true, 100, true);
        assert!(score <= 1.0);
        assert!(score >= 0.0);
    }

    #[test]
    fn recency_decays_to_zero_past_window() {
        let old = Utc::now() - chrono::Duration::days(60);
        assert_eq!(recency_score(old), 0.0);
    }

    #[test]
    fn l2_reciprocal_relevance_is_bounded() {
        let r = relevance_from_distance(0.0, SimilarityMetric::L2Reciprocal);
        assert!((r - 1.0).abs() < 1e-9);
        let r2 = relevance_from_distance(1.0, SimilarityMetric::L2Reciprocal);
        assert!((r2 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn cosine_complement_relevance_is_bounded() {
        let r = relevance_from_distance(0.0, SimilarityMetric::CosineComplement);
        assert!((r - 1.0).abs() < 1e-9);
        let r2 = relevance_from_distance(1.5, SimilarityMetric::CosineComplement);
        assert_eq!(r2, 0.0);
    }
}
