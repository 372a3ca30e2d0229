//! Shared statistics aggregation (spec §4.5.6).
//!
//! Both storage adapters compute [`crate::types::Statistics`] over their own
//! persisted traces/memories; this module is the single aggregate-counter
//! implementation they share, so the histogram and ratio logic isn't
//! duplicated per backend (mirrors the teacher's `learning/stats.rs`
//! aggregate-counter shape).

use crate::types::{MemoryItem, Outcome, ReasoningTrace, Statistics};

/// Computes [`Statistics`] from the full set of traces and memories. Callers
/// (storage adapters) are responsible for pre-filtering by workspace.
#[must_use]
pub fn compute_statistics(traces: &[ReasoningTrace], memories: &[MemoryItem]) -> Statistics {
    let mut stats = Statistics {
        trace_count: traces.len() as u64,
        memory_count: memories.len() as u64,
        ..Statistics::default()
    };

    for trace in traces {
        match trace.outcome {
            Outcome::Success => stats.success_count += 1,
            Outcome::Failure => stats.failure_count += 1,
            Outcome::Partial => stats.partial_count += 1,
        }
    }

    if stats.trace_count > 0 {
        stats.success_rate = stats.success_count as f64 / stats.trace_count as f64;
    }

    let error_memories = memories.iter().filter(|m| m.is_error_learning()).count();
    if stats.memory_count > 0 {
        stats.memories_with_error_ratio = error_memories as f64 / stats.memory_count as f64;
    }

    for memory in memories {
        for tag in &memory.pattern_tags {
            *stats.pattern_tag_histogram.entry(tag.clone()).or_insert(0) += 1;
        }
        *stats
            .domain_histogram
            .entry(memory.domain_category.clone())
            .or_insert(0) += 1;
        *stats
            .difficulty_histogram
            .entry(format!("{:?}", memory.difficulty_level).to_lowercase())
            .or_insert(0) += 1;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DifficultyLevel, ErrorContext, TraceMetadata, TrajectoryStep, StepAction};
    use chrono::Utc;
    use uuid::Uuid;

    fn trace(outcome: Outcome) -> ReasoningTrace {
        ReasoningTrace {
            id: Uuid::new_v4(),
            task: "task".to_string(),
            trajectory: vec![TrajectoryStep::new(
                0,
                "thought".to_string(),
                StepAction::Generate,
                "output".to_string(),
            )],
            outcome,
            memory_items: vec![],
            parent_trace_id: None,
            task_embedding: None,
            workspace_id: "ws".to_string(),
            timestamp: Utc::now(),
            metadata: TraceMetadata::default(),
        }
    }

    fn memory(error: bool, tags: Vec<&str>) -> MemoryItem {
        MemoryItem {
            id: Uuid::new_v4(),
            title: "a sufficiently long title".to_string(),
            description: "a sufficiently long description field".to_string(),
            content: "content that is definitely at least twenty characters long".to_string(),
            error_context: error.then(|| ErrorContext {
                error_type: "E".to_string(),
                failure_pattern: "P".to_string(),
                corrective_guidance: "G".to_string(),
            }),
            pattern_tags: tags.into_iter().map(str::to_string).collect(),
            difficulty_level: DifficultyLevel::Moderate,
            domain_category: "networking".to_string(),
            parent_memory_id: None,
            derived_from: vec![],
            evolution_stage: 0,
            workspace_id: "ws".to_string(),
            created_at: Utc::now(),
            content_embedding: None,
        }
    }

    #[test]
    fn counts_outcomes_correctly() {
        let traces = vec![
            trace(Outcome::Success),
            trace(Outcome::Success),
            trace(Outcome::Failure),
        ];
        let stats = compute_statistics(&traces, &[]);
        assert_eq!(stats.trace_count, 3);
        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.failure_count, 1);
        assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_has_zero_rates_not_nan() {
        let stats = compute_statistics(&[], &[]);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.memories_with_error_ratio, 0.0);
    }

    #[test]
    fn builds_pattern_tag_histogram() {
        let memories = vec![memory(false, vec!["http", "retry"]), memory(false, vec!["http"])];
        let stats = compute_statistics(&[], &memories);
        assert_eq!(stats.pattern_tag_histogram.get("http"), Some(&2));
        assert_eq!(stats.pattern_tag_histogram.get("retry"), Some(&1));
    }

    #[test]
    fn computes_error_ratio() {
        let memories = vec![memory(true, vec![]), memory(false, vec![])];
        let stats = compute_statistics(&[], &memories);
        assert!((stats.memories_with_error_ratio - 0.5).abs() < 1e-9);
    }
}
