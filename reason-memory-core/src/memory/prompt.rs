//! Prompt rendering of retrieved memories (spec §4.5.2).
//!
//! Renders a ranked [`ScoredMemory`] list into a single block suitable for
//! splicing into a GENERATE prompt, truncating from the tail (lowest-ranked
//! memories first) to respect a token budget approximated via
//! [`crate::constants::APPROX_CHARS_PER_TOKEN`] (spec §9 Open Question 4).

use crate::constants::APPROX_CHARS_PER_TOKEN;
use crate::types::ScoredMemory;

const WARNING_MARKER: &str = "⚠ LEARNED FROM A PAST FAILURE";

fn render_one(rank: usize, scored: &ScoredMemory) -> String {
    let memory = &scored.memory;
    let mut block = String::new();
    block.push_str(&format!("[{rank}] {}\n", memory.title));
    if let Some(err) = &memory.error_context {
        block.push_str(&format!("{WARNING_MARKER}\n"));
        block.push_str(&format!("error_type: {}\n", err.error_type));
        block.push_str(&format!("failure_pattern: {}\n", err.failure_pattern));
        block.push_str(&format!(
            "corrective_guidance: {}\n",
            err.corrective_guidance
        ));
    }
    block.push_str(&format!("description: {}\n", memory.description));
    block.push_str(&format!("content: {}\n", memory.content));
    block
}

/// Renders `memories` (already in descending rank order) into a prompt
/// block, dropping lowest-ranked entries from the tail until the rendered
/// text fits within `token_budget` (approximated as
/// `chars / APPROX_CHARS_PER_TOKEN`).
#[must_use]
pub fn render(memories: &[ScoredMemory], token_budget: usize) -> String {
    if memories.is_empty() {
        return String::new();
    }

    let char_budget = token_budget.saturating_mul(APPROX_CHARS_PER_TOKEN);
    let mut blocks: Vec<String> = memories
        .iter()
        .enumerate()
        .map(|(i, m)| render_one(i + 1, m))
        .collect();

    loop {
        let joined = blocks.join("\n");
        if joined.chars().count() <= char_budget || blocks.len() <= 1 {
            return joined;
        }
        blocks.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DifficultyLevel, ErrorContext, MemoryItem};
    use chrono::Utc;
    use uuid::Uuid;

    fn scored(title: &str, error: bool) -> ScoredMemory {
        MemoryItem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "a description long enough to pass validation".to_string(),
            content: "some content that is definitely at least twenty chars".to_string(),
            error_context: error.then(|| ErrorContext {
                error_type: "TimeoutError".to_string(),
                failure_pattern: "no timeout set".to_string(),
                corrective_guidance: "always pass timeout=5".to_string(),
            }),
            pattern_tags: vec![],
            difficulty_level: DifficultyLevel::Simple,
            domain_category: "networking".to_string(),
            parent_memory_id: None,
            derived_from: vec![],
            evolution_stage: 0,
            workspace_id: "ws".to_string(),
            created_at: Utc::now(),
            content_embedding: None,
        }
        .into()
    }

    impl From<MemoryItem> for ScoredMemory {
        fn from(memory: MemoryItem) -> Self {
            ScoredMemory {
                memory,
                score: 0.9,
                relevance: 0.9,
                recency: 0.9,
            }
        }
    }

    #[test]
    fn empty_input_renders_empty_string() {
        assert_eq!(render(&[], 500), "");
    }

    #[test]
    fn error_memory_includes_warning_marker() {
        let rendered = render(&[scored("fix", true)], 500);
        assert!(rendered.contains(WARNING_MARKER));
        assert!(rendered.contains("TimeoutError"));
    }

    #[test]
    fn non_error_memory_has_no_warning_marker() {
        let rendered = render(&[scored("fix", false)], 500);
        assert!(!rendered.contains(WARNING_MARKER));
    }

    #[test]
    fn truncates_lowest_ranked_memories_first_under_tight_budget() {
        let memories = vec![scored("first", false), scored("second", false)];
        let rendered = render(&memories, 10);
        assert!(rendered.contains("first"));
        assert!(!rendered.contains("second"));
    }

    #[test]
    fn always_keeps_at_least_one_memory() {
        let memories = vec![scored("only", false)];
        let rendered = render(&memories, 1);
        assert!(rendered.contains("only"));
    }
}
