//! Memory extraction from a judged trajectory (spec §4.5.4).
//!
//! Turns a [`JudgeVerdict`]'s `learnings` into 1-3 validated [`MemoryItem`]s.
//! For failure/partial outcomes at least one extracted item carries an
//! `error_context`; per the resolved "zero extracted learnings" open
//! question, a trajectory judged `partial` with no learnings and no error
//! context yields an empty list rather than a synthesized placeholder, and
//! that is logged at `debug` rather than treated as an error. `failure` gets
//! no such exemption (spec §3: `outcome = failure` ⇒ at least one extracted
//! item has `error_context` populated) — with no learnings and no
//! pre-existing error context, one is synthesized from the verdict's own
//! `reasoning`.

use chrono::Utc;
use uuid::Uuid;

use crate::constants::EMBEDDING_DIM;
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::memory::judge::JudgeVerdict;
use crate::types::{DifficultyLevel, ErrorContext, MemoryId, MemoryItem, Outcome, WorkspaceId};

const MAX_EXTRACTED: usize = 3;

fn derive_title(learning: &str) -> String {
    let words: Vec<&str> = learning.split_whitespace().take(12).collect();
    let mut title = words.join(" ");
    if title.chars().count() < 5 {
        title = format!("Learning: {title}");
    }
    if title.chars().count() > 200 {
        title = title.chars().take(197).collect::<String>() + "...";
    }
    title
}

fn derive_description(learning: &str) -> String {
    let mut description = learning.trim().to_string();
    if description.chars().count() < 10 {
        description = format!("Observation recorded during reasoning: {description}");
    }
    if description.chars().count() > 500 {
        description = description.chars().take(497).collect::<String>() + "...";
    }
    description
}

fn derive_content(learning: &str, task: &str) -> String {
    let mut content = format!("Context: {task}\nLearning: {learning}");
    if content.chars().count() < 20 {
        content.push_str("\n(no further detail provided by the judge)");
    }
    content
}

/// Parameters controlling how extracted items are seeded for genealogy.
pub struct ExtractionContext<'a> {
    pub task: &'a str,
    pub workspace_id: &'a WorkspaceId,
    pub domain_category: &'a str,
    /// Top retrieved memory from this trajectory's GENERATE step, if any —
    /// its id becomes `parent_memory_id` and seeds `derived_from` and
    /// `evolution_stage` for the first extracted item (spec §4.5.4, §4.5.5).
    pub parent_candidate: Option<(MemoryId, u32)>,
}

/// Extracts up to [`MAX_EXTRACTED`] memory items from a judge verdict.
pub fn extract(
    verdict: &JudgeVerdict,
    context: &ExtractionContext<'_>,
    embedder: &dyn EmbeddingProvider,
) -> Result<Vec<MemoryItem>> {
    let needs_error_context = matches!(verdict.verdict, Outcome::Failure | Outcome::Partial);

    if verdict.learnings.is_empty()
        && verdict.error_context.is_none()
        && !matches!(verdict.verdict, Outcome::Failure)
    {
        tracing::debug!(
            outcome = %verdict.verdict,
            "judge verdict produced no learnings and no error context; extracting zero memories"
        );
        return Ok(Vec::new());
    }

    let mut items = Vec::new();

    for (index, learning) in verdict.learnings.iter().take(MAX_EXTRACTED).enumerate() {
        let attach_error_context = needs_error_context && index == 0;
        let error_context = if attach_error_context {
            verdict.error_context.clone().or_else(|| {
                Some(ErrorContext {
                    error_type: format!("{}", verdict.verdict),
                    failure_pattern: verdict.reasoning.clone(),
                    corrective_guidance: learning.clone(),
                })
            })
        } else {
            None
        };

        let content = derive_content(learning, context.task);
        let embedding = embedder.embed(&content)?;
        debug_assert_eq!(embedding.len(), EMBEDDING_DIM);

        let (parent_memory_id, derived_from, evolution_stage) = if index == 0 {
            match context.parent_candidate {
                Some((parent_id, parent_stage)) => {
                    (Some(parent_id), vec![parent_id], parent_stage + 1)
                }
                None => (None, Vec::new(), 0),
            }
        } else {
            (None, Vec::new(), 0)
        };

        let item = MemoryItem {
            id: Uuid::new_v4(),
            title: derive_title(learning),
            description: derive_description(learning),
            content,
            error_context,
            pattern_tags: Vec::new(),
            difficulty_level: DifficultyLevel::Moderate,
            domain_category: context.domain_category.to_string(),
            parent_memory_id,
            derived_from,
            evolution_stage,
            workspace_id: context.workspace_id.clone(),
            created_at: Utc::now(),
            content_embedding: Some(embedding),
        };
        item.validate()?;
        items.push(item);
    }

    // If the outcome demands an error context but no learning carried one
    // (e.g. a failure with a non-empty `reasoning` but no `learnings`),
    // synthesize a single error-context item from the verdict's own fields.
    // `failure` has no pre-existing `error_context` to fall back on in this
    // branch either (that case is covered above), so one is built from the
    // verdict's `reasoning` alone.
    if needs_error_context && items.is_empty() {
        let error_context = verdict.error_context.clone().unwrap_or_else(|| ErrorContext {
            error_type: format!("{}", verdict.verdict),
            failure_pattern: verdict.reasoning.clone(),
            corrective_guidance: "no specific learning was extracted; rerun with more detailed judge feedback"
                .to_string(),
        });
        let content = derive_content(&error_context.corrective_guidance, context.task);
        let embedding = embedder.embed(&content)?;
        let item = MemoryItem {
            id: Uuid::new_v4(),
            title: derive_title(&error_context.failure_pattern),
            description: derive_description(&verdict.reasoning),
            content,
            error_context: Some(error_context),
            pattern_tags: Vec::new(),
            difficulty_level: DifficultyLevel::Moderate,
            domain_category: context.domain_category.to_string(),
            parent_memory_id: context.parent_candidate.map(|(id, _)| id),
            derived_from: context
                .parent_candidate
                .map(|(id, _)| vec![id])
                .unwrap_or_default(),
            evolution_stage: context
                .parent_candidate
                .map(|(_, stage)| stage + 1)
                .unwrap_or(0),
            workspace_id: context.workspace_id.clone(),
            created_at: Utc::now(),
            content_embedding: Some(embedding),
        };
        item.validate()?;
        items.push(item);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::DeterministicEmbedder;

    fn verdict(outcome: Outcome, learnings: Vec<&str>) -> JudgeVerdict {
        JudgeVerdict {
            verdict: outcome,
            score: 0.5,
            reasoning: "timed out waiting on the remote service".to_string(),
            learnings: learnings.into_iter().map(str::to_string).collect(),
            error_context: None,
        }
    }

    fn context<'a>(task: &'a str, workspace: &'a WorkspaceId) -> ExtractionContext<'a> {
        ExtractionContext {
            task,
            workspace_id: workspace,
            domain_category: "networking",
            parent_candidate: None,
        }
    }

    #[test]
    fn empty_learnings_and_no_error_context_yields_zero_items() {
        let v = verdict(Outcome::Partial, vec![]);
        let ws = "ws-1".to_string();
        let ctx = context("do the thing", &ws);
        let items = extract(&v, &ctx, DeterministicEmbedder::global()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn failure_with_no_learnings_and_no_error_context_still_yields_an_error_item() {
        let v = verdict(Outcome::Failure, vec![]);
        let ws = "ws-1".to_string();
        let ctx = context("call the flaky API", &ws);
        let items = extract(&v, &ctx, DeterministicEmbedder::global()).unwrap();
        assert_eq!(items.len(), 1, "a failure must never extract to nothing");
        assert!(items[0].error_context.is_some());
    }

    #[test]
    fn failure_outcome_attaches_error_context_to_first_item() {
        let v = verdict(
            Outcome::Failure,
            vec!["always set a connection timeout", "retry with backoff"],
        );
        let ws = "ws-1".to_string();
        let ctx = context("call the flaky API", &ws);
        let items = extract(&v, &ctx, DeterministicEmbedder::global()).unwrap();
        assert!(items[0].error_context.is_some());
    }

    #[test]
    fn success_outcome_has_no_error_context() {
        let v = verdict(Outcome::Success, vec!["cache the parsed config"]);
        let ws = "ws-1".to_string();
        let ctx = context("parse config once", &ws);
        let items = extract(&v, &ctx, DeterministicEmbedder::global()).unwrap();
        assert!(items[0].error_context.is_none());
    }

    #[test]
    fn caps_extraction_at_three_items() {
        let v = verdict(
            Outcome::Success,
            vec!["one learning here", "two learning here", "three learning here", "four learning here"],
        );
        let ws = "ws-1".to_string();
        let ctx = context("do several things", &ws);
        let items = extract(&v, &ctx, DeterministicEmbedder::global()).unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn parent_candidate_seeds_genealogy_on_first_item() {
        let v = verdict(Outcome::Success, vec!["reuse the connection pool"]);
        let ws = "ws-1".to_string();
        let parent_id = Uuid::new_v4();
        let mut ctx = context("reuse connections", &ws);
        ctx.parent_candidate = Some((parent_id, 2));
        let items = extract(&v, &ctx, DeterministicEmbedder::global()).unwrap();
        assert_eq!(items[0].parent_memory_id, Some(parent_id));
        assert_eq!(items[0].evolution_stage, 3);
    }

    #[test]
    fn all_extracted_items_pass_validation() {
        let v = verdict(Outcome::Success, vec!["short but valid learning text here"]);
        let ws = "ws-1".to_string();
        let ctx = context("task", &ws);
        let items = extract(&v, &ctx, DeterministicEmbedder::global()).unwrap();
        for item in &items {
            assert!(item.validate().is_ok());
        }
    }
}
