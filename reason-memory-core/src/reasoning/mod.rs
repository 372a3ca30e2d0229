//! Iterative Reasoning Engine: the GENERATE/EVALUATE/REFINE/SELECT/JUDGE/
//! EXTRACT/STORE/DONE state machine (spec §4.6).

pub mod engine;
pub mod matts;
mod types;

pub use types::{EngineState, MattsMode, SolveOptions, SolveResult};

use std::sync::Arc;

use crate::error::Result;
use crate::memory::extraction::{self, ExtractionContext};
use crate::memory::judge;
use crate::memory::prompt;
use crate::memory::{MemoryCore, RetrievalParams};
use crate::oracle::{CachedOracle, ReasoningEffort};
use crate::types::{ReasoningTrace, TraceMetadata, WorkspaceId};

/// Orchestrates one `solve` call end to end: retrieve → reason → judge →
/// extract → store.
pub struct ReasoningEngine {
    oracle: Arc<CachedOracle>,
    memory: MemoryCore,
    model: String,
    reasoning_effort: ReasoningEffort,
    max_iterations: u32,
    success_threshold: f64,
    retrieval_k: usize,
}

impl ReasoningEngine {
    #[must_use]
    pub fn new(
        oracle: Arc<CachedOracle>,
        memory: MemoryCore,
        model: impl Into<String>,
        reasoning_effort: ReasoningEffort,
    ) -> Self {
        Self {
            oracle,
            memory,
            model: model.into(),
            reasoning_effort,
            max_iterations: crate::constants::DEFAULT_MAX_ITERATIONS,
            success_threshold: crate::constants::DEFAULT_SUCCESS_THRESHOLD,
            retrieval_k: 5,
        }
    }

    /// Overrides the engine-wide GENERATE/EVALUATE loop bounds (spec §6
    /// `engine.max_iterations`/`engine.success_threshold`/`engine.retrieval_k`).
    #[must_use]
    pub fn with_loop_config(mut self, max_iterations: u32, success_threshold: f64, retrieval_k: usize) -> Self {
        self.max_iterations = max_iterations;
        self.success_threshold = success_threshold;
        self.retrieval_k = retrieval_k;
        self
    }

    /// The per-task defaults a caller's explicit [`SolveOptions`] fields are
    /// laid over, so host-level config (not part of the tool call contract)
    /// still reaches the loop.
    #[must_use]
    pub fn default_solve_options(&self) -> SolveOptions {
        SolveOptions {
            max_iterations: self.max_iterations,
            success_threshold: self.success_threshold,
            retrieval_k: self.retrieval_k,
            ..SolveOptions::default()
        }
    }

    /// Runs the full engine for one task, per the caller's [`SolveOptions`].
    pub async fn solve(
        &self,
        task: &str,
        workspace: &WorkspaceId,
        options: SolveOptions,
    ) -> Result<SolveResult> {
        let (system_prompt, parent_candidate) = if options.use_memory {
            let retrieval = self
                .memory
                .retrieve(
                    task,
                    RetrievalParams {
                        k: options.retrieval_k,
                        ..RetrievalParams::default()
                    },
                    Some(workspace),
                )
                .await?;
            let rendered = prompt::render(&retrieval.memories, 4096);
            let parent = retrieval
                .memories
                .first()
                .map(|scored| (scored.memory.id, scored.memory.evolution_stage));
            (rendered, parent)
        } else {
            (String::new(), None)
        };

        tracing::debug!(state = ?EngineState::Generate, matts = options.enable_matts, "entering reasoning loop");

        let (steps, final_output, final_score, iterations_used, all_outputs, selected_trajectory) =
            if options.enable_matts && options.matts_mode == MattsMode::Parallel {
                let outcome = matts::run_parallel(
                    Arc::clone(&self.oracle),
                    self.model.clone(),
                    self.reasoning_effort,
                    task.to_string(),
                    system_prompt,
                    options.matts_k,
                )
                .await?;
                (
                    outcome.steps,
                    outcome.final_output,
                    outcome.final_score,
                    outcome.iterations_used,
                    Some(outcome.all_outputs),
                    Some(outcome.selected_trajectory),
                )
            } else if options.enable_matts && options.matts_mode == MattsMode::Sequential {
                // Force the full K-deep refinement chain by placing the
                // success threshold out of reach (spec §4.6 MaTTS sequential).
                let outcome = engine::run_trajectory(
                    &self.oracle,
                    &self.model,
                    self.reasoning_effort,
                    task,
                    &system_prompt,
                    options.matts_k,
                    f64::INFINITY,
                    None,
                )
                .await?;
                (
                    outcome.steps,
                    outcome.final_output,
                    outcome.final_score,
                    outcome.iterations_used,
                    None,
                    None,
                )
            } else {
                let outcome = engine::run_trajectory(
                    &self.oracle,
                    &self.model,
                    self.reasoning_effort,
                    task,
                    &system_prompt,
                    options.max_iterations,
                    options.success_threshold,
                    None,
                )
                .await?;
                (
                    outcome.steps,
                    outcome.final_output,
                    outcome.final_score,
                    outcome.iterations_used,
                    None,
                    None,
                )
            };

        tracing::debug!(state = ?EngineState::Judge, score = final_score, "judging trajectory");
        let judge_response = self.judge(task, &final_output, final_score).await?;
        let verdict = judge::parse_verdict(&judge_response)?;

        tracing::debug!(state = ?EngineState::Extract, verdict = %verdict.verdict, "extracting memories");
        let extraction_context = ExtractionContext {
            task,
            workspace_id: workspace,
            domain_category: "general",
            parent_candidate,
        };
        let extracted = extraction::extract(&verdict, &extraction_context, self.memory.embedder().as_ref())?;

        let mut result = SolveResult {
            success: matches!(verdict.verdict, crate::types::Outcome::Success),
            output: final_output.clone(),
            trajectory: steps.clone(),
            score: final_score,
            iterations: iterations_used,
            memories_extracted: extracted.iter().map(|m| m.id).collect(),
            judge_reasoning: verdict.reasoning.clone(),
            all_outputs,
            selected_trajectory,
            storage_error: None,
        };

        if options.store_result {
            tracing::debug!(state = ?EngineState::Store, "persisting trace");
            let task_embedding = self.memory.embedder().embed(task).ok();
            let trace = ReasoningTrace {
                id: uuid::Uuid::new_v4(),
                task: task.to_string(),
                trajectory: steps,
                outcome: verdict.verdict,
                memory_items: extracted.iter().map(|m| m.id).collect(),
                parent_trace_id: None,
                task_embedding,
                workspace_id: workspace.clone(),
                timestamp: chrono::Utc::now(),
                metadata: TraceMetadata {
                    final_score: Some(final_score),
                    iterations_used: Some(iterations_used),
                    matts_mode: options.enable_matts.then(|| format!("{:?}", options.matts_mode)),
                    matts_k: options.enable_matts.then_some(options.matts_k),
                    selected_trajectory,
                },
            };
            if let Err(e) = trace.validate() {
                result.storage_error = Some(e.to_string());
                result.success = false;
                return Ok(result);
            }
            match self.memory.storage().store_trace(&trace, &extracted).await {
                Ok(_) => {}
                Err(e) => {
                    // STORE failure: DONE with success=false, no storage retry
                    // (spec §4.6 — operator reruns via retention/migration).
                    result.storage_error = Some(e.to_string());
                    result.success = false;
                }
            }
        }

        tracing::debug!(state = ?EngineState::Done, success = result.success, "solve complete");
        Ok(result)
    }

    async fn judge(&self, task: &str, output: &str, eval_score: f64) -> Result<String> {
        use crate::oracle::{Message, OracleRequest};

        let messages = vec![
            Message::system(
                "Judge the final output for this task. Reply strictly as JSON: \
                 {\"verdict\": \"success\"|\"failure\"|\"partial\", \"score\": <0..1>, \
                 \"reasoning\": \"...\", \"learnings\": [\"...\"], \"error_context\": \
                 {\"error_type\": \"...\", \"failure_pattern\": \"...\", \
                 \"corrective_guidance\": \"...\"} | null}."
                    .to_string(),
            ),
            Message::user(format!(
                "Task: {task}\n\nFinal output:\n{output}\n\nLast evaluation score: {eval_score:.2}"
            )),
        ];
        let request = OracleRequest {
            model: self.model.clone(),
            messages,
            temperature: 0.0,
            max_output_tokens: 1024,
            reasoning_effort: ReasoningEffort::Low,
        };
        let response = self.oracle.create(request).await?;
        Ok(response.content)
    }
}
