//! MaTTS-parallel fan-out and self-contrast SELECT (spec §4.6, §5).
//!
//! Grounded on `spatiotemporal/diversity/maximizer.rs`'s use of
//! `futures::future::join_all`-style fan-out for candidate generation
//! followed by a single scoring pass: K candidates run concurrently via
//! `tokio::task::JoinSet`, then a single barrier picks the winner. Per spec
//! §4.6, each candidate is exactly one GENERATE call — no per-candidate
//! EVALUATE/REFINE chain — and SELECT alone adjudicates quality.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::oracle::{CachedOracle, Message, OracleRequest, ReasoningEffort};
use crate::types::{StepAction, TrajectoryStep};

use super::engine::generate;

/// One candidate's raw GENERATE result.
struct Candidate {
    trajectory_id: u32,
    output: String,
}

/// Result of running K candidates concurrently and selecting one.
pub struct MattsParallelOutcome {
    pub steps: Vec<TrajectoryStep>,
    pub final_output: String,
    pub final_score: f64,
    pub iterations_used: u32,
    pub all_outputs: Vec<String>,
    pub selected_trajectory: u32,
}

/// Runs `k` independent GENERATE calls concurrently, then a self-contrast
/// SELECT step over their outputs.
pub async fn run_parallel(
    oracle: Arc<CachedOracle>,
    model: String,
    effort: ReasoningEffort,
    task: String,
    system_prompt: String,
    k: u32,
) -> Result<MattsParallelOutcome> {
    let mut join_set = tokio::task::JoinSet::new();
    for trajectory_id in 0..k {
        let oracle = Arc::clone(&oracle);
        let model = model.clone();
        let task = task.clone();
        let system_prompt = system_prompt.clone();
        join_set.spawn(async move {
            let result = generate(&oracle, &model, effort, &task, &system_prompt).await;
            (trajectory_id, result)
        });
    }

    let mut candidates: Vec<Candidate> = Vec::with_capacity(k as usize);
    let mut generate_steps: Vec<(u32, TrajectoryStep)> = Vec::with_capacity(k as usize);
    while let Some(joined) = join_set.join_next().await {
        let (trajectory_id, result) = joined.map_err(|e| {
            crate::error::Error::LlmGeneration(format!("matts candidate task panicked: {e}"))
        })?;
        let (thought, output) = result?;
        let step = TrajectoryStep::new(0, thought, StepAction::Generate, output.clone())
            .with_trajectory_id(trajectory_id);
        generate_steps.push((trajectory_id, step));
        candidates.push(Candidate { trajectory_id, output });
    }
    candidates.sort_by_key(|c| c.trajectory_id);
    generate_steps.sort_by_key(|(id, _)| *id);

    let (selected, select_score, justification) = select(&oracle, &model, &task, &candidates).await?;

    let all_outputs: Vec<String> = candidates.iter().map(|c| c.output.clone()).collect();
    let mut steps: Vec<TrajectoryStep> = generate_steps.into_iter().map(|(_, step)| step).collect();
    steps.push(
        TrajectoryStep::new(1, justification, StepAction::Select, String::new())
            .with_trajectory_id(selected),
    );

    let winner = candidates
        .iter()
        .find(|c| c.trajectory_id == selected)
        .expect("select() returns a valid trajectory_id");

    Ok(MattsParallelOutcome {
        steps,
        final_output: winner.output.clone(),
        final_score: select_score,
        iterations_used: 1,
        all_outputs,
        selected_trajectory: selected,
    })
}

/// Self-contrast SELECT: asks the oracle to pick among the K candidate
/// outputs and score the winner. On a missing/out-of-range/unparseable
/// answer, falls back to the lowest `trajectory_id` (spec §4.6's tie-break
/// generalizes naturally since there is no independent per-candidate score).
async fn select(
    oracle: &CachedOracle,
    model: &str,
    task: &str,
    candidates: &[Candidate],
) -> Result<(u32, f64, String)> {
    let listing: String = candidates
        .iter()
        .map(|c| format!("Candidate {}:\n{}", c.trajectory_id, c.output))
        .collect::<Vec<_>>()
        .join("\n\n");

    let messages = vec![
        Message::system(
            "Compare the candidate solutions below and pick the best one. Reply \
             strictly as JSON: {\"selected_index\": <candidate id>, \"score\": <0..1>, \
             \"justification\": \"...\"}."
                .to_string(),
        ),
        Message::user(format!("Task: {task}\n\n{listing}")),
    ];
    let request = OracleRequest {
        model: model.to_string(),
        messages,
        temperature: 0.0,
        max_output_tokens: 512,
        reasoning_effort: ReasoningEffort::Low,
    };
    let response = oracle.create(request).await?;

    let parsed = serde_json::from_str::<Value>(response.content.trim()).ok();
    let parsed_index = parsed
        .as_ref()
        .and_then(|v| v.get("selected_index").and_then(Value::as_u64))
        .map(|i| i as u32);
    let justification = parsed
        .as_ref()
        .and_then(|v| v.get("justification").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    if let Some(index) = parsed_index {
        if candidates.iter().any(|c| c.trajectory_id == index) {
            let score = parsed
                .as_ref()
                .and_then(|v| v.get("score").and_then(Value::as_f64))
                .unwrap_or(0.0)
                .clamp(0.0, 1.0);
            return Ok((index, score, justification));
        }
    }

    Ok((fallback_select(candidates), 0.0, justification))
}

fn fallback_select(candidates: &[Candidate]) -> u32 {
    candidates.iter().map(|c| c.trajectory_id).min().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u32) -> Candidate {
        Candidate {
            trajectory_id: id,
            output: "out".to_string(),
        }
    }

    #[test]
    fn fallback_picks_lowest_trajectory_id() {
        let candidates = vec![candidate(2), candidate(0), candidate(1)];
        assert_eq!(fallback_select(&candidates), 0);
    }
}
