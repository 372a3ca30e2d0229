//! GENERATE/EVALUATE/REFINE primitives shared by single-trajectory and MaTTS
//! modes (spec §4.6). New code — the teacher has no direct FSM-over-LLM-calls
//! analog, but follows its `reflection.rs` post-hoc-analysis-feeding-storage
//! idiom: explicit states, a `match`-driven loop, `tracing` spans per
//! transition.

use std::collections::HashSet;

use serde_json::Value;

use crate::constants::DEFAULT_CONNECT_TIMEOUT;
use crate::error::Result;
use crate::oracle::{CachedOracle, Message, OracleRequest, ReasoningEffort};
use crate::types::{hash_output, StepAction, TrajectoryStep};

/// One GENERATE/EVALUATE/REFINE chain's outcome.
pub struct TrajectoryOutcome {
    pub steps: Vec<TrajectoryStep>,
    pub final_output: String,
    pub final_score: f64,
    pub iterations_used: u32,
    pub looped: bool,
}

fn parse_score_and_feedback(raw: &str) -> (f64, String) {
    let trimmed = raw.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return (0.0, raw.to_string());
    };
    let score = value
        .get("score")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (score, feedback)
}

/// Drives a single GENERATE → EVALUATE → (REFINE)* chain. `system_prompt` is
/// the memory-augmented prompt prefix (possibly empty); `trajectory_id` and
/// `refinement_stage_offset` tag each step for MaTTS callers, or are `None`
/// for a plain single-trajectory solve.
pub async fn run_trajectory(
    oracle: &CachedOracle,
    model: &str,
    effort: ReasoningEffort,
    task: &str,
    system_prompt: &str,
    max_iterations: u32,
    success_threshold: f64,
    trajectory_id: Option<u32>,
) -> Result<TrajectoryOutcome> {
    let mut steps: Vec<TrajectoryStep> = Vec::new();
    let mut seen_hashes: HashSet<String> = HashSet::new();
    let mut current_output = String::new();
    let mut current_score = 0.0;
    let mut last_feedback = String::new();
    let mut looped = false;
    let mut iteration = 0;

    loop {
        let (thought, output) = if iteration == 0 {
            generate(oracle, model, effort, task, system_prompt).await?
        } else {
            refine(oracle, model, effort, task, &current_output, &last_feedback).await?
        };

        let action = if iteration == 0 {
            StepAction::Generate
        } else {
            StepAction::Refine
        };
        let hash = hash_output(&output);
        let mut step = TrajectoryStep::new(iteration, thought, action, output.clone());
        if let Some(id) = trajectory_id {
            step = step.with_trajectory_id(id);
        }
        if iteration > 0 {
            step = step.with_refinement_stage(iteration);
        }
        steps.push(step);

        if iteration > 0 && seen_hashes.contains(&hash) {
            looped = true;
            current_output = output;
            iteration += 1;
            break;
        }
        seen_hashes.insert(hash);
        current_output = output;

        let (score, feedback) = evaluate(oracle, model, task, &current_output).await?;
        current_score = score;
        last_feedback = feedback.clone();
        let mut eval_step = TrajectoryStep::new(iteration, feedback, StepAction::Evaluate, String::new());
        if let Some(id) = trajectory_id {
            eval_step = eval_step.with_trajectory_id(id);
        }
        steps.push(eval_step);

        iteration += 1;
        if score >= success_threshold || iteration >= max_iterations {
            break;
        }
    }

    Ok(TrajectoryOutcome {
        steps,
        final_output: current_output,
        final_score: current_score,
        iterations_used: iteration,
        looped,
    })
}

/// A single GENERATE call: `temperature>0` oracle call producing `(thought,
/// output)`. Exposed to MaTTS-parallel, which fans this out K-wide without
/// the EVALUATE/REFINE chain `run_trajectory` adds on top (spec §4.6).
pub(crate) async fn generate(
    oracle: &CachedOracle,
    model: &str,
    effort: ReasoningEffort,
    task: &str,
    system_prompt: &str,
) -> Result<(String, String)> {
    let mut messages = Vec::new();
    if !system_prompt.is_empty() {
        messages.push(Message::system(system_prompt));
    }
    messages.push(Message::user(task));
    let request = OracleRequest {
        model: model.to_string(),
        messages,
        temperature: 0.7,
        max_output_tokens: 2048,
        reasoning_effort: effort,
    };
    let response = oracle.create(request).await?;
    Ok(("initial attempt".to_string(), response.content))
}

async fn refine(
    oracle: &CachedOracle,
    model: &str,
    effort: ReasoningEffort,
    task: &str,
    prior_output: &str,
    feedback: &str,
) -> Result<(String, String)> {
    let messages = vec![
        Message::system(format!(
            "You are refining a prior attempt at the following task.\nTask: {task}"
        )),
        Message::user(format!(
            "Prior output:\n{prior_output}\n\nFeedback:\n{feedback}\n\nProduce an improved output."
        )),
    ];
    let request = OracleRequest {
        model: model.to_string(),
        messages,
        temperature: 0.7,
        max_output_tokens: 2048,
        reasoning_effort: effort,
    };
    let response = oracle.create(request).await?;
    Ok(("refinement".to_string(), response.content))
}

async fn evaluate(
    oracle: &CachedOracle,
    model: &str,
    task: &str,
    output: &str,
) -> Result<(f64, String)> {
    let messages = vec![
        Message::system(
            "Evaluate the candidate output against the task. Reply strictly as \
             JSON: {\"score\": <0..1>, \"feedback\": \"...\"}."
                .to_string(),
        ),
        Message::user(format!("Task: {task}\n\nCandidate output:\n{output}")),
    ];
    let request = OracleRequest {
        model: model.to_string(),
        messages,
        temperature: 0.0,
        max_output_tokens: 512,
        reasoning_effort: ReasoningEffort::Low,
    };
    let response = oracle.create(request).await?;
    Ok(parse_score_and_feedback(&response.content))
}

/// Connection-timeout-style bound exposed for callers that want to wrap
/// `run_trajectory` in `tokio::time::timeout`; the engine itself does not
/// enforce timeouts (that belongs to the oracle transport), it only exposes
/// the default per spec §5.
#[must_use]
pub fn default_connect_timeout() -> std::time::Duration {
    DEFAULT_CONNECT_TIMEOUT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_evaluation() {
        let (score, feedback) = parse_score_and_feedback(r#"{"score":0.75,"feedback":"close"}"#);
        assert_eq!(score, 0.75);
        assert_eq!(feedback, "close");
    }

    #[test]
    fn unparseable_evaluation_defaults_to_zero() {
        let (score, feedback) = parse_score_and_feedback("not json");
        assert_eq!(score, 0.0);
        assert_eq!(feedback, "not json");
    }

    #[test]
    fn out_of_range_score_is_clamped() {
        let (score, _) = parse_score_and_feedback(r#"{"score":4.0,"feedback":"x"}"#);
        assert_eq!(score, 1.0);
    }
}
