//! Core data model: [`MemoryItem`], [`ReasoningTrace`], [`TrajectoryStep`] and
//! their supporting enums, per the specification's data model section.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Stable identifier for a [`MemoryItem`].
pub type MemoryId = Uuid;
/// Stable identifier for a [`ReasoningTrace`].
pub type TraceId = Uuid;
/// Stable identifier for a logical workspace.
pub type WorkspaceId = String;

/// Outcome of a reasoning trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The trajectory reached the success threshold.
    Success,
    /// The trajectory never reached a usable artifact.
    Failure,
    /// The trajectory produced something, but not a clean success.
    Partial,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Partial => "partial",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Outcome {
    type Err = ();

    /// Parses a verdict string, case-insensitively. Unknown values are the
    /// caller's problem to coerce (see [`crate::memory::judge`]); this parser
    /// only recognizes the three canonical spellings.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(Outcome::Success),
            "failure" => Ok(Outcome::Failure),
            "partial" => Ok(Outcome::Partial),
            _ => Err(()),
        }
    }
}

/// Subjective difficulty bucket assigned to a memory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Simple,
    Moderate,
    Complex,
    Expert,
}

/// The kind of trajectory step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Generate,
    Refine,
    Evaluate,
    /// MaTTS-parallel's self-contrast choice among K candidates; `trajectory_id`
    /// carries the winning candidate's id (spec §4.6, §8 invariant 8).
    Select,
}

/// Error-context triple attached to memories born from failures.
///
/// Rendered prominently in prompts (see [`crate::memory::prompt`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub error_type: String,
    pub failure_pattern: String,
    pub corrective_guidance: String,
}

/// One persisted learning extracted from a trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: MemoryId,
    pub title: String,
    pub description: String,
    pub content: String,
    /// Present iff the memory was extracted from a failure or partial outcome.
    pub error_context: Option<ErrorContext>,
    pub pattern_tags: Vec<String>,
    pub difficulty_level: DifficultyLevel,
    pub domain_category: String,
    pub parent_memory_id: Option<MemoryId>,
    pub derived_from: Vec<MemoryId>,
    pub evolution_stage: u32,
    pub workspace_id: WorkspaceId,
    pub created_at: DateTime<Utc>,
    pub content_embedding: Option<Vec<f32>>,
}

impl MemoryItem {
    /// Validates the field-level invariants from the spec's data model
    /// section: title/description/content length bounds, tag count, and
    /// embedding dimensionality when present.
    pub fn validate(&self) -> Result<()> {
        let title_len = self.title.chars().count();
        if !(5..=200).contains(&title_len) {
            return Err(Error::Validation(format!(
                "title must be 5-200 chars, got {title_len}"
            )));
        }
        let desc_len = self.description.chars().count();
        if !(10..=500).contains(&desc_len) {
            return Err(Error::Validation(format!(
                "description must be 10-500 chars, got {desc_len}"
            )));
        }
        if self.content.chars().count() < 20 {
            return Err(Error::Validation(
                "content must be at least 20 chars".to_string(),
            ));
        }
        if self.pattern_tags.len() > 10 {
            return Err(Error::Validation(format!(
                "pattern_tags must have at most 10 entries, got {}",
                self.pattern_tags.len()
            )));
        }
        if let Some(embedding) = &self.content_embedding {
            if embedding.len() != crate::constants::EMBEDDING_DIM {
                return Err(Error::Validation(format!(
                    "content_embedding must have dimension {}, got {}",
                    crate::constants::EMBEDDING_DIM,
                    embedding.len()
                )));
            }
        }
        Ok(())
    }

    /// True iff this memory was extracted from a failure or partial outcome.
    #[must_use]
    pub fn is_error_learning(&self) -> bool {
        self.error_context.is_some()
    }
}

/// One step in a reasoning trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryStep {
    pub iteration: u32,
    pub thought: String,
    pub action: StepAction,
    pub output: String,
    pub output_hash: String,
    /// Set when this step belongs to a MaTTS-parallel candidate.
    pub trajectory_id: Option<u32>,
    /// Set when this step is a MaTTS-sequential refinement stage.
    pub refinement_stage: Option<u32>,
}

impl TrajectoryStep {
    /// Creates a step, computing its `output_hash` from `output`.
    #[must_use]
    pub fn new(iteration: u32, thought: String, action: StepAction, output: String) -> Self {
        let output_hash = hash_output(&output);
        Self {
            iteration,
            thought,
            action,
            output,
            output_hash,
            trajectory_id: None,
            refinement_stage: None,
        }
    }

    #[must_use]
    pub fn with_trajectory_id(mut self, id: u32) -> Self {
        self.trajectory_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_refinement_stage(mut self, stage: u32) -> Self {
        self.refinement_stage = Some(stage);
        self
    }
}

/// Stable short hash used for loop detection, per spec §3's `output_hash`.
#[must_use]
pub fn hash_output(output: &str) -> String {
    let mut hasher = DefaultHasher::new();
    output.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Optional bag of scores/counters attached to a trace for observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceMetadata {
    pub final_score: Option<f64>,
    pub iterations_used: Option<u32>,
    pub matts_mode: Option<String>,
    pub matts_k: Option<u32>,
    /// The winning `trajectory_id` from a MaTTS-parallel SELECT pass, if any
    /// (mirrors the trajectory's own `Select` step, kept here too so callers
    /// don't have to scan `trajectory` to learn which candidate was chosen).
    pub selected_trajectory: Option<u32>,
}

/// One persisted solve session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningTrace {
    pub id: TraceId,
    pub task: String,
    pub trajectory: Vec<TrajectoryStep>,
    pub outcome: Outcome,
    pub memory_items: Vec<MemoryId>,
    pub parent_trace_id: Option<TraceId>,
    pub task_embedding: Option<Vec<f32>>,
    pub workspace_id: WorkspaceId,
    pub timestamp: DateTime<Utc>,
    pub metadata: TraceMetadata,
}

impl ReasoningTrace {
    /// Validates that the trajectory is non-empty, per the data model
    /// invariant "trajectory (ordered ≥1 steps)".
    pub fn validate(&self) -> Result<()> {
        if self.trajectory.is_empty() {
            return Err(Error::Validation(
                "trajectory must contain at least one step".to_string(),
            ));
        }
        if let Some(embedding) = &self.task_embedding {
            if embedding.len() != crate::constants::EMBEDDING_DIM {
                return Err(Error::Validation(format!(
                    "task_embedding must have dimension {}, got {}",
                    crate::constants::EMBEDDING_DIM,
                    embedding.len()
                )));
            }
        }
        Ok(())
    }
}

/// A retrieved memory paired with its composite score (spec §4.5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub memory: MemoryItem,
    pub score: f64,
    pub relevance: f64,
    pub recency: f64,
}

/// Aggregate statistics exposed by `get_statistics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub trace_count: u64,
    pub memory_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub partial_count: u64,
    pub success_rate: f64,
    pub memories_with_error_ratio: f64,
    pub pattern_tag_histogram: std::collections::BTreeMap<String, u64>,
    pub domain_histogram: std::collections::BTreeMap<String, u64>,
    pub difficulty_histogram: std::collections::BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_memory() -> MemoryItem {
        MemoryItem {
            id: Uuid::new_v4(),
            title: "Use timeouts on requests".to_string(),
            description: "Always pass an explicit timeout to HTTP calls".to_string(),
            content: "requests.get(url, timeout=5) avoids hangs on slow hosts".to_string(),
            error_context: None,
            pattern_tags: vec!["http".to_string()],
            difficulty_level: DifficultyLevel::Simple,
            domain_category: "networking".to_string(),
            parent_memory_id: None,
            derived_from: vec![],
            evolution_stage: 0,
            workspace_id: "ws-1".to_string(),
            created_at: Utc::now(),
            content_embedding: Some(vec![0.0; crate::constants::EMBEDDING_DIM]),
        }
    }

    #[test]
    fn valid_memory_passes_validation() {
        assert!(sample_memory().validate().is_ok());
    }

    #[test]
    fn title_too_short_is_rejected() {
        let mut m = sample_memory();
        m.title = "hi".to_string();
        assert!(m.validate().is_err());
    }

    #[test]
    fn wrong_embedding_dimension_is_rejected() {
        let mut m = sample_memory();
        m.content_embedding = Some(vec![0.0; 10]);
        assert!(m.validate().is_err());
    }

    #[test]
    fn too_many_tags_is_rejected() {
        let mut m = sample_memory();
        m.pattern_tags = (0..11).map(|i| format!("tag{i}")).collect();
        assert!(m.validate().is_err());
    }

    #[test]
    fn output_hash_is_stable() {
        assert_eq!(hash_output("same"), hash_output("same"));
        assert_ne!(hash_output("same"), hash_output("different"));
    }

    #[test]
    fn outcome_parses_known_values_case_insensitively() {
        assert_eq!("SUCCESS".parse::<Outcome>(), Ok(Outcome::Success));
        assert_eq!("Partial".parse::<Outcome>(), Ok(Outcome::Partial));
    }
}
