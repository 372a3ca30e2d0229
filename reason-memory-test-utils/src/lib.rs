//! # Test Utilities
//!
//! Shared test fixtures for `reason-memory-core` and its storage adapters:
//! an in-memory [`InMemoryStorage`] implementing the full `StorageBackend`
//! contract, plus builders for [`MemoryItem`]/[`ReasoningTrace`] fixtures so
//! integration tests in the adapter and CLI crates don't each hand-roll
//! sample data.

mod storage;

pub use storage::InMemoryStorage;

use chrono::{DateTime, Utc};
use reason_memory_core::types::{
    DifficultyLevel, MemoryId, MemoryItem, Outcome, ReasoningTrace, StepAction, TraceMetadata,
    TrajectoryStep, WorkspaceId,
};
use uuid::Uuid;

/// Builds a valid [`MemoryItem`] fixture, overridable via the with_* methods.
#[derive(Debug, Clone)]
pub struct MemoryItemBuilder {
    item: MemoryItem,
}

impl MemoryItemBuilder {
    #[must_use]
    pub fn new(workspace_id: impl Into<WorkspaceId>) -> Self {
        Self {
            item: MemoryItem {
                id: Uuid::new_v4(),
                title: "Use timeouts on outbound requests".to_string(),
                description: "Always pass an explicit timeout to avoid indefinite hangs".to_string(),
                content: "requests.get(url, timeout=5) avoids hangs on slow hosts".to_string(),
                error_context: None,
                pattern_tags: vec!["networking".to_string()],
                difficulty_level: DifficultyLevel::Simple,
                domain_category: "networking".to_string(),
                parent_memory_id: None,
                derived_from: vec![],
                evolution_stage: 0,
                workspace_id: workspace_id.into(),
                created_at: Utc::now(),
                content_embedding: None,
            },
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.item.title = title.into();
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.item.content = content.into();
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.item.created_at = created_at;
        self
    }

    #[must_use]
    pub fn with_error_context(mut self, error_type: &str, pattern: &str, guidance: &str) -> Self {
        self.item.error_context = Some(reason_memory_core::types::ErrorContext {
            error_type: error_type.to_string(),
            failure_pattern: pattern.to_string(),
            corrective_guidance: guidance.to_string(),
        });
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: MemoryId, stage: u32) -> Self {
        self.item.parent_memory_id = Some(parent);
        self.item.derived_from = vec![parent];
        self.item.evolution_stage = stage;
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.item.content_embedding = Some(embedding);
        self
    }

    #[must_use]
    pub fn build(self) -> MemoryItem {
        self.item
    }
}

/// Builds a valid [`ReasoningTrace`] fixture with one GENERATE step.
#[must_use]
pub fn sample_trace(workspace_id: impl Into<WorkspaceId>, outcome: Outcome) -> ReasoningTrace {
    ReasoningTrace {
        id: Uuid::new_v4(),
        task: "implement exponential backoff retry".to_string(),
        trajectory: vec![TrajectoryStep::new(
            0,
            "drafting an initial attempt".to_string(),
            StepAction::Generate,
            "fn retry() { /* ... */ }".to_string(),
        )],
        outcome,
        memory_items: vec![],
        parent_trace_id: None,
        task_embedding: None,
        workspace_id: workspace_id.into(),
        timestamp: Utc::now(),
        metadata: TraceMetadata::default(),
    }
}

/// A deterministic pseudo-embedding with a fixed first component, useful for
/// asserting on similarity ranking in tests without depending on the real
/// [`reason_memory_core::embeddings::DeterministicEmbedder`] hash.
#[must_use]
pub fn fixed_embedding(first_component: f32) -> Vec<f32> {
    let mut v = vec![0.0_f32; reason_memory_core::constants::EMBEDDING_DIM];
    v[0] = first_component;
    v
}
