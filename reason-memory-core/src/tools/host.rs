//! Tool host: binds the validated input/output tool surface (spec §6) to the
//! engine, memory core, and oracle built elsewhere in this crate. A
//! transport (CLI, MCP, HTTP) wraps this host; it carries no transport
//! concerns itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::backup;
use crate::constants::APPROX_CHARS_PER_TOKEN;
use crate::error::{Error, Result};
use crate::memory::{genealogy, MemoryCore, RetrievalParams};
use crate::oracle::CachedOracle;
use crate::reasoning::{ReasoningEngine, SolveOptions};
use crate::storage::StorageBackend;
use crate::types::{DifficultyLevel, MemoryItem, Outcome, WorkspaceId};
use crate::workspace;

use super::types::*;

/// Tracks per-tool call counts and total latency for `get_performance_metrics`.
#[derive(Default)]
struct Metrics {
    by_tool: HashMap<&'static str, ToolMetric>,
}

/// Binds the tool surface to a concrete engine/memory/oracle instance.
pub struct ToolHost {
    engine: ReasoningEngine,
    memory: MemoryCore,
    oracle: Arc<CachedOracle>,
    metrics: Mutex<Metrics>,
}

impl ToolHost {
    #[must_use]
    pub fn new(engine: ReasoningEngine, memory: MemoryCore, oracle: Arc<CachedOracle>) -> Self {
        Self {
            engine,
            memory,
            oracle,
            metrics: Mutex::new(Metrics::default()),
        }
    }

    fn record(&self, tool: &'static str, elapsed_ms: u64) {
        let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
        let entry = metrics.by_tool.entry(tool).or_default();
        entry.call_count += 1;
        entry.total_latency_ms += elapsed_ms;
    }

    pub async fn solve_coding_task(
        &self,
        input: SolveCodingTaskInput,
        workspace_id: &WorkspaceId,
    ) -> Result<crate::reasoning::SolveResult> {
        input.validate()?;
        let started = std::time::Instant::now();
        let options = SolveOptions {
            use_memory: input.use_memory,
            enable_matts: input.enable_matts,
            matts_k: input.matts_k,
            matts_mode: input.matts_mode,
            store_result: input.store_result,
            ..self.engine.default_solve_options()
        };
        let result = self.engine.solve(&input.task, workspace_id, options).await;
        self.record("solve_coding_task", started.elapsed().as_millis() as u64);
        result
    }

    pub async fn retrieve_memories(
        &self,
        input: RetrieveMemoriesInput,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<RenderedMemory>> {
        input.validate()?;
        let started = std::time::Instant::now();
        let params = RetrievalParams {
            k: input.n_results,
            include_failures: input.include_failures,
            domain_filter: input.domain_filter,
            pattern_tags: input.pattern_tags,
            min_score: input.min_score,
            boost_error_warnings: true,
        };
        let result = self
            .memory
            .retrieve(&input.query, params, Some(workspace_id))
            .await?;
        self.record("retrieve_memories", started.elapsed().as_millis() as u64);
        Ok(result
            .memories
            .into_iter()
            .map(|scored| RenderedMemory {
                id: scored.memory.id,
                title: scored.memory.title,
                description: scored.memory.description,
                content: scored.memory.content,
                score: scored.score,
                is_error_learning: scored.memory.error_context.is_some(),
            })
            .collect())
    }

    pub async fn capture_knowledge(
        &self,
        input: CaptureKnowledgeInput,
        workspace_id: &WorkspaceId,
    ) -> Result<CaptureKnowledgeOutput> {
        let started = std::time::Instant::now();
        // Quality heuristic: a longer, more specific answer scores higher.
        // Grounded on the same clamped-composite shape as retrieval scoring
        // rather than a separate ad-hoc formula.
        let length_score = (input.answer.chars().count() as f64 / 400.0).min(1.0);
        let specificity_score = if input.answer.contains("```") || input.answer.lines().count() > 3 {
            1.0
        } else {
            0.5
        };
        let quality_score = (0.6 * length_score + 0.4 * specificity_score).clamp(0.0, 1.0);

        let should_store = input.force_store || quality_score >= 0.5;
        let memory_id = if should_store {
            let content = format!("Q: {}\nA: {}", input.question, input.answer);
            let embedding = self.memory.embedder().embed(&content)?;
            let item = MemoryItem {
                id: Uuid::new_v4(),
                title: derive_capture_title(&input.question),
                description: derive_capture_description(&input.question),
                content,
                error_context: None,
                pattern_tags: Vec::new(),
                difficulty_level: DifficultyLevel::Moderate,
                domain_category: "captured".to_string(),
                parent_memory_id: None,
                derived_from: Vec::new(),
                evolution_stage: 0,
                workspace_id: workspace_id.clone(),
                created_at: Utc::now(),
                content_embedding: Some(embedding),
            };
            item.validate()?;
            let trace = crate::types::ReasoningTrace {
                id: Uuid::new_v4(),
                task: input.question.clone(),
                trajectory: vec![crate::types::TrajectoryStep::new(
                    0,
                    "captured externally".to_string(),
                    crate::types::StepAction::Generate,
                    input.answer.clone(),
                )],
                outcome: Outcome::Success,
                memory_items: vec![item.id],
                parent_trace_id: None,
                task_embedding: None,
                workspace_id: workspace_id.clone(),
                timestamp: Utc::now(),
                metadata: crate::types::TraceMetadata::default(),
            };
            self.memory.storage().store_trace(&trace, &[item.clone()]).await?;
            Some(item.id)
        } else {
            None
        };

        self.record("capture_knowledge", started.elapsed().as_millis() as u64);
        Ok(CaptureKnowledgeOutput {
            quality_score,
            stored: memory_id.is_some(),
            memory_id,
        })
    }

    pub async fn search_knowledge(
        &self,
        input: SearchKnowledgeInput,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<RenderedMemory>> {
        let started = std::time::Instant::now();
        let params = RetrievalParams {
            k: 20,
            include_failures: true,
            domain_filter: input.domain_filter.clone(),
            pattern_tags: None,
            min_score: 0.0,
            boost_error_warnings: false,
        };
        let mut result = self
            .memory
            .retrieve(&input.query, params, Some(workspace_id))
            .await?;

        if let Some(difficulty) = input.difficulty_filter {
            result
                .memories
                .retain(|m| m.memory.difficulty_level == difficulty);
        }

        let weights = input.weights;
        for scored in &mut result.memories {
            scored.score = weights.semantic * scored.relevance
                + weights.quality * quality_proxy(&scored.memory)
                + weights.recency * scored.recency;
        }
        result
            .memories
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        self.record("search_knowledge", started.elapsed().as_millis() as u64);
        Ok(result
            .memories
            .into_iter()
            .map(|scored| RenderedMemory {
                id: scored.memory.id,
                title: scored.memory.title,
                description: scored.memory.description,
                content: scored.memory.content,
                score: scored.score,
                is_error_learning: scored.memory.error_context.is_some(),
            })
            .collect())
    }

    pub async fn get_memory_genealogy(
        &self,
        input: GetMemoryGenealogyInput,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<genealogy::GenealogyNode>> {
        let started = std::time::Instant::now();
        let result = genealogy::get_genealogy(
            self.memory.storage().as_ref(),
            input.memory_id,
            input.depth,
            Some(workspace_id),
        )
        .await;
        self.record("get_memory_genealogy", started.elapsed().as_millis() as u64);
        result
    }

    pub async fn get_statistics(&self) -> Result<(crate::types::Statistics, crate::oracle::CacheStats)> {
        let started = std::time::Instant::now();
        let stats = self.memory.statistics().await?;
        let cache_stats = self.oracle.cache_stats();
        self.record("get_statistics", started.elapsed().as_millis() as u64);
        Ok((stats, cache_stats))
    }

    pub fn manage_workspace(&self, input: ManageWorkspaceInput) -> Result<ManageWorkspaceOutput> {
        let started = std::time::Instant::now();
        let output = match input.action {
            WorkspaceAction::Set => {
                let path = input.path.ok_or_else(|| {
                    Error::Validation("manage_workspace(set) requires a path".to_string())
                })?;
                let handle = workspace::set(&path)?;
                ManageWorkspaceOutput {
                    id: Some(handle.id),
                    name: Some(handle.name),
                    path: Some(handle.path),
                }
            }
            WorkspaceAction::Get => match workspace::get() {
                Some(handle) => ManageWorkspaceOutput {
                    id: Some(handle.id),
                    name: Some(handle.name),
                    path: Some(handle.path),
                },
                None => ManageWorkspaceOutput::default(),
            },
            WorkspaceAction::Clear => {
                workspace::clear();
                ManageWorkspaceOutput::default()
            }
        };
        self.record("manage_workspace", started.elapsed().as_millis() as u64);
        Ok(output)
    }

    pub async fn backup_memories(
        &self,
        input: BackupMemoriesInput,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<backup::BackupManifest> {
        let started = std::time::Instant::now();
        let manifest = match input.action {
            BackupAction::Create => {
                backup::create_backup(
                    self.memory.storage().as_ref(),
                    &input.path,
                    workspace_id,
                    input.incremental,
                    None,
                )
                .await?
            }
            BackupAction::Validate => backup::validate_backup(&input.path)?,
            BackupAction::Restore => {
                let (traces, memories) = backup::restore_backup(
                    self.memory.storage().as_ref(),
                    &input.path,
                    input.target_workspace_id.as_ref(),
                    input.overwrite,
                )
                .await?;
                backup::validate_backup(&input.path).map(|mut m| {
                    m.trace_count = traces;
                    m.memory_count = memories;
                    m
                })?
            }
        };
        self.record("backup_memories", started.elapsed().as_millis() as u64);
        Ok(manifest)
    }

    pub async fn cleanup_old_data(
        &self,
        input: CleanupOldDataInput,
    ) -> Result<crate::tools::types::CleanupOutcome> {
        let started = std::time::Instant::now();
        let outcome = if input.confirm_workspace_delete {
            let workspace_id = input.workspace_id.as_ref().ok_or_else(|| {
                crate::error::Error::Validation(
                    "confirm_workspace_delete requires workspace_id".to_string(),
                )
            })?;
            let report = self.memory.delete_workspace(workspace_id).await?;
            crate::tools::types::CleanupOutcome::WorkspaceDeleted(report)
        } else {
            let report = self
                .memory
                .delete_old_traces(input.retention_days, input.workspace_id.as_ref())
                .await?;
            crate::tools::types::CleanupOutcome::Retention(report)
        };
        self.record("cleanup_old_data", started.elapsed().as_millis() as u64);
        Ok(outcome)
    }

    pub fn get_performance_metrics(
        &self,
        input: GetPerformanceMetricsInput,
    ) -> HashMap<&'static str, ToolMetric> {
        let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
        let snapshot = metrics.by_tool.clone();
        if input.reset_after_read {
            metrics.by_tool.clear();
        }
        snapshot
    }

    pub fn manage_cache(&self, input: ManageCacheInput) -> Result<crate::oracle::CacheStats> {
        let started = std::time::Instant::now();
        match input.action {
            CacheAction::Statistics => {}
            CacheAction::Clear => self.oracle.clear_cache(),
            CacheAction::Invalidate => {
                if let Some(key) = input.key {
                    let request = crate::oracle::OracleRequest {
                        model: String::new(),
                        messages: vec![crate::oracle::Message::user(key)],
                        temperature: 0.0,
                        max_output_tokens: 0,
                        reasoning_effort: crate::oracle::ReasoningEffort::Low,
                    };
                    self.oracle.invalidate_cache_entry(&request);
                } else {
                    self.oracle.clear_cache();
                }
            }
        }
        let stats = self.oracle.cache_stats();
        self.record("manage_cache", started.elapsed().as_millis() as u64);
        Ok(stats)
    }

    pub async fn migrate_database(
        &self,
        input: MigrateDatabaseInput,
        destination: &dyn StorageBackend,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<(u64, u64)> {
        let started = std::time::Instant::now();
        let _ = input.target_backend; // selects which adapter the caller constructed `destination` from
        let result = backup::migrate(
            self.memory.storage().as_ref(),
            destination,
            workspace_id,
            input.dry_run,
        )
        .await;
        self.record("migrate_database", started.elapsed().as_millis() as u64);
        result
    }

    pub fn compress_prompt(&self, input: CompressPromptInput) -> CompressPromptOutput {
        let started = std::time::Instant::now();
        let tokens_before = input.prompt.chars().count() / APPROX_CHARS_PER_TOKEN;
        let ratio_target = ((tokens_before as f64) * input.compression_ratio.clamp(0.0, 1.0)) as usize;
        let target_tokens = ratio_target.min(input.max_tokens).max(1);
        let target_chars = target_tokens * APPROX_CHARS_PER_TOKEN;

        let compressed = if input.prompt.chars().count() <= target_chars {
            input.prompt.clone()
        } else {
            let mut truncated: String = input.prompt.chars().take(target_chars.saturating_sub(3)).collect();
            truncated.push_str("...");
            truncated
        };
        let tokens_after = compressed.chars().count() / APPROX_CHARS_PER_TOKEN;

        self.record("compress_prompt", started.elapsed().as_millis() as u64);
        CompressPromptOutput {
            compressed,
            tokens_before,
            tokens_after,
        }
    }
}

fn derive_capture_title(question: &str) -> String {
    let mut title: String = question.split_whitespace().take(15).collect::<Vec<_>>().join(" ");
    if title.chars().count() < 5 {
        title = format!("Captured: {title}");
    }
    if title.chars().count() > 200 {
        title = title.chars().take(197).collect::<String>() + "...";
    }
    title
}

fn derive_capture_description(question: &str) -> String {
    let mut description = format!("Manually captured knowledge for: {question}");
    if description.chars().count() > 500 {
        description = description.chars().take(497).collect::<String>() + "...";
    }
    description
}

fn quality_proxy(memory: &MemoryItem) -> f64 {
    let base = (memory.content.chars().count() as f64 / 300.0).min(1.0);
    let evolution = (memory.evolution_stage as f64 / 10.0).min(1.0);
    (0.7 * base + 0.3 * evolution).clamp(0.0, 1.0)
}
