//! Storage Backend Interface: backend-agnostic CRUD + search over traces and
//! memory items, workspace-scoped throughout (spec §4.3).
//!
//! Two adapters implement this trait identically: an embedded adapter
//! (`reason-memory-store-embedded`, backed by `redb` + a JSON trace mirror)
//! and a hosted adapter (`reason-memory-store-hosted`, backed by `libsql`).
//! The Memory Core never reaches through this trait into an adapter-specific
//! handle — [`StorageBackend::get_all_memories_metadata`] exists specifically
//! so genealogy scans stay on the public contract (spec §9, "duck-typed
//! storage coupling").

pub mod circuit_breaker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::types::{MemoryId, MemoryItem, ReasoningTrace, Statistics, TraceId, WorkspaceId};

/// Filters applied during [`StorageBackend::query_similar_memories`].
#[derive(Debug, Clone, Default)]
pub struct SimilarityFilters {
    pub include_failures: bool,
    pub domain_filter: Option<String>,
    pub pattern_tags: Option<Vec<String>>,
    pub min_similarity: Option<f32>,
}

/// One candidate returned from a similarity search: the memory plus the
/// adapter-reported distance (ascending = more similar), under whatever
/// metric the adapter documents (see [`SimilarityMetric`]).
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    pub memory: MemoryItem,
    pub distance: f32,
}

/// Which metric an adapter's `distance` values are expressed in. Every
/// adapter converts its native metric into a `[0, 1]` similarity before
/// handing results to the Memory Core, but documents which conversion it
/// used (spec §4.3, §9 Open Question 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMetric {
    /// `distance` is an L2-style distance converted via `1 / (1 + distance)`.
    L2Reciprocal,
    /// `distance` is a cosine distance converted via `1 - distance`.
    CosineComplement,
}

/// Compact genealogy-relevant projection of a memory item, returned by
/// `get_all_memories_metadata` so genealogy walks never need a full record.
#[derive(Debug, Clone)]
pub struct MemoryMetadata {
    pub id: MemoryId,
    pub parent_memory_id: Option<MemoryId>,
    pub derived_from: Vec<MemoryId>,
    pub evolution_stage: u32,
    pub workspace_id: WorkspaceId,
}

/// Result of a retention cleanup pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    pub deleted_traces: u64,
    pub deleted_memories: u64,
    pub freed_bytes_estimate: u64,
    pub cutoff: DateTime<Utc>,
}

/// Result of a bulk workspace purge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceDeletionReport {
    pub deleted_traces: u64,
    pub deleted_memories: u64,
}

/// Backend-agnostic storage contract. All operations are workspace-scoped
/// and synchronous from the caller's perspective (the `async` here exists so
/// both an inherently-async backend like `libsql` and a sync backend like
/// `redb`, wrapped in `spawn_blocking`, can implement it uniformly).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which similarity metric this adapter reports in [`SimilarityMatch::distance`].
    fn similarity_metric(&self) -> SimilarityMetric;

    /// Atomically persists a trace and its memory items, embedding `task`
    /// and each memory's `content`. On any partial-write failure the
    /// adapter must roll back inserts already applied.
    async fn store_trace(&self, trace: &ReasoningTrace, memories: &[MemoryItem]) -> Result<TraceId>;

    /// Top-k candidates by ascending distance under the adapter's metric.
    async fn query_similar_memories(
        &self,
        query_text: &str,
        k: usize,
        filters: &SimilarityFilters,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<Vec<SimilarityMatch>>;

    async fn get_trace(&self, id: TraceId) -> Result<Option<ReasoningTrace>>;
    async fn get_memory(&self, id: MemoryId) -> Result<Option<MemoryItem>>;
    async fn count_traces(&self) -> Result<u64>;
    async fn count_memories(&self) -> Result<u64>;
    async fn get_statistics(&self) -> Result<Statistics>;

    /// Genealogy-scan support: every memory's parent/derived-from/evolution
    /// metadata, optionally scoped to one workspace.
    async fn get_all_memories_metadata(
        &self,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<Vec<MemoryMetadata>>;

    /// Deletes traces (cascading to their memories) older than
    /// `retention_days`, optionally scoped to one workspace.
    async fn delete_old_traces(
        &self,
        retention_days: u32,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<RetentionReport>;

    /// Bulk-purges every trace and memory in `workspace_id`. Callers must
    /// gate this on an explicit confirmation flag (spec §7 `ConfirmationRequired`).
    async fn delete_workspace(&self, workspace_id: &WorkspaceId) -> Result<WorkspaceDeletionReport>;

    /// Full trace dump for backup/migration, optionally scoped to one workspace.
    async fn list_all_traces(&self, workspace_id: Option<&WorkspaceId>) -> Result<Vec<ReasoningTrace>>;

    /// Full memory dump for backup/migration, optionally scoped to one workspace.
    async fn list_all_memories(&self, workspace_id: Option<&WorkspaceId>) -> Result<Vec<MemoryItem>>;

    /// Inserts previously-dumped records (restore/migrate paths). Existing
    /// ids are skipped unless `overwrite` is set. Returns
    /// `(traces_inserted, memories_inserted)`.
    async fn restore_records(
        &self,
        traces: &[ReasoningTrace],
        memories: &[MemoryItem],
        overwrite: bool,
    ) -> Result<(u64, u64)>;
}
