//! `StorageBackend` implementation over the two `redb` tables.
//!
//! Every call hands its `redb` work to `spawn_blocking`, mirroring the
//! teacher's cache-layer pattern of keeping the sync `redb` transaction API
//! off the async executor thread.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use redb::{Database, ReadableTable};
use tracing::{debug, warn};

use reason_memory_core::embeddings::cosine_similarity;
use reason_memory_core::error::{Error, Result};
use reason_memory_core::memory::stats::compute_statistics;
use reason_memory_core::storage::{
    MemoryMetadata, RetentionReport, SimilarityFilters, SimilarityMatch, SimilarityMetric,
    StorageBackend, WorkspaceDeletionReport,
};
use reason_memory_core::types::{MemoryId, MemoryItem, ReasoningTrace, Statistics, TraceId, WorkspaceId};

use crate::tables::{MEMORIES_TABLE, TRACES_TABLE};
use crate::RedbStorage;

fn load_all_traces(db: &Database) -> Result<Vec<ReasoningTrace>> {
    let read_txn = db
        .begin_read()
        .map_err(|e| Error::Storage(format!("begin read: {e}")))?;
    let table = read_txn
        .open_table(TRACES_TABLE)
        .map_err(|e| Error::Storage(format!("open traces table: {e}")))?;
    let mut out = Vec::new();
    for entry in table
        .iter()
        .map_err(|e| Error::Storage(format!("iterate traces: {e}")))?
    {
        let (_, bytes) = entry.map_err(|e| Error::Storage(format!("read trace entry: {e}")))?;
        let trace: ReasoningTrace = serde_json::from_slice(bytes.value())?;
        out.push(trace);
    }
    Ok(out)
}

fn load_all_memories(db: &Database) -> Result<Vec<MemoryItem>> {
    let read_txn = db
        .begin_read()
        .map_err(|e| Error::Storage(format!("begin read: {e}")))?;
    let table = read_txn
        .open_table(MEMORIES_TABLE)
        .map_err(|e| Error::Storage(format!("open memories table: {e}")))?;
    let mut out = Vec::new();
    for entry in table
        .iter()
        .map_err(|e| Error::Storage(format!("iterate memories: {e}")))?
    {
        let (_, bytes) = entry.map_err(|e| Error::Storage(format!("read memory entry: {e}")))?;
        let memory: MemoryItem = serde_json::from_slice(bytes.value())?;
        out.push(memory);
    }
    Ok(out)
}

fn scoped<'a, T>(items: &'a [T], workspace_id: Option<&WorkspaceId>, ws_of: impl Fn(&T) -> &WorkspaceId) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| workspace_id.is_none_or(|w| ws_of(item) == w))
        .collect()
}

#[async_trait]
impl StorageBackend for RedbStorage {
    fn similarity_metric(&self) -> SimilarityMetric {
        SimilarityMetric::CosineComplement
    }

    async fn store_trace(&self, trace: &ReasoningTrace, memories: &[MemoryItem]) -> Result<TraceId> {
        let mut trace = trace.clone();
        if trace.task_embedding.is_none() {
            trace.task_embedding = Some(self.embedder.embed(&trace.task)?);
        }
        let mut memories = memories.to_vec();
        for memory in &mut memories {
            if memory.content_embedding.is_none() {
                memory.content_embedding = Some(self.embedder.embed(&memory.content)?);
            }
        }
        trace.memory_items = memories.iter().map(|m| m.id).collect();

        let trace_bytes = serde_json::to_vec(&trace)?;
        let trace_key = trace.id.to_string();
        let memory_payloads: Vec<(String, Vec<u8>)> = memories
            .iter()
            .map(|m| Ok::<_, Error>((m.id.to_string(), serde_json::to_vec(m)?)))
            .collect::<Result<_>>()?;

        let db = Arc::clone(&self.db);
        let trace_id = trace.id;
        tokio::task::spawn_blocking(move || -> Result<()> {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("begin write: {e}")))?;
            {
                let mut traces = write_txn
                    .open_table(TRACES_TABLE)
                    .map_err(|e| Error::Storage(format!("open traces table: {e}")))?;
                traces
                    .insert(trace_key.as_str(), trace_bytes.as_slice())
                    .map_err(|e| Error::Storage(format!("insert trace: {e}")))?;

                let mut mems = write_txn
                    .open_table(MEMORIES_TABLE)
                    .map_err(|e| Error::Storage(format!("open memories table: {e}")))?;
                for (key, bytes) in &memory_payloads {
                    mems.insert(key.as_str(), bytes.as_slice())
                        .map_err(|e| Error::Storage(format!("insert memory: {e}")))?;
                }
            }
            write_txn
                .commit()
                .map_err(|e| Error::Storage(format!("commit trace write: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))??;

        debug!(trace_id = %trace_id, memories = memories.len(), "stored trace");
        Ok(trace_id)
    }

    async fn query_similar_memories(
        &self,
        query_text: &str,
        k: usize,
        filters: &SimilarityFilters,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<Vec<SimilarityMatch>> {
        let query_embedding = self.embedder.embed(query_text)?;
        let db = Arc::clone(&self.db);
        let all = tokio::task::spawn_blocking(move || load_all_memories(&db))
            .await
            .map_err(|e| Error::Storage(format!("join error: {e}")))??;

        let mut candidates: Vec<SimilarityMatch> = scoped(&all, workspace_id, |m| &m.workspace_id)
            .into_iter()
            .filter(|m| filters.include_failures || m.error_context.is_none())
            .filter(|m| {
                filters
                    .domain_filter
                    .as_deref()
                    .is_none_or(|d| m.domain_category == d)
            })
            .filter(|m| match &filters.pattern_tags {
                None => true,
                Some(tags) => tags.iter().any(|t| m.pattern_tags.contains(t)),
            })
            .filter_map(|m| {
                let embedding = m.content_embedding.as_ref()?;
                let similarity = cosine_similarity(&query_embedding, embedding);
                let distance = 1.0 - similarity;
                Some(SimilarityMatch {
                    memory: m.clone(),
                    distance,
                })
            })
            .filter(|candidate| {
                filters
                    .min_similarity
                    .is_none_or(|min| 1.0 - candidate.distance >= min)
            })
            .collect();

        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates.truncate(k);
        Ok(candidates)
    }

    async fn get_trace(&self, id: TraceId) -> Result<Option<ReasoningTrace>> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<Option<ReasoningTrace>> {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Storage(format!("begin read: {e}")))?;
            let table = read_txn
                .open_table(TRACES_TABLE)
                .map_err(|e| Error::Storage(format!("open traces table: {e}")))?;
            match table
                .get(id.to_string().as_str())
                .map_err(|e| Error::Storage(format!("get trace: {e}")))?
            {
                Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn get_memory(&self, id: MemoryId) -> Result<Option<MemoryItem>> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<Option<MemoryItem>> {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Storage(format!("begin read: {e}")))?;
            let table = read_txn
                .open_table(MEMORIES_TABLE)
                .map_err(|e| Error::Storage(format!("open memories table: {e}")))?;
            match table
                .get(id.to_string().as_str())
                .map_err(|e| Error::Storage(format!("get memory: {e}")))?
            {
                Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn count_traces(&self) -> Result<u64> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || load_all_traces(&db).map(|t| t.len() as u64))
            .await
            .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn count_memories(&self) -> Result<u64> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || load_all_memories(&db).map(|m| m.len() as u64))
            .await
            .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn get_statistics(&self) -> Result<Statistics> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let traces = load_all_traces(&db)?;
            let memories = load_all_memories(&db)?;
            Ok(compute_statistics(&traces, &memories))
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn get_all_memories_metadata(
        &self,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<Vec<MemoryMetadata>> {
        let db = Arc::clone(&self.db);
        let workspace_id = workspace_id.cloned();
        tokio::task::spawn_blocking(move || {
            let memories = load_all_memories(&db)?;
            Ok(scoped(&memories, workspace_id.as_ref(), |m| &m.workspace_id)
                .into_iter()
                .map(|m| MemoryMetadata {
                    id: m.id,
                    parent_memory_id: m.parent_memory_id,
                    derived_from: m.derived_from.clone(),
                    evolution_stage: m.evolution_stage,
                    workspace_id: m.workspace_id.clone(),
                })
                .collect())
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn delete_old_traces(
        &self,
        retention_days: u32,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<RetentionReport> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
        let db = Arc::clone(&self.db);
        let workspace_id = workspace_id.cloned();
        tokio::task::spawn_blocking(move || -> Result<RetentionReport> {
            let traces = load_all_traces(&db)?;
            let memories = load_all_memories(&db)?;

            let stale_traces: Vec<&ReasoningTrace> = scoped(&traces, workspace_id.as_ref(), |t| &t.workspace_id)
                .into_iter()
                .filter(|t| t.timestamp < cutoff)
                .collect();
            let stale_memory_ids: std::collections::HashSet<MemoryId> = stale_traces
                .iter()
                .flat_map(|t| t.memory_items.iter().copied())
                .collect();

            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("begin write: {e}")))?;
            let mut freed_bytes = 0u64;
            {
                let mut traces_table = write_txn
                    .open_table(TRACES_TABLE)
                    .map_err(|e| Error::Storage(format!("open traces table: {e}")))?;
                for t in &stale_traces {
                    if let Some(removed) = traces_table
                        .remove(t.id.to_string().as_str())
                        .map_err(|e| Error::Storage(format!("remove trace: {e}")))?
                    {
                        freed_bytes += removed.value().len() as u64;
                    }
                }
                let mut mems_table = write_txn
                    .open_table(MEMORIES_TABLE)
                    .map_err(|e| Error::Storage(format!("open memories table: {e}")))?;
                for m in memories.iter().filter(|m| stale_memory_ids.contains(&m.id)) {
                    if let Some(removed) = mems_table
                        .remove(m.id.to_string().as_str())
                        .map_err(|e| Error::Storage(format!("remove memory: {e}")))?
                    {
                        freed_bytes += removed.value().len() as u64;
                    }
                }
            }
            write_txn
                .commit()
                .map_err(|e| Error::Storage(format!("commit retention delete: {e}")))?;

            Ok(RetentionReport {
                deleted_traces: stale_traces.len() as u64,
                deleted_memories: stale_memory_ids.len() as u64,
                freed_bytes_estimate: freed_bytes,
                cutoff,
            })
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn delete_workspace(&self, workspace_id: &WorkspaceId) -> Result<WorkspaceDeletionReport> {
        let db = Arc::clone(&self.db);
        let workspace_id = workspace_id.clone();
        tokio::task::spawn_blocking(move || -> Result<WorkspaceDeletionReport> {
            let traces = load_all_traces(&db)?;
            let memories = load_all_memories(&db)?;

            let target_traces: Vec<&ReasoningTrace> =
                traces.iter().filter(|t| t.workspace_id == workspace_id).collect();
            let target_memories: Vec<&MemoryItem> =
                memories.iter().filter(|m| m.workspace_id == workspace_id).collect();

            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("begin write: {e}")))?;
            {
                let mut traces_table = write_txn
                    .open_table(TRACES_TABLE)
                    .map_err(|e| Error::Storage(format!("open traces table: {e}")))?;
                for t in &target_traces {
                    traces_table
                        .remove(t.id.to_string().as_str())
                        .map_err(|e| Error::Storage(format!("remove trace: {e}")))?;
                }
                let mut mems_table = write_txn
                    .open_table(MEMORIES_TABLE)
                    .map_err(|e| Error::Storage(format!("open memories table: {e}")))?;
                for m in &target_memories {
                    mems_table
                        .remove(m.id.to_string().as_str())
                        .map_err(|e| Error::Storage(format!("remove memory: {e}")))?;
                }
            }
            write_txn
                .commit()
                .map_err(|e| Error::Storage(format!("commit workspace delete: {e}")))?;

            Ok(WorkspaceDeletionReport {
                deleted_traces: target_traces.len() as u64,
                deleted_memories: target_memories.len() as u64,
            })
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn list_all_traces(&self, workspace_id: Option<&WorkspaceId>) -> Result<Vec<ReasoningTrace>> {
        let db = Arc::clone(&self.db);
        let workspace_id = workspace_id.cloned();
        tokio::task::spawn_blocking(move || {
            let traces = load_all_traces(&db)?;
            Ok(scoped(&traces, workspace_id.as_ref(), |t| &t.workspace_id)
                .into_iter()
                .cloned()
                .collect())
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn list_all_memories(&self, workspace_id: Option<&WorkspaceId>) -> Result<Vec<MemoryItem>> {
        let db = Arc::clone(&self.db);
        let workspace_id = workspace_id.cloned();
        tokio::task::spawn_blocking(move || {
            let memories = load_all_memories(&db)?;
            Ok(scoped(&memories, workspace_id.as_ref(), |m| &m.workspace_id)
                .into_iter()
                .cloned()
                .collect())
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }

    async fn restore_records(
        &self,
        traces: &[ReasoningTrace],
        memories: &[MemoryItem],
        overwrite: bool,
    ) -> Result<(u64, u64)> {
        let db = Arc::clone(&self.db);
        let traces = traces.to_vec();
        let memories = memories.to_vec();
        tokio::task::spawn_blocking(move || -> Result<(u64, u64)> {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Storage(format!("begin write: {e}")))?;
            let mut traces_inserted = 0u64;
            let mut memories_inserted = 0u64;
            {
                let mut traces_table = write_txn
                    .open_table(TRACES_TABLE)
                    .map_err(|e| Error::Storage(format!("open traces table: {e}")))?;
                for t in &traces {
                    let key = t.id.to_string();
                    if !overwrite && traces_table.get(key.as_str()).map_err(|e| Error::Storage(e.to_string()))?.is_some() {
                        continue;
                    }
                    let bytes = serde_json::to_vec(t)?;
                    traces_table
                        .insert(key.as_str(), bytes.as_slice())
                        .map_err(|e| Error::Storage(format!("insert trace: {e}")))?;
                    traces_inserted += 1;
                }
                let mut mems_table = write_txn
                    .open_table(MEMORIES_TABLE)
                    .map_err(|e| Error::Storage(format!("open memories table: {e}")))?;
                for m in &memories {
                    let key = m.id.to_string();
                    if !overwrite && mems_table.get(key.as_str()).map_err(|e| Error::Storage(e.to_string()))?.is_some() {
                        continue;
                    }
                    let bytes = serde_json::to_vec(m)?;
                    mems_table
                        .insert(key.as_str(), bytes.as_slice())
                        .map_err(|e| Error::Storage(format!("insert memory: {e}")))?;
                    memories_inserted += 1;
                }
            }
            write_txn
                .commit()
                .map_err(|e| Error::Storage(format!("commit restore: {e}")))?;
            if traces_inserted < traces.len() as u64 {
                warn!(
                    skipped = traces.len() as u64 - traces_inserted,
                    "restore skipped existing trace ids (overwrite=false)"
                );
            }
            Ok((traces_inserted, memories_inserted))
        })
        .await
        .map_err(|e| Error::Storage(format!("join error: {e}")))?
    }
}
