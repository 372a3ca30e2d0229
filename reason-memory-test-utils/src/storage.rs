//! In-memory `StorageBackend`, for tests that don't need a real adapter.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use reason_memory_core::embeddings::EmbeddingProvider;
use reason_memory_core::error::Result;
use reason_memory_core::memory::stats::compute_statistics;
use reason_memory_core::storage::{
    MemoryMetadata, RetentionReport, SimilarityFilters, SimilarityMatch, SimilarityMetric,
    StorageBackend, WorkspaceDeletionReport,
};
use reason_memory_core::types::{
    MemoryId, MemoryItem, ReasoningTrace, Statistics, TraceId, WorkspaceId,
};

#[derive(Default)]
struct Inner {
    traces: HashMap<TraceId, ReasoningTrace>,
    memories: HashMap<MemoryId, MemoryItem>,
}

/// A plain `Mutex`-guarded `HashMap` pair standing in for a real adapter.
/// Every method is a faithful (if unindexed) implementation of the
/// contract, not a stub — tests against it exercise real filtering,
/// scoring, and cascade-delete logic.
#[derive(Default)]
pub struct InMemoryStorage {
    inner: Mutex<Inner>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("in-memory storage lock poisoned")
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    reason_memory_core::embeddings::cosine_similarity(a, b)
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn similarity_metric(&self) -> SimilarityMetric {
        SimilarityMetric::CosineComplement
    }

    async fn store_trace(&self, trace: &ReasoningTrace, memories: &[MemoryItem]) -> Result<TraceId> {
        let mut inner = self.lock();
        let mut trace = trace.clone();
        trace.memory_items = memories.iter().map(|m| m.id).collect();
        let id = trace.id;
        inner.traces.insert(id, trace);
        for memory in memories {
            inner.memories.insert(memory.id, memory.clone());
        }
        Ok(id)
    }

    async fn query_similar_memories(
        &self,
        query_text: &str,
        k: usize,
        filters: &SimilarityFilters,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<Vec<SimilarityMatch>> {
        let inner = self.lock();
        let embedder = reason_memory_core::embeddings::DeterministicEmbedder::new();
        let query_embedding = embedder.embed(query_text)?;

        let mut candidates: Vec<SimilarityMatch> = inner
            .memories
            .values()
            .filter(|m| workspace_id.is_none_or(|w| &m.workspace_id == w))
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
                let embedding = m.content_embedding.clone().or_else(|| embedder.embed(&m.content).ok())?;
                let similarity = cosine(&query_embedding, &embedding);
                Some(SimilarityMatch {
                    memory: m.clone(),
                    distance: 1.0 - similarity,
                })
            })
            .filter(|c| filters.min_similarity.is_none_or(|min| 1.0 - c.distance >= min))
            .collect();

        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates.truncate(k);
        Ok(candidates)
    }

    async fn get_trace(&self, id: TraceId) -> Result<Option<ReasoningTrace>> {
        Ok(self.lock().traces.get(&id).cloned())
    }

    async fn get_memory(&self, id: MemoryId) -> Result<Option<MemoryItem>> {
        Ok(self.lock().memories.get(&id).cloned())
    }

    async fn count_traces(&self) -> Result<u64> {
        Ok(self.lock().traces.len() as u64)
    }

    async fn count_memories(&self) -> Result<u64> {
        Ok(self.lock().memories.len() as u64)
    }

    async fn get_statistics(&self) -> Result<Statistics> {
        let inner = self.lock();
        let traces: Vec<ReasoningTrace> = inner.traces.values().cloned().collect();
        let memories: Vec<MemoryItem> = inner.memories.values().cloned().collect();
        Ok(compute_statistics(&traces, &memories))
    }

    async fn get_all_memories_metadata(
        &self,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<Vec<MemoryMetadata>> {
        let inner = self.lock();
        Ok(inner
            .memories
            .values()
            .filter(|m| workspace_id.is_none_or(|w| &m.workspace_id == w))
            .map(|m| MemoryMetadata {
                id: m.id,
                parent_memory_id: m.parent_memory_id,
                derived_from: m.derived_from.clone(),
                evolution_stage: m.evolution_stage,
                workspace_id: m.workspace_id.clone(),
            })
            .collect())
    }

    async fn delete_old_traces(
        &self,
        retention_days: u32,
        workspace_id: Option<&WorkspaceId>,
    ) -> Result<RetentionReport> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
        let mut inner = self.lock();

        let stale_ids: Vec<TraceId> = inner
            .traces
            .values()
            .filter(|t| workspace_id.is_none_or(|w| &t.workspace_id == w))
            .filter(|t| t.timestamp < cutoff)
            .map(|t| t.id)
            .collect();

        let mut stale_memory_ids = std::collections::HashSet::new();
        for id in &stale_ids {
            if let Some(trace) = inner.traces.remove(id) {
                stale_memory_ids.extend(trace.memory_items);
            }
        }
        for id in &stale_memory_ids {
            inner.memories.remove(id);
        }

        Ok(RetentionReport {
            deleted_traces: stale_ids.len() as u64,
            deleted_memories: stale_memory_ids.len() as u64,
            freed_bytes_estimate: 0,
            cutoff,
        })
    }

    async fn delete_workspace(&self, workspace_id: &WorkspaceId) -> Result<WorkspaceDeletionReport> {
        let mut inner = self.lock();
        let before_traces = inner.traces.len();
        let before_memories = inner.memories.len();
        inner.traces.retain(|_, t| &t.workspace_id != workspace_id);
        inner.memories.retain(|_, m| &m.workspace_id != workspace_id);
        Ok(WorkspaceDeletionReport {
            deleted_traces: (before_traces - inner.traces.len()) as u64,
            deleted_memories: (before_memories - inner.memories.len()) as u64,
        })
    }

    async fn list_all_traces(&self, workspace_id: Option<&WorkspaceId>) -> Result<Vec<ReasoningTrace>> {
        Ok(self
            .lock()
            .traces
            .values()
            .filter(|t| workspace_id.is_none_or(|w| &t.workspace_id == w))
            .cloned()
            .collect())
    }

    async fn list_all_memories(&self, workspace_id: Option<&WorkspaceId>) -> Result<Vec<MemoryItem>> {
        Ok(self
            .lock()
            .memories
            .values()
            .filter(|m| workspace_id.is_none_or(|w| &m.workspace_id == w))
            .cloned()
            .collect())
    }

    async fn restore_records(
        &self,
        traces: &[ReasoningTrace],
        memories: &[MemoryItem],
        overwrite: bool,
    ) -> Result<(u64, u64)> {
        let mut inner = self.lock();
        let mut traces_inserted = 0u64;
        let mut memories_inserted = 0u64;
        for trace in traces {
            if !overwrite && inner.traces.contains_key(&trace.id) {
                continue;
            }
            inner.traces.insert(trace.id, trace.clone());
            traces_inserted += 1;
        }
        for memory in memories {
            if !overwrite && inner.memories.contains_key(&memory.id) {
                continue;
            }
            inner.memories.insert(memory.id, memory.clone());
            memories_inserted += 1;
        }
        Ok((traces_inserted, memories_inserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sample_trace, MemoryItemBuilder};
    use reason_memory_core::types::Outcome;

    #[tokio::test]
    async fn stores_and_retrieves_by_id() {
        let storage = InMemoryStorage::new();
        let trace = sample_trace("ws-1", Outcome::Success);
        let memory = MemoryItemBuilder::new("ws-1").build();
        let id = storage.store_trace(&trace, &[memory.clone()]).await.unwrap();
        assert_eq!(storage.get_trace(id).await.unwrap().unwrap().task, trace.task);
        assert!(storage.get_memory(memory.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn workspace_delete_is_scoped() {
        let storage = InMemoryStorage::new();
        storage
            .store_trace(&sample_trace("ws-a", Outcome::Success), &[MemoryItemBuilder::new("ws-a").build()])
            .await
            .unwrap();
        storage
            .store_trace(&sample_trace("ws-b", Outcome::Success), &[MemoryItemBuilder::new("ws-b").build()])
            .await
            .unwrap();

        let report = storage.delete_workspace(&"ws-a".to_string()).await.unwrap();
        assert_eq!(report.deleted_traces, 1);
        assert_eq!(storage.count_traces().await.unwrap(), 1);
    }
}
