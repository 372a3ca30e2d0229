//! Genealogy DAG walk (spec §4.5.5).
//!
//! Walks `parent_memory_id`/`derived_from` edges strictly through
//! [`StorageBackend::get_all_memories_metadata`] — never through
//! adapter-specific internals — mirroring the teacher's graph-traversal
//! idiom of operating over an in-memory adjacency snapshot rather than
//! re-querying storage per node.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::error::Result;
use crate::storage::{MemoryMetadata, StorageBackend};
use crate::types::{MemoryId, WorkspaceId};

/// One node in a genealogy walk result.
#[derive(Debug, Clone, Serialize)]
pub struct GenealogyNode {
    pub id: MemoryId,
    pub parent_memory_id: Option<MemoryId>,
    pub derived_from: Vec<MemoryId>,
    pub evolution_stage: u32,
    pub depth: u32,
}

/// Ancestors and descendants of `memory_id`, out to `max_depth` hops, within
/// `workspace`. Returns an empty result (not an error) if `memory_id` is
/// absent from the metadata snapshot.
pub async fn get_genealogy(
    storage: &dyn StorageBackend,
    memory_id: MemoryId,
    max_depth: u32,
    workspace: Option<&WorkspaceId>,
) -> Result<Vec<GenealogyNode>> {
    let all = storage.get_all_memories_metadata(workspace).await?;
    let by_id: HashMap<MemoryId, &MemoryMetadata> = all.iter().map(|m| (m.id, m)).collect();

    if !by_id.contains_key(&memory_id) {
        return Ok(Vec::new());
    }

    // Children index: parent_memory_id -> direct children, plus derived_from
    // edges (a memory can be "derived from" more than one ancestor).
    let mut children: HashMap<MemoryId, Vec<MemoryId>> = HashMap::new();
    for meta in &all {
        if let Some(parent) = meta.parent_memory_id {
            children.entry(parent).or_default().push(meta.id);
        }
        for ancestor in &meta.derived_from {
            children.entry(*ancestor).or_default().push(meta.id);
        }
    }

    let mut visited: HashSet<MemoryId> = HashSet::new();
    let mut result = Vec::new();
    let mut queue: VecDeque<(MemoryId, u32, bool)> = VecDeque::new();

    // Seed with the node itself, then fan out to ancestors and descendants.
    queue.push_back((memory_id, 0, true));
    visited.insert(memory_id);

    while let Some((id, depth, _)) = queue.pop_front() {
        let Some(meta) = by_id.get(&id) else {
            continue;
        };
        result.push(GenealogyNode {
            id: meta.id,
            parent_memory_id: meta.parent_memory_id,
            derived_from: meta.derived_from.clone(),
            evolution_stage: meta.evolution_stage,
            depth,
        });

        if depth >= max_depth {
            continue;
        }

        let mut next_ids: Vec<MemoryId> = Vec::new();
        if let Some(parent) = meta.parent_memory_id {
            next_ids.push(parent);
        }
        next_ids.extend(meta.derived_from.iter().copied());
        next_ids.extend(children.get(&id).cloned().unwrap_or_default());

        for next in next_ids {
            if visited.insert(next) {
                queue.push_back((next, depth + 1, true));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as CoreResult;
    use crate::storage::{
        RetentionReport, SimilarityFilters, SimilarityMatch, SimilarityMetric,
        WorkspaceDeletionReport,
    };
    use crate::types::{MemoryItem, ReasoningTrace, Statistics, TraceId};
    use async_trait::async_trait;
    use uuid::Uuid;

    struct FakeStorage {
        metadata: Vec<MemoryMetadata>,
    }

    #[async_trait]
    impl StorageBackend for FakeStorage {
        fn similarity_metric(&self) -> SimilarityMetric {
            SimilarityMetric::CosineComplement
        }
        async fn store_trace(
            &self,
            _trace: &ReasoningTrace,
            _memories: &[MemoryItem],
        ) -> CoreResult<TraceId> {
            unimplemented!()
        }
        async fn query_similar_memories(
            &self,
            _query_text: &str,
            _k: usize,
            _filters: &SimilarityFilters,
            _workspace_id: Option<&WorkspaceId>,
        ) -> CoreResult<Vec<SimilarityMatch>> {
            unimplemented!()
        }
        async fn get_trace(&self, _id: TraceId) -> CoreResult<Option<ReasoningTrace>> {
            unimplemented!()
        }
        async fn get_memory(&self, _id: MemoryId) -> CoreResult<Option<MemoryItem>> {
            unimplemented!()
        }
        async fn count_traces(&self) -> CoreResult<u64> {
            unimplemented!()
        }
        async fn count_memories(&self) -> CoreResult<u64> {
            unimplemented!()
        }
        async fn get_statistics(&self) -> CoreResult<Statistics> {
            unimplemented!()
        }
        async fn get_all_memories_metadata(
            &self,
            _workspace_id: Option<&WorkspaceId>,
        ) -> CoreResult<Vec<MemoryMetadata>> {
            Ok(self.metadata.clone())
        }
        async fn delete_old_traces(
            &self,
            _retention_days: u32,
            _workspace_id: Option<&WorkspaceId>,
        ) -> CoreResult<RetentionReport> {
            unimplemented!()
        }
        async fn delete_workspace(
            &self,
            _workspace_id: &WorkspaceId,
        ) -> CoreResult<WorkspaceDeletionReport> {
            unimplemented!()
        }
        async fn list_all_traces(
            &self,
            _workspace_id: Option<&WorkspaceId>,
        ) -> CoreResult<Vec<ReasoningTrace>> {
            unimplemented!()
        }
        async fn list_all_memories(
            &self,
            _workspace_id: Option<&WorkspaceId>,
        ) -> CoreResult<Vec<MemoryItem>> {
            unimplemented!()
        }
        async fn restore_records(
            &self,
            _traces: &[ReasoningTrace],
            _memories: &[MemoryItem],
            _overwrite: bool,
        ) -> CoreResult<(u64, u64)> {
            unimplemented!()
        }
    }

    fn meta(id: MemoryId, parent: Option<MemoryId>, stage: u32) -> MemoryMetadata {
        MemoryMetadata {
            id,
            parent_memory_id: parent,
            derived_from: parent.into_iter().collect(),
            evolution_stage: stage,
            workspace_id: "ws".to_string(),
        }
    }

    #[tokio::test]
    async fn walks_ancestors_and_descendants() {
        let grandparent = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        let storage = FakeStorage {
            metadata: vec![
                meta(grandparent, None, 0),
                meta(parent, Some(grandparent), 1),
                meta(child, Some(parent), 2),
            ],
        };

        let result = get_genealogy(&storage, parent, 5, None).await.unwrap();
        let ids: HashSet<MemoryId> = result.iter().map(|n| n.id).collect();
        assert!(ids.contains(&grandparent));
        assert!(ids.contains(&parent));
        assert!(ids.contains(&child));
    }

    #[tokio::test]
    async fn respects_max_depth() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let storage = FakeStorage {
            metadata: vec![meta(a, None, 0), meta(b, Some(a), 1), meta(c, Some(b), 2)],
        };

        let result = get_genealogy(&storage, a, 1, None).await.unwrap();
        let ids: HashSet<MemoryId> = result.iter().map(|n| n.id).collect();
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
        assert!(!ids.contains(&c));
    }

    #[tokio::test]
    async fn unknown_memory_id_returns_empty() {
        let storage = FakeStorage { metadata: vec![] };
        let result = get_genealogy(&storage, Uuid::new_v4(), 5, None).await.unwrap();
        assert!(result.is_empty());
    }
}
