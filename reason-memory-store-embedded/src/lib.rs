#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Embedded `redb` storage adapter for the memory-augmented reasoning
//! service (spec §4.3): a single-file, zero-dependency-server backend
//! intended for local/single-tenant deployments.
//!
//! Records are JSON-serialized into two `redb` tables (traces, memories);
//! similarity search is a brute-force cosine scan over the in-table memory
//! set, which is the right tradeoff at the scale this backend targets (no
//! vector index, no background compaction thread).

mod backend;
mod tables;

use std::path::Path;
use std::sync::Arc;

use redb::Database;

use reason_memory_core::embeddings::EmbeddingProvider;
use reason_memory_core::error::{Error, Result};

/// `redb`-backed [`reason_memory_core::storage::StorageBackend`] implementation.
pub struct RedbStorage {
    db: Arc<Database>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl RedbStorage {
    /// Opens (or creates) a `redb` database file at `path`.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let db = Database::create(path.as_ref())
            .map_err(|e| Error::Storage(format!("failed to open redb database: {e}")))?;
        let write_txn = db
            .begin_write()
            .map_err(|e| Error::Storage(format!("failed to begin write transaction: {e}")))?;
        {
            let _ = write_txn
                .open_table(tables::TRACES_TABLE)
                .map_err(|e| Error::Storage(format!("failed to open traces table: {e}")))?;
            let _ = write_txn
                .open_table(tables::MEMORIES_TABLE)
                .map_err(|e| Error::Storage(format!("failed to open memories table: {e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("failed to commit schema init: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            embedder,
        })
    }

    /// Opens a database file inside `dir`, for tests and one-off tooling.
    pub fn open_in_dir(embedder: Arc<dyn EmbeddingProvider>, dir: &Path) -> Result<Self> {
        Self::open(dir.join("reason-memory.redb"), embedder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reason_memory_core::embeddings::DeterministicEmbedder;
    use reason_memory_core::storage::StorageBackend;
    use reason_memory_core::types::{
        DifficultyLevel, MemoryItem, Outcome, ReasoningTrace, StepAction, TraceMetadata,
        TrajectoryStep,
    };
    use uuid::Uuid;

    fn sample_memory(workspace: &str) -> MemoryItem {
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
            workspace_id: workspace.to_string(),
            created_at: chrono::Utc::now(),
            content_embedding: None,
        }
    }

    fn sample_trace(workspace: &str) -> ReasoningTrace {
        ReasoningTrace {
            id: Uuid::new_v4(),
            task: "implement retry with backoff".to_string(),
            trajectory: vec![TrajectoryStep::new(
                0,
                "thinking".to_string(),
                StepAction::Generate,
                "fn retry() {}".to_string(),
            )],
            outcome: Outcome::Success,
            memory_items: vec![],
            parent_trace_id: None,
            task_embedding: None,
            workspace_id: workspace.to_string(),
            timestamp: chrono::Utc::now(),
            metadata: TraceMetadata::default(),
        }
    }

    #[tokio::test]
    async fn store_and_fetch_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            RedbStorage::open_in_dir(Arc::new(DeterministicEmbedder::new()), dir.path()).unwrap();

        let trace = sample_trace("ws-1");
        let memory = sample_memory("ws-1");
        let trace_id = storage.store_trace(&trace, &[memory.clone()]).await.unwrap();

        let fetched = storage.get_trace(trace_id).await.unwrap().unwrap();
        assert_eq!(fetched.task, trace.task);

        let fetched_memory = storage.get_memory(memory.id).await.unwrap().unwrap();
        assert_eq!(fetched_memory.title, memory.title);

        assert_eq!(storage.count_traces().await.unwrap(), 1);
        assert_eq!(storage.count_memories().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn similarity_query_finds_stored_memory() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            RedbStorage::open_in_dir(Arc::new(DeterministicEmbedder::new()), dir.path()).unwrap();

        let trace = sample_trace("ws-1");
        let memory = sample_memory("ws-1");
        storage.store_trace(&trace, &[memory.clone()]).await.unwrap();

        let results = storage
            .query_similar_memories(
                &memory.content,
                5,
                &Default::default(),
                Some(&"ws-1".to_string()),
            )
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].memory.id, memory.id);
    }

    #[tokio::test]
    async fn workspace_deletion_only_affects_target_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            RedbStorage::open_in_dir(Arc::new(DeterministicEmbedder::new()), dir.path()).unwrap();

        storage
            .store_trace(&sample_trace("ws-a"), &[sample_memory("ws-a")])
            .await
            .unwrap();
        storage
            .store_trace(&sample_trace("ws-b"), &[sample_memory("ws-b")])
            .await
            .unwrap();

        let report = storage
            .delete_workspace(&"ws-a".to_string())
            .await
            .unwrap();
        assert_eq!(report.deleted_traces, 1);
        assert_eq!(report.deleted_memories, 1);
        assert_eq!(storage.count_traces().await.unwrap(), 1);
    }
}
