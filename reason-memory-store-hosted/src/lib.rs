#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Hosted `libSQL`/Turso storage adapter for the memory-augmented reasoning
//! service (spec §4.3): a durable, networked backend for multi-instance
//! deployments.
//!
//! The distilled spec names a vector-capable "hosted" store (e.g.
//! Postgres+pgvector); this adapter keeps the teacher's `libSQL` stack
//! instead of introducing a new database driver (documented divergence in
//! `DESIGN.md`), storing embeddings as JSON-encoded float arrays and
//! similarity-ranking in process. A production deployment large enough to
//! need index-backed ANN search would swap this module for one built on
//! `libSQL`'s vector extension; the `StorageBackend` contract is unaffected
//! either way.

mod backend;
mod schema;

use std::sync::Arc;

use libsql::{Builder, Database};

use reason_memory_core::embeddings::EmbeddingProvider;
use reason_memory_core::error::{Error, Result};
use reason_memory_core::storage::circuit_breaker::CircuitBreaker;

/// Configuration for connecting to a hosted `libSQL`/Turso database.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5000,
        }
    }
}

/// `libSQL`-backed [`reason_memory_core::storage::StorageBackend`] implementation.
pub struct HostedStorage {
    db: Arc<Database>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: HostedConfig,
    /// Shields every call from a repeatedly-failing remote connection
    /// (spec §4.3); every `StorageBackend` method funnels through
    /// `connection()`, so gating there covers the adapter as a whole.
    circuit: CircuitBreaker,
}

impl HostedStorage {
    /// Connects to a remote Turso database. Only `libsql://`, `file:`, and
    /// `:memory:` URLs are accepted; remote connections require a non-empty
    /// token.
    pub async fn connect(
        url: &str,
        token: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        Self::connect_with_config(url, token, embedder, HostedConfig::default()).await
    }

    pub async fn connect_with_config(
        url: &str,
        token: &str,
        embedder: Arc<dyn EmbeddingProvider>,
        config: HostedConfig,
    ) -> Result<Self> {
        if !url.starts_with("libsql://") && !url.starts_with("file:") && url != ":memory:" {
            return Err(Error::Validation(format!(
                "insecure database URL {url}: only libsql://, file:, or :memory: are allowed"
            )));
        }
        if url.starts_with("libsql://") && token.is_empty() {
            return Err(Error::Validation(
                "remote libsql:// connections require a non-empty auth token".to_string(),
            ));
        }

        let db = if url.starts_with("libsql://") {
            Builder::new_remote(url.to_string(), token.to_string())
                .build()
                .await
        } else {
            Builder::new_local(url).build().await
        }
        .map_err(|e| Error::Storage(format!("failed to open libsql database: {e}")))?;

        let storage = Self {
            db: Arc::new(db),
            embedder,
            circuit: CircuitBreaker::new(5, std::time::Duration::from_secs(30)),
            config,
        };
        storage.initialize_schema().await?;
        Ok(storage)
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(schema::CREATE_TRACES_TABLE, ())
            .await
            .map_err(|e| Error::Storage(format!("create traces table: {e}")))?;
        conn.execute(schema::CREATE_MEMORIES_TABLE, ())
            .await
            .map_err(|e| Error::Storage(format!("create memories table: {e}")))?;
        conn.execute(schema::CREATE_TRACES_WORKSPACE_INDEX, ())
            .await
            .map_err(|e| Error::Storage(format!("create traces index: {e}")))?;
        conn.execute(schema::CREATE_MEMORIES_WORKSPACE_INDEX, ())
            .await
            .map_err(|e| Error::Storage(format!("create memories index: {e}")))?;
        Ok(())
    }

    async fn connection(&self) -> Result<libsql::Connection> {
        self.circuit
            .call(|| async {
                self.db
                    .connect()
                    .map_err(|e| Error::Storage(format!("failed to open connection: {e}")))
            })
            .await
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

    async fn memory_storage() -> HostedStorage {
        HostedStorage::connect(":memory:", "", Arc::new(DeterministicEmbedder::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn store_and_fetch_round_trips() {
        let storage = memory_storage().await;
        let trace = sample_trace("ws-1");
        let memory = sample_memory("ws-1");
        let trace_id = storage.store_trace(&trace, &[memory.clone()]).await.unwrap();

        let fetched = storage.get_trace(trace_id).await.unwrap().unwrap();
        assert_eq!(fetched.task, trace.task);
        let fetched_memory = storage.get_memory(memory.id).await.unwrap().unwrap();
        assert_eq!(fetched_memory.title, memory.title);
    }

    #[tokio::test]
    async fn rejects_insecure_urls() {
        let err = HostedStorage::connect(
            "http://example.com",
            "token",
            Arc::new(DeterministicEmbedder::new()),
        )
        .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn rejects_remote_url_without_token() {
        let err = HostedStorage::connect(
            "libsql://example.turso.io",
            "",
            Arc::new(DeterministicEmbedder::new()),
        )
        .await;
        assert!(err.is_err());
    }
}
