//! Memory Core: composite-scored retrieval, prompt rendering, judging,
//! extraction, genealogy, and statistics/retention (spec §4.5).

pub mod extraction;
pub mod genealogy;
pub mod judge;
pub mod prompt;
pub mod retrieval;
pub mod stats;

use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::storage::StorageBackend;
use crate::types::WorkspaceId;

pub use retrieval::{RetrievalParams, RetrievalResult};

/// Orchestrates the Memory Core's operations over a storage backend and an
/// embedding provider. Cheap to clone (everything behind it is `Arc`).
#[derive(Clone)]
pub struct MemoryCore {
    storage: Arc<dyn StorageBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MemoryCore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { storage, embedder }
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Composite-scored retrieval (spec §4.5.1).
    pub async fn retrieve(
        &self,
        task: &str,
        params: RetrievalParams,
        workspace: Option<&WorkspaceId>,
    ) -> Result<RetrievalResult> {
        retrieval::retrieve(self.storage.as_ref(), task, params, workspace).await
    }

    /// Aggregate statistics, forwarded straight to storage (spec §4.5.6).
    pub async fn statistics(&self) -> Result<crate::types::Statistics> {
        self.storage.get_statistics().await
    }

    /// Retention cleanup, forwarded straight to storage (spec §4.5.6, §4.3).
    pub async fn delete_old_traces(
        &self,
        retention_days: u32,
        workspace: Option<&WorkspaceId>,
    ) -> Result<crate::storage::RetentionReport> {
        self.storage.delete_old_traces(retention_days, workspace).await
    }

    /// Bulk-purges a workspace, clearing it from the process-wide
    /// current-workspace singleton if it was selected (spec §4.3
    /// `delete_workspace`, §4.7 `delete`).
    pub async fn delete_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<crate::storage::WorkspaceDeletionReport> {
        crate::workspace::delete(self.storage.as_ref(), workspace_id, true).await
    }
}
