//! Subcommand handlers, one module per tool-surface grouping.

mod admin;
mod backup;
mod memory;
mod solve;
mod workspace;

pub use admin::{run_cache, run_compress, run_metrics, run_stats};
pub use backup::{run_backup, run_cleanup, run_migrate};
pub use memory::{run_capture, run_genealogy, run_retrieve, run_search};
pub use solve::run_solve;
pub use workspace::run_workspace;

use std::sync::Arc;

use reason_memory_core::oracle::CachedOracle;
use reason_memory_core::reasoning::ReasoningEngine;
use reason_memory_core::tools::ToolHost;
use reason_memory_core::types::WorkspaceId;
use reason_memory_core::MemoryCore;

use crate::config::Config;

/// Everything a command handler needs: the bound tool host, the resolved
/// workspace id, and the config (for building a second backend in `migrate`).
pub struct Context {
    pub host: ToolHost,
    pub workspace_id: WorkspaceId,
    pub config: Config,
}

impl Context {
    #[must_use]
    pub fn new(
        engine: ReasoningEngine,
        memory: MemoryCore,
        oracle: Arc<CachedOracle>,
        workspace_id: WorkspaceId,
        config: Config,
    ) -> Self {
        Self {
            host: ToolHost::new(engine, memory, oracle),
            workspace_id,
            config,
        }
    }
}

/// Wraps a `Vec<T>` so `Output` can be implemented on it locally (the
/// upstream `Vec<T>` / tool-surface DTOs are both foreign to this crate).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(transparent)]
pub struct ListOutput<T>(pub Vec<T>);
