//! Top-level `clap` command tree: one subcommand per tool-surface operation
//! (spec §6), mirroring the teacher's top-level `Cli`/`Commands` split with
//! nested subcommands for the three tools that are themselves small actions
//! (`workspace`, `backup`, `cache`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reason_memory_core::reasoning::MattsMode;
use uuid::Uuid;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "reason-memory")]
#[command(about = "Memory-augmented reasoning service CLI")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to ./reason-memory.toml if present).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Workspace directory. Resolves to a workspace id the same way
    /// `manage_workspace(set)` does; defaults to the current directory.
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the iterative reasoning engine on a coding task.
    Solve {
        /// The task description (>= 10 chars).
        task: String,
        #[arg(long, default_value_t = true)]
        use_memory: bool,
        #[arg(long)]
        enable_matts: bool,
        #[arg(long, default_value_t = 3)]
        matts_k: u32,
        #[arg(long, value_enum, default_value_t = MattsModeArg::Parallel)]
        matts_mode: MattsModeArg,
        #[arg(long, default_value_t = true)]
        store_result: bool,
    },
    /// Retrieve memories similar to a query.
    Retrieve {
        query: String,
        #[arg(long, default_value_t = 5)]
        n_results: usize,
        #[arg(long)]
        domain_filter: Option<String>,
        #[arg(long, value_delimiter = ',')]
        pattern_tags: Option<Vec<String>>,
        #[arg(long)]
        include_failures: bool,
        #[arg(long, default_value_t = 0.0)]
        min_score: f64,
    },
    /// Manually record a question/answer pair as a memory candidate.
    Capture {
        question: String,
        answer: String,
        #[arg(long)]
        force_store: bool,
    },
    /// Weighted search over memories (semantic/quality/recency).
    Search {
        query: String,
        #[arg(long, default_value_t = 0.6)]
        semantic_weight: f64,
        #[arg(long, default_value_t = 0.2)]
        quality_weight: f64,
        #[arg(long, default_value_t = 0.2)]
        recency_weight: f64,
        #[arg(long)]
        domain_filter: Option<String>,
    },
    /// Walk a memory's ancestor/descendant genealogy.
    Genealogy {
        memory_id: Uuid,
        #[arg(long, default_value_t = 5)]
        depth: u32,
    },
    /// Aggregate statistics and oracle cache stats.
    Stats,
    /// Process-wide current-workspace management.
    Workspace {
        #[command(subcommand)]
        action: WorkspaceCommands,
    },
    /// Snapshot backup, restore, and validation.
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },
    /// Age-based retention cleanup.
    Cleanup {
        #[arg(long, default_value_t = 90)]
        retention_days: u32,
        /// Scope the cleanup to one workspace instead of all of them.
        #[arg(long)]
        workspace_id: Option<String>,
        /// Required to clear an entire workspace's data.
        #[arg(long)]
        confirm: bool,
    },
    /// Per-tool call counts and latency.
    Metrics {
        #[arg(long)]
        reset_after_read: bool,
    },
    /// LLM oracle cache inspection/control.
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
    /// Copy all data from the configured backend to another backend.
    Migrate {
        #[arg(value_enum)]
        target_backend: TargetBackendArg,
        #[arg(long)]
        dry_run: bool,
    },
    /// Heuristically compress a prompt to a token budget.
    Compress {
        prompt: String,
        #[arg(long, default_value_t = 2000)]
        max_tokens: usize,
        #[arg(long, default_value_t = 0.5)]
        compression_ratio: f64,
    },
}

#[derive(Subcommand)]
pub enum WorkspaceCommands {
    /// Set the current workspace from a directory path.
    Set { path: PathBuf },
    /// Print the current workspace, if any.
    Get,
    /// Clear the current workspace.
    Clear,
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Snapshot traces/memories to `path`.
    Create {
        path: PathBuf,
        #[arg(long)]
        incremental: bool,
    },
    /// Restore a snapshot from `path`.
    Restore {
        path: PathBuf,
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        target_workspace_id: Option<String>,
    },
    /// Validate a snapshot's manifest without restoring it.
    Validate { path: PathBuf },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Print hit/miss/bypass/eviction counters.
    Stats,
    /// Drop every cached entry.
    Clear,
    /// Drop one entry by its request key, or everything if no key is given.
    Invalidate { key: Option<String> },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum MattsModeArg {
    Parallel,
    Sequential,
}

impl From<MattsModeArg> for MattsMode {
    fn from(value: MattsModeArg) -> Self {
        match value {
            MattsModeArg::Parallel => MattsMode::Parallel,
            MattsModeArg::Sequential => MattsMode::Sequential,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TargetBackendArg {
    Embedded,
    Hosted,
}
