#![allow(clippy::missing_errors_doc)]

//! Command-line binding for the tool surface exposed by
//! `reason-memory-core` (spec §6). This crate supplies the transport the
//! core explicitly leaves out: argument parsing, layered configuration, the
//! real HTTP-backed LLM oracle client, and human/JSON/YAML output.

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod llm_client;
pub mod output;

use std::path::Path;
use std::sync::Arc;

use reason_memory_core::embeddings::DeterministicEmbedder;
use reason_memory_core::error::Error;
use reason_memory_core::oracle::CachedOracle;
use reason_memory_core::reasoning::ReasoningEngine;
use reason_memory_core::storage::StorageBackend;
use reason_memory_core::types::WorkspaceId;
use reason_memory_core::workspace;
use reason_memory_core::MemoryCore;

use cli::{Cli, Commands};
use commands::Context;
use config::{Config, StorageBackendKind};
use llm_client::HttpLlmClient;
use output::OutputFormat;

/// Builds the configured storage backend. Mirrors `config.storage.backend`.
async fn build_storage(config: &Config) -> Result<Arc<dyn StorageBackend>, Error> {
    let embedder = Arc::new(DeterministicEmbedder::new());
    match config.storage.backend {
        StorageBackendKind::Embedded => {
            let storage =
                reason_memory_store_embedded::RedbStorage::open(&config.storage.embedded_dir, embedder)?;
            Ok(Arc::new(storage))
        }
        StorageBackendKind::Hosted => {
            let url = config
                .storage
                .hosted_url
                .as_deref()
                .ok_or_else(|| Error::Validation("storage.hosted_url is not configured".to_string()))?;
            let token = config.storage.hosted_token.as_deref().unwrap_or_default();
            let storage = reason_memory_store_hosted::HostedStorage::connect(url, token, embedder).await?;
            Ok(Arc::new(storage))
        }
    }
}

/// Resolves the workspace id from `--workspace`, falling back to the
/// current directory, via the same path-hash the `manage_workspace` tool uses.
fn resolve_workspace(path: Option<&Path>) -> anyhow::Result<WorkspaceId> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let handle = workspace::set(&path)?;
    Ok(handle.id)
}

/// Parses CLI args, builds the engine/memory/oracle stack, dispatches the
/// requested subcommand, and prints the result. Returns the process exit code.
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log_level);

    let oracle_client = HttpLlmClient::new(config.oracle.base_url.clone(), config.oracle.api_key.clone());
    oracle_client
        .probe()
        .await
        .map_err(|e| anyhow::anyhow!("startup API-key probe failed: {e}"))?;

    let storage = build_storage(&config).await?;
    let embedder = Arc::new(DeterministicEmbedder::new());
    let memory = MemoryCore::new(storage, embedder);

    let cache_ttl = std::time::Duration::from_secs(config.cache.ttl_secs);
    let cache_size = if config.cache.enabled { config.cache.size } else { 0 };
    let oracle = Arc::new(
        CachedOracle::new(Box::new(oracle_client), cache_size, cache_ttl)
            .with_retry_config(config.retry_config()),
    );

    let engine = ReasoningEngine::new(
        Arc::clone(&oracle),
        memory.clone(),
        config.oracle.model.clone(),
        config.reasoning_effort(),
    )
    .with_loop_config(
        config.engine.max_iterations,
        config.engine.success_threshold,
        config.engine.retrieval_k,
    );

    let workspace_id = resolve_workspace(cli.workspace.as_deref())?;
    let ctx = Context::new(engine, memory, oracle, workspace_id, config);

    dispatch(&ctx, &cli.command, cli.format).await
}

/// Prints a tool result (or the error it failed with) and maps it to an
/// exit code. Every subcommand arm funnels through this single place so
/// printing and error classification stay in sync.
fn finish<T: output::Output>(
    result: Result<T, reason_memory_core::error::Error>,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    match result {
        Ok(value) => {
            output::print(&value, format)?;
            Ok(errors::EXIT_OK)
        }
        Err(err) => {
            errors::print_error(&err);
            Ok(errors::exit_code(&err))
        }
    }
}

async fn dispatch(ctx: &Context, command: &Commands, format: OutputFormat) -> anyhow::Result<i32> {
    match command {
        Commands::Solve { .. } => finish(commands::run_solve(ctx, command).await, format),
        Commands::Retrieve { .. } => finish(commands::run_retrieve(ctx, command).await, format),
        Commands::Capture { .. } => finish(commands::run_capture(ctx, command).await, format),
        Commands::Search { .. } => finish(commands::run_search(ctx, command).await, format),
        Commands::Genealogy { .. } => finish(commands::run_genealogy(ctx, command).await, format),
        Commands::Stats => finish(commands::run_stats(ctx).await, format),
        Commands::Workspace { .. } => finish(commands::run_workspace(ctx, command), format),
        Commands::Backup { .. } => finish(commands::run_backup(ctx, command).await, format),
        Commands::Cleanup { .. } => finish(commands::run_cleanup(ctx, command).await, format),
        Commands::Metrics { .. } => finish(Ok(commands::run_metrics(ctx, command)), format),
        Commands::Cache { .. } => finish(commands::run_cache(ctx, command), format),
        Commands::Migrate { .. } => finish(commands::run_migrate(ctx, command).await, format),
        Commands::Compress { .. } => finish(Ok(commands::run_compress(ctx, command)), format),
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
