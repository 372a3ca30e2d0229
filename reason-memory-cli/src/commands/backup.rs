use std::sync::Arc;

use colored::Colorize;
use reason_memory_core::backup::BackupManifest;
use reason_memory_core::embeddings::DeterministicEmbedder;
use reason_memory_core::error::{Error, Result};
use reason_memory_core::storage::{RetentionReport, StorageBackend, WorkspaceDeletionReport};
use reason_memory_core::tools::types::{
    BackupAction, BackupMemoriesInput, CleanupOldDataInput, CleanupOutcome, MigrateDatabaseInput,
    StorageBackendKind as ToolStorageBackendKind,
};
use serde::Serialize;

use crate::cli::{BackupCommands, Commands, TargetBackendArg};
use crate::config::{Config, StorageBackendKind};
use crate::output::Output;

use super::Context;

impl Output for BackupManifest {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "traces={} memories={} incremental={} checksum={}",
            self.trace_count, self.memory_count, self.incremental, self.checksum
        )?;
        Ok(())
    }
}

impl Output for RetentionReport {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "deleted {} traces, {} memories (cutoff {})",
            self.deleted_traces, self.deleted_memories, self.cutoff
        )?;
        Ok(())
    }
}

impl Output for WorkspaceDeletionReport {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "workspace purged: deleted {} traces, {} memories",
            self.deleted_traces, self.deleted_memories
        )?;
        Ok(())
    }
}

impl Output for CleanupOutcome {
    fn write_human<W: std::io::Write>(&self, writer: W) -> anyhow::Result<()> {
        match self {
            CleanupOutcome::Retention(report) => report.write_human(writer),
            CleanupOutcome::WorkspaceDeleted(report) => report.write_human(writer),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrateOutput {
    pub traces_copied: u64,
    pub memories_copied: u64,
    pub dry_run: bool,
}

impl Output for MigrateOutput {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let verb = if self.dry_run { "would copy" } else { "copied" };
        writeln!(
            writer,
            "{verb} {} traces, {} memories",
            self.traces_copied, self.memories_copied
        )?;
        Ok(())
    }
}

pub async fn run_backup(ctx: &Context, command: &Commands) -> Result<BackupManifest> {
    let Commands::Backup { action } = command else {
        unreachable!("run_backup dispatched with a non-Backup command")
    };
    let input = match action {
        BackupCommands::Create { path, incremental } => BackupMemoriesInput {
            action: BackupAction::Create,
            path: path.clone(),
            incremental: *incremental,
            overwrite: false,
            target_workspace_id: None,
        },
        BackupCommands::Restore {
            path,
            overwrite,
            target_workspace_id,
        } => BackupMemoriesInput {
            action: BackupAction::Restore,
            path: path.clone(),
            incremental: false,
            overwrite: *overwrite,
            target_workspace_id: target_workspace_id.clone(),
        },
        BackupCommands::Validate { path } => BackupMemoriesInput {
            action: BackupAction::Validate,
            path: path.clone(),
            incremental: false,
            overwrite: false,
            target_workspace_id: None,
        },
    };
    ctx.host
        .backup_memories(input, Some(&ctx.workspace_id))
        .await
}

/// `--confirm` switches the operation from an age-based retention sweep
/// (runs unattended, may be workspace-scoped) to an unconditional full
/// purge of `--workspace-id`, so it requires one to be given.
pub async fn run_cleanup(ctx: &Context, command: &Commands) -> Result<CleanupOutcome> {
    let Commands::Cleanup {
        retention_days,
        workspace_id,
        confirm,
    } = command
    else {
        unreachable!("run_cleanup dispatched with a non-Cleanup command")
    };
    if *confirm && workspace_id.is_none() {
        return Err(Error::ConfirmationRequired(
            "--confirm requires --workspace-id (full workspace delete needs a target)".to_string(),
        ));
    }
    ctx.host
        .cleanup_old_data(CleanupOldDataInput {
            retention_days: *retention_days,
            workspace_id: workspace_id.clone(),
            confirm_workspace_delete: *confirm,
        })
        .await
}

/// Builds the "other" backend a `migrate` call copies into, from the same
/// config the source backend was built from, per the config's `--target-backend`.
async fn build_destination(config: &Config, target: TargetBackendArg) -> Result<Arc<dyn StorageBackend>> {
    let embedder = Arc::new(DeterministicEmbedder::new());
    match target {
        TargetBackendArg::Embedded => {
            let storage = reason_memory_store_embedded::RedbStorage::open(
                &config.storage.embedded_dir,
                embedder,
            )?;
            Ok(Arc::new(storage))
        }
        TargetBackendArg::Hosted => {
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

pub async fn run_migrate(ctx: &Context, command: &Commands) -> Result<MigrateOutput> {
    let Commands::Migrate {
        target_backend,
        dry_run,
    } = command
    else {
        unreachable!("run_migrate dispatched with a non-Migrate command")
    };
    if ctx.config.storage.backend == backend_kind_of(*target_backend) {
        return Err(Error::Validation(
            "migrate target_backend must differ from the configured source backend".to_string(),
        ));
    }
    let destination = build_destination(&ctx.config, *target_backend).await?;
    let tool_backend = match target_backend {
        TargetBackendArg::Embedded => ToolStorageBackendKind::Embedded,
        TargetBackendArg::Hosted => ToolStorageBackendKind::Hosted,
    };
    let (traces_copied, memories_copied) = ctx
        .host
        .migrate_database(
            MigrateDatabaseInput {
                target_backend: tool_backend,
                dry_run: *dry_run,
            },
            destination.as_ref(),
            Some(&ctx.workspace_id),
        )
        .await?;
    Ok(MigrateOutput {
        traces_copied,
        memories_copied,
        dry_run: *dry_run,
    })
}

fn backend_kind_of(target: TargetBackendArg) -> StorageBackendKind {
    match target {
        TargetBackendArg::Embedded => StorageBackendKind::Embedded,
        TargetBackendArg::Hosted => StorageBackendKind::Hosted,
    }
}
