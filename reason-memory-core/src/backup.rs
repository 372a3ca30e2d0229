//! Backup / Restore / Migration (spec §4.8).
//!
//! Grounded on `memory-storage-redb/src/persistence/manager.rs`'s
//! manifest-plus-checksum-plus-restore-with-remapping idiom. The teacher's
//! dependency set carries neither `tar` nor `zip`, so — per DESIGN.md — this
//! follows the corpus convention instead: a timestamped directory holding a
//! `manifest.json` plus sibling `traces.json`/`memories.json` dumps, no new
//! archive-format dependency introduced.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::StorageBackend;
use crate::types::{MemoryItem, ReasoningTrace, WorkspaceId};

const SCHEMA_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "manifest.json";
const TRACES_FILE: &str = "traces.json";
const MEMORIES_FILE: &str = "memories.json";

/// Metadata describing one backup directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub trace_count: u64,
    pub memory_count: u64,
    pub workspace_id: Option<WorkspaceId>,
    pub incremental: bool,
    /// Non-cryptographic content checksum (`DefaultHasher` over the dump
    /// bytes), used to detect truncated/corrupted dumps, not tampering.
    pub checksum: String,
}

fn checksum_of(traces_bytes: &[u8], memories_bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    traces_bytes.hash(&mut hasher);
    memories_bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Creates a backup of `storage` into `dir` (created if absent). If
/// `incremental` is set, only traces with `created_at`/`timestamp` after
/// `since` are included (spec §9 Open Question 3: the predicate is read from
/// the caller-supplied `since`, sourced from the most recent manifest by the
/// caller — this function itself is stateless).
pub async fn create_backup(
    storage: &dyn StorageBackend,
    dir: &Path,
    workspace: Option<&WorkspaceId>,
    incremental: bool,
    since: Option<DateTime<Utc>>,
) -> Result<BackupManifest> {
    std::fs::create_dir_all(dir)?;

    let mut traces = storage.list_all_traces(workspace).await?;
    let mut memories = storage.list_all_memories(workspace).await?;

    if incremental {
        if let Some(cutoff) = since {
            traces.retain(|t| t.timestamp > cutoff);
            memories.retain(|m| m.created_at > cutoff);
        }
    }

    let traces_bytes = serde_json::to_vec_pretty(&traces)?;
    let memories_bytes = serde_json::to_vec_pretty(&memories)?;

    std::fs::write(dir.join(TRACES_FILE), &traces_bytes)?;
    std::fs::write(dir.join(MEMORIES_FILE), &memories_bytes)?;

    let manifest = BackupManifest {
        schema_version: SCHEMA_VERSION,
        created_at: Utc::now(),
        trace_count: traces.len() as u64,
        memory_count: memories.len() as u64,
        workspace_id: workspace.cloned(),
        incremental,
        checksum: checksum_of(&traces_bytes, &memories_bytes),
    };
    std::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;

    Ok(manifest)
}

fn read_dump_files(dir: &Path) -> Result<(Vec<u8>, Vec<u8>, BackupManifest)> {
    let manifest_bytes = std::fs::read(dir.join(MANIFEST_FILE))?;
    let manifest: BackupManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| Error::JsonParse(format!("invalid backup manifest: {e}")))?;
    let traces_bytes = std::fs::read(dir.join(TRACES_FILE))?;
    let memories_bytes = std::fs::read(dir.join(MEMORIES_FILE))?;
    Ok((traces_bytes, memories_bytes, manifest))
}

/// Validates a backup directory: parses the manifest, recomputes the
/// checksum, and confirms the declared counts match the dumped records.
pub fn validate_backup(dir: &Path) -> Result<BackupManifest> {
    let (traces_bytes, memories_bytes, manifest) = read_dump_files(dir)?;

    let recomputed = checksum_of(&traces_bytes, &memories_bytes);
    if recomputed != manifest.checksum {
        return Err(Error::Validation(format!(
            "backup checksum mismatch: manifest says {}, recomputed {}",
            manifest.checksum, recomputed
        )));
    }

    let traces: Vec<ReasoningTrace> = serde_json::from_slice(&traces_bytes)?;
    let memories: Vec<MemoryItem> = serde_json::from_slice(&memories_bytes)?;
    if traces.len() as u64 != manifest.trace_count {
        return Err(Error::Validation(format!(
            "backup trace count mismatch: manifest says {}, found {}",
            manifest.trace_count,
            traces.len()
        )));
    }
    if memories.len() as u64 != manifest.memory_count {
        return Err(Error::Validation(format!(
            "backup memory count mismatch: manifest says {}, found {}",
            manifest.memory_count,
            memories.len()
        )));
    }

    Ok(manifest)
}

/// Restores a validated backup into `storage`, optionally re-mapping every
/// record's `workspace_id` to `target_workspace_id`. Refuses to clobber
/// existing ids unless `overwrite` is set.
pub async fn restore_backup(
    storage: &dyn StorageBackend,
    dir: &Path,
    target_workspace_id: Option<&WorkspaceId>,
    overwrite: bool,
) -> Result<(u64, u64)> {
    validate_backup(dir)?;
    let (traces_bytes, memories_bytes, _manifest) = read_dump_files(dir)?;
    let mut traces: Vec<ReasoningTrace> = serde_json::from_slice(&traces_bytes)?;
    let mut memories: Vec<MemoryItem> = serde_json::from_slice(&memories_bytes)?;

    if let Some(target) = target_workspace_id {
        for trace in &mut traces {
            trace.workspace_id = target.clone();
        }
        for memory in &mut memories {
            memory.workspace_id = target.clone();
        }
    }

    storage.restore_records(&traces, &memories, overwrite).await
}

/// Streams every record from `source` to `destination` under a
/// read-then-write pipeline, preserving ids and embeddings. `dry_run`
/// reports the counts that would be written without calling
/// `restore_records`.
pub async fn migrate(
    source: &dyn StorageBackend,
    destination: &dyn StorageBackend,
    workspace: Option<&WorkspaceId>,
    dry_run: bool,
) -> Result<(u64, u64)> {
    let traces = source.list_all_traces(workspace).await?;
    let memories = source.list_all_memories(workspace).await?;
    let counts = (traces.len() as u64, memories.len() as u64);

    if dry_run {
        return Ok(counts);
    }

    destination.restore_records(&traces, &memories, false).await
}

/// Default root directory for backups under a workspace path, matching the
/// corpus convention of a sibling directory rather than a scattered file.
#[must_use]
pub fn default_backup_dir(workspace_root: &Path, timestamp: DateTime<Utc>) -> PathBuf {
    workspace_root
        .join("backups")
        .join(timestamp.format("%Y%m%dT%H%M%SZ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_changes_when_bytes_change() {
        let a = checksum_of(b"traces", b"memories");
        let b = checksum_of(b"traces", b"different");
        assert_ne!(a, b);
    }

    #[test]
    fn checksum_is_deterministic() {
        let a = checksum_of(b"x", b"y");
        let b = checksum_of(b"x", b"y");
        assert_eq!(a, b);
    }

    #[test]
    fn default_backup_dir_is_timestamped() {
        let root = Path::new("/tmp/workspace");
        let ts = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let dir = default_backup_dir(root, ts);
        assert!(dir.ends_with("20260102T030405Z"));
    }
}
