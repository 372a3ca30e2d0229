//! Workspace Manager: process-wide current workspace (spec §4.7).
//!
//! New code with a small surface; hashing follows the teacher's
//! `retrieval/cache/types.rs::CacheKey::compute_hash` pattern of hashing
//! identifiers with `std::collections::hash_map::DefaultHasher`. `set/get/
//! clear` are guarded by a `std::sync::RwLock` over a static
//! `Option<WorkspaceHandle>`, matching the "process-wide state, explicit
//! set/clear" pattern spec §9 calls for.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::storage::{StorageBackend, WorkspaceDeletionReport};
use crate::types::WorkspaceId;

/// The currently-selected workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceHandle {
    pub id: WorkspaceId,
    pub name: String,
    pub path: PathBuf,
}

static CURRENT: RwLock<Option<WorkspaceHandle>> = RwLock::new(None);

/// Computes a stable `workspace_id` from a directory path: canonicalizes it
/// when it exists (resolving symlinks/`.`/`..`), else lexically normalizes
/// it, then hashes the resulting string with `DefaultHasher`.
fn path_hash(path: &Path) -> String {
    let canonical = std::fs::canonicalize(path)
        .unwrap_or_else(|_| lexical_normalize(path))
        .to_string_lossy()
        .into_owned();
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                normalized.pop();
            }
            std::path::Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn derive_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workspace".to_string())
}

/// Sets the process-wide current workspace to `path`.
///
/// Fails with [`Error::Validation`] if `path` is empty or not a directory.
pub fn set(path: &Path) -> Result<WorkspaceHandle> {
    if path.as_os_str().is_empty() {
        return Err(Error::Validation("workspace path must not be empty".to_string()));
    }
    if !path.is_dir() {
        return Err(Error::Validation(format!(
            "workspace path {} is not a directory",
            path.display()
        )));
    }

    let handle = WorkspaceHandle {
        id: path_hash(path),
        name: derive_name(path),
        path: path.to_path_buf(),
    };

    let mut guard = CURRENT.write().expect("workspace lock poisoned");
    *guard = Some(handle.clone());
    Ok(handle)
}

/// Returns the current workspace, if one is set.
#[must_use]
pub fn get() -> Option<WorkspaceHandle> {
    CURRENT.read().expect("workspace lock poisoned").clone()
}

/// Clears the current workspace.
pub fn clear() {
    let mut guard = CURRENT.write().expect("workspace lock poisoned");
    *guard = None;
}

/// Deletes a workspace's storage and, if it is the current workspace, clears
/// it. Requires explicit `confirm=true`, matching the spec's
/// `delete(workspace_id, confirm=True)` signature.
pub async fn delete(
    storage: &dyn StorageBackend,
    workspace_id: &WorkspaceId,
    confirm: bool,
) -> Result<WorkspaceDeletionReport> {
    if !confirm {
        return Err(Error::ConfirmationRequired(format!(
            "deleting workspace {workspace_id} requires confirm=true"
        )));
    }

    let report = storage.delete_workspace(workspace_id).await?;

    let mut guard = CURRENT.write().expect("workspace lock poisoned");
    if guard.as_ref().map(|h| &h.id) == Some(workspace_id) {
        *guard = None;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn empty_path_is_rejected() {
        clear();
        let err = set(Path::new("")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    #[serial]
    fn non_directory_path_is_rejected() {
        clear();
        let err = set(Path::new("/definitely/not/a/real/path/at/all")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    #[serial]
    fn same_path_always_yields_same_id() {
        clear();
        let dir = tempfile::tempdir().unwrap();
        let a = set(dir.path()).unwrap();
        let b = set(dir.path()).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    #[serial]
    fn set_then_get_roundtrips() {
        clear();
        let dir = tempfile::tempdir().unwrap();
        let handle = set(dir.path()).unwrap();
        let fetched = get().unwrap();
        assert_eq!(handle.id, fetched.id);
        clear();
        assert!(get().is_none());
    }
}
