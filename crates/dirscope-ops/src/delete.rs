//! Deleting nodes from disk and from the live tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use dirscope_core::tree;
use dirscope_core::{DeleteError, FileTree, Node};

use crate::OPERATION_CHANNEL_SIZE;
use crate::progress::{DeletionComplete, DeletionProgress};

/// How a target is removed from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteMode {
    /// Move to the platform trash (recoverable).
    #[default]
    Trash,
    /// Remove permanently.
    Permanent,
}

/// A successful deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Bytes subtracted from the tree.
    pub bytes_freed: u64,
    /// How the target was removed.
    pub mode: DeleteMode,
}

/// Result sent through the channel during batch deletion.
#[derive(Debug)]
pub enum DeletionResult {
    /// Progress update.
    Progress(DeletionProgress),
    /// The batch completed.
    Complete(DeletionComplete),
}

/// Delete `node` from disk, then remove it from `tree`.
///
/// Nothing is touched if the node or one of its ancestors is still loading.
/// If the filesystem operation fails the tree is left unchanged. A node that
/// is already detached from its tree is reported as deleted with zero bytes
/// freed.
pub async fn delete_node(
    tree: &FileTree,
    node: &Arc<Node>,
    mode: DeleteMode,
) -> Result<DeleteOutcome, DeleteError> {
    let path = node.path().to_path_buf();
    if node.is_orphaned() {
        debug!("Skipping detached node {}", path.display());
        return Ok(DeleteOutcome {
            path,
            bytes_freed: 0,
            mode,
        });
    }
    tree::ensure_settled(node)?;

    let target = path.clone();
    tokio::task::spawn_blocking(move || remove_from_disk(&target, mode))
        .await
        .map_err(|e| DeleteError::Filesystem {
            path: path.clone(),
            message: format!("Task failed: {e}"),
        })??;

    let bytes_freed = node.size();
    tree.remove(node)?;
    debug!("Deleted {} ({} bytes)", path.display(), bytes_freed);

    Ok(DeleteOutcome {
        path,
        bytes_freed,
        mode,
    })
}

/// Remove `path` from disk according to its on-disk type. A package shown
/// as a leaf node is still a directory here.
fn remove_from_disk(path: &Path, mode: DeleteMode) -> Result<(), DeleteError> {
    match mode {
        DeleteMode::Trash => trash::delete(path).map_err(|e| DeleteError::Filesystem {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        DeleteMode::Permanent => {
            let metadata =
                fs::symlink_metadata(path).map_err(|e| DeleteError::filesystem(path, &e))?;
            let result = if metadata.file_type().is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            result.map_err(|e| DeleteError::filesystem(path, &e))
        }
    }
}

/// Start background deletion of `nodes`.
///
/// Targets are processed in order. A failed target is counted and skipped;
/// the batch always ends with a [`DeletionResult::Complete`].
pub fn start_deletion(
    tree: Arc<FileTree>,
    nodes: Vec<Arc<Node>>,
    mode: DeleteMode,
) -> mpsc::Receiver<DeletionResult> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        let mut progress = DeletionProgress::new(nodes.len());
        let mut errors = Vec::new();

        for node in &nodes {
            progress.current = Some(node.path().to_path_buf());
            let _ = tx.send(DeletionResult::Progress(progress.clone())).await;

            match delete_node(&tree, node, mode).await {
                Ok(outcome) => {
                    progress.deleted += 1;
                    progress.bytes_freed += outcome.bytes_freed;
                }
                Err(err) => {
                    warn!("Failed to delete {}: {err}", node.path().display());
                    progress.failed += 1;
                    errors.push(err);
                }
            }
        }

        progress.current = None;
        let _ = tx.send(DeletionResult::Progress(progress.clone())).await;
        let _ = tx
            .send(DeletionResult::Complete(DeletionComplete {
                deleted: progress.deleted,
                failed: progress.failed,
                bytes_freed: progress.bytes_freed,
                errors,
            }))
            .await;
    });

    rx
}
