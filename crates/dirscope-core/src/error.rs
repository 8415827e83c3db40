//! Error types for scanning and tree mutation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that end a scan.
///
/// Only root-level failures and cancellation unwind out of a scan. Failures
/// below the root are absorbed and reported as [`ScanWarning`]s.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root path could not be stat'ed.
    #[error("Cannot read scan root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scan session was stopped before it finished.
    #[error("Scan cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Check whether this error is a cancellation rather than a real failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

/// Errors raised by tree construction.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The path could not be stat'ed (missing, permission denied, ...).
    #[error("Path unreadable: {path}: {source}")]
    PathUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<TreeError> for ScanError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::PathUnreadable { path, source } => {
                ScanError::RootUnreadable { path, source }
            }
        }
    }
}

/// Errors raised when removing a node from the tree.
///
/// In every case the tree is left unmodified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeleteError {
    /// The filesystem deletion itself failed.
    #[error("Failed to delete {path}: {message}")]
    Filesystem { path: PathBuf, message: String },

    /// The node or one of its ancestors is still being loaded by a scan.
    #[error("Cannot remove {path} while it is still being scanned")]
    ConcurrentMutation { path: PathBuf },
}

impl DeleteError {
    /// Create a filesystem error from an I/O error.
    pub fn filesystem(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A directory listing failed; the directory contributes zero bytes.
    ReadError,
    /// An entry's metadata could not be read; the entry was skipped.
    MetadataError,
    /// A directory task panicked; its subtree contributes zero bytes.
    TaskFailed,
}

/// Non-fatal warning encountered during scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for a directory whose listing failed.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        Self {
            message: format!("Read error: {error}"),
            path,
            kind: WarningKind::ReadError,
        }
    }

    /// Create a warning for an entry whose metadata could not be resolved.
    pub fn metadata_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        Self {
            message: format!("Metadata error: {error}"),
            path,
            kind: WarningKind::MetadataError,
        }
    }
}
