//! Progress reporting types for batch deletion.

use std::path::PathBuf;

use dirscope_core::DeleteError;

/// Progress information for an ongoing batch deletion.
#[derive(Debug, Clone, Default)]
pub struct DeletionProgress {
    /// Number of targets in the batch.
    pub total: usize,
    /// Targets deleted so far.
    pub deleted: usize,
    /// Targets that could not be deleted.
    pub failed: usize,
    /// Bytes released from the tree so far.
    pub bytes_freed: u64,
    /// The target currently being processed.
    pub current: Option<PathBuf>,
}

impl DeletionProgress {
    /// Create a progress tracker for `total` targets.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.deleted + self.failed) as f64 / self.total as f64 * 100.0
    }
}

/// Result of a finished batch deletion.
#[derive(Debug, Clone)]
pub struct DeletionComplete {
    /// Number of targets deleted.
    pub deleted: usize,
    /// Number of targets that failed.
    pub failed: usize,
    /// Total bytes released from the tree.
    pub bytes_freed: u64,
    /// One error per failed target.
    pub errors: Vec<DeleteError>,
}

impl DeletionComplete {
    /// Check if every target was deleted.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Human-readable summary. Sizes are raw byte counts.
    pub fn summary(&self) -> String {
        if self.failed == 0 {
            format!("Deleted {} items, freed {} bytes", self.deleted, self.bytes_freed)
        } else {
            format!(
                "Deleted {}, failed {} (freed {} bytes)",
                self.deleted, self.failed, self.bytes_freed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let mut progress = DeletionProgress::new(4);
        assert_eq!(progress.percentage(), 0.0);
        progress.deleted = 1;
        progress.failed = 1;
        assert_eq!(progress.percentage(), 50.0);
        assert_eq!(DeletionProgress::new(0).percentage(), 0.0);
    }

    #[test]
    fn test_summary() {
        let complete = DeletionComplete {
            deleted: 2,
            failed: 0,
            bytes_freed: 10,
            errors: vec![],
        };
        assert!(complete.is_success());
        assert_eq!(complete.summary(), "Deleted 2 items, freed 10 bytes");

        let partial = DeletionComplete {
            deleted: 1,
            failed: 1,
            bytes_freed: 10,
            errors: vec![DeleteError::ConcurrentMutation { path: "/x".into() }],
        };
        assert!(!partial.is_success());
        assert_eq!(partial.summary(), "Deleted 1, failed 1 (freed 10 bytes)");
    }
}
