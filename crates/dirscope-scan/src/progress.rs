//! Scan progress reporting and live tree events.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dirscope_core::{NodeId, ScanWarning};

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files discovered so far.
    pub files_scanned: u64,
    /// Number of directories fully listed so far.
    pub dirs_scanned: u64,
    /// Total file bytes discovered so far.
    pub bytes_scanned: u64,
    /// Directory that was listed most recently.
    pub current_path: PathBuf,
    /// Number of warnings recorded.
    pub errors_count: u64,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Event describing one change to the live tree.
///
/// Events carry node ids rather than nodes; consumers look the node up in the
/// tree they received through the root callback.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// The root node exists and has been handed to the consumer.
    RootCreated { id: NodeId, path: PathBuf },
    /// A directory's child list was published.
    ChildrenAttached { id: NodeId, count: usize },
    /// A node's size was replaced.
    SizeChanged { id: NodeId, size: u64 },
    /// A directory's loading flag flipped.
    LoadingChanged { id: NodeId, loading: bool },
    /// A failure below the root was absorbed.
    Warning(ScanWarning),
    /// Periodic counters.
    Progress(ScanProgress),
    /// The whole subtree has been sized.
    Completed { elapsed: Duration },
    /// The session was stopped before completion.
    Cancelled,
}

/// Lock-free counters shared by all directory tasks of one session.
#[derive(Debug)]
pub(crate) struct ProgressCounters {
    start_time: Instant,
    files_scanned: AtomicU64,
    dirs_scanned: AtomicU64,
    bytes_scanned: AtomicU64,
    errors_count: AtomicU64,
}

impl ProgressCounters {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_scanned: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
        }
    }

    pub fn record_listing(&self, files: u64, bytes: u64) {
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
        self.files_scanned.fetch_add(files, Ordering::Relaxed);
        self.bytes_scanned.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self, current_path: PathBuf) -> ScanProgress {
        ScanProgress {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            current_path,
            errors_count: self.errors_count.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = ProgressCounters::new();
        counters.record_listing(3, 300);
        counters.record_listing(1, 20);
        counters.record_error();

        let progress = counters.snapshot(PathBuf::from("/x"));
        assert_eq!(progress.files_scanned, 4);
        assert_eq!(progress.dirs_scanned, 2);
        assert_eq!(progress.bytes_scanned, 320);
        assert_eq!(progress.errors_count, 1);
        assert_eq!(progress.total_items(), 6);
    }
}
