//! Per-invocation scan state.

use std::path::PathBuf;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use dirscope_core::ScanWarning;

use crate::progress::{ProgressCounters, ScanProgress};

/// State shared by every task of one `scan` call.
///
/// A session is the unit of cancellation: cancelling it stops the entire
/// traversal it belongs to, never a part of it.
#[derive(Debug)]
pub struct ScanSession {
    token: CancellationToken,
    warnings: Mutex<Vec<ScanWarning>>,
    pub(crate) counters: ProgressCounters,
}

impl ScanSession {
    pub(crate) fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            warnings: Mutex::new(Vec::new()),
            counters: ProgressCounters::new(),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub(crate) fn record_warning(&self, warning: ScanWarning) {
        self.counters.record_error();
        self.warnings.lock().push(warning);
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> Vec<ScanWarning> {
        self.warnings.lock().clone()
    }

    /// Current progress counters.
    pub fn progress(&self) -> ScanProgress {
        self.counters.snapshot(PathBuf::new())
    }
}
