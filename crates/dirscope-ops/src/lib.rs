//! Deletion pathway for dirscope.
//!
//! Deletes targets from disk on the blocking pool and keeps the live tree in
//! step: a target is only detached from its tree, and its size subtracted
//! from every ancestor, once the filesystem operation succeeded. Batch
//! deletions report progress via channels.

mod delete;
mod progress;

pub use delete::{DeleteMode, DeleteOutcome, DeletionResult, delete_node, start_deletion};
pub use progress::{DeletionComplete, DeletionProgress};

/// Default channel buffer size for deletion progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
