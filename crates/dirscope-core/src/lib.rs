//! Core types for dirscope.
//!
//! This crate provides the live node tree that the scanner populates and
//! consumers observe: node identity, parent/child ownership, atomic field
//! publication, and the mutation primitives shared by the scanner and the
//! deletion pathway.

mod config;
mod error;
mod node;
pub mod tree;

pub use config::{ScanConfig, ScanConfigBuilder, ScanConfigBuilderError};
pub use error::{DeleteError, ScanError, ScanWarning, TreeError, WarningKind};
pub use node::{EntryInfo, Node, NodeId, NodeSnapshot};
pub use tree::{FileTree, SortOrder};
