//! Concurrent, incremental directory scanning for dirscope.
//!
//! # Overview
//!
//! `dirscope-scan` expands a directory into a live [`Node`] tree. Every
//! directory is listed by its own task and the results are attached to the
//! tree as soon as they are known, so a consumer can render partial results
//! while the scan is still running. Key features:
//!
//! - **Root first**: the root node is handed to the consumer before any
//!   recursive work starts
//! - **Cooperative cancellation** via [`Scanner::stop`]
//! - **Live events** via broadcast channels
//! - **Bounded fan-out** of blocking directory listings
//!
//! # Example
//!
//! ```rust,no_run
//! use dirscope_scan::Scanner;
//!
//! # async fn run() -> Result<(), dirscope_scan::ScanError> {
//! let scanner = Scanner::new();
//! let report = scanner
//!     .scan("/path/to/scan", |root| println!("Scanning {}", root.path().display()))
//!     .await?;
//!
//! println!("Total size: {} bytes", report.total_size());
//! # Ok(())
//! # }
//! ```
//!
//! # Live Updates
//!
//! Subscribe to tree events:
//!
//! ```rust,no_run
//! use dirscope_scan::{ScanEvent, Scanner};
//!
//! let scanner = Scanner::new();
//! let mut events = scanner.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let ScanEvent::Progress(progress) = event {
//!             println!("Scanned {} files", progress.files_scanned);
//!         }
//!     }
//! });
//! ```

mod dispatch;
mod listing;
mod progress;
mod scanner;
mod session;

pub use dispatch::{ChannelDispatcher, Dispatcher, InlineDispatcher, Job, drain_pending};
pub use progress::{ScanEvent, ScanProgress};
pub use scanner::{EVENT_CHANNEL_SIZE, ScanReport, Scanner};
pub use session::ScanSession;

// Re-export core types for convenience
pub use dirscope_core::{
    EntryInfo, FileTree, Node, NodeId, NodeSnapshot, ScanConfig, ScanError, ScanWarning,
    SortOrder, WarningKind,
};
