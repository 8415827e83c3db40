//! Analysis of scanned dirscope trees.
//!
//! This crate works on the live node tree produced by `dirscope-scan`:
//!
//! - **Statistics** - File and folder counts, largest file, per-category sizes
//! - **Smart filters** - Size and age predicates, combined with categories
//! - **Presets** - Canned views such as large files or developer waste
//!
//! # Statistics
//!
//! ```rust,ignore
//! use dirscope_analyze::ScanStatistics;
//! use dirscope_scan::Scanner;
//!
//! let report = Scanner::new().scan("/path/to/scan", |_| {}).await?;
//! let stats = ScanStatistics::from_root(&report.root);
//!
//! for category in &stats.category_stats {
//!     println!("{}: {} files", category.category, category.file_count);
//! }
//! ```
//!
//! # Filters
//!
//! ```rust,ignore
//! use dirscope_analyze::{FileCategory, FilterSet, SmartFilter};
//!
//! let filters = FilterSet::builder()
//!     .categories(vec![FileCategory::Videos])
//!     .filters(vec![SmartFilter::LargeFiles1Gb])
//!     .build()?;
//!
//! for node in filters.collect(&report.root) {
//!     println!("{}", node.path().display());
//! }
//! ```

mod category;
mod filter;
mod preset;
mod stats;

pub use category::FileCategory;
pub use filter::{FilterSet, FilterSetBuilder, SmartFilter};
pub use preset::ScanPreset;
pub use stats::{CategoryStats, FileSummary, ScanStatistics};

// Re-export core types
pub use dirscope_core::Node;
