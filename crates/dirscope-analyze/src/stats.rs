//! Whole-tree statistics.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dirscope_core::Node;

use crate::category::FileCategory;

/// Visit `root` and its descendants in pre-order.
///
/// `f` returns whether to descend into the node's children.
pub(crate) fn walk<F>(root: &Arc<Node>, mut f: F)
where
    F: FnMut(&Arc<Node>) -> bool,
{
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if !f(&node) {
            continue;
        }
        if let Some(children) = node.children() {
            stack.extend(children.iter().rev().cloned());
        }
    }
}

/// Size and count of the files in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: FileCategory,
    pub total_size: u64,
    pub file_count: u64,
}

impl CategoryStats {
    fn new(category: FileCategory) -> Self {
        Self {
            category,
            total_size: 0,
            file_count: 0,
        }
    }

    fn merge(&mut self, other: &CategoryStats) {
        self.total_size += other.total_size;
        self.file_count += other.file_count;
    }

    /// Share of `total` bytes taken by this category, in percent.
    pub fn percentage_of(&self, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.total_size as f64 / total as f64 * 100.0
        }
    }
}

/// A file singled out by the statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub size: u64,
}

/// Summary of a scanned tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStatistics {
    /// Number of file nodes.
    pub total_files: u64,
    /// Number of directory nodes, including the root.
    pub total_folders: u64,
    /// Sum of all file sizes.
    pub total_size: u64,
    /// Largest non-empty file, first found on ties.
    pub largest_file: Option<FileSummary>,
    /// Non-empty categories, largest first.
    pub category_stats: Vec<CategoryStats>,
}

impl ScanStatistics {
    /// Compute statistics for the tree below `root`.
    pub fn from_root(root: &Arc<Node>) -> Self {
        let mut stats = Self::default();
        let mut files = Vec::new();

        walk(root, |node| {
            if node.is_dir() {
                stats.total_folders += 1;
            } else {
                stats.total_files += 1;
                stats.total_size += node.size();
                let is_largest = match &stats.largest_file {
                    Some(current) => node.size() > current.size,
                    None => node.size() > 0,
                };
                if is_largest {
                    stats.largest_file = Some(FileSummary {
                        path: node.path().to_path_buf(),
                        size: node.size(),
                    });
                }
                files.push(node.clone());
            }
            true
        });

        let by_category = files
            .par_iter()
            .fold(HashMap::new, |mut acc: HashMap<FileCategory, CategoryStats>, file| {
                let category = FileCategory::for_path(file.path());
                let entry = acc
                    .entry(category)
                    .or_insert_with(|| CategoryStats::new(category));
                entry.total_size += file.size();
                entry.file_count += 1;
                acc
            })
            .reduce(HashMap::new, |mut a, b| {
                for (category, partial) in b {
                    a.entry(category)
                        .or_insert_with(|| CategoryStats::new(category))
                        .merge(&partial);
                }
                a
            });

        stats.category_stats = by_category
            .into_values()
            .filter(|c| c.total_size > 0)
            .sorted_by(|a, b| {
                b.total_size
                    .cmp(&a.total_size)
                    .then_with(|| a.category.cmp(&b.category))
            })
            .collect();

        debug!(
            "Computed statistics: {} files, {} folders, {} bytes",
            stats.total_files, stats.total_folders, stats.total_size
        );
        stats
    }

    /// Files plus folders.
    pub fn total_items(&self) -> u64 {
        self.total_files + self.total_folders
    }

    /// Mean file size (0 without files).
    pub fn average_file_size(&self) -> u64 {
        self.total_size.checked_div(self.total_files).unwrap_or(0)
    }

    /// Stats for one category, if it holds any bytes.
    pub fn category(&self, category: FileCategory) -> Option<&CategoryStats> {
        self.category_stats.iter().find(|c| c.category == category)
    }
}
