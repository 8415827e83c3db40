//! Smart filters and category selection over a scanned tree.

use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Days, Months, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use dirscope_core::Node;

use crate::category::FileCategory;
use crate::stats::walk;

const GB: u64 = 1_000_000_000;
const MB: u64 = 1_000_000;

/// Predefined predicate on a node's size or modification time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum SmartFilter {
    #[strum(serialize = "large-1gb")]
    LargeFiles1Gb,
    #[strum(serialize = "large-100mb")]
    LargeFiles100Mb,
    #[strum(serialize = "large-10mb")]
    LargeFiles10Mb,
    #[strum(serialize = "old-year")]
    OldFilesYear,
    #[strum(serialize = "old-6months")]
    OldFiles6Months,
    #[strum(serialize = "recent-week")]
    RecentWeek,
    #[strum(serialize = "recent-month")]
    RecentMonth,
}

impl SmartFilter {
    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            Self::LargeFiles1Gb => "Files > 1 GB",
            Self::LargeFiles100Mb => "Files > 100 MB",
            Self::LargeFiles10Mb => "Files > 10 MB",
            Self::OldFilesYear => "Older than 1 Year",
            Self::OldFiles6Months => "Older than 6 Months",
            Self::RecentWeek => "Modified This Week",
            Self::RecentMonth => "Modified This Month",
        }
    }

    /// Check `node` against this filter, with ages measured from `now`.
    ///
    /// Time-based filters never match a node without a modification time.
    pub fn matches(self, node: &Node, now: SystemTime) -> bool {
        match self {
            Self::LargeFiles1Gb => node.size() >= GB,
            Self::LargeFiles100Mb => node.size() >= 100 * MB,
            Self::LargeFiles10Mb => node.size() >= 10 * MB,
            Self::OldFilesYear => older_than(node, now, |t| t.checked_sub_months(Months::new(12))),
            Self::OldFiles6Months => {
                older_than(node, now, |t| t.checked_sub_months(Months::new(6)))
            }
            Self::RecentWeek => newer_than(node, now, |t| t.checked_sub_days(Days::new(7))),
            Self::RecentMonth => newer_than(node, now, |t| t.checked_sub_months(Months::new(1))),
        }
    }
}

type Cutoff = fn(DateTime<Utc>) -> Option<DateTime<Utc>>;

fn older_than(node: &Node, now: SystemTime, cutoff: Cutoff) -> bool {
    compare_modified(node, now, cutoff).is_some_and(|(modified, cutoff)| modified < cutoff)
}

fn newer_than(node: &Node, now: SystemTime, cutoff: Cutoff) -> bool {
    compare_modified(node, now, cutoff).is_some_and(|(modified, cutoff)| modified > cutoff)
}

fn compare_modified(
    node: &Node,
    now: SystemTime,
    cutoff: Cutoff,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let modified = DateTime::<Utc>::from(node.modified()?);
    let cutoff = cutoff(DateTime::<Utc>::from(now))?;
    Some((modified, cutoff))
}

/// A combination of category and smart filters.
///
/// A file passes when its category is selected (or no category is) and it
/// matches any of the selected smart filters (or none are selected).
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct FilterSet {
    /// Categories to keep.
    #[builder(default)]
    pub categories: Vec<FileCategory>,

    /// Smart filters, any of which must match.
    #[builder(default)]
    pub filters: Vec<SmartFilter>,

    /// Reference time for age filters (default: now).
    #[builder(default = "SystemTime::now()")]
    pub reference_time: SystemTime,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            filters: Vec::new(),
            reference_time: SystemTime::now(),
        }
    }
}

impl FilterSet {
    /// Create a new filter set builder.
    pub fn builder() -> FilterSetBuilder {
        FilterSetBuilder::default()
    }

    /// Whether any filter is selected.
    pub fn is_active(&self) -> bool {
        !self.categories.is_empty() || !self.filters.is_empty()
    }

    /// Check a single node.
    pub fn matches(&self, node: &Node) -> bool {
        if !self.categories.is_empty()
            && !self.categories.contains(&FileCategory::for_path(node.path()))
        {
            return false;
        }
        self.filters.is_empty()
            || self
                .filters
                .iter()
                .any(|f| f.matches(node, self.reference_time))
    }

    /// All file nodes below `root` that pass, in tree order.
    pub fn collect(&self, root: &Arc<Node>) -> Vec<Arc<Node>> {
        let mut matched = Vec::new();
        walk(root, |node| {
            if !node.is_dir() && self.matches(node) {
                matched.push(node.clone());
            }
            true
        });
        matched
    }
}
