//! Scan presets.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use dirscope_core::Node;

use crate::stats::walk;

const DAY: u64 = 24 * 60 * 60;

/// Canned selection of what a scan should surface.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ScanPreset {
    #[default]
    Standard,
    LargeFiles,
    OldFiles,
    CacheFiles,
    DeveloperWaste,
}

impl ScanPreset {
    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Standard => "Standard Scan",
            Self::LargeFiles => "Find Large Files",
            Self::OldFiles => "Find Old Files",
            Self::CacheFiles => "Cache & Temp Files",
            Self::DeveloperWaste => "Developer Waste",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Standard => "Complete directory scan",
            Self::LargeFiles => "Files larger than 100 MB",
            Self::OldFiles => "Files not modified in 6+ months",
            Self::CacheFiles => "Caches, logs, and temporary files",
            Self::DeveloperWaste => "node_modules, build folders, .git",
        }
    }

    /// Folder names this preset targets.
    pub fn target_folder_names(self) -> &'static [&'static str] {
        match self {
            Self::DeveloperWaste => &[
                "node_modules",
                ".git",
                "build",
                "dist",
                "target",
                ".gradle",
                "bin",
                "obj",
                "DerivedData",
                "Pods",
            ],
            Self::CacheFiles => &["Caches", "Cache", "tmp", "temp", "logs"],
            _ => &[],
        }
    }

    /// Smallest size a node must have, in bytes.
    pub fn minimum_size(self) -> Option<u64> {
        match self {
            Self::LargeFiles => Some(100_000_000),
            _ => None,
        }
    }

    /// How long ago a node must have last been modified.
    pub fn maximum_age(self) -> Option<Duration> {
        match self {
            Self::OldFiles => Some(Duration::from_secs(6 * 30 * DAY)),
            _ => None,
        }
    }

    /// Whether `node` belongs in this preset's results.
    ///
    /// Nodes without a modification time pass the age check.
    pub fn should_include(self, node: &Node, now: SystemTime) -> bool {
        if self.minimum_size().is_some_and(|min| node.size() < min) {
            return false;
        }

        if let (Some(max_age), Some(modified)) = (self.maximum_age(), node.modified()) {
            let cutoff = now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
            if modified > cutoff {
                return false;
            }
        }

        let targets = self.target_folder_names();
        if targets.is_empty() {
            return true;
        }
        if node.is_dir() && targets.contains(&node.name()) {
            return true;
        }
        node.path()
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .is_some_and(|parent| targets.contains(&parent))
    }

    /// Nodes below `root` this preset surfaces, in tree order.
    ///
    /// A matching target folder is reported once and not descended into.
    /// Otherwise only files are reported.
    pub fn collect(self, root: &Arc<Node>, now: SystemTime) -> Vec<Arc<Node>> {
        let targets = self.target_folder_names();
        let mut matched = Vec::new();
        walk(root, |node| {
            if node.is_dir() {
                if !targets.is_empty() && targets.contains(&node.name()) {
                    matched.push(node.clone());
                    return false;
                }
                return true;
            }
            if self.should_include(node, now) {
                matched.push(node.clone());
            }
            true
        });
        matched
    }
}
