//! Scan configuration types.

use std::path::Path;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Default cap on concurrent directory listings.
pub const DEFAULT_MAX_CONCURRENT_READS: usize = 64;

/// Configuration for scanning operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Skip hidden entries (names starting with `.`).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub skip_hidden: bool,

    /// Size package-like directories as single leaf entries.
    #[builder(default = "false")]
    #[serde(default)]
    pub treat_packages_as_files: bool,

    /// Directory extensions that mark a package (compared case-insensitively).
    #[builder(default = "default_package_extensions()")]
    #[serde(default = "default_package_extensions")]
    pub package_extensions: Vec<String>,

    /// Maximum number of directory listings in flight (0 = unbounded).
    #[builder(default = "DEFAULT_MAX_CONCURRENT_READS")]
    #[serde(default = "default_max_concurrent_reads")]
    pub max_concurrent_reads: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_reads() -> usize {
    DEFAULT_MAX_CONCURRENT_READS
}

fn default_package_extensions() -> Vec<String> {
    [
        "app",
        "bundle",
        "framework",
        "plugin",
        "kext",
        "xcodeproj",
        "xcworkspace",
        "photoslibrary",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref extensions) = self.package_extensions {
            if extensions.iter().any(|e| e.is_empty() || e.starts_with('.')) {
                return Err(
                    "Package extensions must be non-empty and given without a leading dot"
                        .to_string(),
                );
            }
        }
        Ok(())
    }
}

impl From<ScanConfigBuilderError> for ScanError {
    fn from(err: ScanConfigBuilderError) -> Self {
        ScanError::InvalidConfig {
            message: err.to_string(),
        }
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Check if an entry should be skipped under the hidden-file policy.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        self.skip_hidden && name.starts_with('.')
    }

    /// Check if a directory name marks a package.
    pub fn is_package(&self, name: &str) -> bool {
        let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.package_extensions
            .iter()
            .any(|p| p.eq_ignore_ascii_case(ext))
    }

    /// Check if a directory should be sized as a single leaf entry.
    pub fn should_collapse_package(&self, name: &str) -> bool {
        self.treat_packages_as_files && self.is_package(name)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_hidden: true,
            treat_packages_as_files: false,
            package_extensions: default_package_extensions(),
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
        }
    }
}
