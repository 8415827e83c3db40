//! Blocking directory enumeration.

use std::fs;
use std::io;
use std::path::Path;

use jwalk::{Parallelism, WalkDir};
use tracing::debug;

use dirscope_core::{EntryInfo, ScanConfig, ScanWarning};

/// Entries of one directory plus the entries that had to be skipped.
#[derive(Debug, Default)]
pub(crate) struct Listing {
    pub entries: Vec<EntryInfo>,
    pub skipped: Vec<ScanWarning>,
}

impl Listing {
    /// Number of file entries and their total bytes.
    pub fn file_totals(&self) -> (u64, u64) {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .fold((0, 0), |(n, bytes), e| (n + 1, bytes + e.size))
    }
}

/// List the immediate entries of `dir` in enumeration order.
///
/// Fails only if the directory itself cannot be opened. Entries whose
/// metadata cannot be resolved are skipped and reported in
/// [`Listing::skipped`]. Symlinks are not followed.
pub(crate) fn read_entries(dir: &Path, config: &ScanConfig) -> io::Result<Listing> {
    let mut listing = Listing::default();

    for entry_result in fs::read_dir(dir)? {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                listing.skipped.push(ScanWarning::metadata_error(dir, &err));
                continue;
            }
        };

        let path = entry.path();
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if config.should_skip_hidden(&name) {
            continue;
        }

        // DirEntry::metadata does not traverse symlinks.
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                listing.skipped.push(ScanWarning::metadata_error(&path, &err));
                continue;
            }
        };
        let modified = metadata.modified().ok();

        if metadata.is_dir() {
            if config.should_collapse_package(&name) {
                let size = package_size(&path, config);
                listing.entries.push(EntryInfo::file(path, size, modified));
            } else {
                listing.entries.push(EntryInfo::directory(path, modified));
            }
        } else {
            listing
                .entries
                .push(EntryInfo::file(path, metadata.len(), modified));
        }
    }

    Ok(listing)
}

/// Total bytes of all files below a package directory.
///
/// Unreadable parts of the package contribute nothing.
pub(crate) fn package_size(path: &Path, config: &ScanConfig) -> u64 {
    let walker = WalkDir::new(path)
        .parallelism(Parallelism::Serial)
        .skip_hidden(config.skip_hidden)
        .follow_links(false);

    let mut total = 0;
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                debug!("Skipping unreadable package entry: {err}");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            total += metadata.len();
        }
    }
    total
}
