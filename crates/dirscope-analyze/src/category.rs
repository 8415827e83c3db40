//! Extension-based file categories.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Broad kind of a file, derived from its extension.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum FileCategory {
    Videos,
    Images,
    Audio,
    Documents,
    Archives,
    Code,
    Applications,
    Other,
}

impl FileCategory {
    /// Lowercase extensions that belong to this category.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Videos => &[
                "mp4", "mov", "avi", "mkv", "flv", "wmv", "m4v", "webm", "mpeg", "mpg",
            ],
            Self::Images => &[
                "jpg", "jpeg", "png", "gif", "bmp", "tiff", "svg", "heic", "webp", "ico", "raw",
            ],
            Self::Audio => &["mp3", "wav", "aac", "flac", "m4a", "ogg", "wma", "aiff"],
            Self::Documents => &[
                "pdf", "doc", "docx", "txt", "rtf", "pages", "xls", "xlsx", "numbers", "ppt",
                "pptx", "keynote", "odt", "ods", "odp",
            ],
            Self::Archives => &[
                "zip", "rar", "7z", "tar", "gz", "bz2", "xz", "dmg", "iso", "pkg",
            ],
            Self::Code => &[
                "swift", "py", "java", "cpp", "c", "h", "js", "ts", "html", "css", "json", "xml",
                "yaml", "yml", "sh", "rb", "go", "rs", "php",
            ],
            Self::Applications => &["app"],
            Self::Other => &[],
        }
    }

    /// Category for an extension (without the dot), case-insensitive.
    pub fn for_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        Self::iter()
            .find(|c| c.extensions().contains(&ext.as_str()))
            .unwrap_or(Self::Other)
    }

    /// Category for a path. Paths without an extension are `Other`.
    pub fn for_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(Self::Other, Self::for_extension)
    }
}
