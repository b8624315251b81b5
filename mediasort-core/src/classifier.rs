//! Extension-based content classification.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::error::InitError;
use crate::record::{Category, Record};

/// Archive extensions.
pub const DEFAULT_ARCHIVE_EXTENSIONS: &[&str] = &[
    "7z", "bz2", "gz", "iso", "rar", "tar", "tgz", "xz", "zip",
];

/// Executables. Not a category, but junk to the deleter.
pub const DEFAULT_EXECUTABLE_EXTENSIONS: &[&str] = &["bat", "cmd", "com", "exe", "msi", "sh"];

/// Image extensions.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "gif", "jpeg", "jpg", "png", "tbn", "tif", "tiff", "webp",
];

/// Subtitle extensions.
pub const DEFAULT_SUBTITLE_EXTENSIONS: &[&str] = &["ass", "idx", "smi", "srt", "ssa", "sub", "vtt"];

/// Text extensions.
pub const DEFAULT_TEXT_EXTENSIONS: &[&str] = &[
    "doc", "docx", "html", "md", "nfo", "pdf", "rtf", "sfv", "txt",
];

/// Video extensions.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &[
    "3g2", "3gp", "avi", "divx", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogv",
    "ts", "webm", "wmv",
];

fn to_vec(extensions: &[&str]) -> Vec<String> {
    extensions.iter().map(|ext| ext.to_string()).collect()
}

/// The stock category to extension mapping.
pub fn default_category_extensions() -> BTreeMap<Category, Vec<String>> {
    BTreeMap::from([
        (Category::Archive, to_vec(DEFAULT_ARCHIVE_EXTENSIONS)),
        (Category::Image, to_vec(DEFAULT_IMAGE_EXTENSIONS)),
        (Category::Subtitle, to_vec(DEFAULT_SUBTITLE_EXTENSIONS)),
        (Category::Text, to_vec(DEFAULT_TEXT_EXTENSIONS)),
        (Category::Video, to_vec(DEFAULT_VIDEO_EXTENSIONS)),
    ])
}

/// Extensions the `deleter` processor marks by default.
pub fn default_junk_extensions() -> Vec<String> {
    [
        DEFAULT_ARCHIVE_EXTENSIONS,
        DEFAULT_EXECUTABLE_EXTENSIONS,
        DEFAULT_IMAGE_EXTENSIONS,
        DEFAULT_SUBTITLE_EXTENSIONS,
        DEFAULT_TEXT_EXTENSIONS,
    ]
    .concat()
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Extension to [`Category`] lookup, inverted once from a category mapping.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    lookup: HashMap<String, Category>,
}

impl Classifier {
    /// Invert `mapping`. An extension listed under two different categories
    /// is rejected rather than resolved silently.
    pub fn new(mapping: &BTreeMap<Category, Vec<String>>) -> Result<Self, InitError> {
        let mut lookup = HashMap::new();
        for (category, extensions) in mapping {
            for extension in extensions {
                match lookup.get(extension) {
                    Some(existing) if existing != category => {
                        return Err(InitError::DuplicateMapping {
                            extension: extension.clone(),
                            existing: *existing,
                            duplicate: *category,
                        });
                    }
                    Some(_) => {}
                    None => {
                        lookup.insert(extension.clone(), *category);
                    }
                }
            }
        }
        trace!(extensions = lookup.len(), "categorizer: initialized");
        Ok(Self { lookup })
    }

    /// Case-sensitive lookup of a bare extension (no leading dot).
    pub fn category_of(&self, extension: &str) -> Category {
        self.lookup
            .get(extension.trim_start_matches('.'))
            .copied()
            .unwrap_or_default()
    }

    /// Classify a file record in place. Directories pass through untouched.
    pub fn identify(&self, record: &mut Record) {
        if record.is_dir() {
            return;
        }

        let extension = record.extension();
        if extension.is_empty() {
            debug!(path = %record.source_path().display(), "categorizer: no extension, unknown category");
            return;
        }

        let category = self.category_of(extension);
        if category != Category::Unknown {
            debug!(path = %record.source_path().display(), %category, "categorizer: identified");
        }
        record.set_category(category);
    }
}
