//! The unit of work carried through the pipeline.
//!
//! A [`Record`] is created by an input the moment a filesystem entry is
//! discovered and then handed by value from stage to stage. Its source path is
//! fixed at construction; classification fields only ever move forward.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InitError;

/// Broad content classification derived from the file extension.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Compressed bundles and disc images.
    Archive,
    /// Artwork and thumbnails.
    Image,
    /// Subtitle tracks.
    Subtitle,
    /// Release notes, NFOs and other documents.
    Text,
    /// Anything playable.
    Video,
    /// No extension, or one nobody mapped.
    #[default]
    Unknown,
}

impl Category {
    /// Every category an extension can be mapped to.
    pub const KNOWN: [Category; 5] = [
        Category::Archive,
        Category::Image,
        Category::Subtitle,
        Category::Text,
        Category::Video,
    ];

    /// Lowercase name, as used in config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Archive => "archive",
            Category::Image => "image",
            Category::Subtitle => "subtitle",
            Category::Text => "text",
            Category::Video => "video",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = InitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "archive" => Ok(Category::Archive),
            "image" => Ok(Category::Image),
            "subtitle" => Ok(Category::Subtitle),
            "text" => Ok(Category::Text),
            "video" => Ok(Category::Video),
            "unknown" => Ok(Category::Unknown),
            _ => Err(InitError::UnknownCategory(s.to_string())),
        }
    }
}

/// Specific identified content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Not identified yet.
    #[default]
    Unset,
    /// A TV episode.
    Tv,
    /// A movie.
    Movie,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Unset => f.write_str("unset"),
            MediaType::Tv => f.write_str("tv"),
            MediaType::Movie => f.write_str("movie"),
        }
    }
}

/// Whether the entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    /// A regular file, or a link followed to one.
    #[default]
    File,
    /// A directory. Only the deleter acts on these.
    Directory,
}

/// Season of an episode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Season {
    /// Season number, zero when unknown.
    pub number: u32,
}

/// Episode within a season.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Episode {
    /// Episode number, zero when unknown.
    pub number: u32,
    /// Title, only known after a lookup.
    pub title: String,
    /// Number counted across all seasons, only known after a lookup.
    pub absolute_number: u32,
}

/// Metadata for a single TV episode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TvMetadata {
    /// Show name.
    pub name: String,
    /// First-air year, zero when unknown.
    pub release_year: u32,
    /// Season.
    pub season: Season,
    /// Episode.
    pub episode: Episode,
}

/// Metadata for a single movie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieMetadata {
    /// Title.
    pub title: String,
    /// Release year, zero when unknown.
    pub release_year: u32,
}

/// A single discovered filesystem entry and everything learned about it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    source_path: PathBuf,
    entry_kind: EntryKind,
    category: Category,
    media_type: MediaType,
    destination_path: Option<PathBuf>,
    delete: bool,
    identifiers: HashMap<String, String>,
    /// Filled when the record is identified as [`MediaType::Tv`].
    pub tv: TvMetadata,
    /// Filled when the record is identified as [`MediaType::Movie`].
    pub movie: MovieMetadata,
}

impl Record {
    /// A record for an entry discovered at `source_path`.
    pub fn new(source_path: impl Into<PathBuf>, entry_kind: EntryKind) -> Self {
        Self {
            source_path: source_path.into(),
            entry_kind,
            ..Default::default()
        }
    }

    /// A file record.
    pub fn file(source_path: impl Into<PathBuf>) -> Self {
        Self::new(source_path, EntryKind::File)
    }

    /// A directory record.
    pub fn directory(source_path: impl Into<PathBuf>) -> Self {
        Self::new(source_path, EntryKind::Directory)
    }

    /// Where the entry was found. Never changes.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// File or directory.
    pub fn entry_kind(&self) -> EntryKind {
        self.entry_kind
    }

    /// `true` for directory records.
    pub fn is_dir(&self) -> bool {
        self.entry_kind == EntryKind::Directory
    }

    /// Category assigned by the categorizer.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Refine the category. `Unknown` never replaces a known category.
    pub fn set_category(&mut self, category: Category) {
        if category != Category::Unknown {
            self.category = category;
        }
    }

    /// Media type assigned by an extractor stage.
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Refine the media type. `Unset` never replaces an identified type.
    pub fn set_media_type(&mut self, media_type: MediaType) {
        if media_type != MediaType::Unset {
            self.media_type = media_type;
        }
    }

    /// Destination resolved by a path solver, if any.
    pub fn destination_path(&self) -> Option<&Path> {
        self.destination_path.as_deref()
    }

    /// Set the destination once. Returns `false` and leaves the record alone
    /// when a destination was already resolved.
    pub fn set_destination(&mut self, path: impl Into<PathBuf>) -> bool {
        if self.destination_path.is_some() {
            return false;
        }
        self.destination_path = Some(path.into());
        true
    }

    /// Whether a stage asked for this entry to be removed.
    pub fn marked_for_delete(&self) -> bool {
        self.delete
    }

    /// Ask the deleter output to remove this entry once the stream ends.
    pub fn mark_for_delete(&mut self) {
        self.delete = true;
    }

    /// External id stored under `key`, e.g. `"tvdb"`.
    pub fn identifier(&self, key: &str) -> Option<&str> {
        self.identifiers.get(key).map(String::as_str)
    }

    /// All external ids.
    pub fn identifiers(&self) -> &HashMap<String, String> {
        &self.identifiers
    }

    /// Store an external id, replacing any previous value for `key`.
    pub fn set_identifier(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.identifiers.insert(key.into(), value.into());
    }

    /// Text after the final `.` of the last path component, or `""`.
    pub fn extension(&self) -> &str {
        self.source_path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rfind('.').map(|idx| &name[idx + 1..]))
            .unwrap_or("")
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.media_type {
            MediaType::Tv => write!(
                f,
                "{} Season {} Episode {}",
                self.tv.name, self.tv.season.number, self.tv.episode.number
            ),
            _ => write!(f, "{}", self.source_path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_uses_last_component() {
        assert_eq!(Record::file("/src/show.s01e01.mkv").extension(), "mkv");
        assert_eq!(Record::file("/src/some.dir/README").extension(), "");
        assert_eq!(Record::file("/src/.hidden").extension(), "hidden");
        assert_eq!(Record::file("/src/trailing.").extension(), "");
    }

    #[test]
    fn classification_is_monotonic() {
        let mut record = Record::file("/src/a.mkv");
        record.set_category(Category::Video);
        record.set_category(Category::Unknown);
        assert_eq!(record.category(), Category::Video);

        record.set_media_type(MediaType::Tv);
        record.set_media_type(MediaType::Unset);
        assert_eq!(record.media_type(), MediaType::Tv);
    }

    #[test]
    fn destination_is_written_once() {
        let mut record = Record::file("/src/a.mkv");
        assert!(record.set_destination("/dest/a.mkv"));
        assert!(!record.set_destination("/dest/b.mkv"));
        assert_eq!(record.destination_path(), Some(Path::new("/dest/a.mkv")));
    }

    #[test]
    fn display_prefers_episode_summary() {
        let mut record = Record::file("/src/Mr Robot S02E05.mkv");
        assert_eq!(record.to_string(), "/src/Mr Robot S02E05.mkv");

        record.set_media_type(MediaType::Tv);
        record.tv.name = "Mr Robot".into();
        record.tv.season.number = 2;
        record.tv.episode.number = 5;
        assert_eq!(record.to_string(), "Mr Robot Season 2 Episode 5");
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Video".parse::<Category>().unwrap(), Category::Video);
        assert!(matches!(
            "podcast".parse::<Category>(),
            Err(InitError::UnknownCategory(_))
        ));
    }
}
