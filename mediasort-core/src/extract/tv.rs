use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{Matchers, parse_number, sanitize};
use crate::error::InitError;
use crate::record::{Episode, Season, TvMetadata};

/// Stock TV matchers. Groups: show, year, season, episode.
pub const DEFAULT_TV_MATCHERS: &[&str] = &[
    // "Show 1x01", "Show.1-01", "Show/1/01"
    r"(?i)\b([\s\w'.-]*)[\s./-]+(?:\((\d+)\))?[\s./-]?(\d{1,3})[x-](\d{1,3})",
    // "Show S01E01", "Show (2005) s01.e01"
    r"(?i)\b([\s\w'.-]*?)?(?:[\s\(./-](\d{4})[\s\)./-])?[\s\w.-]?(?:s+(\d+))(?:\.|\s|-|_|x)*(?:e+(\d+))",
    // "Show Season 1 Episode 1", "Show/Season 1/01"
    r"(?i)\b([\s\w'.-]*)[\s./-]+(?:\((\d+)\))?[\s./-]?(?:season|series).?(\d+).?(?:episode)?[^\d(]?(\d+)",
];

// Apostrophes survive so "Tom Clancy's" keeps its possessive.
static TV_SANITIZER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^'\w]+").expect("valid tv sanitizer regex"));

/// Identifies TV episodes and extracts show/season/episode from a path.
#[derive(Debug, Clone)]
pub struct TvExtractor {
    matchers: Matchers,
    sanitize: bool,
}

impl TvExtractor {
    /// Compile `patterns` in order. Any invalid pattern fails the whole set.
    pub fn new<S: AsRef<str>>(patterns: &[S], sanitize: bool) -> Result<Self, InitError> {
        let matchers = Matchers::new("tv_metadata", patterns)?;
        debug!(matchers = matchers.len(), sanitize, "tv_metadata: initialized");
        Ok(Self { matchers, sanitize })
    }

    /// [`DEFAULT_TV_MATCHERS`] with sanitizing on.
    pub fn with_defaults() -> Result<Self, InitError> {
        Self::new(DEFAULT_TV_MATCHERS, true)
    }

    /// `true` when any matcher finds `path` to be an episode.
    pub fn identify(&self, path: &str) -> bool {
        self.matchers.identify(path)
    }

    /// Pure function of `path` and the configured matchers.
    pub fn extract(&self, path: &str) -> TvMetadata {
        let [name, year, season, episode] = self.matchers.fields::<4>(path);

        let name = match name {
            Some(name) if self.sanitize => sanitize(&TV_SANITIZER, &name),
            Some(name) => name,
            None => String::new(),
        };

        TvMetadata {
            name,
            release_year: parse_number(year.as_deref()),
            season: Season {
                number: parse_number(season.as_deref()),
            },
            episode: Episode {
                number: parse_number(episode.as_deref()),
                ..Default::default()
            },
        }
    }
}
