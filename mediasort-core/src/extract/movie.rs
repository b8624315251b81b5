use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{Matchers, parse_number, sanitize};
use crate::error::InitError;
use crate::record::MovieMetadata;

/// Stock movie matchers. Groups: title, year.
pub const DEFAULT_MOVIE_MATCHERS: &[&str] = &[
    // "Title (YEAR).ext", "Title.YEAR.1080p.ext", "Title (YEAR)/"
    r"(?i)\b([\s\w.-]*)[\s.-]?(?:[\s\(.-]?(\d{4})[\s\).-]?)(?:\s*[\(\[].*[\)\]])?(?:/|.[A-Za-z]{3})",
];

static MOVIE_SANITIZER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\W+").expect("valid movie sanitizer regex"));

/// Identifies movies and extracts title/year from a path.
#[derive(Debug, Clone)]
pub struct MovieExtractor {
    matchers: Matchers,
    sanitize: bool,
}

impl MovieExtractor {
    /// Compile `patterns` in order.
    pub fn new<S: AsRef<str>>(patterns: &[S], sanitize: bool) -> Result<Self, InitError> {
        let matchers = Matchers::new("movie_metadata", patterns)?;
        debug!(matchers = matchers.len(), sanitize, "movie_metadata: initialized");
        Ok(Self { matchers, sanitize })
    }

    /// [`DEFAULT_MOVIE_MATCHERS`] with sanitizing on.
    pub fn with_defaults() -> Result<Self, InitError> {
        Self::new(DEFAULT_MOVIE_MATCHERS, true)
    }

    /// `true` when any matcher finds `path` to be a movie.
    pub fn identify(&self, path: &str) -> bool {
        self.matchers.identify(path)
    }

    /// Title and year. Unmatched fields stay empty or zero.
    pub fn extract(&self, path: &str) -> MovieMetadata {
        let [title, year] = self.matchers.fields::<2>(path);

        let title = match title {
            Some(title) if self.sanitize => sanitize(&MOVIE_SANITIZER, &title),
            Some(title) => title,
            None => String::new(),
        };

        MovieMetadata {
            title,
            release_year: parse_number(year.as_deref()),
        }
    }
}
