//! Contracts for external metadata and collection services.
//!
//! The lookup and collection stages only talk to these traits; concrete
//! network clients live outside this crate.

mod rate_limit;

pub use rate_limit::RateLimiter;

use async_trait::async_trait;

use crate::error::LookupError;

/// Partial episode metadata recovered from a path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpisodeQuery {
    /// Punctuation-free show name, suffixed with ` (YEAR)` when known.
    pub name: String,
    /// Season number, zero when unknown.
    pub season: u32,
    /// Episode number, zero when unknown.
    pub episode: u32,
}

/// Best match reported by a series database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpisodeMatch {
    /// Provider id of the episode, stored under the `tvdb` identifier.
    pub episode_id: u64,
    /// Canonical series name.
    pub series_name: String,
    /// Episode title.
    pub episode_title: String,
    /// Episode number counted across all seasons.
    pub absolute_number: u32,
}

/// Title and optional year recovered from a path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MovieQuery {
    /// Punctuation-free title.
    pub title: String,
    /// Release year when the path carried one.
    pub year: Option<u32>,
}

/// Best match reported by a movie database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MovieMatch {
    /// Provider id, stored under the `tmdb` identifier.
    pub tmdb_id: u64,
    /// Cross-reference id, stored under `imdb` when present.
    pub imdb_id: Option<String>,
    /// Canonical title.
    pub title: String,
    /// Canonical release year.
    pub release_year: Option<u32>,
}

/// Something a collection service can record as owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionItem {
    /// An episode by its `tvdb` id.
    Episode { tvdb: u64 },
    /// A movie by its `tmdb` id.
    Movie { tmdb: u64 },
}

/// Resolves a partial episode to a series database entry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeriesLookup: Send + Sync {
    /// Best match for `query`.
    async fn lookup_episode(&self, query: EpisodeQuery) -> Result<EpisodeMatch, LookupError>;
}

/// Resolves a title and year to a movie database entry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieLookup: Send + Sync {
    /// Best match for `query`.
    async fn lookup_movie(&self, query: MovieQuery) -> Result<MovieMatch, LookupError>;
}

/// Records items as owned in a user collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionService: Send + Sync {
    /// Add one item to the collection.
    async fn add(&self, item: CollectionItem) -> Result<(), LookupError>;
}
