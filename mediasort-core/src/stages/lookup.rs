//! Decorators that refine extracted metadata with an external database.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{InitError, StageError};
use crate::plugin::{Processor, RecordReceiver, RecordSender, StageContext, forward};
use crate::providers::{EpisodeQuery, MovieLookup, MovieQuery, RateLimiter, SeriesLookup};
use crate::record::{MediaType, Record};

const DEFAULT_REQUEST_LIMIT: u32 = 10;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").expect("valid non-word regex"));

/// Show name as sent to the series database: punctuation blanked out and the
/// release year appended when one was extracted.
fn search_name(name: &str, year: u32) -> String {
    let clean = NON_WORD.replace_all(name, " ");
    if year > 0 {
        format!("{clean} ({year})")
    } else {
        clean.into_owned()
    }
}

/// Options for [`TvdbStage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TvdbOptions {
    /// Lookups per second
    pub request_limit: u32,
}

impl Default for TvdbOptions {
    fn default() -> Self {
        Self {
            request_limit: DEFAULT_REQUEST_LIMIT,
        }
    }
}

/// Options for [`TmdbStage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TmdbOptions {
    /// Lookups per second
    pub request_limit: u32,
}

impl Default for TmdbOptions {
    fn default() -> Self {
        Self {
            request_limit: DEFAULT_REQUEST_LIMIT,
        }
    }
}

/// Wait for a limiter slot, giving up when the run is cancelled.
async fn throttle(limiter: &mut RateLimiter, cancel: &CancellationToken) -> Result<(), StageError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StageError::Cancelled),
        _ = limiter.acquire() => Ok(()),
    }
}

/// Refines tv records from a [`SeriesLookup`].
pub struct TvdbStage {
    options: TvdbOptions,
    lookup: Arc<dyn SeriesLookup>,
    limiter: Option<RateLimiter>,
}

impl fmt::Debug for TvdbStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TvdbStage")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TvdbStage {
    /// Stage querying `lookup`, throttled by `options.request_limit`.
    pub fn new(options: TvdbOptions, lookup: Arc<dyn SeriesLookup>) -> Self {
        Self {
            options,
            lookup,
            limiter: None,
        }
    }

    async fn decorate(
        &mut self,
        record: &mut Record,
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        if cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        if let Some(limiter) = self.limiter.as_mut() {
            throttle(limiter, cancel).await?;
        }

        let query = EpisodeQuery {
            name: search_name(&record.tv.name, record.tv.release_year),
            season: record.tv.season.number,
            episode: record.tv.episode.number,
        };
        debug!(name = %query.name, season = query.season, episode = query.episode, "tvdb: looking up");

        let found = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StageError::Cancelled),
            found = self.lookup.lookup_episode(query) => found?,
        };

        record.set_identifier("tvdb", found.episode_id.to_string());
        if !found.series_name.is_empty() {
            record.tv.name = found.series_name;
        }
        record.tv.episode.title = found.episode_title;
        record.tv.episode.absolute_number = found.absolute_number;
        Ok(())
    }
}

#[async_trait]
impl Processor for TvdbStage {
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        self.limiter = Some(RateLimiter::per_second(self.options.request_limit)?);
        Ok(())
    }

    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        cancel: CancellationToken,
    ) {
        trace!("tvdb: started");
        while let Some(mut record) = input.recv().await {
            if record.media_type() == MediaType::Tv {
                match self.decorate(&mut record, &cancel).await {
                    Ok(()) => info!(path = %record.source_path().display(), episode = %record, "tvdb: decorated"),
                    Err(err) => warn!(path = %record.source_path().display(), error = %err, "tvdb: lookup failed"),
                }
            }
            if !forward(&output, record, "tvdb").await {
                break;
            }
        }
    }
}

/// Refines movie records from a [`MovieLookup`].
pub struct TmdbStage {
    options: TmdbOptions,
    lookup: Arc<dyn MovieLookup>,
    limiter: Option<RateLimiter>,
}

impl fmt::Debug for TmdbStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbStage")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TmdbStage {
    /// Stage querying `lookup`.
    pub fn new(options: TmdbOptions, lookup: Arc<dyn MovieLookup>) -> Self {
        Self {
            options,
            lookup,
            limiter: None,
        }
    }

    async fn decorate(
        &mut self,
        record: &mut Record,
        cancel: &CancellationToken,
    ) -> Result<(), StageError> {
        if cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        if let Some(limiter) = self.limiter.as_mut() {
            throttle(limiter, cancel).await?;
        }

        let year = record.movie.release_year;
        let query = MovieQuery {
            title: record.movie.title.clone(),
            year: (year > 0).then_some(year),
        };
        debug!(title = %query.title, year = ?query.year, "tmdb: looking up");

        let found = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StageError::Cancelled),
            found = self.lookup.lookup_movie(query) => found?,
        };

        record.set_identifier("tmdb", found.tmdb_id.to_string());
        if let Some(imdb) = found.imdb_id {
            record.set_identifier("imdb", imdb);
        }
        if !found.title.is_empty() {
            record.movie.title = found.title;
        }
        if let Some(year) = found.release_year {
            record.movie.release_year = year;
        }
        Ok(())
    }
}

#[async_trait]
impl Processor for TmdbStage {
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        self.limiter = Some(RateLimiter::per_second(self.options.request_limit)?);
        Ok(())
    }

    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        cancel: CancellationToken,
    ) {
        trace!("tmdb: started");
        while let Some(mut record) = input.recv().await {
            if record.media_type() == MediaType::Movie {
                match self.decorate(&mut record, &cancel).await {
                    Ok(()) => info!(
                        path = %record.source_path().display(),
                        title = %record.movie.title,
                        "tmdb: decorated"
                    ),
                    Err(err) => warn!(path = %record.source_path().display(), error = %err, "tmdb: lookup failed"),
                }
            }
            if !forward(&output, record, "tmdb").await {
                break;
            }
        }
    }
}
