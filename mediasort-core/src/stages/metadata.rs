use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::InitError;
use crate::extract::{DEFAULT_MOVIE_MATCHERS, DEFAULT_TV_MATCHERS, MovieExtractor, TvExtractor};
use crate::plugin::{Processor, RecordReceiver, RecordSender, StageContext, forward};
use crate::record::{Category, MediaType, Record};

/// Options for [`TvMetadataStage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TvMetadataOptions {
    /// Ordered patterns with groups: show, year, season, episode
    pub matchers: Vec<String>,
    /// Collapse punctuation in the show name, keeping apostrophes
    pub sanitize_name: bool,
}

impl Default for TvMetadataOptions {
    fn default() -> Self {
        Self {
            matchers: DEFAULT_TV_MATCHERS.iter().map(|m| m.to_string()).collect(),
            sanitize_name: true,
        }
    }
}

/// Options for [`MovieMetadataStage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MovieMetadataOptions {
    /// Ordered patterns with groups: title, year
    pub matchers: Vec<String>,
    /// Collapse punctuation in the title
    pub sanitize_name: bool,
}

impl Default for MovieMetadataOptions {
    fn default() -> Self {
        Self {
            matchers: DEFAULT_MOVIE_MATCHERS.iter().map(|m| m.to_string()).collect(),
            sanitize_name: true,
        }
    }
}

/// Identifies TV episodes among video files and fills [`crate::record::TvMetadata`].
#[derive(Debug, Clone)]
pub struct TvMetadataStage {
    options: TvMetadataOptions,
    extractor: Option<TvExtractor>,
}

impl TvMetadataStage {
    /// Stage over `options`; matchers compile at init.
    pub fn new(options: TvMetadataOptions) -> Self {
        Self {
            options,
            extractor: None,
        }
    }

    fn apply(&self, record: &mut Record) {
        let Some(extractor) = &self.extractor else {
            return;
        };
        if record.category() != Category::Video {
            trace!(path = %record.source_path().display(), category = %record.category(), "tv_metadata: not video, skipping");
            return;
        }

        let path = record.source_path().to_string_lossy().into_owned();
        if !extractor.identify(&path) {
            return;
        }

        // A tv match overrides an earlier movie identification.
        if record.media_type() == MediaType::Movie {
            debug!(path = %path, "tv_metadata: reclassifying movie as tv");
            record.movie = Default::default();
        }
        record.set_media_type(MediaType::Tv);
        record.tv = extractor.extract(&path);
        info!(path = %path, episode = %record, "tv_metadata: identified tv");
    }
}

#[async_trait]
impl Processor for TvMetadataStage {
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        self.extractor = Some(TvExtractor::new(
            &self.options.matchers,
            self.options.sanitize_name,
        )?);
        Ok(())
    }

    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        _cancel: CancellationToken,
    ) {
        debug!("tv_metadata: started");
        while let Some(mut record) = input.recv().await {
            self.apply(&mut record);
            if !forward(&output, record, "tv_metadata").await {
                break;
            }
        }
    }
}

/// Identifies movies among video files and fills [`crate::record::MovieMetadata`].
#[derive(Debug, Clone)]
pub struct MovieMetadataStage {
    options: MovieMetadataOptions,
    extractor: Option<MovieExtractor>,
}

impl MovieMetadataStage {
    /// Stage over `options`; matchers compile at init.
    pub fn new(options: MovieMetadataOptions) -> Self {
        Self {
            options,
            extractor: None,
        }
    }

    fn apply(&self, record: &mut Record) {
        let Some(extractor) = &self.extractor else {
            return;
        };
        if record.category() != Category::Video {
            trace!(path = %record.source_path().display(), category = %record.category(), "movie_metadata: not video, skipping");
            return;
        }
        if record.media_type() != MediaType::Unset {
            trace!(path = %record.source_path().display(), media_type = %record.media_type(), "movie_metadata: already identified, skipping");
            return;
        }

        let path = record.source_path().to_string_lossy().into_owned();
        if !extractor.identify(&path) {
            return;
        }

        record.set_media_type(MediaType::Movie);
        record.movie = extractor.extract(&path);
        info!(
            path = %path,
            title = %record.movie.title,
            year = record.movie.release_year,
            "movie_metadata: identified movie"
        );
    }
}

#[async_trait]
impl Processor for MovieMetadataStage {
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        self.extractor = Some(MovieExtractor::new(
            &self.options.matchers,
            self.options.sanitize_name,
        )?);
        Ok(())
    }

    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        _cancel: CancellationToken,
    ) {
        debug!("movie_metadata: started");
        while let Some(mut record) = input.recv().await {
            self.apply(&mut record);
            if !forward(&output, record, "movie_metadata").await {
                break;
            }
        }
    }
}
