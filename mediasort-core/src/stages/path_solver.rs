use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::plugin::{Processor, RecordReceiver, RecordSender, forward};
use crate::record::{MediaType, Record};

fn dotted_extension(record: &Record) -> String {
    match record.extension() {
        "" => String::new(),
        ext => format!(".{ext}"),
    }
}

/// Store `destination` unless an earlier stage already resolved one.
fn resolve(record: &mut Record, destination: PathBuf, stage: &str) {
    if let Some(existing) = record.destination_path() {
        warn!(
            stage,
            path = %record.source_path().display(),
            existing = %existing.display(),
            "destination already set, keeping it"
        );
        return;
    }
    info!(
        stage,
        path = %record.source_path().display(),
        dest = %destination.display(),
        "solved destination"
    );
    record.set_destination(destination);
}

/// Options for [`TvPathSolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TvPathOptions {
    /// Library root
    pub dest_dir: PathBuf,
    /// Directory under the root holding every show
    pub tv_prefix: String,
    /// Nest episodes in `Season NN` directories
    pub season_dirs: bool,
    /// Append the episode title to the file name when one is known
    pub episode_names: bool,
}

impl Default for TvPathOptions {
    fn default() -> Self {
        Self {
            dest_dir: PathBuf::from("dest"),
            tv_prefix: "tv".to_string(),
            season_dirs: true,
            episode_names: false,
        }
    }
}

/// `<dest-dir>/<tv-prefix>/<Name>/Season NN/<Name> SNNEMM[ <Title>].<ext>`
#[derive(Debug, Clone)]
pub struct TvPathSolver {
    options: TvPathOptions,
}

impl TvPathSolver {
    /// Solver with `options`.
    pub fn new(options: TvPathOptions) -> Self {
        Self { options }
    }

    /// Destination for a tv record.
    pub fn destination(&self, record: &Record) -> PathBuf {
        let tv = &record.tv;
        let title = if self.options.episode_names && !tv.episode.title.is_empty() {
            format!(" {}", tv.episode.title)
        } else {
            String::new()
        };
        let filename = format!(
            "{} S{:02}E{:02}{}{}",
            tv.name,
            tv.season.number,
            tv.episode.number,
            title,
            dotted_extension(record)
        );

        let mut path = self.options.dest_dir.join(&self.options.tv_prefix).join(&tv.name);
        if self.options.season_dirs {
            path.push(format!("Season {:02}", tv.season.number));
        }
        path.push(filename);
        path
    }

    fn apply(&self, record: &mut Record) {
        if record.media_type() != MediaType::Tv {
            trace!(path = %record.source_path().display(), "tv_path_solver: not tv, forwarding");
            return;
        }
        if record.tv.name.is_empty() {
            warn!(path = %record.source_path().display(), "tv_path_solver: no show name, skipping");
            return;
        }
        let destination = self.destination(record);
        resolve(record, destination, "tv_path_solver");
    }
}

#[async_trait]
impl Processor for TvPathSolver {
    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        _cancel: CancellationToken,
    ) {
        debug!(dest = %self.options.dest_dir.display(), "tv_path_solver: started");
        while let Some(mut record) = input.recv().await {
            self.apply(&mut record);
            if !forward(&output, record, "tv_path_solver").await {
                break;
            }
        }
    }
}

/// Options for [`MoviePathSolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MoviePathOptions {
    /// Library root
    pub dest_dir: PathBuf,
    /// Directory under the root holding every movie
    pub movie_prefix: String,
    /// Give every movie its own `Title (YEAR)` directory
    pub movie_dirs: bool,
}

impl Default for MoviePathOptions {
    fn default() -> Self {
        Self {
            dest_dir: PathBuf::from("dest"),
            movie_prefix: "movies".to_string(),
            movie_dirs: true,
        }
    }
}

/// `<dest-dir>/<movie-prefix>/<Title> (YEAR)/<Title> (YEAR).<ext>`
#[derive(Debug, Clone)]
pub struct MoviePathSolver {
    options: MoviePathOptions,
}

impl MoviePathSolver {
    /// Solver with `options`.
    pub fn new(options: MoviePathOptions) -> Self {
        Self { options }
    }

    /// Destination for a movie record.
    pub fn destination(&self, record: &Record) -> PathBuf {
        let stem = format!("{} ({})", record.movie.title, record.movie.release_year);
        let mut path = self.options.dest_dir.join(&self.options.movie_prefix);
        if self.options.movie_dirs {
            path.push(&stem);
        }
        path.push(format!("{stem}{}", dotted_extension(record)));
        path
    }

    fn apply(&self, record: &mut Record) {
        if record.media_type() != MediaType::Movie {
            trace!(path = %record.source_path().display(), "movie_path_solver: not a movie, forwarding");
            return;
        }
        if record.movie.title.is_empty() {
            warn!(path = %record.source_path().display(), "movie_path_solver: no title, skipping");
            return;
        }
        let destination = self.destination(record);
        resolve(record, destination, "movie_path_solver");
    }
}

#[async_trait]
impl Processor for MoviePathSolver {
    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        _cancel: CancellationToken,
    ) {
        debug!(dest = %self.options.dest_dir.display(), "movie_path_solver: started");
        while let Some(mut record) = input.recv().await {
            self.apply(&mut record);
            if !forward(&output, record, "movie_path_solver").await {
                break;
            }
        }
    }
}
