//! Built-in stages and their registry names.

mod categorizer;
mod collector;
mod deleter;
mod filepath;
mod lookup;
mod metadata;
mod path_mover;
mod path_solver;
mod stdout;

pub use categorizer::CategorizerStage;
pub use collector::{CollectorOptions, CollectorOutput};
pub use deleter::{DeleterOptions, DeleterOutput, DeleterStage};
pub use filepath::{FilepathInput, FilepathOptions};
pub use lookup::{TmdbOptions, TmdbStage, TvdbOptions, TvdbStage};
pub use metadata::{MovieMetadataOptions, MovieMetadataStage, TvMetadataOptions, TvMetadataStage};
pub use path_mover::{PathMoverOptions, PathMoverOutput};
pub use path_solver::{MoviePathOptions, MoviePathSolver, TvPathOptions, TvPathSolver};
pub use stdout::{StdoutOptions, StdoutOutput};

use std::sync::Arc;

use crate::error::InitError;
use crate::plugin::{Factory, Input, Output, Phase, Processor, Providers, Registry};

/// Directory walker input.
pub const FILEPATH: &str = "filepath";
/// TV identification, `pre` phase.
pub const TV: &str = "tv";
/// Movie identification, `pre` phase.
pub const MOVIE: &str = "movie";
/// Series lookup, `intra` phase.
pub const TVDB: &str = "tvdb";
/// Movie lookup, `intra` phase.
pub const TMDB: &str = "tmdb";
/// TV destination, `post` phase.
pub const TV_PATH_SOLVER: &str = "tv-path-solver";
/// Movie destination, `post` phase.
pub const MOVIE_PATH_SOLVER: &str = "movie-path-solver";
/// Deletion marker, `post` phase.
pub const DELETER: &str = "deleter";
/// Reporting output.
pub const STDOUT: &str = "stdout";
/// Moving output.
pub const PATH_MOVER: &str = "path-mover";
/// Collection output.
pub const COLLECTOR: &str = "collector";

pub(crate) fn register_builtin(registry: &mut Registry) -> Result<(), InitError> {
    registry.register_input(
        FILEPATH,
        Factory::from_options(|o: FilepathOptions| Box::new(FilepathInput::new(o)) as Box<dyn Input>),
    )?;

    registry.register_processor(
        Phase::Pre,
        TV,
        Factory::from_options(|o: TvMetadataOptions| {
            Box::new(TvMetadataStage::new(o)) as Box<dyn Processor>
        }),
    )?;
    registry.register_processor(
        Phase::Pre,
        MOVIE,
        Factory::from_options(|o: MovieMetadataOptions| {
            Box::new(MovieMetadataStage::new(o)) as Box<dyn Processor>
        }),
    )?;

    registry.register_processor(
        Phase::Post,
        TV_PATH_SOLVER,
        Factory::from_options(|o: TvPathOptions| Box::new(TvPathSolver::new(o)) as Box<dyn Processor>),
    )?;
    registry.register_processor(
        Phase::Post,
        MOVIE_PATH_SOLVER,
        Factory::from_options(|o: MoviePathOptions| {
            Box::new(MoviePathSolver::new(o)) as Box<dyn Processor>
        }),
    )?;
    registry.register_processor(
        Phase::Post,
        DELETER,
        Factory::from_options(|o: DeleterOptions| Box::new(DeleterStage::new(o)) as Box<dyn Processor>),
    )?;

    registry.register_output(
        STDOUT,
        Factory::from_options(|o: StdoutOptions| Box::new(StdoutOutput::new(o)) as Box<dyn Output>),
    )?;
    registry.register_output(
        PATH_MOVER,
        Factory::from_options(|o: PathMoverOptions| {
            Box::new(PathMoverOutput::new(o)) as Box<dyn Output>
        }),
    )?;

    Ok(())
}

pub(crate) fn register_providers(
    registry: &mut Registry,
    providers: Providers,
) -> Result<(), InitError> {
    if let Some(series) = providers.series {
        registry.register_processor(
            Phase::Intra,
            TVDB,
            Factory::from_options(move |o: TvdbOptions| {
                Box::new(TvdbStage::new(o, Arc::clone(&series))) as Box<dyn Processor>
            }),
        )?;
    }

    if let Some(movies) = providers.movies {
        registry.register_processor(
            Phase::Intra,
            TMDB,
            Factory::from_options(move |o: TmdbOptions| {
                Box::new(TmdbStage::new(o, Arc::clone(&movies))) as Box<dyn Processor>
            }),
        )?;
    }

    if let Some(collection) = providers.collection {
        registry.register_output(
            COLLECTOR,
            Factory::from_options(move |o: CollectorOptions| {
                Box::new(CollectorOutput::new(o, Arc::clone(&collection))) as Box<dyn Output>
            }),
        )?;
    }

    Ok(())
}
