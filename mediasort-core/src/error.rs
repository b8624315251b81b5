//! Error types, one enum per failure class.

use std::path::PathBuf;

use thiserror::Error;

use crate::record::Category;

/// Malformed configuration detected while decoding stage options.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An option value has the wrong type or shape.
    #[error("invalid options for stage '{stage}': {source}")]
    InvalidOptions {
        /// Stage the options belong to.
        stage: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The options for a stage are not a key/value table.
    #[error("stage options for '{stage}' must be a table, got {found}")]
    NotATable {
        /// Stage the options belong to.
        stage: String,
        /// Kind of value found instead.
        found: String,
    },

    /// Queues need room for at least one record.
    #[error("pipeline buffer must be greater than zero")]
    ZeroCapacity,
}

/// Fatal startup failures raised while registering or initializing stages.
#[derive(Error, Debug)]
pub enum InitError {
    /// One extension was listed under two categories.
    #[error(
        "duplicate extension mapping: '{extension}' is mapped to {existing} and {duplicate}"
    )]
    DuplicateMapping {
        /// The conflicting extension, lowercased.
        extension: String,
        /// Category seen first.
        existing: Category,
        /// Category that tried to claim it again.
        duplicate: Category,
    },

    /// A stage name was registered twice for the same kind.
    #[error("{kind} plugin '{name}' is already registered")]
    DuplicatePlugin {
        /// Stage kind, e.g. `"output"`.
        kind: &'static str,
        /// The duplicated name.
        name: String,
    },

    /// A matcher pattern does not compile.
    #[error("invalid matcher '{pattern}': {source}")]
    InvalidMatcher {
        /// The pattern as configured.
        pattern: String,
        /// Compile error.
        #[source]
        source: regex::Error,
    },

    /// A category name outside the known set.
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    /// A setting that decodes but cannot be used.
    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// Option key.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A collaborator client could not be built.
    #[error("client construction failed: {0}")]
    Client(String),

    /// Option decoding failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures of a collaborator lookup or collection call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The provider knows nothing matching the query.
    #[error("no match found for '{0}'")]
    NotFound(String),

    /// The provider asked us to slow down.
    #[error("rate limited by provider")]
    RateLimited,

    /// Any other provider-side failure.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Per-record failures. Stages log these and keep going.
#[derive(Error, Debug)]
pub enum StageError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No path-resolving stage set a destination.
    #[error("record has no destination path")]
    MissingDestination,

    /// The destination's parent is missing and `create-dirs` is off.
    #[error("directory {0} does not exist and will not be created")]
    MissingDirectory(PathBuf),

    /// The destination exists and `overwrite` is off.
    #[error("destination {0} already exists and will not be overwritten")]
    DestinationExists(PathBuf),

    /// A collaborator call failed.
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// The record lacks the external id a stage needs, e.g. `"tvdb"`.
    #[error("record has no '{0}' identifier")]
    MissingIdentifier(&'static str),

    /// The run was cancelled while the record was in flight.
    #[error("operation cancelled")]
    Cancelled,
}

/// Orchestration-level faults surfaced by the pipeline engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A stage task panicked or was aborted.
    #[error("{phase} task failed: {source}")]
    TaskFailed {
        /// Engine phase the task belonged to: inputs, processors or outputs.
        phase: &'static str,
        /// Join error from the runtime.
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Any mediasort error.
#[derive(Error, Debug)]
pub enum SortError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`InitError`].
    #[error(transparent)]
    Init(#[from] InitError),

    /// See [`StageError`].
    #[error(transparent)]
    Stage(#[from] StageError),

    /// See [`LookupError`].
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// See [`EngineError`].
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result alias over [`SortError`].
pub type Result<T> = std::result::Result<T, SortError>;
