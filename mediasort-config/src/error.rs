//! Errors raised while loading, assembling and generating configs.

use std::path::PathBuf;

use mediasort_core::{ConfigError, InitError};
use thiserror::Error;

/// Failures reading or decoding a config file, or its env overrides.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The file could not be read.
    #[error("failed to read config file {path}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid TOML config.
    #[error("invalid TOML config {path}")]
    Toml {
        /// File that was parsed.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },
    /// The file is not a valid JSON config.
    #[error("invalid JSON config {path}")]
    Json {
        /// File that was parsed.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The file is not a valid YAML config.
    #[error("invalid YAML config {path}")]
    Yaml {
        /// File that was parsed.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_yaml::Error,
    },
    /// A `MEDIASORT_*` variable holds a value its setting cannot take.
    #[error("invalid value '{value}' for {key}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Fatal failures while turning a loaded config into a runnable engine.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// A configured stage failed to build or initialize.
    #[error("failed to build {kind} '{name}'")]
    Stage {
        /// `input`, `output`, or the processor phase.
        kind: &'static str,
        /// Registry name of the stage.
        name: String,
        /// Why it failed.
        #[source]
        source: InitError,
    },
    /// The `[categorizer]` table is inconsistent.
    #[error("failed to build categorizer")]
    Categorizer(#[source] InitError),
    /// The `[pipeline]` table is invalid.
    #[error(transparent)]
    Pipeline(#[from] ConfigError),
}

/// Failures rendering a generated config.
#[derive(Debug, Error)]
pub enum GenconfError {
    /// `--format` named something other than toml, json or yaml.
    #[error("unknown config format '{0}' (expected toml, json or yaml)")]
    UnknownFormat(String),
    /// TOML serialization failed.
    #[error("failed to render TOML")]
    Toml(#[from] toml::ser::Error),
    /// JSON serialization failed.
    #[error("failed to render JSON")]
    Json(#[from] serde_json::Error),
    /// YAML serialization failed.
    #[error("failed to render YAML")]
    Yaml(#[from] serde_yaml::Error),
}
