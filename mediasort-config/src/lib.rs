//! Configuration for mediasort.
//!
//! - [`loader`] finds and decodes the TOML, JSON or YAML config and applies
//!   `MEDIASORT_*` environment overrides.
//! - [`assemble`](assemble::assemble) turns a [`SortConfig`] into a
//!   ready-to-run [`PipelineEngine`](mediasort_core::PipelineEngine).
//! - [`genconf`] renders a config listing every registered stage with its
//!   default options.

pub mod assemble;
pub mod error;
pub mod genconf;
pub mod loader;
pub mod model;

pub use assemble::assemble;
pub use error::{AssembleError, ConfigLoadError, GenconfError};
pub use genconf::{ConfigFormat, Selection, generate};
pub use loader::{ConfigLoader, ConfigSource};
pub use model::{LogFormat, SortConfig, StageEntry};
