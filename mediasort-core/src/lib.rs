//! # Mediasort Core
//!
//! Core library for mediasort: discover media files, work out what they are,
//! and route them to a tidy library layout.
//!
//! ## Overview
//!
//! - **Records**: [`record::Record`] is the unit handed from stage to stage.
//! - **Classification**: [`classifier::Classifier`] maps extensions to a
//!   [`record::Category`]; [`extract`] recognises TV episodes and movies from
//!   their paths with ordered regular expressions.
//! - **Plugins**: [`plugin`] defines the `Input`, `Processor` and `Output`
//!   contracts and the name-indexed [`plugin::Registry`].
//! - **Engine**: [`pipeline::PipelineEngine`] wires inputs, the processor
//!   chain and outputs into one bounded dataflow graph.
//! - **Stages**: [`stages`] holds every built-in stage.
//! - **Collaborators**: [`providers`] describes the external lookup and
//!   collection services the decorating stages rely on.
//!
//! ## Example
//!
//! ```no_run
//! use mediasort_core::pipeline::PipelineEngine;
//! use mediasort_core::plugin::{Input, Output, Processor, StageContext};
//! use mediasort_core::stages::{
//!     CategorizerStage, FilepathInput, FilepathOptions, StdoutOptions, StdoutOutput,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = StageContext::default();
//! let mut categorizer = CategorizerStage::default();
//! categorizer.init(&ctx)?;
//!
//! let input = FilepathInput::new(FilepathOptions {
//!     src_dir: "/downloads".into(),
//!     ..Default::default()
//! });
//!
//! PipelineEngine::new()
//!     .with_inputs([Box::new(input) as Box<dyn Input>])
//!     .with_processors([Box::new(categorizer) as Box<dyn Processor>])
//!     .with_outputs([Box::new(StdoutOutput::new(StdoutOptions::default())) as Box<dyn Output>])
//!     .run(CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod plugin;
pub mod providers;
pub mod record;
pub mod stages;

pub use error::{
    ConfigError, EngineError, InitError, LookupError, Result, SortError, StageError,
};
pub use pipeline::PipelineEngine;
pub use plugin::{Phase, Registry, StageContext};
pub use record::{Category, EntryKind, MediaType, Record};
