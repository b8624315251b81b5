//! Name-indexed stage factories.
//!
//! A [`Registry`] is built once at startup, then only read while assembling
//! the pipeline or generating a default configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Input, Output, Processor, StageOptions, overlay_options};
use crate::error::{ConfigError, InitError};
use crate::providers::{CollectionService, MovieLookup, SeriesLookup};
use crate::stages;

/// Processor chain phase. Phases run in declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Identification: runs right after the categorizer.
    Pre,
    /// Decoration from external databases.
    Intra,
    /// Destination resolution and deletion marking.
    Post,
}

impl Phase {
    /// Every phase in run order.
    pub const ALL: [Phase; 3] = [Phase::Pre, Phase::Intra, Phase::Post];

    /// Name used in config keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Intra => "intra",
            Phase::Post => "post",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BuildFn<T> = dyn Fn(&str, &StageOptions) -> Result<Box<T>, ConfigError> + Send + Sync;
type DefaultsFn = dyn Fn() -> StageOptions + Send + Sync;

/// Builds one kind of stage from its option struct `O`.
pub struct Factory<T: ?Sized> {
    build: Arc<BuildFn<T>>,
    defaults: Arc<DefaultsFn>,
}

impl<T: ?Sized> Clone for Factory<T> {
    fn clone(&self) -> Self {
        Self {
            build: Arc::clone(&self.build),
            defaults: Arc::clone(&self.defaults),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("defaults", &(self.defaults)())
            .finish()
    }
}

impl<T: ?Sized + 'static> Factory<T> {
    /// Factory for a stage configured by `O`, whose `Default` provides the
    /// values used when a key is not configured.
    pub fn from_options<O, F>(build: F) -> Self
    where
        O: Default + Serialize + DeserializeOwned + 'static,
        F: Fn(O) -> Box<T> + Send + Sync + 'static,
    {
        Self {
            build: Arc::new(
                move |name: &str, options: &StageOptions| -> Result<Box<T>, ConfigError> {
                    let options = overlay_options(name, O::default(), options)?;
                    Ok(build(options))
                },
            ),
            defaults: Arc::new(|| match serde_json::to_value(O::default()) {
                Ok(Value::Object(map)) => map,
                _ => StageOptions::new(),
            }),
        }
    }

    /// Construct a stage: defaults, then the `options` overlay.
    pub fn build(&self, name: &str, options: &StageOptions) -> Result<Box<T>, ConfigError> {
        (self.build)(name, options)
    }

    /// The option table a freshly constructed stage would use.
    pub fn default_options(&self) -> StageOptions {
        (self.defaults)()
    }
}

/// Collaborators that enable the lookup and collection stages.
#[derive(Clone, Default)]
pub struct Providers {
    /// Enables the `tvdb` stage.
    pub series: Option<Arc<dyn SeriesLookup>>,
    /// Enables the `tmdb` stage.
    pub movies: Option<Arc<dyn MovieLookup>>,
    /// Enables the `collector` output.
    pub collection: Option<Arc<dyn CollectionService>>,
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Providers")
            .field("series", &self.series.is_some())
            .field("movies", &self.movies.is_some())
            .field("collection", &self.collection.is_some())
            .finish()
    }
}

/// Factories in registration order, so generated configs list stages the
/// way they were registered.
type Named<F> = Vec<(String, F)>;

/// Stage factories by kind and name.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    inputs: Named<Factory<dyn Input>>,
    processors: BTreeMap<Phase, Named<Factory<dyn Processor>>>,
    outputs: Named<Factory<dyn Output>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stage that needs no external collaborator.
    pub fn builtin() -> Result<Self, InitError> {
        let mut registry = Self::new();
        stages::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Built-in stages plus whichever lookup and collection stages the
    /// supplied collaborators enable.
    pub fn with_providers(providers: Providers) -> Result<Self, InitError> {
        let mut registry = Self::builtin()?;
        stages::register_providers(&mut registry, providers)?;
        Ok(registry)
    }

    /// Register an input. Names are unique per kind.
    pub fn register_input(
        &mut self,
        name: impl Into<String>,
        factory: Factory<dyn Input>,
    ) -> Result<(), InitError> {
        insert_unique(&mut self.inputs, "input", name.into(), factory)
    }

    /// Register a processor for `phase`. Names are unique per phase.
    pub fn register_processor(
        &mut self,
        phase: Phase,
        name: impl Into<String>,
        factory: Factory<dyn Processor>,
    ) -> Result<(), InitError> {
        let kind = match phase {
            Phase::Pre => "pre processor",
            Phase::Intra => "intra processor",
            Phase::Post => "post processor",
        };
        insert_unique(
            self.processors.entry(phase).or_default(),
            kind,
            name.into(),
            factory,
        )
    }

    /// Register an output.
    pub fn register_output(
        &mut self,
        name: impl Into<String>,
        factory: Factory<dyn Output>,
    ) -> Result<(), InitError> {
        insert_unique(&mut self.outputs, "output", name.into(), factory)
    }

    /// The input registered as `name`.
    pub fn input(&self, name: &str) -> Option<&Factory<dyn Input>> {
        lookup(&self.inputs, name)
    }

    /// The processor registered as `name` in `phase`.
    pub fn processor(&self, phase: Phase, name: &str) -> Option<&Factory<dyn Processor>> {
        self.processors
            .get(&phase)
            .and_then(|stages| lookup(stages, name))
    }

    /// The output registered as `name`.
    pub fn output(&self, name: &str) -> Option<&Factory<dyn Output>> {
        lookup(&self.outputs, name)
    }

    /// Input names in registration order.
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        names(&self.inputs)
    }

    /// Processor names of one phase in registration order.
    pub fn processor_names(&self, phase: Phase) -> impl Iterator<Item = &str> {
        self.processors
            .get(&phase)
            .into_iter()
            .flat_map(|stages| names(stages))
    }

    /// Output names in registration order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        names(&self.outputs)
    }
}

fn lookup<'a, F>(stages: &'a Named<F>, name: &str) -> Option<&'a F> {
    stages
        .iter()
        .find(|(registered, _)| registered == name)
        .map(|(_, factory)| factory)
}

fn names<F>(stages: &Named<F>) -> impl Iterator<Item = &str> {
    stages.iter().map(|(name, _)| name.as_str())
}

fn insert_unique<F>(
    stages: &mut Named<F>,
    kind: &'static str,
    name: String,
    factory: F,
) -> Result<(), InitError> {
    if lookup(stages, &name).is_some() {
        return Err(InitError::DuplicatePlugin { kind, name });
    }
    stages.push((name, factory));
    Ok(())
}
