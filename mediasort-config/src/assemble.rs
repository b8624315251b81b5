//! Config to engine.

use mediasort_core::plugin::{Factory, Output, Processor, StageContext};
use mediasort_core::stages::{CategorizerStage, DeleterOutput};
use mediasort_core::{InitError, Phase, PipelineEngine, Registry};
use tracing::{debug, info, warn};

use crate::error::AssembleError;
use crate::model::{SortConfig, StageEntry};

/// Build and initialize one configured stage. Unknown names yield `None`.
fn build_stage<T: ?Sized + 'static>(
    kind: &'static str,
    entry: &StageEntry,
    factory: Option<&Factory<T>>,
    init: impl FnOnce(&mut T) -> Result<(), InitError>,
) -> Result<Option<Box<T>>, AssembleError> {
    let Some(factory) = factory else {
        warn!(kind, name = %entry.name, "unknown plugin, skipping");
        return Ok(None);
    };

    let fail = |source: InitError| AssembleError::Stage {
        kind,
        name: entry.name.clone(),
        source,
    };

    let mut stage = factory
        .build(&entry.name, &entry.options)
        .map_err(|err| fail(err.into()))?;
    init(&mut *stage).map_err(fail)?;
    debug!(kind, name = %entry.name, "stage ready");
    Ok(Some(stage))
}

/// Turn a loaded config into a ready-to-run engine.
///
/// Every stage is constructed, configured and initialized exactly once here,
/// so any failure surfaces before the first record is read. The categorizer
/// always heads the processor chain and the deleter output is always
/// attached.
pub fn assemble(
    config: &SortConfig,
    registry: &Registry,
    ctx: &StageContext,
) -> Result<PipelineEngine, AssembleError> {
    let mut engine = PipelineEngine::with_capacity(config.pipeline.buffer)?;

    for entry in &config.inputs {
        let stage = build_stage("input", entry, registry.input(&entry.name), |s| s.init(ctx))?;
        if let Some(stage) = stage {
            engine.add_input(stage);
        }
    }

    for phase in Phase::ALL {
        for entry in config.processors.phase(phase) {
            let stage = build_stage(
                phase.as_str(),
                entry,
                registry.processor(phase, &entry.name),
                |s| s.init(ctx),
            )?;
            if let Some(stage) = stage {
                engine.add_processor(stage);
            }
        }
    }

    for entry in &config.outputs {
        let stage = build_stage("output", entry, registry.output(&entry.name), |s| s.init(ctx))?;
        if let Some(stage) = stage {
            engine.add_output(stage);
        }
    }

    let mapping = config
        .categorizer
        .mapping()
        .map_err(AssembleError::Categorizer)?;
    let mut categorizer = CategorizerStage::new(mapping);
    categorizer.init(ctx).map_err(AssembleError::Categorizer)?;
    engine.prepend_processor(Box::new(categorizer));

    let mut deleter = DeleterOutput::new();
    deleter
        .init(ctx)
        .map_err(|source| AssembleError::Stage {
            kind: "output",
            name: "deleter".to_string(),
            source,
        })?;
    engine.add_output(Box::new(deleter));

    info!(
        inputs = config.inputs.len(),
        buffer = engine.capacity(),
        dry_run = ctx.dry_run,
        "pipeline assembled"
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(name: &str, options: serde_json::Value) -> StageEntry {
        let serde_json::Value::Object(options) = options else {
            panic!("options must be an object");
        };
        StageEntry::with_options(name, options)
    }

    #[test]
    fn unknown_plugins_are_skipped() {
        let mut config = SortConfig::default();
        config.inputs.push(StageEntry::new("ftp"));
        config.processors.intra.push(StageEntry::new("tvdb"));
        config.outputs.push(StageEntry::new("stdout"));

        let registry = Registry::builtin().unwrap();
        assert!(assemble(&config, &registry, &StageContext::default()).is_ok());
    }

    #[test]
    fn stage_in_wrong_phase_is_unknown() {
        let mut config = SortConfig::default();
        config.processors.pre.push(StageEntry::new("deleter"));

        let registry = Registry::builtin().unwrap();
        assert!(assemble(&config, &registry, &StageContext::default()).is_ok());
    }

    #[test]
    fn malformed_options_abort_assembly() {
        let mut config = SortConfig::default();
        config
            .processors
            .post
            .push(entry("tv-path-solver", json!({ "season-dirs": "sometimes" })));

        let err = assemble(&config, &Registry::builtin().unwrap(), &StageContext::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AssembleError::Stage { kind: "post", ref name, source: InitError::Config(_) }
                if name == "tv-path-solver"
        ));
    }

    #[test]
    fn init_failures_abort_assembly() {
        let mut config = SortConfig::default();
        config
            .processors
            .pre
            .push(entry("tv", json!({ "matchers": ["(unclosed"] })));

        let err = assemble(&config, &Registry::builtin().unwrap(), &StageContext::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AssembleError::Stage { source: InitError::InvalidMatcher { .. }, .. }
        ));
    }

    #[test]
    fn categorizer_conflicts_abort_assembly() {
        let mut config = SortConfig::default();
        config
            .categorizer
            .file_extensions
            .insert("text".into(), vec!["mkv".into()]);

        let err = assemble(&config, &Registry::builtin().unwrap(), &StageContext::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AssembleError::Categorizer(InitError::DuplicateMapping { .. })
        ));
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let mut config = SortConfig::default();
        config.pipeline.buffer = 0;
        assert!(matches!(
            assemble(&config, &Registry::builtin().unwrap(), &StageContext::default()),
            Err(AssembleError::Pipeline(_))
        ));
    }
}
