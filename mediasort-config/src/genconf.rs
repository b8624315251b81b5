//! Default-config generation.
//!
//! Every selected stage is listed with the options a freshly built instance
//! would use, in registration order, so the output runs as-is.

use std::fmt;
use std::str::FromStr;

use mediasort_core::{Phase, Registry};
use tracing::warn;

use crate::error::GenconfError;
use crate::model::{SortConfig, StageEntry};

/// Output format of a generated config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// TOML, the format `~/.mediasort.toml` is read in.
    #[default]
    Toml,
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
            ConfigFormat::Yaml => "yaml",
        })
    }
}

impl FromStr for ConfigFormat {
    type Err = GenconfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            _ => Err(GenconfError::UnknownFormat(s.to_string())),
        }
    }
}

/// Which registered stages to include. An empty list selects all of them.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Input names.
    pub inputs: Vec<String>,
    /// Processor names, matched in every phase.
    pub processors: Vec<String>,
    /// Output names.
    pub outputs: Vec<String>,
}

fn pick<'a>(
    kind: &str,
    registered: impl Iterator<Item = &'a str>,
    wanted: &[String],
) -> Vec<&'a str> {
    let registered: Vec<&str> = registered.collect();
    if wanted.is_empty() {
        return registered;
    }
    for name in wanted {
        if !registered.contains(&name.as_str()) {
            warn!(kind, %name, "unknown plugin, skipping");
        }
    }
    registered
        .into_iter()
        .filter(|name| wanted.iter().any(|w| w == name))
        .collect()
}

/// A config listing every selected stage with its default options.
pub fn default_config(registry: &Registry, selection: &Selection) -> SortConfig {
    let mut config = SortConfig::default();

    for name in pick("input", registry.input_names(), &selection.inputs) {
        if let Some(factory) = registry.input(name) {
            config
                .inputs
                .push(StageEntry::with_options(name, factory.default_options()));
        }
    }

    // A processor name may be registered in more than one phase.
    let mut known = Vec::new();
    for phase in Phase::ALL {
        for name in registry.processor_names(phase) {
            let selected =
                selection.processors.is_empty() || selection.processors.iter().any(|w| w == name);
            known.push(name);
            if !selected {
                continue;
            }
            if let Some(factory) = registry.processor(phase, name) {
                config
                    .processors
                    .phase_mut(phase)
                    .push(StageEntry::with_options(name, factory.default_options()));
            }
        }
    }
    for name in &selection.processors {
        if !known.contains(&name.as_str()) {
            warn!(kind = "processor", %name, "unknown plugin, skipping");
        }
    }

    for name in pick("output", registry.output_names(), &selection.outputs) {
        if let Some(factory) = registry.output(name) {
            config
                .outputs
                .push(StageEntry::with_options(name, factory.default_options()));
        }
    }

    config
}

/// Serialize `config` in `format`.
pub fn render(config: &SortConfig, format: ConfigFormat) -> Result<String, GenconfError> {
    Ok(match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)? + "\n",
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// [`default_config`] rendered in `format`.
pub fn generate(
    registry: &Registry,
    selection: &Selection,
    format: ConfigFormat,
) -> Result<String, GenconfError> {
    render(&default_config(registry, selection), format)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn names(entries: &[StageEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn empty_selection_includes_everything() {
        let config = default_config(&Registry::builtin().unwrap(), &Selection::default());
        assert_eq!(names(&config.inputs), ["filepath"]);
        assert_eq!(names(&config.processors.pre), ["tv", "movie"]);
        assert!(config.processors.intra.is_empty());
        assert_eq!(
            names(&config.processors.post),
            ["tv-path-solver", "movie-path-solver", "deleter"]
        );
        assert_eq!(names(&config.outputs), ["stdout", "path-mover"]);
        assert_eq!(
            config.inputs[0].options.get("src-dir"),
            Some(&json!("/src"))
        );
        assert_eq!(config.outputs[1].options.get("dry-run"), Some(&json!(true)));
    }

    #[test]
    fn selection_filters_and_skips_unknown_names() {
        let selection = Selection {
            inputs: vec!["filepath".into(), "ftp".into()],
            processors: vec!["tv".into(), "tv-path-solver".into()],
            outputs: vec!["stdout".into()],
        };
        let config = default_config(&Registry::builtin().unwrap(), &selection);
        assert_eq!(names(&config.inputs), ["filepath"]);
        assert_eq!(names(&config.processors.pre), ["tv"]);
        assert_eq!(names(&config.processors.post), ["tv-path-solver"]);
        assert_eq!(names(&config.outputs), ["stdout"]);
    }

    #[test]
    fn generated_toml_loads_back() {
        let registry = Registry::builtin().unwrap();
        let rendered = generate(&registry, &Selection::default(), ConfigFormat::Toml).unwrap();
        let parsed: SortConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, default_config(&registry, &Selection::default()));
    }

    #[test]
    fn generated_json_loads_back() {
        let registry = Registry::builtin().unwrap();
        let rendered = generate(&registry, &Selection::default(), ConfigFormat::Json).unwrap();
        let parsed: SortConfig = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.outputs.len(), 2);
        assert_eq!(parsed.processors.post[2].name, "deleter");
        assert_eq!(parsed.processors.post[2].options.get("directories"), Some(&json!(true)));
    }

    #[test]
    fn generated_yaml_loads_back() {
        let registry = Registry::builtin().unwrap();
        let rendered = generate(&registry, &Selection::default(), ConfigFormat::Yaml).unwrap();
        assert!(rendered.contains("name: tv-path-solver"));
        let parsed: SortConfig = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed, default_config(&registry, &Selection::default()));
    }

    #[test]
    fn format_names() {
        assert_eq!("JSON".parse::<ConfigFormat>().unwrap(), ConfigFormat::Json);
        assert_eq!("yml".parse::<ConfigFormat>().unwrap(), ConfigFormat::Yaml);
        assert!(matches!(
            "xml".parse::<ConfigFormat>(),
            Err(GenconfError::UnknownFormat(_))
        ));
    }
}
