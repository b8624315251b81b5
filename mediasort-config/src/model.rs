//! The config document.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use mediasort_core::classifier::default_category_extensions;
use mediasort_core::pipeline::DEFAULT_QUEUE_CAPACITY;
use mediasort_core::plugin::StageOptions;
use mediasort_core::{Category, InitError, Phase};
use serde::{Deserialize, Serialize};

/// Log line rendering for the CLI subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Name as accepted by `--log-format`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// One configured stage: a registry name plus that stage's flat options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    /// Registry name of the stage.
    pub name: String,
    /// Option overrides, flattened next to `name`.
    #[serde(flatten)]
    pub options: StageOptions,
}

impl StageEntry {
    /// Entry with no overrides.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: StageOptions::new(),
        }
    }

    /// Entry with `options` laid over the stage defaults.
    pub fn with_options(name: impl Into<String>, options: StageOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// The `[pipeline]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Capacity of every inter-stage queue. 1 gives maximal backpressure.
    pub buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// The `[categorizer]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CategorizerConfig {
    /// Per-category extension lists. A listed category replaces the stock
    /// list for that category; unlisted categories keep their defaults.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub file_extensions: BTreeMap<String, Vec<String>>,
}

impl CategorizerConfig {
    /// Stock mapping with the configured categories laid over it.
    pub fn mapping(&self) -> Result<BTreeMap<Category, Vec<String>>, InitError> {
        let mut mapping = default_category_extensions();
        for (name, extensions) in &self.file_extensions {
            let category: Category = name.parse()?;
            mapping.insert(category, extensions.clone());
        }
        Ok(mapping)
    }
}

/// Processor entries per phase. Each phase runs in listed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Identification stages.
    pub pre: Vec<StageEntry>,
    /// Lookup stages.
    pub intra: Vec<StageEntry>,
    /// Destination and deletion stages.
    pub post: Vec<StageEntry>,
}

impl ProcessorConfig {
    /// Entries for `phase`.
    pub fn phase(&self, phase: Phase) -> &[StageEntry] {
        match phase {
            Phase::Pre => &self.pre,
            Phase::Intra => &self.intra,
            Phase::Post => &self.post,
        }
    }

    /// Mutable entries for `phase`.
    pub fn phase_mut(&mut self, phase: Phase) -> &mut Vec<StageEntry> {
        match phase {
            Phase::Pre => &mut self.pre,
            Phase::Intra => &mut self.intra,
            Phase::Post => &mut self.post,
        }
    }
}

/// Top-level document read from `~/.mediasort.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SortConfig {
    /// Follow every decision path without touching the filesystem
    pub dry_run: bool,
    /// `tracing` filter directive; `RUST_LOG` wins
    pub log_level: String,
    /// Log line rendering
    pub log_format: LogFormat,
    /// Engine settings
    pub pipeline: PipelineConfig,
    /// Extension to category overrides
    pub categorizer: CategorizerConfig,
    /// Inputs, run concurrently
    pub inputs: Vec<StageEntry>,
    /// Processors, by phase
    pub processors: ProcessorConfig,
    /// Outputs, each sees every record
    pub outputs: Vec<StageEntry>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            pipeline: PipelineConfig::default(),
            categorizer: CategorizerConfig::default(),
            inputs: Vec::new(),
            processors: ProcessorConfig::default(),
            outputs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn toml_document_decodes() {
        let config: SortConfig = toml::from_str(
            r#"
            dry-run = true
            log-format = "json"

            [pipeline]
            buffer = 8

            [categorizer.file-extensions]
            video = ["mkv", "webm"]

            [[inputs]]
            name = "filepath"
            src-dir = "/downloads"

            [[processors.pre]]
            name = "tv"

            [[processors.post]]
            name = "tv-path-solver"
            dest-dir = "/media"
            season-dirs = false

            [[outputs]]
            name = "stdout"
            "#,
        )
        .unwrap();

        assert!(config.dry_run);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.pipeline.buffer, 8);
        assert_eq!(config.inputs[0].name, "filepath");
        assert_eq!(config.inputs[0].options.get("src-dir"), Some(&json!("/downloads")));
        assert_eq!(config.processors.phase(Phase::Pre)[0], StageEntry::new("tv"));
        assert!(config.processors.intra.is_empty());
        assert_eq!(
            config.processors.post[0].options.get("season-dirs"),
            Some(&json!(false))
        );
        assert_eq!(config.outputs[0].name, "stdout");
    }

    #[test]
    fn categorizer_overlay_replaces_only_listed_categories() {
        let config = CategorizerConfig {
            file_extensions: BTreeMap::from([("Video".to_string(), vec!["mkv".to_string()])]),
        };
        let mapping = config.mapping().unwrap();
        assert_eq!(mapping[&Category::Video], ["mkv"]);
        assert_eq!(
            mapping[&Category::Text],
            default_category_extensions()[&Category::Text]
        );
    }

    #[test]
    fn unknown_category_is_rejected() {
        let config = CategorizerConfig {
            file_extensions: BTreeMap::from([("audio".to_string(), vec!["flac".to_string()])]),
        };
        assert!(matches!(
            config.mapping(),
            Err(InitError::UnknownCategory(name)) if name == "audio"
        ));
    }

    #[test]
    fn log_format_parses_loosely() {
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
