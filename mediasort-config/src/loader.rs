//! Config file discovery, decoding and environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ConfigLoadError;
use crate::model::{LogFormat, SortConfig};

/// Path of the config file, when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "MEDIASORT_CONFIG";
/// Overrides `dry-run`.
pub const DRY_RUN_ENV: &str = "MEDIASORT_DRY_RUN";
/// Overrides `log-level`.
pub const LOG_LEVEL_ENV: &str = "MEDIASORT_LOG_LEVEL";
/// Overrides `log-format`.
pub const LOG_FORMAT_ENV: &str = "MEDIASORT_LOG_FORMAT";

/// File name looked up in the home directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".mediasort.toml";

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// No file was found; built-in defaults.
    #[default]
    Default,
    /// Read from this file.
    File(PathBuf),
}

/// Resolves, reads and decodes a [`SortConfig`], then applies environment
/// overrides.
///
/// Resolution order:
/// 1) an explicit path (from `--config`),
/// 2) `$MEDIASORT_CONFIG`,
/// 3) `$HOME/.mediasort.toml` if it exists,
/// 4) built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader that searches the environment and home directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` ahead of any other location. `None` keeps the search.
    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.path = path;
        self
    }

    /// Load from the process environment.
    pub fn load(&self) -> Result<(SortConfig, ConfigSource), ConfigLoadError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// [`load`](Self::load) with an injectable environment.
    pub fn load_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(SortConfig, ConfigSource), ConfigLoadError> {
        let explicit = self.path.clone().or_else(|| {
            env(CONFIG_PATH_ENV)
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from)
        });

        let (mut config, source) = match explicit {
            Some(path) => (load_from_file(&path)?, ConfigSource::File(path)),
            None => match default_path(&env).filter(|path| path.is_file()) {
                Some(path) => (load_from_file(&path)?, ConfigSource::File(path)),
                None => {
                    debug!("no config file found, using defaults");
                    (SortConfig::default(), ConfigSource::Default)
                }
            },
        };

        apply_env_overrides(&mut config, env)?;
        Ok((config, source))
    }
}

fn default_path(env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    env("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| Path::new(&home).join(DEFAULT_CONFIG_FILE))
}

/// Read a TOML, JSON or YAML config. Unknown extensions try TOML, then JSON,
/// then YAML, and report the TOML error if none fits.
pub fn load_from_file(path: &Path) -> Result<SortConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loading config");

    let parse_toml = |contents: &str| {
        toml::from_str::<SortConfig>(contents).map_err(|source| ConfigLoadError::Toml {
            path: path.to_path_buf(),
            source,
        })
    };
    let parse_json = |contents: &str| {
        serde_json::from_str::<SortConfig>(contents).map_err(|source| ConfigLoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    };

    let parse_yaml = |contents: &str| {
        serde_yaml::from_str::<SortConfig>(contents).map_err(|source| ConfigLoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents),
        Some("yaml") | Some("yml") => parse_yaml(&contents),
        Some("toml") | Some("tml") => parse_toml(&contents),
        _ => parse_toml(&contents).or_else(|toml_err| {
            debug!(error = %toml_err, "config is not TOML, trying JSON and YAML");
            parse_json(&contents)
                .or_else(|_| parse_yaml(&contents))
                .map_err(|_| toml_err)
        }),
    }
}

/// Apply `MEDIASORT_*` overrides on top of the file values.
pub fn apply_env_overrides(
    config: &mut SortConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigLoadError> {
    if let Some(value) = env(DRY_RUN_ENV) {
        config.dry_run = parse_bool(&value).ok_or(ConfigLoadError::InvalidEnv {
            key: DRY_RUN_ENV,
            value,
        })?;
    }
    if let Some(value) = env(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
        config.log_level = value.trim().to_string();
    }
    if let Some(value) = env(LOG_FORMAT_ENV) {
        config.log_format = value
            .parse::<LogFormat>()
            .map_err(|_| ConfigLoadError::InvalidEnv {
                key: LOG_FORMAT_ENV,
                value,
            })?;
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn missing_everything_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().to_str().unwrap();
        let (config, source) = ConfigLoader::new()
            .load_with(env_from(&[("HOME", home)]))
            .unwrap();
        assert_eq!(config, SortConfig::default());
        assert_eq!(source, ConfigSource::Default);
    }

    #[test]
    fn home_config_is_picked_up() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "log-level = \"debug\"\n").unwrap();

        let (config, source) = ConfigLoader::new()
            .load_with(env_from(&[("HOME", temp.path().to_str().unwrap())]))
            .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let err = ConfigLoader::new()
            .with_path(Some(temp.path().join("missing.toml")))
            .load_with(env_from(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io { .. }));
    }

    #[test]
    fn format_follows_extension_with_fallback() {
        let temp = TempDir::new().unwrap();

        let json = temp.path().join("sort.json");
        fs::write(&json, r#"{"dry-run": true, "pipeline": {"buffer": 4}}"#).unwrap();
        let config = load_from_file(&json).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.pipeline.buffer, 4);

        let yaml = temp.path().join("sort.yml");
        fs::write(
            &yaml,
            "log-level: debug\ninputs:\n  - name: filepath\n    src-dir: /downloads\n",
        )
        .unwrap();
        let config = load_from_file(&yaml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.inputs[0].name, "filepath");
        assert_eq!(
            config.inputs[0].options.get("src-dir"),
            Some(&serde_json::Value::from("/downloads"))
        );

        let untyped = temp.path().join("sortrc");
        fs::write(&untyped, r#"{"log-format": "json"}"#).unwrap();
        assert_eq!(load_from_file(&untyped).unwrap().log_format, LogFormat::Json);

        let broken = temp.path().join("broken.toml");
        fs::write(&broken, "dry-run = maybe").unwrap();
        assert!(matches!(
            load_from_file(&broken),
            Err(ConfigLoadError::Toml { .. })
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sort.toml");
        fs::write(&path, "dry-run = false\nlog-level = \"warn\"\n").unwrap();

        let (config, _) = ConfigLoader::new()
            .with_path(Some(path))
            .load_with(env_from(&[
                (DRY_RUN_ENV, "yes"),
                (LOG_LEVEL_ENV, "trace"),
                (LOG_FORMAT_ENV, "json"),
            ]))
            .unwrap();
        assert!(config.dry_run);
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn config_path_env_is_honoured() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "[pipeline]\nbuffer = 3\n").unwrap();

        let (config, source) = ConfigLoader::new()
            .load_with(env_from(&[(CONFIG_PATH_ENV, path.to_str().unwrap())]))
            .unwrap();
        assert_eq!(config.pipeline.buffer, 3);
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut config = SortConfig::default();
        let err = apply_env_overrides(&mut config, env_from(&[(DRY_RUN_ENV, "perhaps")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidEnv { key: DRY_RUN_ENV, .. }
        ));
    }
}
