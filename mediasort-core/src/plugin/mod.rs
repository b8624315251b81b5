//! Stage capability contracts.
//!
//! Every stage is built in two steps: a factory decodes the stage's option
//! struct (defaults overlaid with configured values), then [`Input::init`],
//! [`Processor::init`] or [`Output::init`] runs exactly once before the
//! pipeline starts. The entry points (`consume`, `process`, `receive`) are
//! called once per run and return only when their upstream is exhausted.

pub mod registry;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{ConfigError, InitError};
use crate::record::Record;

pub use registry::{Factory, Phase, Providers, Registry};

/// Sending half of a bounded record queue.
pub type RecordSender = mpsc::Sender<Record>;
/// Receiving half of a bounded record queue.
pub type RecordReceiver = mpsc::Receiver<Record>;

/// Flat key/value option overlay for a single stage instance.
pub type StageOptions = serde_json::Map<String, Value>;

/// Run-wide settings handed to every stage at init.
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    /// Log every side effect instead of performing it.
    pub dry_run: bool,
    /// Cancelled on shutdown. Stages may stop early once it fires.
    pub cancel: CancellationToken,
}

impl StageContext {
    /// Context for one run.
    pub fn new(dry_run: bool, cancel: CancellationToken) -> Self {
        Self { dry_run, cancel }
    }
}

/// Produces records onto the shared ingestion queue.
#[async_trait]
pub trait Input: Send + Sync + fmt::Debug {
    /// Validate options and build internal state. Runs once, before the
    /// pipeline starts.
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        Ok(())
    }

    /// Send every record to `output`, then return. Dropping `output` ends
    /// this input.
    async fn consume(&mut self, output: RecordSender, cancel: CancellationToken);
}

/// Transforms, filters or annotates records between two queues.
#[async_trait]
pub trait Processor: Send + Sync + fmt::Debug {
    /// See [`Input::init`].
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        Ok(())
    }

    /// Read `input` until it closes, forwarding each record to `output`.
    async fn process(
        &mut self,
        input: RecordReceiver,
        output: RecordSender,
        cancel: CancellationToken,
    );
}

/// Terminal consumer of its private copy of the record stream.
#[async_trait]
pub trait Output: Send + Sync + fmt::Debug {
    /// See [`Input::init`].
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        Ok(())
    }

    /// Consume `input` until it closes.
    async fn receive(&mut self, input: RecordReceiver, cancel: CancellationToken);
}

/// Decode `options` on top of `defaults`.
///
/// Keys the option struct does not declare are ignored and missing keys keep
/// their default values.
pub fn overlay_options<T>(stage: &str, defaults: T, options: &StageOptions) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let invalid = |source| ConfigError::InvalidOptions {
        stage: stage.to_string(),
        source,
    };

    let mut merged = match serde_json::to_value(defaults).map_err(invalid)? {
        Value::Object(map) => map,
        other => {
            return Err(ConfigError::NotATable {
                stage: stage.to_string(),
                found: other.to_string(),
            });
        }
    };
    for (key, value) in options {
        merged.insert(key.clone(), value.clone());
    }

    serde_json::from_value(Value::Object(merged)).map_err(invalid)
}

/// Hand a record downstream. Returns `false` once the receiver is gone.
pub async fn forward(output: &RecordSender, record: Record, stage: &str) -> bool {
    if output.send(record).await.is_err() {
        warn!(stage, "downstream queue closed, stopping");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(default, rename_all = "kebab-case")]
    struct Options {
        dest_dir: String,
        season_dirs: bool,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                dest_dir: "dest".into(),
                season_dirs: true,
            }
        }
    }

    fn options(value: Value) -> StageOptions {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn overlay_keeps_defaults_and_ignores_unknown_keys() {
        let merged = overlay_options(
            "test",
            Options::default(),
            &options(json!({"dest-dir": "/media", "colour": "blue"})),
        )
        .unwrap();
        assert_eq!(
            merged,
            Options {
                dest_dir: "/media".into(),
                season_dirs: true,
            }
        );
    }

    #[test]
    fn overlay_rejects_malformed_values() {
        let err = overlay_options(
            "tv-path-solver",
            Options::default(),
            &options(json!({"season-dirs": "sometimes"})),
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidOptions { ref stage, .. } if stage == "tv-path-solver")
        );
    }

    #[tokio::test]
    async fn forward_reports_closed_queue() {
        let (tx, rx) = mpsc::channel(1);
        assert!(forward(&tx, Record::file("/src/a.mkv"), "test").await);
        drop(rx);
        assert!(!forward(&tx, Record::file("/src/b.mkv"), "test").await);
    }
}
