use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

use crate::plugin::{Output, RecordReceiver};

/// Options for [`StdoutOutput`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StdoutOptions {
    /// Also report records that were not given a destination
    pub all: bool,
}

/// Reports `src -> dest` for every resolved record.
#[derive(Debug, Clone)]
pub struct StdoutOutput {
    options: StdoutOptions,
}

impl StdoutOutput {
    /// Reporter with `options`.
    pub fn new(options: StdoutOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Output for StdoutOutput {
    async fn receive(&mut self, mut input: RecordReceiver, _cancel: CancellationToken) {
        trace!("stdout: started");
        while let Some(record) = input.recv().await {
            match record.destination_path() {
                Some(dest) => info!(
                    "stdout: {} -> {}",
                    record.source_path().display(),
                    dest.display()
                ),
                None if self.options.all => info!(
                    category = %record.category(),
                    media_type = %record.media_type(),
                    "stdout: {record}"
                ),
                None => {}
            }
        }
    }
}
