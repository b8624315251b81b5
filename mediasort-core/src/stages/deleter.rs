use std::collections::BinaryHeap;
use std::path::PathBuf;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classifier::default_junk_extensions;
use crate::error::InitError;
use crate::extract::compile_matchers;
use crate::plugin::{Output, Processor, RecordReceiver, RecordSender, StageContext, forward};
use crate::record::Record;

/// Options for [`DeleterStage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DeleterOptions {
    /// Mark every directory
    pub directories: bool,
    /// Mark files with one of these extensions
    pub extensions: Vec<String>,
    /// Mark any source path matching one of these patterns
    pub matchers: Vec<String>,
}

impl Default for DeleterOptions {
    fn default() -> Self {
        Self {
            directories: true,
            extensions: default_junk_extensions(),
            matchers: Vec::new(),
        }
    }
}

/// Marks records for deletion. Deletion itself happens in [`DeleterOutput`].
#[derive(Debug, Clone)]
pub struct DeleterStage {
    options: DeleterOptions,
    matchers: Vec<Regex>,
}

impl DeleterStage {
    /// Marker with `options`.
    pub fn new(options: DeleterOptions) -> Self {
        Self {
            options,
            matchers: Vec::new(),
        }
    }

    fn should_delete(&self, record: &Record) -> bool {
        if record.is_dir() && self.options.directories {
            return true;
        }
        let extension = record.extension();
        if self.options.extensions.iter().any(|ext| ext == extension) {
            return true;
        }
        let path = record.source_path().to_string_lossy();
        self.matchers.iter().any(|matcher| matcher.is_match(&path))
    }
}

#[async_trait]
impl Processor for DeleterStage {
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        self.matchers = compile_matchers(&self.options.matchers)?;
        debug!(
            matchers = self.matchers.len(),
            extensions = self.options.extensions.len(),
            directories = self.options.directories,
            "deleter: initialized"
        );
        Ok(())
    }

    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        _cancel: CancellationToken,
    ) {
        while let Some(mut record) = input.recv().await {
            if self.should_delete(&record) {
                info!(path = %record.source_path().display(), "deleter: marking for delete");
                record.mark_for_delete();
            }
            if !forward(&output, record, "deleter").await {
                break;
            }
        }
    }
}

/// Queued removal, ordered so the longest path is removed first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Removal {
    len: usize,
    path: PathBuf,
    is_dir: bool,
}

/// Always-on output that removes records marked for deletion once the stream
/// is exhausted, deepest paths first so directories are empty by the time
/// they are reached.
#[derive(Debug, Clone, Default)]
pub struct DeleterOutput {
    dry_run: bool,
}

impl DeleterOutput {
    /// An empty deleter.
    pub fn new() -> Self {
        Self::default()
    }

    async fn remove(&self, removal: &Removal) -> std::io::Result<()> {
        if removal.is_dir {
            tokio::fs::remove_dir(&removal.path).await
        } else {
            tokio::fs::remove_file(&removal.path).await
        }
    }
}

#[async_trait]
impl Output for DeleterOutput {
    fn init(&mut self, ctx: &StageContext) -> Result<(), InitError> {
        self.dry_run = ctx.dry_run;
        Ok(())
    }

    async fn receive(&mut self, mut input: RecordReceiver, cancel: CancellationToken) {
        let mut queue = BinaryHeap::new();
        while let Some(record) = input.recv().await {
            if record.marked_for_delete() {
                debug!(path = %record.source_path().display(), "deleter_output: queueing");
                queue.push(Removal {
                    len: record.source_path().as_os_str().len(),
                    path: record.source_path().to_path_buf(),
                    is_dir: record.is_dir(),
                });
            }
        }

        if cancel.is_cancelled() && !queue.is_empty() {
            warn!(queued = queue.len(), "deleter_output: run cancelled, nothing deleted");
            return;
        }

        while let Some(removal) = queue.pop() {
            if self.dry_run {
                info!(path = %removal.path.display(), "deleter_output: (dry run) delete");
                continue;
            }
            match self.remove(&removal).await {
                Ok(()) => info!(path = %removal.path.display(), "deleter_output: deleted"),
                Err(err) => error!(path = %removal.path.display(), error = %err, "deleter_output: delete failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use super::*;

    fn stage(options: DeleterOptions) -> DeleterStage {
        let mut stage = DeleterStage::new(options);
        stage.init(&StageContext::default()).unwrap();
        stage
    }

    #[test]
    fn marks_directories_junk_and_matches() {
        let stage = stage(DeleterOptions {
            matchers: vec![r"(?i)sample".into()],
            ..Default::default()
        });
        assert!(stage.should_delete(&Record::directory("/src/Show")));
        assert!(stage.should_delete(&Record::file("/src/Show/info.nfo")));
        assert!(stage.should_delete(&Record::file("/src/Show/setup.exe")));
        assert!(stage.should_delete(&Record::file("/src/Show/Sample.mkv")));
        assert!(!stage.should_delete(&Record::file("/src/Show/Show S01E01.mkv")));
    }

    #[test]
    fn directories_can_be_kept() {
        let stage = stage(DeleterOptions {
            directories: false,
            ..Default::default()
        });
        assert!(!stage.should_delete(&Record::directory("/src/Show")));
    }

    async fn deliver(output: &mut DeleterOutput, records: Vec<Record>, cancel: CancellationToken) {
        let (tx, rx) = mpsc::channel(records.len().max(1));
        for record in records {
            tx.send(record).await.unwrap();
        }
        drop(tx);
        output.receive(rx, cancel).await;
    }

    fn marked(mut record: Record) -> Record {
        record.mark_for_delete();
        record
    }

    #[tokio::test]
    async fn removes_deepest_paths_first() {
        let temp = TempDir::new().unwrap();
        let show = temp.path().join("Show");
        let nested = show.join("Extras");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("info.nfo"), b"").unwrap();
        fs::write(show.join("keep.mkv"), b"").unwrap();

        let mut output = DeleterOutput::new();
        output.init(&StageContext::default()).unwrap();
        deliver(
            &mut output,
            vec![
                marked(Record::directory(&nested)),
                marked(Record::file(nested.join("info.nfo"))),
                Record::file(show.join("keep.mkv")),
            ],
            CancellationToken::new(),
        )
        .await;

        assert!(!nested.exists());
        assert!(show.join("keep.mkv").exists());
    }

    #[tokio::test]
    async fn dry_run_deletes_nothing() {
        let temp = TempDir::new().unwrap();
        let junk = temp.path().join("info.nfo");
        fs::write(&junk, b"").unwrap();

        let mut output = DeleterOutput::new();
        output
            .init(&StageContext::new(true, CancellationToken::new()))
            .unwrap();
        deliver(&mut output, vec![marked(Record::file(&junk))], CancellationToken::new()).await;

        assert!(junk.exists());
    }

    #[tokio::test]
    async fn failed_removal_does_not_stop_the_rest() {
        let temp = TempDir::new().unwrap();
        let junk = temp.path().join("info.nfo");
        fs::write(&junk, b"").unwrap();

        let mut output = DeleterOutput::new();
        output.init(&StageContext::default()).unwrap();
        deliver(
            &mut output,
            vec![
                marked(Record::file(temp.path().join("already-gone-with-a-long-name.nfo"))),
                marked(Record::file(&junk)),
            ],
            CancellationToken::new(),
        )
        .await;

        assert!(!junk.exists());
    }
}
