use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::plugin::{Input, RecordSender};
use crate::record::{EntryKind, Record};

/// Options for [`FilepathInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilepathOptions {
    /// Directory to walk. The directory itself is not emitted.
    pub src_dir: PathBuf,
    /// Follow symbolic links while walking
    pub follow_links: bool,
    /// Maximum depth below `src-dir` (unlimited when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl Default for FilepathOptions {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("/src"),
            follow_links: false,
            max_depth: None,
        }
    }
}

/// Emits one record per file or directory below `src-dir`.
#[derive(Debug, Clone)]
pub struct FilepathInput {
    options: FilepathOptions,
}

impl FilepathInput {
    /// Walker over `options.src_dir`.
    pub fn new(options: FilepathOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Input for FilepathInput {
    async fn consume(&mut self, output: RecordSender, cancel: CancellationToken) {
        let options = self.options.clone();
        info!(src = %options.src_dir.display(), "filepath: walking");

        let walker = tokio::task::spawn_blocking(move || walk(&options, &output, &cancel));
        match walker.await {
            Ok(count) => debug!(count, "filepath: ingested entries"),
            Err(err) => error!(error = %err, "filepath: walker task failed"),
        }
    }
}

fn walk(options: &FilepathOptions, output: &RecordSender, cancel: &CancellationToken) -> usize {
    let mut walker = WalkDir::new(&options.src_dir)
        .min_depth(1)
        .follow_links(options.follow_links)
        .sort_by_file_name();
    if let Some(depth) = options.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut count = 0;
    for entry in walker {
        if cancel.is_cancelled() {
            info!(count, "filepath: cancelled, stopping walk");
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "filepath: skipping entry");
                continue;
            }
        };

        let kind = if entry.file_type().is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        debug!(path = %entry.path().display(), ?kind, "filepath: found");

        if output.blocking_send(Record::new(entry.into_path(), kind)).is_err() {
            warn!("filepath: ingestion queue closed, stopping walk");
            break;
        }
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use super::*;

    async fn collect(options: FilepathOptions) -> Vec<Record> {
        let (tx, mut rx) = mpsc::channel(1);
        let mut input = FilepathInput::new(options);
        let producer = tokio::spawn(async move {
            input.consume(tx, CancellationToken::new()).await;
        });

        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }
        producer.await.unwrap();
        records
    }

    #[tokio::test]
    async fn walks_everything_below_root() {
        let temp = TempDir::new().unwrap();
        let show = temp.path().join("Mr Robot");
        fs::create_dir(&show).unwrap();
        fs::write(show.join("Mr Robot S01E01.mkv"), b"").unwrap();
        fs::write(temp.path().join("notes.txt"), b"").unwrap();

        let records = collect(FilepathOptions {
            src_dir: temp.path().to_path_buf(),
            ..Default::default()
        })
        .await;

        let entries: Vec<_> = records
            .iter()
            .map(|r| {
                (
                    r.source_path().strip_prefix(temp.path()).unwrap().to_path_buf(),
                    r.entry_kind(),
                )
            })
            .collect();
        assert_eq!(
            entries,
            [
                (PathBuf::from("Mr Robot"), EntryKind::Directory),
                (
                    PathBuf::from("Mr Robot/Mr Robot S01E01.mkv"),
                    EntryKind::File
                ),
                (PathBuf::from("notes.txt"), EntryKind::File),
            ]
        );
    }

    #[tokio::test]
    async fn missing_root_produces_nothing() {
        let temp = TempDir::new().unwrap();
        let records = collect(FilepathOptions {
            src_dir: temp.path().join("absent"),
            ..Default::default()
        })
        .await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn cancelled_walk_stops_early() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.mkv"), b"").unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        FilepathInput::new(FilepathOptions {
            src_dir: temp.path().to_path_buf(),
            ..Default::default()
        })
        .consume(tx, cancel)
        .await;
        assert!(rx.recv().await.is_none());
    }
}
