use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::error::{InitError, StageError};
use crate::plugin::{Output, RecordReceiver, StageContext};
use crate::record::Record;

/// Options for [`PathMoverOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PathMoverOptions {
    /// Create missing destination directories
    pub create_dirs: bool,
    /// Replace an existing destination file
    pub overwrite: bool,
    /// Log every decision without touching the filesystem. On unless a
    /// config turns it off.
    pub dry_run: bool,
}

impl Default for PathMoverOptions {
    fn default() -> Self {
        Self {
            create_dirs: true,
            overwrite: false,
            dry_run: true,
        }
    }
}

/// Moves each record's source to its resolved destination.
#[derive(Debug, Clone)]
pub struct PathMoverOutput {
    options: PathMoverOptions,
}

impl PathMoverOutput {
    /// Mover with `options`. The global dry-run is applied at init.
    pub fn new(options: PathMoverOptions) -> Self {
        Self { options }
    }

    async fn move_record(&self, src: &Path, dest: &Path) -> Result<(), StageError> {
        let dry_run = self.options.dry_run;

        if let Some(dir) = dest.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !fs::try_exists(dir).await? {
                if !self.options.create_dirs {
                    return Err(StageError::MissingDirectory(dir.to_path_buf()));
                }
                if dry_run {
                    info!(dir = %dir.display(), "path_mover: (dry run) mkdir");
                } else {
                    fs::create_dir_all(dir).await?;
                }
            }
        }

        if fs::try_exists(dest).await? && !self.options.overwrite {
            return Err(StageError::DestinationExists(dest.to_path_buf()));
        }

        if dry_run {
            info!(src = %src.display(), dest = %dest.display(), "path_mover: (dry run) move");
            return Ok(());
        }

        if let Err(err) = fs::rename(src, dest).await {
            debug!(error = %err, "path_mover: rename failed, copying instead");
            fs::copy(src, dest).await?;
            fs::remove_file(src).await?;
        }
        Ok(())
    }

    fn report(&self, record: &Record, result: Result<(), StageError>) {
        match result {
            Ok(()) if self.options.dry_run => {}
            Ok(()) => info!(
                src = %record.source_path().display(),
                dest = ?record.destination_path(),
                "path_mover: moved"
            ),
            Err(err) => error!(path = %record.source_path().display(), error = %err, "path_mover: move failed"),
        }
    }
}

#[async_trait]
impl Output for PathMoverOutput {
    fn init(&mut self, ctx: &StageContext) -> Result<(), InitError> {
        self.options.dry_run |= ctx.dry_run;
        Ok(())
    }

    async fn receive(&mut self, mut input: RecordReceiver, _cancel: CancellationToken) {
        trace!("path_mover: started");
        while let Some(record) = input.recv().await {
            let Some(dest) = record.destination_path() else {
                trace!(path = %record.source_path().display(), "path_mover: no destination, skipping");
                continue;
            };
            self.report(&record, self.move_record(record.source_path(), dest).await);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs as stdfs;

    use tempfile::TempDir;

    use super::*;

    fn live() -> PathMoverOptions {
        PathMoverOptions {
            dry_run: false,
            ..Default::default()
        }
    }

    fn mover(options: PathMoverOptions) -> PathMoverOutput {
        let mut output = PathMoverOutput::new(options);
        output.init(&StageContext::default()).unwrap();
        output
    }

    #[tokio::test]
    async fn moves_and_creates_directories() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("Mr Robot S02E05.mkv");
        stdfs::write(&src, b"episode").unwrap();
        let dest = temp.path().join("tv/Mr Robot/Season 02/Mr Robot S02E05.mkv");

        mover(live())
            .move_record(&src, &dest)
            .await
            .unwrap();

        assert!(!src.exists());
        assert_eq!(stdfs::read(&dest).unwrap(), b"episode");
    }

    #[tokio::test]
    async fn refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.mkv");
        let dest = temp.path().join("b.mkv");
        stdfs::write(&src, b"new").unwrap();
        stdfs::write(&dest, b"old").unwrap();

        let err = mover(live())
            .move_record(&src, &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::DestinationExists(_)));
        assert_eq!(stdfs::read(&dest).unwrap(), b"old");

        mover(PathMoverOptions {
            overwrite: true,
            ..live()
        })
        .move_record(&src, &dest)
        .await
        .unwrap();
        assert_eq!(stdfs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn missing_directory_without_create_dirs() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.mkv");
        stdfs::write(&src, b"").unwrap();

        let err = mover(PathMoverOptions {
            create_dirs: false,
            ..live()
        })
        .move_record(&src, &temp.path().join("missing/a.mkv"))
        .await
        .unwrap_err();
        assert!(matches!(err, StageError::MissingDirectory(_)));
        assert!(src.exists());
    }

    #[tokio::test]
    async fn global_dry_run_wins() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.mkv");
        stdfs::write(&src, b"").unwrap();
        let dest = temp.path().join("out/a.mkv");

        let mut output = PathMoverOutput::new(live());
        output
            .init(&StageContext::new(true, CancellationToken::new()))
            .unwrap();
        output.move_record(&src, &dest).await.unwrap();

        assert!(src.exists());
        assert!(!temp.path().join("out").exists());
    }

    #[tokio::test]
    async fn unconfigured_mover_only_logs() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.mkv");
        stdfs::write(&src, b"").unwrap();
        let dest = temp.path().join("out/a.mkv");

        assert!(PathMoverOptions::default().dry_run);
        mover(PathMoverOptions::default())
            .move_record(&src, &dest)
            .await
            .unwrap();

        assert!(src.exists());
        assert!(!temp.path().join("out").exists());
    }
}
