use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::StageError;
use crate::plugin::{Output, RecordReceiver};
use crate::providers::{CollectionItem, CollectionService};
use crate::record::{MediaType, Record};

/// Options for [`CollectorOutput`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CollectorOptions {
    /// Only collect episodes
    pub tv_only: bool,
    /// Only collect movies
    pub movies_only: bool,
}

/// Adds identified episodes and movies to a collection service.
pub struct CollectorOutput {
    options: CollectorOptions,
    service: Arc<dyn CollectionService>,
}

impl fmt::Debug for CollectorOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorOutput")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn numeric_id(record: &Record, key: &'static str) -> Result<u64, StageError> {
    record
        .identifier(key)
        .and_then(|id| id.parse().ok())
        .ok_or(StageError::MissingIdentifier(key))
}

impl CollectorOutput {
    /// Collector reporting to `service`.
    pub fn new(options: CollectorOptions, service: Arc<dyn CollectionService>) -> Self {
        Self { options, service }
    }

    fn item(&self, record: &Record) -> Option<Result<CollectionItem, StageError>> {
        match record.media_type() {
            MediaType::Tv if !self.options.movies_only => Some(
                numeric_id(record, "tvdb").map(|tvdb| CollectionItem::Episode { tvdb }),
            ),
            MediaType::Movie if !self.options.tv_only => Some(
                numeric_id(record, "tmdb").map(|tmdb| CollectionItem::Movie { tmdb }),
            ),
            _ => None,
        }
    }

    async fn collect(&self, item: CollectionItem, cancel: &CancellationToken) -> Result<(), StageError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StageError::Cancelled),
            added = self.service.add(item) => added.map_err(StageError::from),
        }
    }
}

#[async_trait]
impl Output for CollectorOutput {
    async fn receive(&mut self, mut input: RecordReceiver, cancel: CancellationToken) {
        trace!("collector: started");
        while let Some(record) = input.recv().await {
            let Some(item) = self.item(&record) else {
                continue;
            };
            if cancel.is_cancelled() {
                debug!(path = %record.source_path().display(), "collector: cancelled, skipping");
                continue;
            }

            let result = match item {
                Ok(item) => self.collect(item, &cancel).await.map(|()| item),
                Err(err) => Err(err),
            };
            match result {
                Ok(item) => info!(path = %record.source_path().display(), ?item, "collector: collected"),
                Err(err) => warn!(path = %record.source_path().display(), error = %err, "collector: not collected"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::LookupError;
    use crate::providers::MockCollectionService;

    fn tv(id: Option<&str>) -> Record {
        let mut record = Record::file("/src/Mr Robot S02E05.mkv");
        record.set_media_type(MediaType::Tv);
        if let Some(id) = id {
            record.set_identifier("tvdb", id);
        }
        record
    }

    fn movie(id: &str) -> Record {
        let mut record = Record::file("/src/Finding Nemo (2003).mkv");
        record.set_media_type(MediaType::Movie);
        record.set_identifier("tmdb", id);
        record
    }

    async fn deliver(output: &mut CollectorOutput, records: Vec<Record>) {
        let (tx, rx) = mpsc::channel(records.len().max(1));
        for record in records {
            tx.send(record).await.unwrap();
        }
        drop(tx);
        output.receive(rx, CancellationToken::new()).await;
    }

    #[tokio::test]
    async fn collects_by_external_id() {
        let mut service = MockCollectionService::new();
        service
            .expect_add()
            .with(eq(CollectionItem::Episode { tvdb: 5_634_402 }))
            .times(1)
            .returning(|_| Ok(()));
        service
            .expect_add()
            .with(eq(CollectionItem::Movie { tmdb: 12 }))
            .times(1)
            .returning(|_| Err(LookupError::RateLimited));

        let mut output = CollectorOutput::new(CollectorOptions::default(), Arc::new(service));
        deliver(
            &mut output,
            vec![
                tv(Some("5634402")),
                tv(None),
                Record::file("/src/notes.txt"),
                movie("12"),
            ],
        )
        .await;
    }

    #[tokio::test]
    async fn tv_only_skips_movies() {
        let mut service = MockCollectionService::new();
        service.expect_add().never();

        let mut output = CollectorOutput::new(
            CollectorOptions {
                tv_only: true,
                ..Default::default()
            },
            Arc::new(service),
        );
        deliver(&mut output, vec![movie("12")]).await;
    }
}
