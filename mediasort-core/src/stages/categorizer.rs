use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::classifier::{Classifier, default_category_extensions};
use crate::error::InitError;
use crate::plugin::{Processor, RecordReceiver, RecordSender, StageContext, forward};
use crate::record::Category;

/// Always-on head of the processor chain; assigns each file a [`Category`].
#[derive(Debug, Clone)]
pub struct CategorizerStage {
    mapping: BTreeMap<Category, Vec<String>>,
    classifier: Option<Classifier>,
}

impl Default for CategorizerStage {
    fn default() -> Self {
        Self::new(default_category_extensions())
    }
}

impl CategorizerStage {
    /// Categorizer over a category to extensions mapping.
    pub fn new(mapping: BTreeMap<Category, Vec<String>>) -> Self {
        Self {
            mapping,
            classifier: None,
        }
    }
}

#[async_trait]
impl Processor for CategorizerStage {
    fn init(&mut self, _ctx: &StageContext) -> Result<(), InitError> {
        self.classifier = Some(Classifier::new(&self.mapping)?);
        Ok(())
    }

    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        _cancel: CancellationToken,
    ) {
        trace!("categorizer: started");
        while let Some(mut record) = input.recv().await {
            if let Some(classifier) = &self.classifier {
                classifier.identify(&mut record);
            }
            if !forward(&output, record, "categorizer").await {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::record::Record;

    #[test]
    fn init_rejects_conflicting_mapping() {
        let mapping = BTreeMap::from([
            (Category::Video, vec!["mkv".to_string()]),
            (Category::Archive, vec!["mkv".to_string()]),
        ]);
        let err = CategorizerStage::new(mapping)
            .init(&StageContext::default())
            .unwrap_err();
        assert!(matches!(err, InitError::DuplicateMapping { .. }));
    }

    #[tokio::test]
    async fn classifies_in_order() {
        let mut stage = CategorizerStage::default();
        stage.init(&StageContext::default()).unwrap();

        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        in_tx.send(Record::file("/src/a.mkv")).await.unwrap();
        in_tx.send(Record::directory("/src/b")).await.unwrap();
        in_tx.send(Record::file("/src/c.nfo")).await.unwrap();
        drop(in_tx);

        stage.process(in_rx, out_tx, CancellationToken::new()).await;

        let categories: Vec<_> = std::iter::from_fn(|| out_rx.try_recv().ok())
            .map(|r| r.category())
            .collect();
        assert_eq!(
            categories,
            [Category::Video, Category::Unknown, Category::Text]
        );
    }
}
