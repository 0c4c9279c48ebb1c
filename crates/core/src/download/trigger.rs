//! Background task delivering completed artifacts to a [`Retriever`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::RetrievalError;
use super::retriever::Retriever;
use crate::artifact::{ArtifactHandle, ArtifactStore};
use crate::input::FileIdentity;
use crate::metrics::RETRIEVALS_TOTAL;

/// An artifact ready to be retrieved under a suggested file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalOffer {
    pub identity: FileIdentity,
    pub artifact: ArtifactHandle,
    pub filename: String,
}

/// Counts reported when the trigger stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSummary {
    /// Paths of every artifact delivered, in delivery order.
    pub retrieved: Vec<PathBuf>,
    /// Artifacts revoked before they could be delivered.
    pub skipped: usize,
    pub failed: usize,
}

/// Retrieves every offered artifact.
///
/// The task ends once every sender of the offer channel is dropped.
pub struct DownloadTrigger {
    store: Arc<dyn ArtifactStore>,
    retriever: Arc<dyn Retriever>,
}

impl DownloadTrigger {
    pub fn new(store: Arc<dyn ArtifactStore>, retriever: Arc<dyn Retriever>) -> Self {
        Self { store, retriever }
    }

    /// Spawns the delivery loop over `offers`.
    pub fn spawn(
        self,
        mut offers: mpsc::UnboundedReceiver<RetrievalOffer>,
    ) -> JoinHandle<TriggerSummary> {
        tokio::spawn(async move {
            let mut summary = TriggerSummary::default();
            while let Some(offer) = offers.recv().await {
                debug!("Retrieving {} for {}", offer.filename, offer.identity);
                self.deliver(&offer.artifact, &offer.filename, &mut summary)
                    .await;
            }
            debug!(
                "Download trigger stopped: {} retrieved, {} skipped, {} failed",
                summary.retrieved.len(),
                summary.skipped,
                summary.failed
            );
            summary
        })
    }

    async fn deliver(&self, handle: &ArtifactHandle, filename: &str, summary: &mut TriggerSummary) {
        let Some(artifact) = self.store.open(handle).await else {
            let err = RetrievalError::ArtifactGone {
                id: handle.id.clone(),
            };
            warn!("Skipping {}: {}", filename, err);
            RETRIEVALS_TOTAL.with_label_values(&["skipped"]).inc();
            summary.skipped += 1;
            return;
        };

        match self.retriever.retrieve(&artifact, filename).await {
            Ok(path) => {
                info!("Saved {}", path.display());
                RETRIEVALS_TOTAL.with_label_values(&["success"]).inc();
                summary.retrieved.push(path);
            }
            Err(e) => {
                warn!(
                    "Retriever {} failed for {}: {}",
                    self.retriever.name(),
                    filename,
                    e
                );
                RETRIEVALS_TOTAL.with_label_values(&["failed"]).inc();
                summary.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::MemoryArtifactStore;
    use crate::converter::Artifact;
    use crate::testing::RecordingRetriever;

    fn offer(handle: &ArtifactHandle, name: &str) -> RetrievalOffer {
        RetrievalOffer {
            identity: FileIdentity::new(name),
            artifact: handle.clone(),
            filename: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_delivers_offers_and_skips_revoked() {
        let store = Arc::new(MemoryArtifactStore::new());
        let retriever = Arc::new(RecordingRetriever::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let task = DownloadTrigger::new(store.clone(), retriever.clone()).spawn(rx);

        let live = store.issue(Artifact::new(vec![1u8], "image/png")).await;
        let gone = store.issue(Artifact::new(vec![2u8], "image/png")).await;
        store.revoke(&gone).await;

        tx.send(offer(&live, "a.png")).unwrap();
        tx.send(offer(&gone, "b.png")).unwrap();
        drop(tx);

        let summary = task.await.unwrap();
        assert_eq!(summary.retrieved.len(), 1);
        assert_eq!(summary.skipped, 1);

        let calls = retriever.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filename, "a.png");
        assert_eq!(calls[0].bytes, vec![1]);
    }

    #[tokio::test]
    async fn test_failed_retrieval_is_counted() {
        let store = Arc::new(MemoryArtifactStore::new());
        let retriever = Arc::new(RecordingRetriever::new());
        retriever.set_next_error("disk full").await;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = DownloadTrigger::new(store.clone(), retriever.clone()).spawn(rx);

        let handle = store.issue(Artifact::new(vec![1u8], "image/jpeg")).await;
        tx.send(offer(&handle, "a.jpg")).unwrap();
        drop(tx);

        let summary = task.await.unwrap();
        assert_eq!(summary.failed, 1);
        assert!(summary.retrieved.is_empty());
    }

    #[tokio::test]
    async fn test_backlog_is_delivered_in_order() {
        let store = Arc::new(MemoryArtifactStore::new());
        let retriever = Arc::new(RecordingRetriever::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let mut names = Vec::new();
        for n in 0..500 {
            let handle = store.issue(Artifact::new(vec![n as u8], "application/pdf")).await;
            let name = format!("doc{}.pdf", n);
            tx.send(offer(&handle, &name)).unwrap();
            names.push(name);
        }
        drop(tx);

        let summary = DownloadTrigger::new(store, retriever.clone())
            .spawn(rx)
            .await
            .unwrap();
        assert_eq!(summary.retrieved.len(), 500);
        assert_eq!(retriever.filenames().await, names);
    }
}
