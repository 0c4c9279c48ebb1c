//! Recording retriever for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::converter::Artifact;
use crate::download::{RetrievalError, Retriever};

/// A recorded retrieval for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRetrieval {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// [`Retriever`] that keeps everything it is offered in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingRetriever {
    calls: Arc<RwLock<Vec<RecordedRetrieval>>>,
    next_error: Arc<RwLock<Option<String>>>,
}

impl RecordingRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all successful retrievals.
    pub async fn recorded_calls(&self) -> Vec<RecordedRetrieval> {
        self.calls.read().await.clone()
    }

    /// File names retrieved so far, in order.
    pub async fn filenames(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .map(|c| c.filename.clone())
            .collect()
    }

    /// Configure the next retrieval to fail with a write error.
    pub async fn set_next_error(&self, message: impl Into<String>) {
        *self.next_error.write().await = Some(message.into());
    }
}

#[async_trait]
impl Retriever for RecordingRetriever {
    fn name(&self) -> &str {
        "recording"
    }

    async fn retrieve(
        &self,
        artifact: &Artifact,
        filename: &str,
    ) -> Result<PathBuf, RetrievalError> {
        if let Some(message) = self.next_error.write().await.take() {
            return Err(RetrievalError::WriteFailed {
                path: PathBuf::from(filename),
                source: std::io::Error::new(std::io::ErrorKind::Other, message),
            });
        }

        self.calls.write().await.push(RecordedRetrieval {
            filename: filename.to_string(),
            content_type: artifact.content_type.clone(),
            bytes: artifact.bytes.to_vec(),
        });
        Ok(PathBuf::from(filename))
    }
}
