//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{Artifact, ConversionError, ConversionJob, Converter};
use crate::format::{FormatId, Operation};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    pub job_id: String,
    pub file_name: String,
    pub source: FormatId,
    pub operation: Operation,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Simulate success/failure, once, always, or per file name
/// - Simulate conversion time, globally or per file name
///
/// A successful conversion returns the input bytes tagged with the
/// operation's content type (or the source's, for passthrough operations).
#[derive(Debug, Clone)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next conversion will fail with this error.
    next_error: Arc<RwLock<Option<ConversionError>>>,
    /// Every conversion fails with a decode failure.
    always_fail: Arc<RwLock<bool>>,
    /// File names whose conversions fail.
    failing_files: Arc<RwLock<HashSet<String>>>,
    /// Simulated conversion duration in milliseconds.
    delay_ms: Arc<RwLock<u64>>,
    /// Per-file overrides of the simulated duration.
    file_delays: Arc<RwLock<HashMap<String, Duration>>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter that succeeds immediately.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            always_fail: Arc::new(RwLock::new(false)),
            failing_files: Arc::new(RwLock::new(HashSet::new())),
            delay_ms: Arc::new(RwLock::new(0)),
            file_delays: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Builder-style default delay.
    pub fn with_delay_ms(self, ms: u64) -> Self {
        Self {
            delay_ms: Arc::new(RwLock::new(ms)),
            ..self
        }
    }

    /// Builder-style permanent failure.
    pub fn always_failing() -> Self {
        Self {
            always_fail: Arc::new(RwLock::new(true)),
            ..Self::new()
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConversionError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every conversion fail (or succeed again).
    pub async fn set_always_fail(&self, fail: bool) {
        *self.always_fail.write().await = fail;
    }

    /// Make conversions of files with this name fail.
    pub async fn set_fail_for(&self, file_name: impl Into<String>) {
        self.failing_files.write().await.insert(file_name.into());
    }

    /// Set the simulated conversion duration for one file name.
    pub async fn set_delay_for(&self, file_name: impl Into<String>, delay: Duration) {
        self.file_delays
            .write()
            .await
            .insert(file_name.into(), delay);
    }

    async fn take_error(&self, file_name: &str) -> Option<ConversionError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Some(err);
        }
        if *self.always_fail.read().await || self.failing_files.read().await.contains(file_name) {
            return Some(ConversionError::decode_failure(format!(
                "mock failure for {}",
                file_name
            )));
        }
        None
    }

    async fn delay_for(&self, file_name: &str) -> Duration {
        match self.file_delays.read().await.get(file_name) {
            Some(delay) => *delay,
            None => Duration::from_millis(*self.delay_ms.read().await),
        }
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(&self, job: ConversionJob) -> Result<Artifact, ConversionError> {
        let file_name = job.file.name().to_string();

        let delay = self.delay_for(&file_name).await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match self.take_error(&file_name).await {
            Some(err) => Err(err),
            None => {
                let bytes = job.file.read().await?;
                let content_type = job
                    .operation
                    .mime()
                    .unwrap_or_else(|| job.source.descriptor().mime());
                Ok(Artifact::new(bytes, content_type))
            }
        };

        self.conversions.write().await.push(RecordedConversion {
            job_id: job.job_id,
            file_name,
            source: job.source,
            operation: job.operation,
            success: result.is_ok(),
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputFile;

    fn job(name: &str, operation: Operation) -> ConversionJob {
        ConversionJob {
            job_id: format!("{}#1", name),
            file: InputFile::from_bytes(name, None, vec![1, 2, 3]),
            source: FormatId::Png,
            operation,
        }
    }

    #[tokio::test]
    async fn test_successful_conversion() {
        let converter = MockConverter::new();
        let artifact = converter.convert(job("a.png", Operation::Jpg)).await.unwrap();

        assert_eq!(&*artifact.bytes, &[1, 2, 3]);
        assert_eq!(artifact.content_type, "image/jpeg");

        let recorded = converter.recorded_conversions().await;
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].success);
        assert_eq!(recorded[0].operation, Operation::Jpg);
    }

    #[tokio::test]
    async fn test_next_error_applies_once() {
        let converter = MockConverter::new();
        converter
            .set_next_error(ConversionError::encode_failure("boom"))
            .await;

        assert!(converter.convert(job("a.png", Operation::Webp)).await.is_err());
        assert!(converter.convert(job("a.png", Operation::Webp)).await.is_ok());
        assert_eq!(converter.conversion_count().await, 2);
    }

    #[tokio::test]
    async fn test_always_failing() {
        let converter = MockConverter::always_failing();
        for _ in 0..3 {
            assert!(converter.convert(job("a.png", Operation::Jpg)).await.is_err());
        }
        converter.set_always_fail(false).await;
        assert!(converter.convert(job("a.png", Operation::Jpg)).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_for_file() {
        let converter = MockConverter::new();
        converter.set_fail_for("bad.png").await;

        assert!(converter.convert(job("bad.png", Operation::Jpg)).await.is_err());
        assert!(converter.convert(job("good.png", Operation::Jpg)).await.is_ok());
    }

    #[tokio::test]
    async fn test_passthrough_keeps_source_type() {
        let converter = MockConverter::new();
        let mut job = job("doc.pdf", Operation::Compress);
        job.source = FormatId::Pdf;
        let artifact = converter.convert(job).await.unwrap();
        assert_eq!(artifact.content_type, "application/pdf");
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_file_delay() {
        let converter = MockConverter::new().with_delay_ms(5);
        converter
            .set_delay_for("slow.png", Duration::from_secs(10))
            .await;

        let start = tokio::time::Instant::now();
        converter.convert(job("slow.png", Operation::Jpg)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
