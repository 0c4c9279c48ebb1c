//! Mock HEIC decoder for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::fixtures;
use crate::converter::{HeicDecoder, HeicError};

/// A recorded decode call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedHeicCall {
    pub target_mime: String,
    pub quality: f32,
    pub input_len: usize,
}

/// Mock implementation of the HeicDecoder trait.
///
/// Successful calls return a small real image in the requested format so
/// callers that sniff the output still work.
#[derive(Debug, Clone, Default)]
pub struct MockHeicDecoder {
    calls: Arc<RwLock<Vec<RecordedHeicCall>>>,
    next_error: Arc<RwLock<Option<HeicError>>>,
}

impl MockHeicDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedHeicCall> {
        self.calls.read().await.clone()
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: HeicError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl HeicDecoder for MockHeicDecoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn decode_to(
        &self,
        bytes: &[u8],
        target_mime: &str,
        quality: f32,
    ) -> Result<Vec<u8>, HeicError> {
        self.calls.write().await.push(RecordedHeicCall {
            target_mime: target_mime.to_string(),
            quality,
            input_len: bytes.len(),
        });

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        match target_mime {
            "image/png" => Ok(fixtures::png_bytes(2, 2)),
            "image/jpeg" => Ok(fixtures::jpeg_bytes(2, 2)),
            other => Err(HeicError::UnsupportedOutput {
                mime: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_fails_once() {
        let decoder = MockHeicDecoder::new();
        decoder.set_next_error(HeicError::Unavailable).await;

        assert!(decoder.decode_to(b"abc", "image/png", 0.5).await.is_err());
        let bytes = decoder.decode_to(b"abcd", "image/jpeg", 0.5).await.unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );

        let calls = decoder.recorded_calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].input_len, 4);
    }
}
