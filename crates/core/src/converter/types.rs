//! Types for the converter module.

use std::sync::Arc;

use crate::format::{FormatId, Operation};
use crate::input::InputFile;

/// Quality factor used for every lossy encode.
pub const ENCODE_QUALITY: f32 = 0.92;

/// Converts a `0.0..=1.0` quality factor into the 1-100 scale encoders expect.
pub fn quality_percent(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Output of a successful conversion: bytes plus their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Arc<[u8]>,
    pub content_type: String,
}

impl Artifact {
    pub fn new(bytes: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A conversion request for one file.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Identifier used in logs (usually `<identity>#<attempt>`).
    pub job_id: String,
    pub file: InputFile,
    /// Detected source format.
    pub source: FormatId,
    pub operation: Operation,
}
