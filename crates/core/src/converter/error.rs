//! Error types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::format::{FormatId, Operation};

/// Errors that can occur during a conversion attempt.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Detection found no known format for the file.
    #[error("Unsupported format: {name}")]
    UnrecognizedFormat { name: String },

    /// The detected format does not offer the requested operation.
    #[error("{format:?} cannot be converted with {operation}")]
    OperationNotAllowed {
        format: FormatId,
        operation: Operation,
    },

    /// The source bytes could not be decoded.
    #[error("Decode failed: {reason}")]
    DecodeFailure { reason: String },

    /// The decoded surface could not be encoded.
    #[error("Encode failed: {reason}")]
    EncodeFailure { reason: String },

    /// Reading the source bytes failed.
    #[error("Failed to read input: {0}")]
    Read(#[from] std::io::Error),
}

/// Coarse classification of a failed attempt, recorded on the conversion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    DecodeFailure,
    EncodeFailure,
    ReadFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::DecodeFailure => "decode_failure",
            Self::EncodeFailure => "encode_failure",
            Self::ReadFailure => "read_failure",
        };
        f.write_str(s)
    }
}

impl ConversionError {
    /// Creates a new decode failure.
    pub fn decode_failure(reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            reason: reason.into(),
        }
    }

    /// Creates a new encode failure.
    pub fn encode_failure(reason: impl Into<String>) -> Self {
        Self::EncodeFailure {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnrecognizedFormat { .. } | Self::OperationNotAllowed { .. } => {
                FailureKind::UnsupportedFormat
            }
            Self::DecodeFailure { .. } => FailureKind::DecodeFailure,
            Self::EncodeFailure { .. } => FailureKind::EncodeFailure,
            Self::Read(_) => FailureKind::ReadFailure,
        }
    }

    /// Whether retrying the same target can ever succeed. Unsupported formats are
    /// a property of the file, not of the attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), FailureKind::UnsupportedFormat)
    }
}

/// Errors reported by the specialized HEIC/HEIF decoder.
#[derive(Debug, Error)]
pub enum HeicError {
    /// No decoder is available in this process.
    #[error("HEIC decoding is not available")]
    Unavailable,

    /// The external tool could not be found.
    #[error("HEIC decoder not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The requested output type cannot be produced.
    #[error("Unsupported HEIC output type: {mime}")]
    UnsupportedOutput { mime: String },

    /// The decoder ran and failed.
    #[error("HEIC decoding failed: {reason}")]
    Failed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<HeicError> for ConversionError {
    fn from(err: HeicError) -> Self {
        // Unsupported sub-codecs and corrupt files are not told apart.
        ConversionError::decode_failure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            ConversionError::UnrecognizedFormat {
                name: "a.xyz".into()
            }
            .kind(),
            FailureKind::UnsupportedFormat
        );
        assert_eq!(
            ConversionError::decode_failure("bad").kind(),
            FailureKind::DecodeFailure
        );
        assert_eq!(
            ConversionError::encode_failure("bad").kind(),
            FailureKind::EncodeFailure
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ConversionError::from(io).kind(), FailureKind::ReadFailure);
    }

    #[test]
    fn test_retryable() {
        assert!(ConversionError::decode_failure("x").is_retryable());
        assert!(!ConversionError::OperationNotAllowed {
            format: FormatId::Gif,
            operation: Operation::Jpg,
        }
        .is_retryable());
    }

    #[test]
    fn test_heic_error_maps_to_decode_failure() {
        let err: ConversionError = HeicError::Unavailable.into();
        assert_eq!(err.kind(), FailureKind::DecodeFailure);

        let err: ConversionError = HeicError::Failed {
            reason: "exit status 1".into(),
            stderr: Some("Unsupported feature".into()),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::DecodeFailure);
    }

    #[test]
    fn test_display() {
        let err = ConversionError::OperationNotAllowed {
            format: FormatId::Pdf,
            operation: Operation::Png,
        };
        assert_eq!(err.to_string(), "Pdf cannot be converted with PNG");
    }
}
