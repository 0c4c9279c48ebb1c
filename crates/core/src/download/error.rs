//! Error types for the download module.

use std::path::PathBuf;
use thiserror::Error;

use crate::artifact::ArtifactId;

/// Errors that can occur while retrieving an artifact.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The artifact was revoked before it could be retrieved.
    #[error("artifact {id} is no longer available")]
    ArtifactGone { id: ArtifactId },

    /// Every candidate destination name is taken.
    #[error("destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// The suggested file name would escape the output directory.
    #[error("invalid file name: {name:?}")]
    InvalidFileName { name: String },

    /// Failed to create the output directory.
    #[error("failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the artifact.
    #[error("failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RetrievalError {
    /// Whether retrying the same retrieval might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::DirectoryCreationFailed { .. } | RetrievalError::WriteFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RetrievalError::DestinationExists {
            path: PathBuf::from("/out/a.png"),
        };
        assert_eq!(err.to_string(), "destination already exists: /out/a.png");
        assert!(!err.is_retryable());

        let err = RetrievalError::WriteFailed {
            path: PathBuf::from("/out/a.png"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(err.is_retryable());
    }
}
