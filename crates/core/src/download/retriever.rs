//! Retrieval targets for finished artifacts.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::config::OutputConfig;
use super::error::RetrievalError;
use crate::converter::Artifact;
use crate::format::{base_name, extension_of, Operation};

/// Highest ` (n)` suffix tried before giving up on a free name.
const MAX_SUFFIX: u32 = 999;

/// Name offered for an artifact: the input's base name plus the operation's
/// extension.
pub fn suggested_filename(input_name: &str, operation: Operation) -> String {
    format!("{}.{}", base_name(input_name), operation.extension())
}

/// Receives artifacts offered for retrieval.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Returns the name of this retriever implementation.
    fn name(&self) -> &str;

    /// Delivers `artifact` under `filename`, returning where it ended up.
    async fn retrieve(&self, artifact: &Artifact, filename: &str)
        -> Result<PathBuf, RetrievalError>;
}

/// [`Retriever`] writing artifacts into a local directory.
pub struct DirectoryRetriever {
    config: OutputConfig,
}

impl DirectoryRetriever {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    fn candidate(filename: &str, n: u32) -> String {
        if n == 0 {
            return filename.to_string();
        }
        match extension_of(filename) {
            Some(ext) => format!("{} ({}).{}", base_name(filename), n, ext),
            None => format!("{} ({})", filename, n),
        }
    }

    async fn write_new(path: &Path, bytes: &[u8]) -> Result<bool, RetrievalError> {
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(source) => {
                return Err(RetrievalError::WriteFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        file.write_all(bytes)
            .await
            .map_err(|source| RetrievalError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        file.flush()
            .await
            .map_err(|source| RetrievalError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(true)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

#[async_trait]
impl Retriever for DirectoryRetriever {
    fn name(&self) -> &str {
        "directory"
    }

    async fn retrieve(
        &self,
        artifact: &Artifact,
        filename: &str,
    ) -> Result<PathBuf, RetrievalError> {
        if !is_plain_file_name(filename) {
            return Err(RetrievalError::InvalidFileName {
                name: filename.to_string(),
            });
        }

        let dir = &self.config.directory;
        fs::create_dir_all(dir)
            .await
            .map_err(|source| RetrievalError::DirectoryCreationFailed {
                path: dir.clone(),
                source,
            })?;

        if self.config.overwrite {
            let path = dir.join(filename);
            fs::write(&path, &artifact.bytes)
                .await
                .map_err(|source| RetrievalError::WriteFailed {
                    path: path.clone(),
                    source,
                })?;
            debug!("Wrote {} bytes to {}", artifact.len(), path.display());
            return Ok(path);
        }

        for n in 0..=MAX_SUFFIX {
            let path = dir.join(Self::candidate(filename, n));
            if Self::write_new(&path, &artifact.bytes).await? {
                debug!("Wrote {} bytes to {}", artifact.len(), path.display());
                return Ok(path);
            }
        }

        Err(RetrievalError::DestinationExists {
            path: dir.join(filename),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn retriever(dir: &TempDir, overwrite: bool) -> DirectoryRetriever {
        DirectoryRetriever::new(OutputConfig {
            directory: dir.path().join("out"),
            overwrite,
        })
    }

    #[test]
    fn test_suggested_filename() {
        assert_eq!(suggested_filename("photo.HEIC", Operation::Png), "photo.png");
        assert_eq!(
            suggested_filename("archive.tar.gz", Operation::Compress),
            "archive.tar.pdf"
        );
        assert_eq!(suggested_filename("README", Operation::Jpg), "README.jpg");
        assert_eq!(suggested_filename("anim.gif", Operation::Optimize), "anim.gif");
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(DirectoryRetriever::candidate("a.png", 0), "a.png");
        assert_eq!(DirectoryRetriever::candidate("a.png", 2), "a (2).png");
        assert_eq!(DirectoryRetriever::candidate("README", 1), "README (1)");
    }

    #[tokio::test]
    async fn test_writes_into_created_directory() {
        let dir = TempDir::new().unwrap();
        let retriever = retriever(&dir, false);
        let artifact = Artifact::new(vec![1u8, 2, 3], "image/png");

        let path = retriever.retrieve(&artifact, "a.png").await.unwrap();
        assert_eq!(path, dir.path().join("out").join("a.png"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_existing_name_gets_suffix() {
        let dir = TempDir::new().unwrap();
        let retriever = retriever(&dir, false);
        let artifact = Artifact::new(vec![9u8], "image/png");

        retriever.retrieve(&artifact, "a.png").await.unwrap();
        let second = retriever.retrieve(&artifact, "a.png").await.unwrap();
        let third = retriever.retrieve(&artifact, "a.png").await.unwrap();

        assert_eq!(second.file_name().unwrap(), "a (1).png");
        assert_eq!(third.file_name().unwrap(), "a (2).png");
    }

    #[tokio::test]
    async fn test_overwrite_replaces() {
        let dir = TempDir::new().unwrap();
        let retriever = retriever(&dir, true);

        retriever
            .retrieve(&Artifact::new(vec![1u8], "image/png"), "a.png")
            .await
            .unwrap();
        let path = retriever
            .retrieve(&Artifact::new(vec![2u8], "image/png"), "a.png")
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "a.png");
        assert_eq!(std::fs::read(&path).unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_rejects_path_components() {
        let dir = TempDir::new().unwrap();
        let retriever = retriever(&dir, false);
        let err = retriever
            .retrieve(&Artifact::new(vec![1u8], "image/png"), "../a.png")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidFileName { .. }));
    }

    #[tokio::test]
    async fn test_directory_that_is_a_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("out"), b"in the way").unwrap();
        let retriever = retriever(&dir, false);

        let err = tokio_test::assert_err!(
            retriever
                .retrieve(&Artifact::new(vec![1u8], "image/png"), "a.png")
                .await
        );
        assert!(matches!(err, RetrievalError::DirectoryCreationFailed { .. }));
        assert!(err.is_retryable());

        let ok = retriever_for(dir.path().join("ok"));
        let path = tokio_test::assert_ok!(
            ok.retrieve(&Artifact::new(vec![1u8], "image/png"), "a.png")
                .await
        );
        assert!(path.ends_with("ok/a.png"));
    }

    fn retriever_for(directory: PathBuf) -> DirectoryRetriever {
        DirectoryRetriever::new(OutputConfig {
            directory,
            overwrite: false,
        })
    }
}
