//! User-submitted input files and their identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the bytes of an input file live. Path-backed content is read lazily.
#[derive(Debug, Clone)]
pub enum FileContent {
    Memory(Arc<[u8]>),
    Path(PathBuf),
}

/// An immutable user-submitted file.
#[derive(Debug, Clone)]
pub struct InputFile {
    name: String,
    declared_type: Option<String>,
    size: u64,
    modified: Option<DateTime<Utc>>,
    content: FileContent,
}

impl InputFile {
    /// Creates a file whose content is already in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        declared_type: Option<&str>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            declared_type: declared_type.filter(|t| !t.is_empty()).map(str::to_string),
            size: bytes.len() as u64,
            modified: None,
            content: FileContent::Memory(bytes.into()),
        }
    }

    /// Creates a file backed by a path on disk. Only metadata is read here.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            declared_type: None,
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            content: FileContent::Path(path.to_path_buf()),
        })
    }

    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        self.declared_type = (!declared_type.is_empty()).then_some(declared_type);
        self
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    pub fn content(&self) -> &FileContent {
        &self.content
    }

    /// Reads the raw bytes.
    pub async fn read(&self) -> std::io::Result<Arc<[u8]>> {
        match &self.content {
            FileContent::Memory(bytes) => Ok(Arc::clone(bytes)),
            FileContent::Path(path) => Ok(tokio::fs::read(path).await?.into()),
        }
    }
}

/// Key distinguishing one working-set file from another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIdentity(String);

impl FileIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How identities are assigned when a file joins the working set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityScheme {
    /// A fresh sequence number per ingested file. Never collides.
    #[default]
    Sequence,
    /// Name plus modification time in milliseconds. Two files with the same name
    /// and timestamp share one slot.
    NameAndModified,
    /// SHA-256 of the content. Identical copies share one slot.
    ContentHash,
}

impl IdentityScheme {
    /// Derives the identity of `file`; `sequence` is the ingestion counter.
    pub async fn identity_for(
        &self,
        file: &InputFile,
        sequence: u64,
    ) -> std::io::Result<FileIdentity> {
        let id = match self {
            Self::Sequence => format!("f{}", sequence),
            Self::NameAndModified => {
                let millis = file.modified().map(|m| m.timestamp_millis()).unwrap_or(0);
                format!("{}{}", file.name(), millis)
            }
            Self::ContentHash => {
                let bytes = file.read().await?;
                let digest = format!("{:x}", Sha256::digest(&bytes));
                format!("sha256:{}", &digest[..16])
            }
        };
        Ok(FileIdentity(id))
    }
}
