//! Artifact handle issuance.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::converter::Artifact;

/// Opaque reference to an issued artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A retrievable, revocable reference to artifact bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub id: ArtifactId,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Issues and revokes artifact handles.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Stores `artifact` and returns a handle to it.
    async fn issue(&self, artifact: Artifact) -> ArtifactHandle;

    /// Returns the artifact behind `handle`, or `None` once revoked.
    async fn open(&self, handle: &ArtifactHandle) -> Option<Artifact>;

    /// Permanently revokes `handle`. Idempotent; returns whether it was live.
    async fn revoke(&self, handle: &ArtifactHandle) -> bool;

    /// Number of handles that are currently live.
    async fn live_count(&self) -> usize;
}

/// In-memory [`ArtifactStore`].
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<ArtifactId, Artifact>>,
    issued: AtomicU64,
    revoked: AtomicU64,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total handles ever issued.
    pub fn issued_count(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    /// Total effective revocations (repeated revokes of one handle count once).
    pub fn revoked_count(&self) -> u64 {
        self.revoked.load(Ordering::Relaxed)
    }

    /// Whether `handle` is still live.
    pub async fn is_live(&self, handle: &ArtifactHandle) -> bool {
        self.artifacts.read().await.contains_key(&handle.id)
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn issue(&self, artifact: Artifact) -> ArtifactHandle {
        let handle = ArtifactHandle {
            id: ArtifactId::generate(),
            content_type: artifact.content_type.clone(),
            size_bytes: artifact.len() as u64,
        };
        self.artifacts
            .write()
            .await
            .insert(handle.id.clone(), artifact);
        self.issued.fetch_add(1, Ordering::Relaxed);
        handle
    }

    async fn open(&self, handle: &ArtifactHandle) -> Option<Artifact> {
        self.artifacts.read().await.get(&handle.id).cloned()
    }

    async fn revoke(&self, handle: &ArtifactHandle) -> bool {
        let removed = self.artifacts.write().await.remove(&handle.id).is_some();
        if removed {
            self.revoked.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    async fn live_count(&self) -> usize {
        self.artifacts.read().await.len()
    }
}
