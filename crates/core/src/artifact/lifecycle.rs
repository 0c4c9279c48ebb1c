//! Identity to artifact bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::store::{ArtifactHandle, ArtifactStore};
use crate::converter::Artifact;
use crate::input::FileIdentity;
use crate::metrics::{ARTIFACTS_LIVE, ARTIFACTS_REVOKED};

/// Keeps at most one live artifact per file identity.
///
/// Not synchronized on its own; the orchestrator keeps it behind the same lock
/// as the conversion records.
pub struct ArtifactLifecycle {
    store: Arc<dyn ArtifactStore>,
    current: HashMap<FileIdentity, ArtifactHandle>,
}

impl ArtifactLifecycle {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            current: HashMap::new(),
        }
    }

    /// Current handle for `identity`, if any.
    pub fn get(&self, identity: &FileIdentity) -> Option<&ArtifactHandle> {
        self.current.get(identity)
    }

    pub fn live_count(&self) -> usize {
        self.current.len()
    }

    /// Issues `artifact` and makes it the current one for `identity`, revoking
    /// the previous artifact first.
    pub async fn install(&mut self, identity: &FileIdentity, artifact: Artifact) -> ArtifactHandle {
        self.release(identity).await;

        let handle = self.store.issue(artifact).await;
        debug!("Installed artifact {} for {}", handle.id, identity);
        self.current.insert(identity.clone(), handle.clone());
        ARTIFACTS_LIVE.inc();
        handle
    }

    /// Revokes and forgets the artifact for `identity`. No-op without one.
    pub async fn release(&mut self, identity: &FileIdentity) -> bool {
        let Some(handle) = self.current.remove(identity) else {
            return false;
        };

        ARTIFACTS_LIVE.dec();
        if self.store.revoke(&handle).await {
            ARTIFACTS_REVOKED.inc();
        }
        debug!("Released artifact {} for {}", handle.id, identity);
        true
    }

    /// Revokes every artifact. Returns how many were released.
    pub async fn release_all(&mut self) -> usize {
        let handles: Vec<_> = self.current.drain().collect();
        let count = handles.len();
        for (identity, handle) in handles {
            ARTIFACTS_LIVE.dec();
            if self.store.revoke(&handle).await {
                ARTIFACTS_REVOKED.inc();
            }
            debug!("Released artifact {} for {}", handle.id, identity);
        }
        count
    }
}
