//! Output artifacts and their lifecycle.
//!
//! An [`ArtifactStore`] issues revocable handles for conversion output. The
//! [`ArtifactLifecycle`] maps each file identity to its current handle and makes
//! sure a replaced or removed artifact is revoked, so no artifact is orphaned.

mod lifecycle;
mod store;

pub use lifecycle::ArtifactLifecycle;
pub use store::{ArtifactHandle, ArtifactId, ArtifactStore, MemoryArtifactStore};
