//! Session events.
//!
//! Everything observable about a session (file list changes, status
//! transitions, completed artifacts) is published on an [`EventBus`]. The bus
//! is lossy for slow subscribers; artifact retrieval goes through the
//! orchestrator's offer channel instead.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::artifact::ArtifactHandle;
use crate::format::Operation;
use crate::input::FileIdentity;
use crate::orchestrator::ConversionStatus;

/// An event emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversionEvent {
    /// A file joined the working set.
    FileAdded { identity: FileIdentity, name: String },
    /// A file left the working set.
    FileRemoved { identity: FileIdentity },
    /// The working set was emptied.
    Cleared,
    /// A record moved to a new status.
    StatusChanged {
        identity: FileIdentity,
        attempt: u64,
        status: ConversionStatus,
    },
    /// An attempt produced an artifact.
    Completed {
        identity: FileIdentity,
        attempt: u64,
        operation: Operation,
        artifact: ArtifactHandle,
        /// Suggested file name for retrieval.
        filename: String,
        total_converted: u64,
    },
    /// The current artifact of a file was offered for retrieval again.
    RetrievalRequested {
        identity: FileIdentity,
        artifact: ArtifactHandle,
        filename: String,
    },
    /// The operations offered for the whole working set changed.
    BatchOperationsChanged { operations: Vec<Operation> },
}

/// Broadcast channel for [`ConversionEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConversionEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to every subscriber.
    pub fn emit(&self, event: ConversionEvent) {
        // No receivers is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversionEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(ConversionEvent::Cleared);
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let identity = FileIdentity::new("f1");

        bus.emit(ConversionEvent::StatusChanged {
            identity: identity.clone(),
            attempt: 1,
            status: ConversionStatus::Converting,
        });
        bus.emit(ConversionEvent::FileRemoved {
            identity: identity.clone(),
        });

        assert!(matches!(
            rx.recv().await.unwrap(),
            ConversionEvent::StatusChanged { attempt: 1, .. }
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            ConversionEvent::FileRemoved { identity }
        );
    }

    #[test]
    fn test_serialization_is_tagged() {
        let json = serde_json::to_string(&ConversionEvent::BatchOperationsChanged {
            operations: vec![Operation::Jpg, Operation::Webp],
        })
        .unwrap();
        assert!(json.contains("\"type\":\"batch_operations_changed\""));
        assert!(json.contains("\"JPG\""));
    }
}
