//! Types for the conversion orchestrator.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::artifact::ArtifactHandle;
use crate::converter::FailureKind;
use crate::format::Operation;
use crate::input::FileIdentity;

/// Errors returned by orchestrator operations.
///
/// Conversion failures are not errors at this level; they end up as
/// [`ConversionStatus::Error`] on the record.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No file with this identity is in the working set.
    #[error("file not found: {0}")]
    FileNotFound(FileIdentity),

    /// The file has no current artifact to offer.
    #[error("file {0} has no converted artifact")]
    NotConverted(FileIdentity),

    /// The file's format is not recognized, so no operation can be chosen.
    #[error("unsupported file: {0}")]
    UnsupportedFile(String),

    /// Reading the file to derive its identity failed.
    #[error("failed to read {name}: {source}")]
    Ingest {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// An attempt task panicked or was aborted.
    #[error("conversion task failed: {0}")]
    TaskFailed(String),
}

/// Per-file conversion status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    #[default]
    Idle,
    Converting,
    Done,
    Error,
}

impl ConversionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Converting => "converting",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// State of the most recent attempt for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub status: ConversionStatus,
    /// Operation requested by the latest attempt.
    pub chosen_target: Option<Operation>,
    /// Current artifact, present only when `status` is `Done`.
    pub artifact: Option<ArtifactHandle>,
    /// Generation of the latest attempt. Starts at 1.
    pub attempt: u64,
    /// Why the latest attempt failed, when `status` is `Error`.
    pub failure: Option<FailureKind>,
}

/// How one attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Done(ArtifactHandle),
    Error(FailureKind),
    /// A newer attempt started, or the file was removed, before this one
    /// finished. Its result was dropped.
    Superseded,
}

/// A running conversion attempt.
#[derive(Debug)]
pub struct ConversionAttempt {
    pub identity: FileIdentity,
    pub attempt: u64,
    pub operation: Operation,
    pub(crate) handle: JoinHandle<AttemptOutcome>,
}

impl ConversionAttempt {
    /// Waits for the attempt to finish.
    pub async fn wait(self) -> Result<AttemptOutcome, OrchestratorError> {
        self.handle
            .await
            .map_err(|e| OrchestratorError::TaskFailed(e.to_string()))
    }
}

/// Waits for every attempt, returning outcomes in the same order.
pub async fn wait_all(
    attempts: Vec<ConversionAttempt>,
) -> Vec<Result<AttemptOutcome, OrchestratorError>> {
    join_all(attempts.into_iter().map(ConversionAttempt::wait)).await
}
