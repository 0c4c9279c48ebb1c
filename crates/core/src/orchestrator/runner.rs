//! Conversion orchestrator implementation.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

use super::config::OrchestratorConfig;
use super::types::{
    AttemptOutcome, ConversionAttempt, ConversionRecord, ConversionStatus, OrchestratorError,
};
use crate::artifact::{ArtifactHandle, ArtifactLifecycle, ArtifactStore};
use crate::converter::{ConversionError, ConversionJob, Converter};
use crate::download::{suggested_filename, RetrievalOffer};
use crate::events::{ConversionEvent, EventBus};
use crate::format::{detect, Operation};
use crate::input::{FileIdentity, InputFile};
use crate::metrics::{CONVERSIONS_TOTAL, SUPERSEDED_ATTEMPTS};
use crate::planner::{common_operations, is_eligible, BatchPolicy};

/// Everything that changes during a session, kept behind one lock.
struct SessionState {
    /// Identities in ingestion order.
    order: Vec<FileIdentity>,
    files: HashMap<FileIdentity, InputFile>,
    records: HashMap<FileIdentity, ConversionRecord>,
    artifacts: ArtifactLifecycle,
    total_converted: u64,
    batch: BTreeSet<Operation>,
    /// Last attempt generation handed out. Never reused within a session, so a
    /// removed and re-added identity cannot collide with an old attempt.
    last_attempt: u64,
    offer_sinks: Vec<mpsc::UnboundedSender<RetrievalOffer>>,
}

impl SessionState {
    fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            order: Vec::new(),
            files: HashMap::new(),
            records: HashMap::new(),
            artifacts: ArtifactLifecycle::new(store),
            total_converted: 0,
            batch: BTreeSet::new(),
            last_attempt: 0,
            offer_sinks: Vec::new(),
        }
    }

    fn listed(&self) -> impl Iterator<Item = (&FileIdentity, &InputFile)> {
        self.order
            .iter()
            .filter_map(|id| self.files.get(id).map(|file| (id, file)))
    }

    /// Files that have never been asked to convert.
    fn pending(&self) -> impl Iterator<Item = (&FileIdentity, &InputFile)> {
        self.listed()
            .filter(|(id, _)| !self.records.contains_key(*id))
    }

    /// Hands an artifact to every retrieval subscriber, dropping closed ones.
    fn offer(&mut self, offer: RetrievalOffer) {
        self.offer_sinks.retain(|sink| sink.send(offer.clone()).is_ok());
    }

    /// Recomputes the batch operations and announces them when they changed.
    fn refresh_batch(&mut self, policy: BatchPolicy, events: &EventBus) {
        let batch = common_operations(self.pending().map(|(_, file)| file), policy);
        if batch != self.batch {
            debug!("Batch operations now {:?}", batch);
            self.batch = batch;
            events.emit(ConversionEvent::BatchOperationsChanged {
                operations: self.batch.iter().copied().collect(),
            });
        }
    }
}

/// Drives every file of a session through Idle, Converting and Done/Error.
///
/// Each request spawns its own task, so different files convert concurrently.
/// For one file the latest request wins: every request bumps the record's
/// attempt generation and a completing attempt only writes back if its
/// generation is still current.
pub struct ConversionOrchestrator {
    config: OrchestratorConfig,
    converter: Arc<dyn Converter>,
    state: Arc<RwLock<SessionState>>,
    events: EventBus,
    sequence: AtomicU64,
}

impl ConversionOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        converter: Arc<dyn Converter>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        let state = SessionState::new(store);

        Self {
            config,
            converter,
            state: Arc::new(RwLock::new(state)),
            events,
            sequence: AtomicU64::new(0),
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversionEvent> {
        self.events.subscribe()
    }

    /// Subscribes to retrieval offers: one per completed conversion and one
    /// per [`redownload`](Self::redownload).
    ///
    /// Unlike the event bus this channel never drops offers. It closes once the
    /// orchestrator and every running attempt are gone.
    pub async fn subscribe_offers(&self) -> mpsc::UnboundedReceiver<RetrievalOffer> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.write().await.offer_sinks.push(tx);
        rx
    }

    // =========================================================================
    // Working set
    // =========================================================================

    /// Adds a file to the working set and returns its identity.
    ///
    /// When the derived identity is already present the existing entry is kept
    /// and its identity returned.
    pub async fn add_file(&self, file: InputFile) -> Result<FileIdentity, OrchestratorError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let identity = self
            .config
            .identity_scheme
            .identity_for(&file, sequence)
            .await
            .map_err(|source| OrchestratorError::Ingest {
                name: file.name().to_string(),
                source,
            })?;

        let mut session = self.state.write().await;
        if session.files.contains_key(&identity) {
            debug!("{} already in working set as {}", file.name(), identity);
            return Ok(identity);
        }

        info!("Added {} as {}", file.name(), identity);
        self.events.emit(ConversionEvent::FileAdded {
            identity: identity.clone(),
            name: file.name().to_string(),
        });
        session.order.push(identity.clone());
        session.files.insert(identity.clone(), file);
        session.refresh_batch(self.config.batch_policy, &self.events);

        Ok(identity)
    }

    /// Adds several files, returning their identities in order.
    pub async fn add_files(
        &self,
        files: impl IntoIterator<Item = InputFile>,
    ) -> Result<Vec<FileIdentity>, OrchestratorError> {
        let mut identities = Vec::new();
        for file in files {
            identities.push(self.add_file(file).await?);
        }
        Ok(identities)
    }

    /// Removes a file from any state, releasing its artifact.
    ///
    /// Returns `false` when the file was not in the working set.
    pub async fn remove_file(&self, identity: &FileIdentity) -> bool {
        let mut guard = self.state.write().await;
        let session = &mut *guard;

        let Some(file) = session.files.remove(identity) else {
            debug!("Remove of unknown file {} ignored", identity);
            return false;
        };
        session.order.retain(|id| id != identity);
        if let Some(record) = session.records.remove(identity) {
            if record.status == ConversionStatus::Converting {
                debug!("Removed {} while attempt {} was running", identity, record.attempt);
            }
        }
        session.artifacts.release(identity).await;

        info!("Removed {} ({})", file.name(), identity);
        self.events.emit(ConversionEvent::FileRemoved {
            identity: identity.clone(),
        });
        session.refresh_batch(self.config.batch_policy, &self.events);
        true
    }

    /// Empties the working set and revokes every artifact.
    pub async fn clear(&self) -> usize {
        let mut guard = self.state.write().await;
        let session = &mut *guard;

        let removed = session.files.len();
        let released = session.artifacts.release_all().await;
        session.order.clear();
        session.files.clear();
        session.records.clear();

        info!("Cleared {} files, released {} artifacts", removed, released);
        self.events.emit(ConversionEvent::Cleared);
        session.refresh_batch(self.config.batch_policy, &self.events);
        removed
    }

    /// All files in ingestion order.
    pub async fn files(&self) -> Vec<(FileIdentity, InputFile)> {
        let session = self.state.read().await;
        session
            .listed()
            .map(|(id, file)| (id.clone(), file.clone()))
            .collect()
    }

    /// Files that have no conversion record yet.
    pub async fn pending_files(&self) -> Vec<(FileIdentity, InputFile)> {
        let session = self.state.read().await;
        session
            .pending()
            .map(|(id, file)| (id.clone(), file.clone()))
            .collect()
    }

    pub async fn record(&self, identity: &FileIdentity) -> Option<ConversionRecord> {
        self.state.read().await.records.get(identity).cloned()
    }

    /// Number of successful conversions this session. Never decreases.
    pub async fn total_converted(&self) -> u64 {
        self.state.read().await.total_converted
    }

    /// Operations currently offered for "convert all".
    pub async fn batch_operations(&self) -> Vec<Operation> {
        self.state.read().await.batch.iter().copied().collect()
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Starts converting a file with `operation`.
    ///
    /// The record moves to `Converting` and any previous artifact is revoked
    /// before this returns. An attempt already running for the same file is
    /// superseded.
    pub async fn request_conversion(
        &self,
        identity: &FileIdentity,
        operation: Operation,
    ) -> Result<ConversionAttempt, OrchestratorError> {
        let mut guard = self.state.write().await;
        let session = &mut *guard;

        let file = session
            .files
            .get(identity)
            .cloned()
            .ok_or_else(|| OrchestratorError::FileNotFound(identity.clone()))?;

        session.last_attempt += 1;
        let attempt = session.last_attempt;

        let record = session.records.entry(identity.clone()).or_default();
        if record.status == ConversionStatus::Converting {
            debug!("Superseding attempt {} of {}", record.attempt, identity);
        }
        record.attempt = attempt;
        record.status = ConversionStatus::Converting;
        record.chosen_target = Some(operation);
        record.artifact = None;
        record.failure = None;

        session.artifacts.release(identity).await;

        debug!("{} attempt {}: converting to {}", identity, attempt, operation);
        self.events.emit(ConversionEvent::StatusChanged {
            identity: identity.clone(),
            attempt,
            status: ConversionStatus::Converting,
        });
        session.refresh_batch(self.config.batch_policy, &self.events);

        let handle = tokio::spawn(run_attempt(
            Arc::clone(&self.state),
            Arc::clone(&self.converter),
            self.events.clone(),
            identity.clone(),
            attempt,
            file,
            operation,
        ));

        Ok(ConversionAttempt {
            identity: identity.clone(),
            attempt,
            operation,
            handle,
        })
    }

    /// Converts every pending file whose format allows `operation`.
    /// Other pending files are left untouched.
    pub async fn convert_all(&self, operation: Operation) -> Vec<ConversionAttempt> {
        let targets: Vec<FileIdentity> = {
            let session = self.state.read().await;
            session
                .pending()
                .filter(|(_, file)| is_eligible(file, operation))
                .map(|(id, _)| id.clone())
                .collect()
        };

        info!("Converting {} files to {}", targets.len(), operation);

        let mut attempts = Vec::with_capacity(targets.len());
        for identity in targets {
            match self.request_conversion(&identity, operation).await {
                Ok(attempt) => attempts.push(attempt),
                // Removed between listing and requesting.
                Err(e) => debug!("Skipping {} in batch: {}", identity, e),
            }
        }
        attempts
    }

    /// Converts the file to its format's first allowed operation, whatever
    /// was requested before.
    pub async fn retry(
        &self,
        identity: &FileIdentity,
    ) -> Result<ConversionAttempt, OrchestratorError> {
        let operation = {
            let session = self.state.read().await;
            let file = session
                .files
                .get(identity)
                .ok_or_else(|| OrchestratorError::FileNotFound(identity.clone()))?;

            detect(file)
                .and_then(|format| format.descriptor().allowed_operations.first().copied())
                .ok_or_else(|| OrchestratorError::UnsupportedFile(file.name().to_string()))?
        };

        self.request_conversion(identity, operation).await
    }

    /// Offers the current artifact of a converted file for retrieval again.
    pub async fn redownload(
        &self,
        identity: &FileIdentity,
    ) -> Result<ArtifactHandle, OrchestratorError> {
        let mut guard = self.state.write().await;
        let session = &mut *guard;
        let file = session
            .files
            .get(identity)
            .ok_or_else(|| OrchestratorError::FileNotFound(identity.clone()))?;

        let (handle, operation) = session
            .records
            .get(identity)
            .filter(|r| r.status == ConversionStatus::Done)
            .and_then(|r| Some((r.artifact.clone()?, r.chosen_target?)))
            .ok_or_else(|| OrchestratorError::NotConverted(identity.clone()))?;

        let filename = suggested_filename(file.name(), operation);
        self.events.emit(ConversionEvent::RetrievalRequested {
            identity: identity.clone(),
            artifact: handle.clone(),
            filename: filename.clone(),
        });
        session.offer(RetrievalOffer {
            identity: identity.clone(),
            artifact: handle.clone(),
            filename,
        });
        Ok(handle)
    }

    /// Allowed operations for the file other than the one last requested.
    pub async fn also_targets(
        &self,
        identity: &FileIdentity,
    ) -> Result<Vec<Operation>, OrchestratorError> {
        let session = self.state.read().await;
        let file = session
            .files
            .get(identity)
            .ok_or_else(|| OrchestratorError::FileNotFound(identity.clone()))?;
        let chosen = session.records.get(identity).and_then(|r| r.chosen_target);

        Ok(detect(file)
            .map(|format| {
                format
                    .descriptor()
                    .allowed_operations
                    .iter()
                    .copied()
                    .filter(|op| Some(*op) != chosen)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Body of one attempt task.
async fn run_attempt(
    state: Arc<RwLock<SessionState>>,
    converter: Arc<dyn Converter>,
    events: EventBus,
    identity: FileIdentity,
    attempt: u64,
    file: InputFile,
    operation: Operation,
) -> AttemptOutcome {
    let job_id = format!("{}#{}", identity, attempt);
    let source = detect(&file);

    let result = match source {
        None => Err(ConversionError::UnrecognizedFormat {
            name: file.name().to_string(),
        }),
        Some(format) if !format.descriptor().allows(operation) => {
            Err(ConversionError::OperationNotAllowed { format, operation })
        }
        Some(format) => {
            converter
                .convert(ConversionJob {
                    job_id: job_id.clone(),
                    file: file.clone(),
                    source: format,
                    operation,
                })
                .await
        }
    };

    let mut guard = state.write().await;
    let session = &mut *guard;

    let current = session.records.get(&identity).map(|r| r.attempt);
    if current != Some(attempt) {
        SUPERSEDED_ATTEMPTS.inc();
        debug!("Dropping stale result of {}", job_id);
        return AttemptOutcome::Superseded;
    }

    let source_label = source.map(|f| f.descriptor().label).unwrap_or("unknown");

    match result {
        Ok(artifact) => {
            let handle = session.artifacts.install(&identity, artifact).await;
            session.total_converted += 1;
            if let Some(record) = session.records.get_mut(&identity) {
                record.status = ConversionStatus::Done;
                record.artifact = Some(handle.clone());
            }

            CONVERSIONS_TOTAL
                .with_label_values(&[source_label, "done"])
                .inc();
            info!(
                "Converted {} to {} ({} bytes of {})",
                file.name(),
                operation,
                handle.size_bytes,
                handle.content_type
            );

            let filename = suggested_filename(file.name(), operation);
            events.emit(ConversionEvent::StatusChanged {
                identity: identity.clone(),
                attempt,
                status: ConversionStatus::Done,
            });
            events.emit(ConversionEvent::Completed {
                identity: identity.clone(),
                attempt,
                operation,
                artifact: handle.clone(),
                filename: filename.clone(),
                total_converted: session.total_converted,
            });
            session.offer(RetrievalOffer {
                identity,
                artifact: handle.clone(),
                filename,
            });
            AttemptOutcome::Done(handle)
        }
        Err(e) => {
            let kind = e.kind();
            if let Some(record) = session.records.get_mut(&identity) {
                record.status = ConversionStatus::Error;
                record.failure = Some(kind);
            }

            CONVERSIONS_TOTAL
                .with_label_values(&[source_label, "error"])
                .inc();
            warn!("Conversion of {} to {} failed: {}", file.name(), operation, e);

            events.emit(ConversionEvent::StatusChanged {
                identity,
                attempt,
                status: ConversionStatus::Error,
            });
            AttemptOutcome::Error(kind)
        }
    }
}
