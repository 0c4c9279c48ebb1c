pub mod artifact;
pub mod config;
pub mod converter;
pub mod download;
pub mod events;
pub mod format;
pub mod input;
pub mod metrics;
pub mod orchestrator;
pub mod planner;
pub mod testing;

pub use artifact::{ArtifactHandle, ArtifactLifecycle, ArtifactStore, MemoryArtifactStore};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError,
};
pub use converter::{Artifact, ConversionError, Converter, FailureKind, StrategyConverter};
pub use download::{DirectoryRetriever, DownloadTrigger, OutputConfig, RetrievalOffer, Retriever};
pub use events::{ConversionEvent, EventBus};
pub use format::{detect, FormatId, Operation};
pub use input::{FileIdentity, IdentityScheme, InputFile};
pub use orchestrator::{
    AttemptOutcome, ConversionOrchestrator, ConversionRecord, ConversionStatus,
    OrchestratorConfig, OrchestratorError,
};
pub use planner::BatchPolicy;
