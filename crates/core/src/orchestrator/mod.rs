//! Conversion orchestrator for the per-file state machine.
//!
//! The orchestrator owns the session's working set and drives each file
//! through its states:
//! - **Idle**: added, never requested
//! - **Converting**: an attempt task is running (set before the request returns)
//! - **Done** / **Error**: the latest attempt finished
//!
//! Failures never escape an attempt; they are recorded on the file's
//! [`ConversionRecord`] and published as events.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::ConversionOrchestrator;
pub use types::{
    wait_all, AttemptOutcome, ConversionAttempt, ConversionRecord, ConversionStatus,
    OrchestratorError,
};
