//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::input::IdentityScheme;
use crate::planner::BatchPolicy;

/// Configuration for the conversion orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How "convert all" operations are combined across pending files.
    #[serde(default)]
    pub batch_policy: BatchPolicy,

    /// How files are keyed when they join the working set.
    #[serde(default)]
    pub identity_scheme: IdentityScheme,

    /// Buffer size of the event broadcast channel.
    /// Slow subscribers that fall further behind than this miss events.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    256
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_policy: BatchPolicy::default(),
            identity_scheme: IdentityScheme::default(),
            event_capacity: default_event_capacity(),
        }
    }
}
