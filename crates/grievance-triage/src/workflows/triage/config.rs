use serde::{Deserialize, Serialize};

pub const DEFAULT_REASSIGN_BATCH_SIZE: usize = 200;

/// Tuning for the triage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Reports fetched per page during bulk reassignment.
    pub reassign_batch_size: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            reassign_batch_size: DEFAULT_REASSIGN_BATCH_SIZE,
        }
    }
}
