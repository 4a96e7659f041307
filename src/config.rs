use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the reconciliation loop treats error-severity validation findings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Reject the batch.
    #[default]
    Strict,
    /// Log and commit anyway.
    Permissive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Initial capacity of the fragment queue; it grows past this.
    pub queue_capacity: usize,
    /// Buffer of the outbound event channel. Slow subscribers lag past it.
    pub event_capacity: usize,
    /// Upper bound on one interpreter call. Elapsing counts as an
    /// interpretation failure.
    pub interpreter_timeout: Duration,
    pub validation: ValidationPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            event_capacity: 256,
            interpreter_timeout: Duration::from_secs(30),
            validation: ValidationPolicy::Strict,
        }
    }
}
