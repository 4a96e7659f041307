use chrono::{DateTime, Utc};
use serde::Serialize;

use super::hash::StateHash;
use super::interpreter::InterpretError;
use super::reconciler::StageError;
use crate::patch::PatchOperation;
use crate::replay::Cursor;

/// What became of one fragment.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FragmentOutcome {
    Committed {
        operations: Vec<PatchOperation>,
        state_hash: StateHash,
        /// Earliest timeline position the batch touched.
        change: Option<Cursor>,
    },
    /// The interpreter returned no operations.
    NoOp,
    InterpretFailed { reason: InterpretError },
    Rejected {
        operations: Vec<PatchOperation>,
        error: StageError,
    },
}

impl FragmentOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, FragmentOutcome::Committed { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FragmentOutcome::InterpretFailed { .. } | FragmentOutcome::Rejected { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            FragmentOutcome::Committed { .. } => "committed",
            FragmentOutcome::NoOp => "no-op",
            FragmentOutcome::InterpretFailed { .. } => "interpret-failed",
            FragmentOutcome::Rejected { .. } => "rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FragmentRecord {
    /// Position in arrival order, starting at 0 and reset with the hand.
    pub sequence: u64,
    pub fragment: String,
    pub received_at: DateTime<Utc>,
    pub outcome: FragmentOutcome,
}

/// Append-only log of every fragment seen since the last reset, whatever
/// its outcome. Failed fragments stay visible to later interpretation.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct FragmentLog {
    records: Vec<FragmentRecord>,
}

impl FragmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn append(&mut self, record: FragmentRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FragmentRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&FragmentRecord> {
        self.records.last()
    }

    /// Fragment texts in arrival order, as handed to the interpreter.
    pub fn fragments(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|record| record.fragment.clone())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FragmentRecord> {
        self.records
            .iter()
            .filter(|record| record.outcome.is_failure())
    }
}
