use serde::Serialize;

use super::hash::StateHash;
use super::history::{FragmentOutcome, FragmentRecord};
use super::interpreter::InterpretError;
use super::reconciler::StageError;
use crate::patch::PatchOperation;
use crate::replay::Cursor;

/// Broadcast after every step of the reconciliation worker.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconcileEvent {
    Committed {
        sequence: u64,
        fragment: String,
        operations: Vec<PatchOperation>,
        state_hash: StateHash,
        change: Option<Cursor>,
    },
    Unchanged {
        sequence: u64,
        fragment: String,
    },
    InterpretFailed {
        sequence: u64,
        fragment: String,
        reason: InterpretError,
    },
    Rejected {
        sequence: u64,
        fragment: String,
        error: StageError,
    },
    Reset {
        state_hash: StateHash,
    },
}

impl ReconcileEvent {
    pub fn sequence(&self) -> Option<u64> {
        match self {
            ReconcileEvent::Committed { sequence, .. }
            | ReconcileEvent::Unchanged { sequence, .. }
            | ReconcileEvent::InterpretFailed { sequence, .. }
            | ReconcileEvent::Rejected { sequence, .. } => Some(*sequence),
            ReconcileEvent::Reset { .. } => None,
        }
    }
}

impl From<&FragmentRecord> for ReconcileEvent {
    fn from(record: &FragmentRecord) -> Self {
        let sequence = record.sequence;
        let fragment = record.fragment.clone();
        match &record.outcome {
            FragmentOutcome::Committed {
                operations,
                state_hash,
                change,
            } => ReconcileEvent::Committed {
                sequence,
                fragment,
                operations: operations.clone(),
                state_hash: *state_hash,
                change: *change,
            },
            FragmentOutcome::NoOp => ReconcileEvent::Unchanged { sequence, fragment },
            FragmentOutcome::InterpretFailed { reason } => ReconcileEvent::InterpretFailed {
                sequence,
                fragment,
                reason: reason.clone(),
            },
            FragmentOutcome::Rejected { error, .. } => ReconcileEvent::Rejected {
                sequence,
                fragment,
                error: error.clone(),
            },
        }
    }
}
