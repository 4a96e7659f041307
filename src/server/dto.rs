use serde::{Deserialize, Serialize};

use crate::reconcile::{FragmentRecord, StateHash};
use crate::replay::{Cursor, TableSnapshot};

#[derive(Debug, Deserialize)]
pub struct SubmitFragmentRequest {
    pub fragment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitFragmentResponse {
    /// Items waiting in the queue after this one was added.
    pub pending: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub state_hash: StateHash,
    pub fragments: Vec<FragmentRecord>,
    pub in_flight: Option<String>,
    pub pending: Vec<String>,
}

/// Cursor coordinates for `/hand/snapshot`. No coordinates means the end of
/// the hand; a round without an action means the start of that round.
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotQuery {
    pub round: Option<usize>,
    pub action: Option<isize>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub state_hash: StateHash,
    pub cursor: Cursor,
    pub snapshot: TableSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub state_hash: StateHash,
    pub cursors: Vec<Cursor>,
}
