use parking_lot::RwLock;
use serde::Serialize;

use super::hash::StateHash;
use super::history::FragmentLog;
use crate::history::HandHistory;

/// Everything a reader may ask about the hand at one instant.
#[derive(Clone, Debug, Serialize)]
pub struct PublishedHand {
    pub document: HandHistory,
    pub state_hash: StateHash,
    pub log: FragmentLog,
    /// The fragment the worker is currently interpreting, if any.
    pub in_flight: Option<String>,
}

/// Read side of the reconciliation loop. Only the worker writes, and it
/// swaps document, hash and log in a single write.
pub struct HandState {
    inner: RwLock<PublishedHand>,
}

impl HandState {
    pub fn new(document: HandHistory, state_hash: StateHash) -> Self {
        Self {
            inner: RwLock::new(PublishedHand {
                document,
                state_hash,
                log: FragmentLog::new(),
                in_flight: None,
            }),
        }
    }

    pub fn current(&self) -> PublishedHand {
        self.inner.read().clone()
    }

    pub fn document(&self) -> HandHistory {
        self.inner.read().document.clone()
    }

    pub fn state_hash(&self) -> StateHash {
        self.inner.read().state_hash
    }

    pub fn log(&self) -> FragmentLog {
        self.inner.read().log.clone()
    }

    pub fn in_flight(&self) -> Option<String> {
        self.inner.read().in_flight.clone()
    }

    pub(crate) fn begin(&self, fragment: &str) {
        self.inner.write().in_flight = Some(fragment.to_owned());
    }

    pub(crate) fn publish(&self, document: HandHistory, state_hash: StateHash, log: FragmentLog) {
        *self.inner.write() = PublishedHand {
            document,
            state_hash,
            log,
            in_flight: None,
        };
    }
}
