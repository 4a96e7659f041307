use std::fmt;

use serde::{Deserialize, Serialize};

use crate::history::HandHistory;

/// A point in the replay timeline. `action_idx == -1` sits between the deal
/// of the round's board and its first action.
///
/// Ordering is lexicographic on `(round_idx, action_idx)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub round_idx: usize,
    pub action_idx: isize,
}

impl Cursor {
    pub const START: Cursor = Cursor {
        round_idx: 0,
        action_idx: -1,
    };

    pub const fn new(round_idx: usize, action_idx: isize) -> Self {
        Self {
            round_idx,
            action_idx,
        }
    }

    pub fn is_start_of_round(&self) -> bool {
        self.action_idx < 0
    }

    /// The next step: the following action in this round, else the start of
    /// the next round. `None` at the end of the hand.
    pub fn next(self, hand: &HandHistory) -> Option<Cursor> {
        if let Some(round) = hand.rounds.get(self.round_idx) {
            if self.action_idx + 1 < len_isize(round.actions.len()) {
                return Some(Cursor::new(self.round_idx, self.action_idx + 1));
            }
        }
        if self.round_idx + 1 < hand.rounds.len() {
            return Some(Cursor::new(self.round_idx + 1, -1));
        }
        None
    }

    /// The previous step: the preceding action in this round, else the last
    /// action of the previous round. `None` at the hand start.
    pub fn prev(self, hand: &HandHistory) -> Option<Cursor> {
        if self.action_idx > -1 {
            return Some(Cursor::new(self.round_idx, self.action_idx - 1));
        }
        if self.round_idx > 0 {
            let previous = self.round_idx - 1;
            return Some(Cursor::new(previous, last_action_idx(hand, previous)));
        }
        None
    }

    /// Nearest valid cursor. A hand without rounds only has [`Cursor::START`].
    pub fn clamp(self, hand: &HandHistory) -> Cursor {
        let Some(last_round) = hand.rounds.len().checked_sub(1) else {
            return Cursor::START;
        };
        if self.round_idx > last_round {
            return Cursor::new(last_round, last_action_idx(hand, last_round));
        }
        let last_action = last_action_idx(hand, self.round_idx);
        Cursor::new(self.round_idx, self.action_idx.clamp(-1, last_action))
    }

    pub fn is_valid(self, hand: &HandHistory) -> bool {
        self.clamp(hand) == self
    }

    /// The final position of the hand.
    pub fn end(hand: &HandHistory) -> Cursor {
        Cursor::new(usize::MAX, isize::MAX).clamp(hand)
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::START
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.round_idx, self.action_idx)
    }
}

/// Every cursor from the start to the end of the hand, in order.
pub fn timeline(hand: &HandHistory) -> Vec<Cursor> {
    let mut cursors = vec![Cursor::START];
    let mut current = Cursor::START;
    while let Some(next) = current.next(hand) {
        cursors.push(next);
        current = next;
    }
    cursors
}

fn last_action_idx(hand: &HandHistory, round_idx: usize) -> isize {
    hand.rounds
        .get(round_idx)
        .map(|round| len_isize(round.actions.len()) - 1)
        .unwrap_or(-1)
}

fn len_isize(len: usize) -> isize {
    isize::try_from(len).unwrap_or(isize::MAX)
}
