use std::time::Duration;

use tracing::debug;

use super::cursor::Cursor;
use super::locator::locate_earliest_change;
use super::snapshot::{compute_snapshot, TableSnapshot};
use crate::history::HandHistory;
use crate::patch::PatchOperation;

const LOG_TARGET: &str = "voice_hand_history::replay::playback";

pub const DEFAULT_TICK: Duration = Duration::from_millis(800);

/// Replay position plus the auto-play flag that walks it forward after each
/// commit. Holds no document; every call takes the current one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Playback {
    cursor: Cursor,
    playing: bool,
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Jumps to the earliest position a committed batch touched and starts
    /// auto-play from there. Empty batches leave playback alone.
    pub fn follow_commit(&mut self, hand: &HandHistory, operations: &[PatchOperation]) -> Cursor {
        if let Some(cursor) = locate_earliest_change(hand, operations) {
            debug!(target: LOG_TARGET, %cursor, "following committed change");
            self.cursor = cursor;
            self.playing = true;
        }
        self.cursor
    }

    /// One auto-play step. Returns `false` once playback has stopped.
    pub fn tick(&mut self, hand: &HandHistory) -> bool {
        if !self.playing {
            return false;
        }
        self.sync_bounds(hand);
        match self.cursor.next(hand) {
            Some(next) => {
                self.cursor = next;
                true
            }
            None => {
                debug!(target: LOG_TARGET, cursor = %self.cursor, "reached end of hand");
                self.playing = false;
                false
            }
        }
    }

    pub fn step_forward(&mut self, hand: &HandHistory) -> Option<Cursor> {
        self.playing = false;
        self.sync_bounds(hand);
        let next = self.cursor.next(hand)?;
        self.cursor = next;
        Some(next)
    }

    pub fn step_back(&mut self, hand: &HandHistory) -> Option<Cursor> {
        self.playing = false;
        self.sync_bounds(hand);
        let prev = self.cursor.prev(hand)?;
        self.cursor = prev;
        Some(prev)
    }

    pub fn seek(&mut self, hand: &HandHistory, cursor: Cursor) -> Cursor {
        self.playing = false;
        self.cursor = cursor.clamp(hand);
        self.cursor
    }

    /// Re-anchors the cursor after the document changed underneath it. A
    /// vanished round sends the cursor back to the hand start.
    pub fn sync_bounds(&mut self, hand: &HandHistory) {
        if self.cursor.round_idx >= hand.rounds.len() {
            self.cursor = Cursor::START;
        } else {
            self.cursor = self.cursor.clamp(hand);
        }
    }

    pub fn snapshot(&self, hand: &HandHistory) -> TableSnapshot {
        compute_snapshot(hand, self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::*;
    use serde_json::json;

    #[test]
    fn commit_starts_autoplay_from_the_change() {
        let hand = three_handed_to_river();
        let ops: Vec<PatchOperation> = serde_json::from_value(json!([
            { "op": "add", "path": "/rounds/3/actions/-", "value": {} }
        ]))
        .unwrap();

        let mut playback = Playback::new();
        assert_eq!(playback.follow_commit(&hand, &ops), Cursor::new(3, 1));
        assert!(playback.is_playing());
        assert!(!playback.tick(&hand));
        assert!(!playback.is_playing());
    }

    #[test]
    fn ticks_walk_to_the_end_and_stop() {
        let hand = three_handed_to_river();
        let mut playback = Playback::new();
        playback.play();
        let mut steps = 0;
        while playback.tick(&hand) {
            steps += 1;
        }
        assert_eq!(steps, hand.rounds.len() + hand.action_count() - 1);
        assert_eq!(playback.cursor(), Cursor::end(&hand));
    }

    #[test]
    fn manual_navigation_pauses() {
        let hand = three_handed_to_river();
        let mut playback = Playback::new();
        playback.play();
        assert_eq!(playback.step_forward(&hand), Some(Cursor::new(0, 0)));
        assert!(!playback.is_playing());
        assert_eq!(playback.step_back(&hand), Some(Cursor::START));
        assert_eq!(playback.step_back(&hand), None);

        playback.play();
        assert_eq!(playback.seek(&hand, Cursor::new(2, 99)), Cursor::new(2, 1));
        assert!(!playback.is_playing());
        assert!(!playback.tick(&hand));
    }

    #[test]
    fn shrinking_document_resets_to_start() {
        let mut hand = three_handed_to_river();
        let mut playback = Playback::new();
        playback.seek(&hand, Cursor::new(3, 0));
        hand.rounds.truncate(2);
        playback.sync_bounds(&hand);
        assert_eq!(playback.cursor(), Cursor::START);

        playback.seek(&hand, Cursor::new(1, 3));
        hand.rounds[1].actions.truncate(1);
        playback.sync_bounds(&hand);
        assert_eq!(playback.cursor(), Cursor::new(1, 0));
    }

    #[test]
    fn snapshot_tracks_the_cursor() {
        let hand = heads_up_preflop();
        let mut playback = Playback::new();
        playback.seek(&hand, Cursor::new(0, 2));
        assert_eq!(playback.snapshot(&hand).seat(1).unwrap().stack, 193.0);
    }
}
