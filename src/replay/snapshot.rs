use std::collections::BTreeMap;

use serde::Serialize;

use super::cursor::Cursor;
use crate::history::chips_serde::{chips, signed_chips};
use crate::history::{Action, ActionKind, Card, Chips, HandHistory, PlayerId, SeatId, Street};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub seat: SeatId,
    #[serde(serialize_with = "chips::serialize")]
    pub starting_stack: Chips,
    /// May go negative so that over-commits in a bad recording still add up.
    #[serde(serialize_with = "signed_chips::serialize")]
    pub stack: f64,
    /// Chips in front of the player on the current street.
    #[serde(serialize_with = "signed_chips::serialize")]
    pub wager: f64,
    pub folded: bool,
    /// Known hole cards; `None` once mucked.
    pub cards: Option<Vec<Card>>,
    pub last_action: Option<String>,
    pub is_next_to_act: bool,
}

/// The table as it looks at one cursor position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub cursor: Cursor,
    #[serde(serialize_with = "signed_chips::serialize")]
    pub pot: f64,
    pub board: Vec<Card>,
    /// Sorted by seat.
    pub players: Vec<PlayerSnapshot>,
    pub street: Street,
    pub dealer_seat: SeatId,
    pub next_to_act: Option<PlayerId>,
    pub hand_complete: bool,
}

impl TableSnapshot {
    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn seat(&self, seat: SeatId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.seat == seat)
    }

    /// Pot plus everything still in front of players.
    pub fn chips_in_play(&self) -> f64 {
        self.pot + self.players.iter().map(|p| p.wager).sum::<f64>()
    }
}

/// Replays `hand` from the start up to and including `cursor`. The cursor is
/// clamped first, so any position is accepted.
pub fn compute_snapshot(hand: &HandHistory, cursor: Cursor) -> TableSnapshot {
    let cursor = cursor.clamp(hand);

    let mut players: BTreeMap<PlayerId, PlayerSnapshot> = hand
        .players
        .iter()
        .map(|p| {
            let snapshot = PlayerSnapshot {
                id: p.id,
                name: p.name.clone(),
                seat: p.seat,
                starting_stack: p.starting_stack,
                stack: p.starting_stack,
                wager: 0.0,
                folded: false,
                cards: p.cards.clone(),
                last_action: None,
                is_next_to_act: false,
            };
            (p.id, snapshot)
        })
        .collect();
    let mut pot = 0.0;
    let mut board: Vec<Card> = Vec::new();

    for (round_idx, round) in hand.rounds.iter().enumerate().take(cursor.round_idx + 1) {
        if round_idx > 0 {
            for player in players.values_mut() {
                pot += player.wager;
                player.wager = 0.0;
                player.last_action = None;
            }
            for card in round.board() {
                if !board.contains(card) {
                    board.push(*card);
                }
            }
        }

        let replayed = if round_idx == cursor.round_idx {
            usize::try_from(cursor.action_idx + 1).unwrap_or(0)
        } else {
            round.actions.len()
        };
        for action in round.actions.iter().take(replayed) {
            if let Some(player) = players.get_mut(&action.player_id) {
                apply_action(player, action);
            }
        }
    }

    let current = hand.rounds.get(cursor.round_idx);
    let next_idx = usize::try_from(cursor.action_idx + 1).unwrap_or(0);
    let next_to_act = current
        .and_then(|round| round.actions.get(next_idx))
        .map(|action| action.player_id);
    let hand_complete = current.is_some()
        && next_to_act.is_none()
        && cursor.round_idx + 1 >= hand.rounds.len();

    if let Some(id) = next_to_act {
        if let Some(player) = players.get_mut(&id) {
            player.is_next_to_act = true;
        }
    }

    let mut players: Vec<PlayerSnapshot> = players.into_values().collect();
    players.sort_by_key(|p| (p.seat, p.id));

    TableSnapshot {
        cursor,
        pot,
        board,
        players,
        street: current.map(|r| r.street).unwrap_or(Street::Preflop),
        dealer_seat: hand.dealer_seat,
        next_to_act,
        hand_complete,
    }
}

fn apply_action(player: &mut PlayerSnapshot, action: &Action) {
    match action.action {
        ActionKind::Fold => {
            player.folded = true;
            player.cards = None;
        }
        kind if kind.is_monetary() => {
            if let Some(total) = action.amount {
                player.stack -= total - player.wager;
                player.wager = total;
            }
        }
        _ => {}
    }
    player.last_action = Some(action_label(action));
}

fn action_label(action: &Action) -> String {
    match (action.action, action.amount) {
        (ActionKind::Bet | ActionKind::Raise, Some(amount)) => {
            format!("{} {}", action.action, amount)
        }
        (kind, _) => kind.to_string(),
    }
}
