use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::card::Card;
use super::chips_serde::{chips, optional_chips};

/// Chip or currency amount. Non-negative and possibly fractional (0.25/0.50 games).
pub type Chips = f64;
pub type SeatId = u8; // 1..=table_size
pub type PlayerId = u64; // stable for the hand
pub type RoundId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    pub fn as_str(self) -> &'static str {
        match self {
            Street::Preflop => "Preflop",
            Street::Flop => "Flop",
            Street::Turn => "Turn",
            Street::River => "River",
            Street::Showdown => "Showdown",
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "Dealt Card")]
    DealtCard,
    #[serde(rename = "Post SB")]
    PostSmallBlind,
    #[serde(rename = "Post BB")]
    PostBigBlind,
    Fold,
    Check,
    Bet,
    Raise,
    Call,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::DealtCard => "Dealt Card",
            ActionKind::PostSmallBlind => "Post SB",
            ActionKind::PostBigBlind => "Post BB",
            ActionKind::Fold => "Fold",
            ActionKind::Check => "Check",
            ActionKind::Bet => "Bet",
            ActionKind::Raise => "Raise",
            ActionKind::Call => "Call",
        }
    }

    /// Actions whose amount is the player's running total for the street.
    pub fn is_monetary(self) -> bool {
        matches!(
            self,
            ActionKind::PostSmallBlind
                | ActionKind::PostBigBlind
                | ActionKind::Bet
                | ActionKind::Raise
                | ActionKind::Call
        )
    }

    /// Actions that take a turn in the clockwise betting order.
    pub fn takes_turn(self) -> bool {
        !matches!(self, ActionKind::DealtCard)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub id: PlayerId,
    #[serde(with = "chips")]
    pub starting_stack: Chips,
    pub seat: SeatId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_number: u32,
    pub player_id: PlayerId,
    pub action: ActionKind,
    /// Total the player has put in on this street once the action completes.
    #[serde(default, with = "optional_chips", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Chips>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_allin: Option<bool>,
}

impl Action {
    pub fn is_allin(&self) -> bool {
        self.is_allin.unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    /// Full board as of this street, not just the cards it added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
    pub street: Street,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Round {
    pub fn board(&self) -> &[Card] {
        self.cards.as_deref().unwrap_or(&[])
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerWin {
    pub player_id: PlayerId,
    #[serde(with = "chips")]
    pub win_amount: Chips,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pot {
    #[serde(default, with = "optional_chips", skip_serializing_if = "Option::is_none")]
    pub rake: Option<Chips>,
    pub number: u32,
    #[serde(with = "chips")]
    pub amount: Chips,
    #[serde(default)]
    pub player_wins: Vec<PlayerWin>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BetLimit {
    #[serde(with = "chips")]
    pub bet_cap: Chips,
    pub bet_type: String,
}

/// The canonical record of one hand, in Open Hand History field naming.
///
/// This is a plain serializable record; invariants are checked by
/// [`super::validation::validate`] before a reconciled copy is committed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandHistory {
    pub spec_version: String,
    pub internal_version: String,
    pub network_name: String,
    pub site_name: String,
    pub game_type: String,
    pub table_name: String,
    pub table_size: u8,
    pub game_number: String,
    pub start_date_utc: String,
    pub currency: String,
    #[serde(with = "chips")]
    pub ante_amount: Chips,
    #[serde(with = "chips")]
    pub small_blind_amount: Chips,
    #[serde(with = "chips")]
    pub big_blind_amount: Chips,
    pub bet_limit: BetLimit,
    pub dealer_seat: SeatId,
    /// `0` until the hero is identified.
    pub hero_player_id: PlayerId,
    pub players: Vec<Player>,
    pub rounds: Vec<Round>,
    pub pots: Vec<Pot>,
    /// Top-level fields this crate does not model, carried through as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HandHistory {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_at_seat(&self, seat: SeatId) -> Option<&Player> {
        self.players.iter().find(|p| p.seat == seat)
    }

    pub fn hero(&self) -> Option<&Player> {
        self.player(self.hero_player_id)
    }

    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.rounds.iter().find(|r| r.id == id)
    }

    pub fn action_count(&self) -> usize {
        self.rounds.iter().map(|r| r.actions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serde::{assert_round_trip_eq, assert_round_trip_json};

    #[test]
    fn enums_use_hand_history_spelling() {
        assert_eq!(
            serde_json::to_string(&ActionKind::PostBigBlind).unwrap(),
            "\"Post BB\""
        );
        assert_eq!(
            serde_json::to_string(&ActionKind::DealtCard).unwrap(),
            "\"Dealt Card\""
        );
        assert_eq!(serde_json::to_string(&Street::River).unwrap(), "\"River\"");
        assert_round_trip_eq(&ActionKind::Raise);
        assert_round_trip_eq(&Street::Showdown);
    }

    #[test]
    fn streets_are_ordered_chronologically() {
        assert!(Street::Preflop < Street::Flop);
        assert!(Street::Turn < Street::River);
        assert!(Street::River < Street::Showdown);
    }

    #[test]
    fn optional_fields_are_omitted_and_restored() {
        let action = Action {
            action_number: 3,
            player_id: 4,
            action: ActionKind::Check,
            amount: None,
            is_allin: None,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("amount").is_none());
        assert!(json.get("is_allin").is_none());
        assert_round_trip_eq(&action);
    }

    #[test]
    fn unknown_top_level_fields_pass_through() {
        let mut json = serde_json::to_value(HandHistory::default()).unwrap();
        json["tournament_info"] = serde_json::json!({ "buyin": 10 });
        let history: HandHistory = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(history.extra["tournament_info"]["buyin"], 10);
        assert_round_trip_json(&history);
        assert_eq!(serde_json::to_value(&history).unwrap(), json);
    }

    #[test]
    fn rounds_default_to_no_actions() {
        let round: Round =
            serde_json::from_value(serde_json::json!({ "id": 1, "street": "Flop" })).unwrap();
        assert!(round.actions.is_empty());
        assert!(round.board().is_empty());
    }
}
