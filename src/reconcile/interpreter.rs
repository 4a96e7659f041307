use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::chips_serde::chips;
use crate::history::{Chips, HandHistory, Player, PlayerId, Round, SeatId};
use crate::patch::PatchOperation;

/// Why a fragment produced no operation list.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum InterpretError {
    #[error("interpreter timed out after {0} ms")]
    Timeout(u64),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed interpreter response: {0}")]
    MalformedResponse(String),
    #[error("interpreter returned an error: {0}")]
    Upstream(String),
    #[error("interpreter unavailable: {0}")]
    Unavailable(String),
}

/// The parts of the document an interpreter needs to place a fragment:
/// seating, blinds, and the timeline so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateContext {
    pub table_size: u8,
    pub dealer_seat: SeatId,
    pub hero_player_id: PlayerId,
    #[serde(with = "chips")]
    pub small_blind_amount: Chips,
    #[serde(with = "chips")]
    pub big_blind_amount: Chips,
    pub players: Vec<Player>,
    pub rounds: Vec<Round>,
}

impl StateContext {
    pub fn from_hand(hand: &HandHistory) -> Self {
        Self {
            table_size: hand.table_size,
            dealer_seat: hand.dealer_seat,
            hero_player_id: hand.hero_player_id,
            small_blind_amount: hand.small_blind_amount,
            big_blind_amount: hand.big_blind_amount,
            players: hand.players.clone(),
            rounds: hand.rounds.clone(),
        }
    }
}

/// Turns one transcript fragment into edit operations. Implementations are
/// untrusted: whatever they return is applied to a copy and validated first.
#[async_trait]
pub trait FragmentInterpreter: Send + Sync {
    fn name(&self) -> &str;

    /// `prior` holds every earlier fragment in arrival order, failed ones included.
    async fn interpret(
        &self,
        fragment: &str,
        prior: &[String],
        context: &StateContext,
    ) -> Result<Vec<PatchOperation>, InterpretError>;
}
