use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::chips_serde::chips;
use super::types::*;

/// Configuration for a fresh hand. Every field has a default, so callers
/// only name what differs: `HandSettings { table_size: 6, ..Default::default() }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandSettings {
    pub spec_version: String,
    pub internal_version: String,
    pub network_name: String,
    pub site_name: String,
    pub game_type: String,
    pub table_name: String,
    pub table_size: u8,
    pub game_number: String,
    pub start_date_utc: Option<String>,
    pub currency: String,
    #[serde(with = "chips")]
    pub ante_amount: Chips,
    #[serde(with = "chips")]
    pub small_blind_amount: Chips,
    #[serde(with = "chips")]
    pub big_blind_amount: Chips,
    #[serde(with = "chips")]
    pub bet_cap: Chips,
    pub bet_type: String,
    pub dealer_seat: SeatId,
    pub hero_player_id: PlayerId,
}

impl Default for HandSettings {
    fn default() -> Self {
        Self {
            spec_version: "1.4.6".into(),
            internal_version: "1.4.6".into(),
            network_name: "CustomGame".into(),
            site_name: "HomeGame".into(),
            game_type: "Holdem".into(),
            table_name: "Sample Table".into(),
            table_size: 8,
            game_number: "1".into(),
            start_date_utc: None,
            currency: "Chips".into(),
            ante_amount: 0.0,
            small_blind_amount: 1.0,
            big_blind_amount: 2.0,
            bet_cap: 0.0,
            bet_type: "NL".into(),
            dealer_seat: 1,
            hero_player_id: 0,
        }
    }
}

impl HandHistory {
    pub fn new(settings: HandSettings) -> Self {
        let start_date_utc = settings
            .start_date_utc
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        Self {
            spec_version: settings.spec_version,
            internal_version: settings.internal_version,
            network_name: settings.network_name,
            site_name: settings.site_name,
            game_type: settings.game_type,
            table_name: settings.table_name,
            table_size: settings.table_size,
            game_number: settings.game_number,
            start_date_utc,
            currency: settings.currency,
            ante_amount: settings.ante_amount,
            small_blind_amount: settings.small_blind_amount,
            big_blind_amount: settings.big_blind_amount,
            bet_limit: BetLimit {
                bet_cap: settings.bet_cap,
                bet_type: settings.bet_type,
            },
            dealer_seat: settings.dealer_seat,
            hero_player_id: settings.hero_player_id,
            players: Vec::new(),
            rounds: Vec::new(),
            pots: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn add_round(&mut self, round: Round) {
        self.rounds.push(round);
    }

    /// Appends to the round with the given id. Returns `false` when no such round exists.
    pub fn add_action_to_round(&mut self, round_id: RoundId, action: Action) -> bool {
        match self.rounds.iter_mut().find(|r| r.id == round_id) {
            Some(round) => {
                round.actions.push(action);
                true
            }
            None => false,
        }
    }

    pub fn add_pot(&mut self, pot: Pot) {
        self.pots.push(pot);
    }

    /// Wraps the document in the `{"ohh": ...}` envelope used for interchange.
    pub fn to_ohh_json(&self) -> serde_json::Result<Value> {
        let mut envelope = Map::new();
        envelope.insert("ohh".into(), serde_json::to_value(self)?);
        Ok(Value::Object(envelope))
    }

    /// Accepts either the enveloped form or a bare document.
    pub fn from_ohh_json(value: Value) -> serde_json::Result<Self> {
        match value {
            Value::Object(mut map) if map.len() == 1 && map.contains_key("ohh") => {
                let inner = map.remove("ohh").unwrap_or(Value::Null);
                serde_json::from_value(inner)
            }
            other => serde_json::from_value(other),
        }
    }
}

impl Default for HandHistory {
    fn default() -> Self {
        Self::new(HandSettings::default())
    }
}
