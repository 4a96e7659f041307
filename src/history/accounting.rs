use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{Chips, HandHistory, PlayerId};

/// Chips each player has put into the pot over the whole hand.
///
/// Amounts are absolute totals per street, so a player's contribution on a
/// street is the amount on their last monetary action of that street.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PotAccounting {
    contributions: BTreeMap<PlayerId, Chips>,
}

impl PotAccounting {
    pub fn from_hand(hand: &HandHistory) -> Self {
        let mut contributions: BTreeMap<PlayerId, Chips> = BTreeMap::new();

        for round in &hand.rounds {
            let mut street: BTreeMap<PlayerId, Chips> = BTreeMap::new();
            for action in &round.actions {
                if !action.action.is_monetary() {
                    continue;
                }
                if let Some(amount) = action.amount {
                    street.insert(action.player_id, amount);
                }
            }
            for (player_id, amount) in street {
                let total = contributions.entry(player_id).or_default();
                *total += amount;
            }
        }

        Self { contributions }
    }

    pub fn contribution(&self, player_id: PlayerId) -> Chips {
        self.contributions.get(&player_id).copied().unwrap_or(0.0)
    }

    pub fn contributions(&self) -> &BTreeMap<PlayerId, Chips> {
        &self.contributions
    }

    pub fn total(&self) -> Chips {
        self.contributions.values().sum()
    }

    /// The most `player_id` can take down: everything they matched from each
    /// contributor, their own chips included.
    pub fn winnable_by(&self, player_id: PlayerId) -> Chips {
        let own = self.contribution(player_id);
        self.contributions
            .values()
            .map(|amount| amount.min(own))
            .sum()
    }
}
