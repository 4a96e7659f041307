//! Common test utilities: serde assertions and hand fixtures.

/// Helpers shared across test modules.
pub mod serde {
    use std::fmt::Debug;

    /// Assert that a value survives a serde_json round-trip using structural equality.
    pub fn assert_round_trip_eq<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned + PartialEq + Debug,
    {
        let json = serde_json::to_string(value)
            .expect("serialization should succeed during round-trip testing");
        let restored: T = serde_json::from_str(&json)
            .expect("deserialization should succeed during round-trip testing");
        assert_eq!(restored, *value, "serde_json round-trip altered the value");
    }

    /// Assert that serde_json emits the same payload before and after round-tripping.
    pub fn assert_round_trip_json<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned,
    {
        let json = serde_json::to_value(value)
            .expect("serialization to value should succeed during round-trip testing");
        let restored: T = serde_json::from_value(json.clone())
            .expect("deserialization from value should succeed during round-trip testing");
        let json_after = serde_json::to_value(restored)
            .expect("re-serialization should succeed during round-trip testing");
        assert_eq!(
            json_after, json,
            "serde_json round-trip altered the payload"
        );
    }
}

/// Hand documents used across the history, replay and reconcile tests.
pub mod fixtures {
    use crate::history::{
        Action, ActionKind, Card, Chips, HandHistory, HandSettings, Player, PlayerId, Pot,
        PlayerWin, Round, RoundId, SeatId, Street,
    };

    pub const FIXED_START: &str = "2024-03-01T20:15:00.000Z";

    pub fn cards(codes: &[&str]) -> Vec<Card> {
        codes
            .iter()
            .map(|code| code.parse().expect("fixture card codes are valid"))
            .collect()
    }

    pub fn player(id: PlayerId, seat: SeatId, stack: Chips) -> Player {
        Player {
            name: format!("P{id}"),
            id,
            starting_stack: stack,
            seat,
            cards: None,
        }
    }

    pub fn action(
        action_number: u32,
        player_id: PlayerId,
        kind: ActionKind,
        amount: Option<Chips>,
    ) -> Action {
        Action {
            action_number,
            player_id,
            action: kind,
            amount,
            is_allin: None,
        }
    }

    pub fn round(id: RoundId, street: Street, board: &[&str], actions: Vec<Action>) -> Round {
        Round {
            id,
            cards: (!board.is_empty()).then(|| cards(board)),
            street,
            actions,
        }
    }

    pub fn empty_hand() -> HandHistory {
        HandHistory::new(HandSettings {
            start_date_utc: Some(FIXED_START.into()),
            ..Default::default()
        })
    }

    /// Two players at 200, blinds posted, seat 1 raises to 7.
    pub fn heads_up_preflop() -> HandHistory {
        use ActionKind::*;

        let mut hand = HandHistory::new(HandSettings {
            table_size: 2,
            start_date_utc: Some(FIXED_START.into()),
            ..Default::default()
        });
        hand.add_player(player(1, 1, 200.0));
        hand.add_player(player(2, 2, 200.0));
        hand.add_round(round(
            0,
            Street::Preflop,
            &[],
            vec![
                action(1, 1, PostSmallBlind, Some(1.0)),
                action(2, 2, PostBigBlind, Some(2.0)),
                action(3, 1, Raise, Some(7.0)),
            ],
        ));
        hand
    }

    /// Three-handed hand played to the river. Seat 1 holds the button and
    /// folds on the flop; seats 2 and 3 go to showdown.
    pub fn three_handed_to_river() -> HandHistory {
        use ActionKind::*;

        let mut hand = HandHistory::new(HandSettings {
            table_size: 3,
            hero_player_id: 1,
            start_date_utc: Some(FIXED_START.into()),
            ..Default::default()
        });
        let mut hero = player(1, 1, 100.0);
        hero.cards = Some(cards(&["Qs", "Jh"]));
        hand.add_player(hero);
        hand.add_player(player(2, 2, 100.0));
        hand.add_player(player(3, 3, 100.0));

        hand.add_round(round(
            0,
            Street::Preflop,
            &[],
            vec![
                action(1, 2, PostSmallBlind, Some(1.0)),
                action(2, 3, PostBigBlind, Some(2.0)),
                action(3, 1, Call, Some(2.0)),
                action(4, 2, Call, Some(2.0)),
                action(5, 3, Check, None),
            ],
        ));
        hand.add_round(round(
            1,
            Street::Flop,
            &["Ah", "Kd", "7c"],
            vec![
                action(6, 2, Check, None),
                action(7, 3, Bet, Some(6.0)),
                action(8, 1, Fold, None),
                action(9, 2, Call, Some(6.0)),
            ],
        ));
        hand.add_round(round(
            2,
            Street::Turn,
            &["Ah", "Kd", "7c", "2s"],
            vec![action(10, 2, Check, None), action(11, 3, Check, None)],
        ));
        hand.add_round(round(
            3,
            Street::River,
            &["Ah", "Kd", "7c", "2s", "9h"],
            vec![action(12, 2, Bet, Some(10.0)), action(13, 3, Call, Some(10.0))],
        ));
        hand.add_pot(Pot {
            rake: None,
            number: 0,
            amount: 38.0,
            player_wins: vec![PlayerWin {
                player_id: 3,
                win_amount: 38.0,
            }],
        });
        hand
    }
}
