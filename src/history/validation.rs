use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use super::card::Card;
use super::types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A single finding from [`validate`]. Errors describe documents that the
/// replay engine cannot interpret consistently; warnings describe sloppy but
/// replayable recordings.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    #[error("table size {table_size} is below 2")]
    TableTooSmall { table_size: u8 },
    #[error("dealer seat {dealer_seat} is outside 1..={table_size}")]
    DealerSeatOutOfRange { dealer_seat: SeatId, table_size: u8 },
    #[error("player id {player_id} appears more than once")]
    DuplicatePlayerId { player_id: PlayerId },
    #[error("player {player_id} sits in seat {seat}, outside 1..={table_size}")]
    SeatOutOfRange {
        player_id: PlayerId,
        seat: SeatId,
        table_size: u8,
    },
    #[error("seat {seat} is held by both player {first} and player {second}")]
    SeatTaken {
        seat: SeatId,
        first: PlayerId,
        second: PlayerId,
    },
    #[error("round {round_index} has id {id}, not greater than the previous id {previous}")]
    RoundIdNotIncreasing {
        round_index: usize,
        id: RoundId,
        previous: RoundId,
    },
    #[error("round {round_index} is {street}, which does not follow {previous}")]
    StreetRegressed {
        round_index: usize,
        street: Street,
        previous: Street,
    },
    #[error("round {round_index} board does not extend the earlier board")]
    BoardNotExtended { round_index: usize },
    #[error("round {round_index} action {action_index} names unknown player {player_id}")]
    UnknownActionPlayer {
        round_index: usize,
        action_index: usize,
        player_id: PlayerId,
    },
    #[error("hero player {hero_player_id} is not seated")]
    UnknownHero { hero_player_id: PlayerId },
    #[error("round {round_index} action {action_index}: player {player_id} acts after folding")]
    ActedAfterFold {
        round_index: usize,
        action_index: usize,
        player_id: PlayerId,
    },
    #[error("round {round_index} action {action_index} skips seat {skipped_seat} without a fold")]
    RotationGap {
        round_index: usize,
        action_index: usize,
        skipped_seat: SeatId,
    },
    #[error(
        "round {round_index} action {action_index}: player {player_id} puts in more than their starting stack"
    )]
    AmountExceedsStack {
        round_index: usize,
        action_index: usize,
        player_id: PlayerId,
    },
    #[error("round {round_index} action {action_index} is {action} without an amount")]
    MissingAmount {
        round_index: usize,
        action_index: usize,
        action: ActionKind,
    },
}

impl Violation {
    pub fn severity(&self) -> Severity {
        match self {
            Violation::UnknownHero { .. }
            | Violation::ActedAfterFold { .. }
            | Violation::RotationGap { .. }
            | Violation::MissingAmount { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity() == Severity::Warning)
    }
}

/// Checks the structural invariants of a hand. Never panics on malformed input.
pub fn validate(hand: &HandHistory) -> ValidationReport {
    let mut violations = Vec::new();
    check_table(hand, &mut violations);
    check_players(hand, &mut violations);
    check_rounds(hand, &mut violations);
    check_actions(hand, &mut violations);
    ValidationReport { violations }
}

fn check_table(hand: &HandHistory, out: &mut Vec<Violation>) {
    if hand.table_size < 2 {
        out.push(Violation::TableTooSmall {
            table_size: hand.table_size,
        });
    }
    if !seat_in_range(hand.dealer_seat, hand.table_size) {
        out.push(Violation::DealerSeatOutOfRange {
            dealer_seat: hand.dealer_seat,
            table_size: hand.table_size,
        });
    }
    if hand.hero_player_id != 0 && hand.hero().is_none() {
        out.push(Violation::UnknownHero {
            hero_player_id: hand.hero_player_id,
        });
    }
}

fn check_players(hand: &HandHistory, out: &mut Vec<Violation>) {
    let mut ids = BTreeSet::new();
    let mut seats: BTreeMap<SeatId, PlayerId> = BTreeMap::new();

    for player in &hand.players {
        if !ids.insert(player.id) {
            out.push(Violation::DuplicatePlayerId {
                player_id: player.id,
            });
        }
        if !seat_in_range(player.seat, hand.table_size) {
            out.push(Violation::SeatOutOfRange {
                player_id: player.id,
                seat: player.seat,
                table_size: hand.table_size,
            });
        }
        if let Some(&first) = seats.get(&player.seat) {
            out.push(Violation::SeatTaken {
                seat: player.seat,
                first,
                second: player.id,
            });
        } else {
            seats.insert(player.seat, player.id);
        }
    }
}

fn check_rounds(hand: &HandHistory, out: &mut Vec<Violation>) {
    let mut board: Option<&[Card]> = None;

    for (round_index, round) in hand.rounds.iter().enumerate() {
        if round_index > 0 {
            let previous = &hand.rounds[round_index - 1];
            if round.id <= previous.id {
                out.push(Violation::RoundIdNotIncreasing {
                    round_index,
                    id: round.id,
                    previous: previous.id,
                });
            }
            if round.street <= previous.street {
                out.push(Violation::StreetRegressed {
                    round_index,
                    street: round.street,
                    previous: previous.street,
                });
            }
        }

        let cards = round.board();
        if cards.is_empty() {
            continue;
        }
        if let Some(earlier) = board {
            if !cards.starts_with(earlier) {
                out.push(Violation::BoardNotExtended { round_index });
            }
        }
        board = Some(cards);
    }
}

fn check_actions(hand: &HandHistory, out: &mut Vec<Violation>) {
    let mut folded: BTreeSet<PlayerId> = BTreeSet::new();
    let mut all_in: BTreeSet<PlayerId> = BTreeSet::new();

    for (round_index, round) in hand.rounds.iter().enumerate() {
        // Post-flop action starts left of the button.
        let mut last_seat = if round.street != Street::Preflop && round_index > 0 {
            Some(hand.dealer_seat)
        } else {
            None
        };

        for (action_index, action) in round.actions.iter().enumerate() {
            let Some(player) = hand.player(action.player_id) else {
                out.push(Violation::UnknownActionPlayer {
                    round_index,
                    action_index,
                    player_id: action.player_id,
                });
                continue;
            };

            if folded.contains(&player.id) {
                out.push(Violation::ActedAfterFold {
                    round_index,
                    action_index,
                    player_id: player.id,
                });
            }
            if action.action.is_monetary() {
                match action.amount {
                    None => out.push(Violation::MissingAmount {
                        round_index,
                        action_index,
                        action: action.action,
                    }),
                    Some(amount) if amount > player.starting_stack => {
                        out.push(Violation::AmountExceedsStack {
                            round_index,
                            action_index,
                            player_id: player.id,
                        })
                    }
                    Some(_) => {}
                }
            }

            if action.action.takes_turn() && round.street != Street::Showdown {
                if let Some(from) = last_seat {
                    for skipped_seat in seats_between(from, player.seat, hand.table_size) {
                        let skipped = hand.player_at_seat(skipped_seat);
                        if let Some(skipped) = skipped {
                            if !folded.contains(&skipped.id) && !all_in.contains(&skipped.id) {
                                out.push(Violation::RotationGap {
                                    round_index,
                                    action_index,
                                    skipped_seat,
                                });
                            }
                        }
                    }
                }
                last_seat = Some(player.seat);
            }

            match action.action {
                ActionKind::Fold => {
                    folded.insert(player.id);
                }
                _ if action.is_allin() => {
                    all_in.insert(player.id);
                }
                _ => {}
            }
        }
    }
}

fn seat_in_range(seat: SeatId, table_size: u8) -> bool {
    seat >= 1 && seat <= table_size
}

/// Seats strictly between `from` and `to` walking clockwise. Empty when
/// either seat is off the table.
fn seats_between(from: SeatId, to: SeatId, table_size: u8) -> Vec<SeatId> {
    if table_size < 2 || !seat_in_range(from, table_size) || !seat_in_range(to, table_size) {
        return Vec::new();
    }
    let mut seats = Vec::new();
    let mut seat = from % table_size + 1;
    while seat != to {
        seats.push(seat);
        seat = seat % table_size + 1;
    }
    seats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::*;

    fn rules(report: &ValidationReport) -> Vec<&Violation> {
        report.violations.iter().collect()
    }

    #[test]
    fn fixtures_are_clean() {
        assert!(validate(&heads_up_preflop()).is_clean());
        assert!(validate(&three_handed_to_river()).is_clean());
        assert!(validate(&empty_hand()).is_clean());
    }

    #[test]
    fn duplicate_seats_and_ids_are_errors() {
        let mut hand = heads_up_preflop();
        hand.add_player(player(2, 1, 50.0));
        let report = validate(&hand);
        assert!(report.has_errors());
        assert!(rules(&report).contains(&&Violation::DuplicatePlayerId { player_id: 2 }));
        assert!(rules(&report).contains(&&Violation::SeatTaken {
            seat: 1,
            first: 1,
            second: 2
        }));
    }

    #[test]
    fn seats_outside_table_are_errors() {
        let mut hand = heads_up_preflop();
        hand.add_player(player(3, 5, 100.0));
        hand.dealer_seat = 0;
        let report = validate(&hand);
        assert!(rules(&report).contains(&&Violation::SeatOutOfRange {
            player_id: 3,
            seat: 5,
            table_size: 2
        }));
        assert!(rules(&report).contains(&&Violation::DealerSeatOutOfRange {
            dealer_seat: 0,
            table_size: 2
        }));
    }

    #[test]
    fn streets_must_advance_and_boards_must_extend() {
        let mut hand = three_handed_to_river();
        hand.rounds[2].street = Street::Flop;
        hand.rounds[3].cards = Some(cards(&["Ah", "Kd", "2s"]));
        let report = validate(&hand);
        assert!(rules(&report).contains(&&Violation::StreetRegressed {
            round_index: 2,
            street: Street::Flop,
            previous: Street::Flop
        }));
        assert!(rules(&report).contains(&&Violation::BoardNotExtended { round_index: 3 }));
    }

    #[test]
    fn rounds_without_board_are_skipped_by_board_check() {
        let mut hand = three_handed_to_river();
        hand.rounds[2].cards = None;
        assert!(validate(&hand).is_clean());
    }

    #[test]
    fn round_ids_must_increase() {
        let mut hand = three_handed_to_river();
        hand.rounds[1].id = 0;
        let report = validate(&hand);
        assert_eq!(
            report.errors().collect::<Vec<_>>(),
            vec![&Violation::RoundIdNotIncreasing {
                round_index: 1,
                id: 0,
                previous: 0
            }]
        );
    }

    #[test]
    fn unknown_action_player_is_error() {
        let mut hand = heads_up_preflop();
        hand.rounds[0]
            .actions
            .push(action(4, 9, ActionKind::Call, Some(7.0)));
        let report = validate(&hand);
        assert!(rules(&report).contains(&&Violation::UnknownActionPlayer {
            round_index: 0,
            action_index: 3,
            player_id: 9
        }));
    }

    #[test]
    fn sloppy_recordings_are_warnings_only() {
        let mut hand = three_handed_to_river();
        hand.hero_player_id = 42;
        hand.rounds[2]
            .actions
            .push(action(12, 1, ActionKind::Check, None));
        hand.rounds[3].actions[0].amount = None;
        let report = validate(&hand);
        assert!(!report.has_errors());
        let warnings: Vec<_> = report.warnings().collect();
        assert!(warnings.contains(&&Violation::UnknownHero { hero_player_id: 42 }));
        assert!(warnings.contains(&&Violation::ActedAfterFold {
            round_index: 2,
            action_index: 2,
            player_id: 1
        }));
        assert!(warnings.contains(&&Violation::MissingAmount {
            round_index: 3,
            action_index: 0,
            action: ActionKind::Bet
        }));
    }

    #[test]
    fn street_total_above_starting_stack_is_error() {
        let mut hand = heads_up_preflop();
        hand.rounds[0].actions[2].amount = Some(f64::MAX);
        let report = validate(&hand);
        assert_eq!(
            report.errors().collect::<Vec<_>>(),
            vec![&Violation::AmountExceedsStack {
                round_index: 0,
                action_index: 2,
                player_id: 1
            }]
        );

        // Exactly all-in is fine.
        hand.rounds[0].actions[2].amount = Some(200.0);
        assert!(validate(&hand).is_clean());
    }

    #[test]
    fn skipped_seat_without_fold_is_a_rotation_gap() {
        use ActionKind::*;
        let mut hand = three_handed_to_river();
        // Seat 3 acts right after the blinds without seat 1 folding first.
        hand.rounds[0].actions = vec![
            action(1, 2, PostSmallBlind, Some(1.0)),
            action(2, 3, PostBigBlind, Some(2.0)),
            action(3, 2, Call, Some(2.0)),
        ];
        let report = validate(&hand);
        assert!(report.warnings().any(|v| *v
            == Violation::RotationGap {
                round_index: 0,
                action_index: 2,
                skipped_seat: 1
            }));
    }

    #[test]
    fn earlier_fold_closes_the_gap() {
        use ActionKind::*;
        let mut hand = three_handed_to_river();
        hand.rounds[0].actions = vec![
            action(1, 2, PostSmallBlind, Some(1.0)),
            action(2, 3, PostBigBlind, Some(2.0)),
            action(3, 1, Fold, None),
            action(4, 2, Call, Some(2.0)),
            action(5, 3, Check, None),
        ];
        hand.rounds.truncate(1);
        assert!(validate(&hand).is_clean());
    }

    #[test]
    fn first_postflop_actor_is_measured_from_the_button() {
        let mut hand = three_handed_to_river();
        // Seat 3 opens the flop, skipping seat 2.
        hand.rounds[1].actions.remove(0);
        let report = validate(&hand);
        assert!(report.warnings().any(|v| *v
            == Violation::RotationGap {
                round_index: 1,
                action_index: 0,
                skipped_seat: 2
            }));
    }

    #[test]
    fn severity_serializes_with_rule_tag() {
        let json = serde_json::to_value(Violation::BoardNotExtended { round_index: 2 }).unwrap();
        assert_eq!(json["rule"], "board_not_extended");
        assert_eq!(json["round_index"], 2);
        assert_eq!(
            serde_json::to_value(Severity::Warning).unwrap(),
            serde_json::json!("warning")
        );
    }
}
