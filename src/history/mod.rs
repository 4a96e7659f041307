//! The hand-history document: a dumb, serializable record of one hand plus
//! the invariant checks the reconciliation loop runs before committing it.

pub mod accounting;
pub mod builder;
pub mod card;
pub mod chips_serde;
pub mod types;
pub mod validation;

pub use accounting::PotAccounting;
pub use builder::HandSettings;
pub use card::{format_cards, Card, CardParseError, Rank, Suit};
pub use types::{
    Action, ActionKind, BetLimit, Chips, HandHistory, Player, PlayerId, PlayerWin, Pot, Round,
    RoundId, SeatId, Street,
};
pub use validation::{validate, Severity, ValidationReport, Violation};
