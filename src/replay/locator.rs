use super::cursor::Cursor;
use crate::history::HandHistory;
use crate::patch::{parse_index, JsonPointer, PatchOperation};

/// Earliest timeline position touched by a committed batch, resolved against
/// the document *after* the batch was applied. Returns `None` for an empty batch.
///
/// Paths outside `/rounds` (players, hero, blinds) and paths that cannot be
/// parsed map to the hand start, since they can change how every earlier
/// position renders.
pub fn locate_earliest_change(hand: &HandHistory, operations: &[PatchOperation]) -> Option<Cursor> {
    operations
        .iter()
        .flat_map(|op| std::iter::once(op.path()).chain(op.from()))
        .map(|path| locate_path(hand, path))
        .min()
        .map(|cursor| cursor.clamp(hand))
}

fn locate_path(hand: &HandHistory, path: &str) -> Cursor {
    let Ok(pointer) = JsonPointer::parse(path) else {
        return Cursor::START;
    };
    match pointer.tokens() {
        [rounds, round, rest @ ..] if rounds == "rounds" => {
            let Some(round_idx) = resolve_index(round, hand.rounds.len()) else {
                return Cursor::START;
            };
            match rest {
                [actions, action, ..] if actions == "actions" => {
                    let len = hand.rounds.get(round_idx).map_or(0, |r| r.actions.len());
                    match resolve_index(action, len) {
                        Some(action_idx) => {
                            Cursor::new(round_idx, isize::try_from(action_idx).unwrap_or(isize::MAX))
                        }
                        None => Cursor::START,
                    }
                }
                _ => Cursor::new(round_idx, -1),
            }
        }
        _ => Cursor::START,
    }
}

/// `-` names the element that was just appended.
fn resolve_index(token: &str, len: usize) -> Option<usize> {
    if token == "-" {
        Some(len.saturating_sub(1))
    } else {
        parse_index(token)
    }
}
