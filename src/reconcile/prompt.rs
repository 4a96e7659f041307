use super::interpreter::StateContext;

/// Instructions for a chat model acting as a fragment interpreter.
pub const SYSTEM_PROMPT: &str = r#"You maintain a poker hand history in Open Hand History form. Each request carries the current state, the earlier transcript segments, and one new segment of spoken commentary. Reply with the JSON Patch (RFC 6902) operations that record what the new segment adds.

State shape:
  table_size, dealer_seat, hero_player_id, small_blind_amount, big_blind_amount
  players: [{ id, name, seat, starting_stack, cards? }]
  rounds:  [{ id, street: "Preflop"|"Flop"|"Turn"|"River"|"Showdown", cards?, actions: [{ action_number, player_id, action, amount?, is_allin? }] }]
  action is one of "Dealt Card", "Post SB", "Post BB", "Fold", "Check", "Bet", "Raise", "Call".

Seating:
- Seats are numbered from 1. Unless told otherwise the table has 8 seats, seat 1 posts the small blind, seat 2 the big blind, and the button is the last seat.
- Keep one player per seat for every seat of the table. Unnamed seats get { id: seat, name: "P<seat>", seat, starting_stack: 100 big blinds }.
- When the speaker places themself ("I'm in the cutoff"), make that player the hero and seat them accordingly.

Action order:
- Action moves clockwise: 1, 2, ..., table_size, 1. Before recording an action, every seat between the previous actor and the new actor whose player is still in the hand must receive a Fold first, in that order. Never append those folds after the new action.
- Post-flop, the first actor is the first live seat after the button.
- If the Preflop round does not exist when the first action or deal is described, create it with Post SB and Post BB first.
- A folded player never acts again.
- If the segment finishes the current street and announces the next one, record the remaining actions of the current street before adding the new round.
- When a segment corrects earlier actions, insert or remove at specific indices so the recorded order matches what happened.

Amounts:
- amount is the player's total for the street, never the increment. "Raise to 30" is 30. A call records the amount being called, e.g. a call of a raise to 7 is 7. Blinds record the blind size.

Cards:
- Two characters each: uppercase rank from 23456789TJQKA followed by a lowercase suit from s, h, d, c. Ten is always "T". Never use a placeholder suit; pick a plausible distinct suit when none is given.
- Hole cards go on the player object ("/players/<i>/cards"), not on a Dealt Card action.
- A round's cards hold the whole board so far: the Turn round repeats the three flop cards and adds the fourth.

Patch rules:
- Append with "-" ("/rounds/-", "/rounds/0/actions/-"). Never replace or re-add "/rounds" or "/players" as a whole once they have entries.
- Use "add" for fields that may not exist yet and "replace" only for fields that do.
- Do not create a Showdown or later round when the hand ended by a fold.
- If the segment is commentary, repeats what is already recorded, or trails off without a complete action, return no operations. A later segment may finish the thought; an unfinished sentence in the earlier segments can supply the subject of the new one.

Reply with a single JSON object and nothing else: {"patches": [ { "op": ..., "path": ..., "value": ... }, ... ]}"#;

pub fn user_message(fragment: &str, prior: &[String], context: &StateContext) -> String {
    let state = serde_json::to_string(context).unwrap_or_else(|_| "{}".to_owned());
    let earlier = serde_json::to_string(prior).unwrap_or_else(|_| "[]".to_owned());
    let latest = serde_json::to_string(fragment).unwrap_or_else(|_| "\"\"".to_owned());
    format!(
        "Current state: {state}\n\nEarlier transcript segments: {earlier}\n\nLatest segment: {latest}"
    )
}
