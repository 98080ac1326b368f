//! Result recorder: validates and stores a match result, then routes it.

use super::errors::{BracketError, BracketResult};
use super::models::{BracketSlot, Seat, SlotId, SlotUpdate, TournamentId};
use super::progression::{self, Advancement};
use crate::db::StoreTx;

/// Winner side of a score line. Equal and negative scores are rejected.
pub fn winning_side(score_a: i32, score_b: i32) -> BracketResult<Seat> {
    if score_a < 0 || score_b < 0 || score_a == score_b {
        return Err(BracketError::InvalidScore { score_a, score_b });
    }
    Ok(if score_a > score_b { Seat::A } else { Seat::B })
}

/// Record a match result inside `tx`.
///
/// Validation happens before any write, in this order: slot exists, slot
/// belongs to the tournament, no result yet, both seats occupied, scores
/// differ. The slot is re-read after the tournament lock is taken so two
/// submissions for the same slot cannot both pass.
pub(crate) async fn record(
    tx: &mut dyn StoreTx,
    slot_id: SlotId,
    tournament_id: TournamentId,
    score_a: i32,
    score_b: i32,
) -> BracketResult<(BracketSlot, Advancement)> {
    let slot = tx
        .get_slot(slot_id)
        .await?
        .ok_or(BracketError::SlotNotFound(slot_id))?;
    if slot.tournament_id != tournament_id {
        return Err(BracketError::SlotTournamentMismatch {
            slot_id,
            tournament_id,
        });
    }

    tx.lock_tournament(tournament_id)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;
    let slot = tx
        .get_slot(slot_id)
        .await?
        .ok_or(BracketError::SlotNotFound(slot_id))?;

    if slot.winner.is_some() {
        return Err(BracketError::ResultAlreadyRecorded(slot_id));
    }
    let (Some(competitor_a), Some(competitor_b)) = (slot.competitor_a, slot.competitor_b) else {
        return Err(BracketError::SlotNotReady(slot_id));
    };
    if slot.is_bye {
        return Err(BracketError::BracketInvariantViolation(format!(
            "bye slot {slot_id} holds two competitors"
        )));
    }

    let (winner, loser) = match winning_side(score_a, score_b)? {
        Seat::A => (competitor_a, competitor_b),
        Seat::B => (competitor_b, competitor_a),
    };

    let decided = tx
        .update_slot(slot_id, &SlotUpdate::result(score_a, score_b, winner))
        .await?;

    log::info!(
        "Tournament {}: slot {} (round {}) decided {} x {}, winner {}",
        tournament_id,
        slot_id,
        decided.round,
        score_a,
        score_b,
        winner
    );

    let advancement = progression::advance(tx, &decided, winner, Some(loser)).await?;
    Ok((decided, advancement))
}
