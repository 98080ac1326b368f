//! Progression router: moves decided winners (and semifinal losers) forward.

use super::errors::{BracketError, BracketResult};
use super::models::{
    BracketSlot, CompetitorId, FINAL_ROUND, Group, SlotFilter, SlotUpdate, THIRD_PLACE_ROUND,
    TournamentId,
};
use crate::db::StoreTx;

/// Where a decided slot sent its competitors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancement {
    /// Winner seated in the next group round
    Seated(BracketSlot),
    /// Winner seated in the final; loser (if any) in the third-place match
    Finals {
        final_slot: BracketSlot,
        third_place: Option<BracketSlot>,
    },
    /// Final or third-place match: nothing further to route
    Terminal,
}

fn invariant(message: String) -> BracketError {
    log::error!("Bracket invariant violated: {}", message);
    BracketError::BracketInvariantViolation(message)
}

/// Route the outcome of a decided slot.
///
/// A group semifinal (round 2) feeds the final and the third-place match; an
/// earlier group round feeds the next round of the same group; the final and
/// the third-place match are terminal. The loser is only kept at the
/// semifinal boundary.
pub(crate) async fn advance(
    tx: &mut dyn StoreTx,
    slot: &BracketSlot,
    winner: CompetitorId,
    loser: Option<CompetitorId>,
) -> BracketResult<Advancement> {
    let next_round = slot.round - 1;

    if next_round == FINAL_ROUND {
        return finalize(tx, slot, winner, loser).await;
    }
    if next_round < FINAL_ROUND {
        return Ok(Advancement::Terminal);
    }

    let seated = seat_in_round(tx, slot.tournament_id, slot.group, next_round, winner).await?;
    Ok(Advancement::Seated(seated))
}

/// Seat `winner` in round `round` of `group`.
///
/// Prefers the first non-bye slot with an open seat; otherwise takes the
/// round's bye slot if nobody occupies it yet.
pub(crate) async fn seat_in_round(
    tx: &mut dyn StoreTx,
    tournament_id: TournamentId,
    group: Group,
    round: i32,
    winner: CompetitorId,
) -> BracketResult<BracketSlot> {
    let slots = tx
        .find_slots(tournament_id, &SlotFilter::round_group(round, group))
        .await?;

    let destination = slots
        .iter()
        .find(|s| !s.is_bye && s.open_seat(group.preferred_seat()).is_some())
        .or_else(|| slots.iter().find(|s| s.is_bye && s.is_empty()))
        .ok_or_else(|| {
            invariant(format!(
                "no open slot in round {round} group {group} of tournament {tournament_id}"
            ))
        })?;

    let seat = destination
        .open_seat(group.preferred_seat())
        .ok_or_else(|| invariant(format!("slot {} has no open seat", destination.id)))?;

    let updated = tx
        .update_slot(destination.id, &SlotUpdate::seat(seat, winner))
        .await?;

    log::debug!(
        "Tournament {}: competitor {} advanced to slot {} (round {}, group {})",
        tournament_id,
        winner,
        updated.id,
        round,
        group
    );

    Ok(updated)
}

/// Seat a group semifinal's winner in the final and its loser in the
/// third-place match, each in the seat reserved for the slot's group.
pub(crate) async fn finalize(
    tx: &mut dyn StoreTx,
    slot: &BracketSlot,
    winner: CompetitorId,
    loser: Option<CompetitorId>,
) -> BracketResult<Advancement> {
    if slot.group == Group::F {
        return Err(invariant(format!(
            "slot {} in round {} cannot feed the final",
            slot.id, slot.round
        )));
    }

    let seat = slot.group.preferred_seat();
    let final_slot = single_slot(tx, slot.tournament_id, FINAL_ROUND).await?;
    if final_slot.seat(seat).is_some() {
        return Err(invariant(format!(
            "final seat for group {} already taken in tournament {}",
            slot.group, slot.tournament_id
        )));
    }

    let third_place = match loser {
        Some(loser) => {
            let third_place = single_slot(tx, slot.tournament_id, THIRD_PLACE_ROUND).await?;
            if third_place.seat(seat).is_some() {
                return Err(invariant(format!(
                    "third-place seat for group {} already taken in tournament {}",
                    slot.group, slot.tournament_id
                )));
            }
            Some((third_place.id, loser))
        }
        None => None,
    };

    let final_slot = tx
        .update_slot(final_slot.id, &SlotUpdate::seat(seat, winner))
        .await?;
    let third_place = match third_place {
        Some((id, loser)) => Some(tx.update_slot(id, &SlotUpdate::seat(seat, loser)).await?),
        None => None,
    };

    log::debug!(
        "Tournament {}: competitor {} reached the final from group {}",
        slot.tournament_id,
        winner,
        slot.group
    );

    Ok(Advancement::Finals {
        final_slot,
        third_place,
    })
}

async fn single_slot(
    tx: &mut dyn StoreTx,
    tournament_id: TournamentId,
    round: i32,
) -> BracketResult<BracketSlot> {
    let mut slots = tx
        .find_slots(tournament_id, &SlotFilter::round_group(round, Group::F))
        .await?;

    match slots.len() {
        1 => Ok(slots.remove(0)),
        found => Err(invariant(format!(
            "expected one round {round} slot in tournament {tournament_id}, found {found}"
        ))),
    }
}

/// Set `is_finalized` once the final is decided and the third-place match is
/// decided or can never be played. Returns whether the tournament is finalized.
pub(crate) async fn refresh_finalized(
    tx: &mut dyn StoreTx,
    tournament_id: TournamentId,
) -> BracketResult<bool> {
    let final_slot = single_slot(tx, tournament_id, FINAL_ROUND).await?;
    let third_place = single_slot(tx, tournament_id, THIRD_PLACE_ROUND).await?;

    let third_settled =
        third_place.winner.is_some() || (third_place.is_bye && third_place.is_empty());
    if final_slot.winner.is_none() || !third_settled {
        return Ok(false);
    }

    tx.set_finalized(tournament_id).await?;
    log::info!("Tournament {} finalized", tournament_id);
    Ok(true)
}
