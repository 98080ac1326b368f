//! Bye resolver: structural bye marking at build time and bye cascading.

use super::draw::Draw;
use super::errors::{BracketError, BracketResult};
use super::models::{
    BracketSlot, FINAL_ROUND, Group, LAST_GROUP_ROUND, SlotFilter, SlotUpdate, THIRD_PLACE_ROUND,
    TournamentId,
};
use super::plan::group_rounds;
use super::progression::{self, Advancement};
use crate::db::StoreTx;

/// Flag one slot as a bye in every group round after the first whose number
/// of entering competitors is odd.
///
/// Runs once, right after the slots are created and before the tournament is
/// marked bracketed. When a group semifinal ends up as a bye, the
/// third-place match is flagged too: only one semifinal loser will reach it.
///
/// # Returns
///
/// * `BracketResult<usize>` - Number of group slots flagged
pub(crate) async fn mark_structural_byes(
    tx: &mut dyn StoreTx,
    tournament_id: TournamentId,
    first_round: i32,
    group_sizes: [(Group, usize); 2],
    draw: &mut Draw,
) -> BracketResult<usize> {
    let mut count = 0;

    for (group, entrants) in group_sizes {
        for shape in group_rounds(entrants, first_round).iter().skip(1) {
            if !shape.has_bye {
                continue;
            }

            let open: Vec<BracketSlot> = tx
                .find_slots(tournament_id, &SlotFilter::round_group(shape.round, group))
                .await?
                .into_iter()
                .filter(|s| !s.is_bye && s.is_empty())
                .collect();

            let idx = draw.pick(open.len()).ok_or_else(|| {
                BracketError::BracketInvariantViolation(format!(
                    "no open slot to flag as bye in round {} group {}",
                    shape.round, group
                ))
            })?;
            tx.update_slot(open[idx].id, &SlotUpdate::mark_bye()).await?;
            count += 1;
        }
    }

    let semifinal_bye = tx
        .find_slots(tournament_id, &SlotFilter::round(LAST_GROUP_ROUND))
        .await?
        .iter()
        .any(|s| s.is_bye);
    if semifinal_bye {
        let third_place = tx
            .find_slots(
                tournament_id,
                &SlotFilter::round_group(THIRD_PLACE_ROUND, Group::F),
            )
            .await?;
        for slot in third_place {
            tx.update_slot(slot.id, &SlotUpdate::mark_bye()).await?;
        }
    }

    log::debug!(
        "Tournament {}: flagged {} structural bye(s)",
        tournament_id,
        count
    );

    Ok(count)
}

/// Award every occupied, unresolved bye to its lone occupant and advance it.
///
/// Repeats until a pass resolves nothing, so byes reached by an advancement
/// made in this call are resolved as well. Byes still waiting for their
/// occupant are left untouched.
///
/// # Returns
///
/// * `BracketResult<Vec<BracketSlot>>` - Resolved byes and the slots their
///   winners were seated in, in the order they were written
pub(crate) async fn resolve_byes(
    tx: &mut dyn StoreTx,
    tournament_id: TournamentId,
) -> BracketResult<Vec<BracketSlot>> {
    let mut affected = Vec::new();

    loop {
        let pending: Vec<BracketSlot> = tx
            .find_slots(tournament_id, &SlotFilter::byes())
            .await?
            .into_iter()
            .filter(|s| !s.bye_resolved && s.round != FINAL_ROUND)
            .collect();

        let mut resolved_any = false;
        for slot in pending {
            if slot.is_empty() {
                continue;
            }
            let Some(winner) = slot.occupant() else {
                return Err(BracketError::BracketInvariantViolation(format!(
                    "bye slot {} holds two competitors",
                    slot.id
                )));
            };
            if slot.score_a.is_some() || slot.score_b.is_some() {
                return Err(BracketError::BracketInvariantViolation(format!(
                    "bye slot {} has a recorded score",
                    slot.id
                )));
            }

            let resolved = tx
                .update_slot(slot.id, &SlotUpdate::resolve_bye(winner))
                .await?;
            log::debug!(
                "Tournament {}: bye slot {} awarded to competitor {}",
                tournament_id,
                resolved.id,
                winner
            );

            match progression::advance(tx, &resolved, winner, None).await? {
                Advancement::Seated(destination) => {
                    affected.push(resolved);
                    affected.push(destination);
                }
                Advancement::Finals { final_slot, .. } => {
                    affected.push(resolved);
                    affected.push(final_slot);
                }
                Advancement::Terminal => affected.push(resolved),
            }
            resolved_any = true;
        }

        if !resolved_any {
            return Ok(affected);
        }
    }
}
