//! Bracket builder: persists the complete slot tree of a tournament.

use super::byes;
use super::draw::Draw;
use super::errors::{BracketError, BracketResult};
use super::models::{CompetitorId, Group, Tournament};
use super::plan::{BracketPlan, split_groups};
use crate::db::StoreTx;

/// Minimum competitors for a bracket
pub const MIN_COMPETITORS: usize = 2;

/// Shape of a freshly built bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub competitors: usize,
    pub first_round: i32,
    pub slot_count: usize,
    pub structural_byes: usize,
}

/// Build the whole bracket of `tournament` inside `tx`.
///
/// Creates every slot, flags the structural byes and marks the tournament
/// bracketed. The caller commits; nothing is visible before that.
///
/// # Errors
///
/// * `BracketError::TournamentAlreadyBracketed` - Bracket already exists
/// * `BracketError::InsufficientCompetitors` - Fewer than two competitors
pub(crate) async fn build(
    tx: &mut dyn StoreTx,
    tournament: &Tournament,
    draw: &mut Draw,
) -> BracketResult<BuildSummary> {
    if tournament.is_bracketed {
        return Err(BracketError::TournamentAlreadyBracketed(tournament.id));
    }

    let competitors: Vec<CompetitorId> = tx
        .list_competitors(tournament.id)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    if competitors.len() < MIN_COMPETITORS {
        return Err(BracketError::InsufficientCompetitors {
            needed: MIN_COMPETITORS,
            current: competitors.len(),
        });
    }

    let plan = BracketPlan::new(tournament.id, &competitors, draw);
    tx.create_slots(&plan.slots).await?;

    let (group_a, group_b) = split_groups(&competitors);
    let structural_byes = byes::mark_structural_byes(
        tx,
        tournament.id,
        plan.first_round,
        [(Group::A, group_a.len()), (Group::B, group_b.len())],
        draw,
    )
    .await?;

    tx.set_bracketed(tournament.id).await?;

    let summary = BuildSummary {
        competitors: competitors.len(),
        first_round: plan.first_round,
        slot_count: plan.slots.len(),
        structural_byes,
    };

    log::info!(
        "Tournament {}: bracket built for {} competitors ({} slots, first round {}, {} byes)",
        tournament.id,
        summary.competitors,
        summary.slot_count,
        summary.first_round,
        summary.structural_byes
    );

    Ok(summary)
}
