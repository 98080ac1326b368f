//! Bracket shape: round numbering, group split and the slot list of a new bracket.
//!
//! Everything here is pure; persisting the plan is done by the builder.

use super::draw::Draw;
use super::models::{
    CompetitorId, FINAL_ROUND, Group, LAST_GROUP_ROUND, SlotSpec, THIRD_PLACE_ROUND, TournamentId,
};

/// Round at which group play starts: `ceil(log2(total))`.
///
/// Returns 0 for fewer than two competitors.
pub fn first_round_number(total: usize) -> i32 {
    if total < 2 {
        return 0;
    }
    (usize::BITS - (total - 1).leading_zeros()) as i32
}

/// Split competitors positionally into group A (first half) and group B (the rest)
pub fn split_groups<T>(competitors: &[T]) -> (&[T], &[T]) {
    competitors.split_at(competitors.len() / 2)
}

/// Shape of one group round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundShape {
    pub round: i32,
    /// Competitors entering the round
    pub entering: usize,
    /// Slots in the round: `ceil(entering / 2)`
    pub slots: usize,
    /// One slot holds a lone competitor
    pub has_bye: bool,
}

/// Rounds of one group, from `first_round` down to the group semifinal (round 2).
///
/// The slot count of each round is the ceiling half of the previous round's
/// slot count. Empty when `first_round` is below 2.
pub fn group_rounds(entrants: usize, first_round: i32) -> Vec<RoundShape> {
    let mut rounds = Vec::new();
    let mut entering = entrants;
    for round in (LAST_GROUP_ROUND..=first_round).rev() {
        let slots = entering.div_ceil(2);
        rounds.push(RoundShape {
            round,
            entering,
            slots,
            has_bye: entering % 2 == 1,
        });
        entering = slots;
    }
    rounds
}

/// Complete slot list for a new bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPlan {
    pub first_round: i32,
    pub slots: Vec<SlotSpec>,
}

impl BracketPlan {
    /// Plan the bracket of `competitors`, in registration order.
    ///
    /// First-round pairs are drawn within each group. A pair with an absent
    /// opponent becomes a bye slot with its winner already set. Later group
    /// rounds, the final and the third-place match start empty, except with
    /// exactly two competitors: the final is seated directly and the
    /// third-place match is a bye nobody can reach.
    pub fn new(tournament_id: TournamentId, competitors: &[CompetitorId], draw: &mut Draw) -> Self {
        let first_round = first_round_number(competitors.len());

        if competitors.len() < 2 {
            return Self {
                first_round,
                slots: Vec::new(),
            };
        }

        if competitors.len() == 2 {
            let mut third_place = SlotSpec::empty(tournament_id, THIRD_PLACE_ROUND, Group::F);
            third_place.is_bye = true;
            return Self {
                first_round,
                slots: vec![
                    SlotSpec::pairing(
                        tournament_id,
                        FINAL_ROUND,
                        Group::F,
                        competitors[0],
                        competitors[1],
                    ),
                    third_place,
                ],
            };
        }

        let (group_a, group_b) = split_groups(competitors);
        let groups = [(Group::A, group_a), (Group::B, group_b)];
        let mut slots = Vec::new();

        for (group, entrants) in groups {
            for pair in draw.pair(entrants) {
                slots.push(match pair {
                    (a, Some(b)) => SlotSpec::pairing(tournament_id, first_round, group, a, b),
                    (lone, None) => SlotSpec::walkover(tournament_id, first_round, group, lone),
                });
            }
        }

        let shapes =
            groups.map(|(group, entrants)| (group, group_rounds(entrants.len(), first_round)));
        for round in (LAST_GROUP_ROUND..first_round).rev() {
            for (group, rounds) in &shapes {
                let count = rounds
                    .iter()
                    .find(|shape| shape.round == round)
                    .map_or(0, |shape| shape.slots);
                slots.extend((0..count).map(|_| SlotSpec::empty(tournament_id, round, *group)));
            }
        }

        slots.push(SlotSpec::empty(tournament_id, FINAL_ROUND, Group::F));
        slots.push(SlotSpec::empty(tournament_id, THIRD_PLACE_ROUND, Group::F));

        Self { first_round, slots }
    }

    /// Number of planned slots in `round`, both groups included
    pub fn slots_in_round(&self, round: i32) -> usize {
        self.slots.iter().filter(|s| s.round == round).count()
    }
}

/// Structural byes the bye resolver will flag after the first round:
/// one per group round with an odd number of entrants.
pub fn expected_structural_byes(total: usize) -> usize {
    let first_round = first_round_number(total);
    let (a, b) = (total / 2, total - total / 2);
    [a, b]
        .into_iter()
        .map(|entrants| {
            group_rounds(entrants, first_round)
                .iter()
                .skip(1)
                .filter(|shape| shape.has_bye)
                .count()
        })
        .sum()
}
