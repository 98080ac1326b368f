//! Bracket data models: tournaments, competitors and bracket slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tournament ID type
pub type TournamentId = i64;

/// Competitor ID type
pub type CompetitorId = i64;

/// Bracket slot ID type
pub type SlotId = i64;

/// Round number of the final
pub const FINAL_ROUND: i32 = 1;

/// Round number of the third-place match
pub const THIRD_PLACE_ROUND: i32 = 0;

/// Last group round before the final (the group semifinal)
pub const LAST_GROUP_ROUND: i32 = 2;

/// Bracket group a slot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Group {
    /// First half of the competitor list
    A,
    /// Second half of the competitor list
    B,
    /// Cross-group slots: the final and the third-place match
    F,
}

impl Group {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::A => "A",
            Group::B => "B",
            Group::F => "F",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" | "a" => Some(Group::A),
            "B" | "b" => Some(Group::B),
            "F" | "f" => Some(Group::F),
            _ => None,
        }
    }

    /// Seat this group's competitors take when advancing.
    ///
    /// Group A advances into seat A and group B into seat B. In the final and
    /// third-place match this is the only seat a group may use.
    pub fn preferred_seat(self) -> Seat {
        match self {
            Group::A | Group::F => Seat::A,
            Group::B => Seat::B,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two competitor positions of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    A,
    B,
}

impl Seat {
    /// The opposite seat
    pub fn other(self) -> Self {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }
}

/// Tournament record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Tournament name
    pub name: String,
    /// Cached number of registered competitors
    pub competitor_count: i64,
    /// True once the bracket tree exists
    pub is_bracketed: bool,
    /// True once the final (and a playable third-place match) is decided
    pub is_finalized: bool,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

/// Registered competitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    /// Competitor ID
    pub id: CompetitorId,
    /// Display name
    pub name: String,
    /// Owning tournament
    pub tournament_id: TournamentId,
}

/// Lifecycle state of a slot, derived from its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    /// No competitor assigned
    Empty,
    /// One competitor assigned
    Seated,
    /// Both competitors assigned, no result yet
    Ready,
    /// Match played and winner recorded
    Decided,
    /// Lone occupant advanced without a match
    ByeDecided,
}

/// One node of the elimination tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlot {
    /// Slot ID
    pub id: SlotId,
    /// Owning tournament
    pub tournament_id: TournamentId,
    /// Round number (1 = final, 0 = third place)
    pub round: i32,
    /// Group tag
    pub group: Group,
    /// Competitor in seat A
    pub competitor_a: Option<CompetitorId>,
    /// Competitor in seat B
    pub competitor_b: Option<CompetitorId>,
    /// Recorded score for seat A
    pub score_a: Option<i32>,
    /// Recorded score for seat B
    pub score_b: Option<i32>,
    /// Winner, once decided
    pub winner: Option<CompetitorId>,
    /// Lone occupant auto-advances
    pub is_bye: bool,
    /// Bye winner already advanced
    pub bye_resolved: bool,
}

impl BracketSlot {
    /// Competitor in the given seat
    pub fn seat(&self, seat: Seat) -> Option<CompetitorId> {
        match seat {
            Seat::A => self.competitor_a,
            Seat::B => self.competitor_b,
        }
    }

    /// First open seat, trying `preferred` before the other one
    pub fn open_seat(&self, preferred: Seat) -> Option<Seat> {
        [preferred, preferred.other()]
            .into_iter()
            .find(|seat| self.seat(*seat).is_none())
    }

    /// Both seats assigned
    pub fn is_ready(&self) -> bool {
        self.competitor_a.is_some() && self.competitor_b.is_some()
    }

    /// No seat assigned
    pub fn is_empty(&self) -> bool {
        self.competitor_a.is_none() && self.competitor_b.is_none()
    }

    /// The single competitor of a slot with exactly one seat assigned
    pub fn occupant(&self) -> Option<CompetitorId> {
        match (self.competitor_a, self.competitor_b) {
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            _ => None,
        }
    }

    /// The assigned competitor that is not the winner
    pub fn loser(&self) -> Option<CompetitorId> {
        let winner = self.winner?;
        [self.competitor_a, self.competitor_b]
            .into_iter()
            .flatten()
            .find(|id| *id != winner)
    }

    pub fn state(&self) -> SlotState {
        if self.winner.is_some() {
            if self.is_bye {
                SlotState::ByeDecided
            } else {
                SlotState::Decided
            }
        } else if self.is_ready() {
            SlotState::Ready
        } else if self.is_empty() {
            SlotState::Empty
        } else {
            SlotState::Seated
        }
    }

    /// Human-readable round name
    pub fn round_label(&self) -> RoundLabel {
        RoundLabel::from(self.round)
    }
}

/// Presentation name of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundLabel {
    ThirdPlace,
    Final,
    Round(i32),
}

impl From<i32> for RoundLabel {
    fn from(round: i32) -> Self {
        match round {
            THIRD_PLACE_ROUND => RoundLabel::ThirdPlace,
            FINAL_ROUND => RoundLabel::Final,
            other => RoundLabel::Round(other),
        }
    }
}

impl fmt::Display for RoundLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundLabel::ThirdPlace => f.write_str("Third place"),
            RoundLabel::Final => f.write_str("Final"),
            RoundLabel::Round(round) => write!(f, "{round}"),
        }
    }
}

/// A slot to be created by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub tournament_id: TournamentId,
    pub round: i32,
    pub group: Group,
    pub competitor_a: Option<CompetitorId>,
    pub competitor_b: Option<CompetitorId>,
    pub winner: Option<CompetitorId>,
    pub is_bye: bool,
}

impl SlotSpec {
    /// Slot with no competitors
    pub fn empty(tournament_id: TournamentId, round: i32, group: Group) -> Self {
        Self {
            tournament_id,
            round,
            group,
            competitor_a: None,
            competitor_b: None,
            winner: None,
            is_bye: false,
        }
    }

    /// Slot with both competitors seated
    pub fn pairing(
        tournament_id: TournamentId,
        round: i32,
        group: Group,
        a: CompetitorId,
        b: CompetitorId,
    ) -> Self {
        Self {
            competitor_a: Some(a),
            competitor_b: Some(b),
            ..Self::empty(tournament_id, round, group)
        }
    }

    /// Slot whose lone competitor advances without a match
    pub fn walkover(
        tournament_id: TournamentId,
        round: i32,
        group: Group,
        competitor: CompetitorId,
    ) -> Self {
        let mut spec = Self::empty(tournament_id, round, group);
        match group.preferred_seat() {
            Seat::A => spec.competitor_a = Some(competitor),
            Seat::B => spec.competitor_b = Some(competitor),
        }
        spec.winner = Some(competitor);
        spec.is_bye = true;
        spec
    }
}

/// Partial update of a slot's mutable fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotUpdate {
    pub competitor_a: Option<CompetitorId>,
    pub competitor_b: Option<CompetitorId>,
    pub scores: Option<(i32, i32)>,
    pub winner: Option<CompetitorId>,
    pub is_bye: Option<bool>,
    pub bye_resolved: Option<bool>,
}

impl SlotUpdate {
    /// Occupy one seat
    pub fn seat(seat: Seat, competitor: CompetitorId) -> Self {
        match seat {
            Seat::A => Self {
                competitor_a: Some(competitor),
                ..Self::default()
            },
            Seat::B => Self {
                competitor_b: Some(competitor),
                ..Self::default()
            },
        }
    }

    /// Record a played match
    pub fn result(score_a: i32, score_b: i32, winner: CompetitorId) -> Self {
        Self {
            scores: Some((score_a, score_b)),
            winner: Some(winner),
            ..Self::default()
        }
    }

    /// Flag the slot as a bye
    pub fn mark_bye() -> Self {
        Self {
            is_bye: Some(true),
            ..Self::default()
        }
    }

    /// Award a bye to its lone occupant
    pub fn resolve_bye(winner: CompetitorId) -> Self {
        Self {
            winner: Some(winner),
            bye_resolved: Some(true),
            ..Self::default()
        }
    }

    /// Apply to an in-memory slot
    pub fn apply_to(&self, slot: &mut BracketSlot) {
        if let Some(a) = self.competitor_a {
            slot.competitor_a = Some(a);
        }
        if let Some(b) = self.competitor_b {
            slot.competitor_b = Some(b);
        }
        if let Some((a, b)) = self.scores {
            slot.score_a = Some(a);
            slot.score_b = Some(b);
        }
        if let Some(winner) = self.winner {
            slot.winner = Some(winner);
        }
        if let Some(is_bye) = self.is_bye {
            slot.is_bye = is_bye;
        }
        if let Some(resolved) = self.bye_resolved {
            slot.bye_resolved = resolved;
        }
    }
}

/// Slot lookup filter. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotFilter {
    pub round: Option<i32>,
    pub group: Option<Group>,
    pub is_bye: Option<bool>,
}

impl SlotFilter {
    pub fn round(round: i32) -> Self {
        Self {
            round: Some(round),
            ..Self::default()
        }
    }

    pub fn round_group(round: i32, group: Group) -> Self {
        Self {
            round: Some(round),
            group: Some(group),
            is_bye: None,
        }
    }

    pub fn byes() -> Self {
        Self {
            is_bye: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, slot: &BracketSlot) -> bool {
        self.round.is_none_or(|round| slot.round == round)
            && self.group.is_none_or(|group| slot.group == group)
            && self.is_bye.is_none_or(|is_bye| slot.is_bye == is_bye)
    }
}

/// Tournament search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentFilter {
    /// Exact tournament ID
    pub id: Option<TournamentId>,
    /// Case-insensitive name substring
    pub name: Option<String>,
}

/// Final placings of a tournament
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standings {
    pub champion: Option<Competitor>,
    pub runner_up: Option<Competitor>,
    pub third: Option<Competitor>,
    pub fourth: Option<Competitor>,
}

impl Standings {
    /// No placing known yet
    pub fn is_pending(&self) -> bool {
        self.champion.is_none()
            && self.runner_up.is_none()
            && self.third.is_none()
            && self.fourth.is_none()
    }
}
