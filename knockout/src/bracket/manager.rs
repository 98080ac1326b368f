//! Bracket manager: the transactional entry points of the engine.
//!
//! Each public method opens one store transaction, runs to completion and
//! commits. Any error drops the transaction, so a rejected or failed call
//! leaves no partial writes behind.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::builder::{self, BuildSummary};
use super::byes;
use super::draw::Draw;
use super::errors::{BracketError, BracketResult};
use super::models::{
    BracketSlot, Competitor, CompetitorId, FINAL_ROUND, SlotFilter, SlotId, Standings,
    THIRD_PLACE_ROUND, Tournament, TournamentFilter, TournamentId,
};
use super::progression;
use super::results;
use crate::db::{BracketStore, StoreTx};

/// Bracket slots, with the build summary when the read generated them
#[derive(Debug, Clone)]
pub struct BracketView {
    pub slots: Vec<BracketSlot>,
    pub built: Option<BuildSummary>,
}

/// Bracket manager
#[derive(Clone)]
pub struct BracketManager {
    store: Arc<dyn BracketStore>,
    draw: Arc<Mutex<Draw>>,
}

impl BracketManager {
    /// Create a manager drawing pairings from OS entropy
    pub fn new(store: Arc<dyn BracketStore>) -> Self {
        Self::with_draw(store, Draw::random())
    }

    /// Create a manager with an explicit draw (seeded or ordered)
    pub fn with_draw(store: Arc<dyn BracketStore>, draw: Draw) -> Self {
        Self {
            store,
            draw: Arc::new(Mutex::new(draw)),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn BracketStore> {
        &self.store
    }

    /// Create a new tournament
    pub async fn create_tournament(&self, name: &str) -> BracketResult<Tournament> {
        let mut tx = self.store.begin().await?;
        let tournament = tx.create_tournament(name).await?;
        tx.commit().await?;

        log::info!("Created tournament {} '{}'", tournament.id, tournament.name);
        Ok(tournament)
    }

    /// Get a tournament
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        let mut tx = self.store.begin().await?;
        tx.get_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    /// Search tournaments
    ///
    /// An ID filter must match an existing tournament; a name filter matches
    /// case-insensitive substrings and may return an empty list.
    pub async fn search_tournaments(
        &self,
        filter: &TournamentFilter,
    ) -> BracketResult<Vec<Tournament>> {
        let mut tx = self.store.begin().await?;

        if let Some(id) = filter.id {
            let tournament = tx
                .get_tournament(id)
                .await?
                .ok_or(BracketError::TournamentNotFound(id))?;
            return Ok(vec![tournament]);
        }

        let name = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
        Ok(tx.search_tournaments(name).await?)
    }

    /// Register a competitor
    ///
    /// # Errors
    ///
    /// * `BracketError::TournamentNotFound` - Unknown tournament
    /// * `BracketError::TournamentAlreadyBracketed` - Registration is closed
    pub async fn register_competitor(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> BracketResult<Competitor> {
        let mut tx = self.store.begin().await?;

        let tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        if tournament.is_bracketed {
            return Err(BracketError::TournamentAlreadyBracketed(tournament_id));
        }

        let competitor = tx.create_competitor(name, tournament_id).await?;
        let count = tx.count_competitors(tournament_id).await?;
        tx.set_competitor_count(tournament_id, count).await?;
        tx.commit().await?;

        log::info!(
            "Tournament {}: registered competitor {} '{}' ({} total)",
            tournament_id,
            competitor.id,
            competitor.name,
            count
        );
        Ok(competitor)
    }

    /// Competitors of a tournament in registration order
    pub async fn list_competitors(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Competitor>> {
        let mut tx = self.store.begin().await?;
        tx.get_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        Ok(tx.list_competitors(tournament_id).await?)
    }

    /// Build the bracket of a tournament that has none yet.
    ///
    /// Slot creation, structural bye marking and the `is_bracketed` flag are
    /// committed together.
    pub async fn generate_bracket(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<BracketSlot>> {
        let mut tx = self.store.begin().await?;
        let tournament = lock(tx.as_mut(), tournament_id).await?;

        {
            let mut draw = self.draw.lock().await;
            builder::build(tx.as_mut(), &tournament, &mut draw).await?;
        }
        let slots = tx.find_slots(tournament_id, &SlotFilter::default()).await?;
        tx.commit().await?;

        Ok(sorted(slots))
    }

    /// Bracket of a tournament, generating it on first access.
    ///
    /// Pending byes are resolved before the slots are returned.
    pub async fn bracket(&self, tournament_id: TournamentId) -> BracketResult<Vec<BracketSlot>> {
        Ok(self.open_bracket(tournament_id).await?.slots)
    }

    /// Same as [`bracket`](Self::bracket), reporting whether this call built it.
    ///
    /// The existence check and the build share the tournament lock, so of
    /// several concurrent first reads exactly one sees `built`.
    pub async fn open_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        let mut tx = self.store.begin().await?;
        let tournament = lock(tx.as_mut(), tournament_id).await?;

        let built = if tournament.is_bracketed {
            None
        } else {
            let mut draw = self.draw.lock().await;
            Some(builder::build(tx.as_mut(), &tournament, &mut draw).await?)
        };
        byes::resolve_byes(tx.as_mut(), tournament_id).await?;

        let slots = tx.find_slots(tournament_id, &SlotFilter::default()).await?;
        tx.commit().await?;

        Ok(BracketView {
            slots: sorted(slots),
            built,
        })
    }

    /// Resolve every pending bye of a tournament.
    ///
    /// Idempotent: a second call with nothing new to resolve returns an
    /// empty list.
    pub async fn resolve_byes(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<BracketSlot>> {
        let mut tx = self.store.begin().await?;
        lock(tx.as_mut(), tournament_id).await?;

        let affected = byes::resolve_byes(tx.as_mut(), tournament_id).await?;
        tx.commit().await?;

        Ok(affected)
    }

    /// Record the result of a match and advance its winner.
    ///
    /// # Errors
    ///
    /// * `BracketError::SlotNotFound` - Unknown slot
    /// * `BracketError::SlotTournamentMismatch` - Slot of another tournament
    /// * `BracketError::ResultAlreadyRecorded` - Slot already decided
    /// * `BracketError::SlotNotReady` - Slot lacks a competitor
    /// * `BracketError::InvalidScore` - Tie or negative score
    /// * `BracketError::BracketInvariantViolation` - No destination for the winner
    pub async fn record_result(
        &self,
        slot_id: SlotId,
        tournament_id: TournamentId,
        score_a: i32,
        score_b: i32,
    ) -> BracketResult<BracketSlot> {
        let mut tx = self.store.begin().await?;

        let (decided, _) =
            results::record(tx.as_mut(), slot_id, tournament_id, score_a, score_b).await?;
        byes::resolve_byes(tx.as_mut(), tournament_id).await?;
        progression::refresh_finalized(tx.as_mut(), tournament_id).await?;

        tx.commit().await?;
        Ok(decided)
    }

    /// Final placings of a tournament
    ///
    /// # Errors
    ///
    /// * `BracketError::TournamentNotFound` - Unknown tournament
    /// * `BracketError::TournamentNotBracketed` - No bracket yet
    /// * `BracketError::StandingsPending` - Neither the final nor the third-place match is decided
    pub async fn standings(&self, tournament_id: TournamentId) -> BracketResult<Standings> {
        let mut tx = self.store.begin().await?;
        let tournament = tx
            .get_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        if !tournament.is_bracketed {
            return Err(BracketError::TournamentNotBracketed(tournament_id));
        }

        let competitors = tx.list_competitors(tournament_id).await?;
        let find = |id: Option<CompetitorId>| {
            id.and_then(|id| competitors.iter().find(|c| c.id == id).cloned())
        };

        let mut standings = Standings::default();
        for slot in tx
            .find_slots(tournament_id, &SlotFilter::default())
            .await?
            .into_iter()
            .filter(|s| s.winner.is_some())
        {
            match slot.round {
                FINAL_ROUND => {
                    standings.champion = find(slot.winner);
                    standings.runner_up = find(slot.loser());
                }
                THIRD_PLACE_ROUND => {
                    standings.third = find(slot.winner);
                    standings.fourth = find(slot.loser());
                }
                _ => {}
            }
        }

        if standings.is_pending() {
            return Err(BracketError::StandingsPending(tournament_id));
        }
        Ok(standings)
    }
}

async fn lock(tx: &mut dyn StoreTx, tournament_id: TournamentId) -> BracketResult<Tournament> {
    tx.lock_tournament(tournament_id)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))
}

/// Presentation order: earliest round first, then group, then creation order
fn sorted(mut slots: Vec<BracketSlot>) -> Vec<BracketSlot> {
    slots.sort_by(|a, b| {
        b.round
            .cmp(&a.round)
            .then(a.group.cmp(&b.group))
            .then(a.id.cmp(&b.id))
    });
    slots
}
