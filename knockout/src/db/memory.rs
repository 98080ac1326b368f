//! In-memory entity store.
//!
//! Transactions are serialized: `begin` takes an owned lock on the whole
//! state and works on a copy that replaces the state on `commit`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{BracketStore, StoreError, StoreResult, StoreTx};
use crate::bracket::models::{
    BracketSlot, Competitor, FINAL_ROUND, Group, SlotFilter, SlotId, SlotSpec, SlotUpdate,
    THIRD_PLACE_ROUND, Tournament, TournamentId,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tournaments: BTreeMap<TournamentId, Tournament>,
    competitors: BTreeMap<i64, Competitor>,
    slots: BTreeMap<SlotId, BracketSlot>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tournament_mut(&mut self, id: TournamentId) -> StoreResult<&mut Tournament> {
        self.tournaments.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "tournament",
            id,
        })
    }
}

/// In-memory store for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryBracketStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBracketStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BracketStore for MemoryBracketStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Open in-memory transaction
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn create_tournament(&mut self, name: &str) -> StoreResult<Tournament> {
        let id = self.work.next_id();
        let tournament = Tournament {
            id,
            name: name.to_string(),
            competitor_count: 0,
            is_bracketed: false,
            is_finalized: false,
            created_at: Utc::now(),
        };
        self.work.tournaments.insert(id, tournament.clone());
        Ok(tournament)
    }

    async fn get_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.work.tournaments.get(&id).cloned())
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        // The whole state is already held by this transaction.
        self.get_tournament(id).await
    }

    async fn search_tournaments(&mut self, name: Option<&str>) -> StoreResult<Vec<Tournament>> {
        let needle = name.map(str::to_lowercase);
        Ok(self
            .work
            .tournaments
            .values()
            .filter(|t| {
                needle
                    .as_deref()
                    .is_none_or(|needle| t.name.to_lowercase().contains(needle))
            })
            .cloned()
            .collect())
    }

    async fn set_bracketed(&mut self, id: TournamentId) -> StoreResult<()> {
        self.work.tournament_mut(id)?.is_bracketed = true;
        Ok(())
    }

    async fn set_finalized(&mut self, id: TournamentId) -> StoreResult<()> {
        self.work.tournament_mut(id)?.is_finalized = true;
        Ok(())
    }

    async fn set_competitor_count(&mut self, id: TournamentId, count: i64) -> StoreResult<()> {
        self.work.tournament_mut(id)?.competitor_count = count;
        Ok(())
    }

    async fn create_competitor(
        &mut self,
        name: &str,
        tournament_id: TournamentId,
    ) -> StoreResult<Competitor> {
        if !self.work.tournaments.contains_key(&tournament_id) {
            return Err(StoreError::NotFound {
                entity: "tournament",
                id: tournament_id,
            });
        }

        let id = self.work.next_id();
        let competitor = Competitor {
            id,
            name: name.to_string(),
            tournament_id,
        };
        self.work.competitors.insert(id, competitor.clone());
        Ok(competitor)
    }

    async fn list_competitors(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Competitor>> {
        Ok(self
            .work
            .competitors
            .values()
            .filter(|c| c.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn count_competitors(&mut self, tournament_id: TournamentId) -> StoreResult<i64> {
        let count = self
            .work
            .competitors
            .values()
            .filter(|c| c.tournament_id == tournament_id)
            .count();
        Ok(count as i64)
    }

    async fn create_slots(&mut self, specs: &[SlotSpec]) -> StoreResult<Vec<BracketSlot>> {
        let mut created = Vec::with_capacity(specs.len());
        for spec in specs {
            if !self.work.tournaments.contains_key(&spec.tournament_id) {
                return Err(StoreError::NotFound {
                    entity: "tournament",
                    id: spec.tournament_id,
                });
            }
            // Mirrors the unique index on the final and third-place slots.
            if spec.group == Group::F
                && matches!(spec.round, FINAL_ROUND | THIRD_PLACE_ROUND)
                && self.work.slots.values().any(|s| {
                    s.tournament_id == spec.tournament_id
                        && s.group == Group::F
                        && s.round == spec.round
                })
            {
                return Err(StoreError::Constraint(format!(
                    "duplicate round {} slot for tournament {}",
                    spec.round, spec.tournament_id
                )));
            }

            let id = self.work.next_id();
            let slot = BracketSlot {
                id,
                tournament_id: spec.tournament_id,
                round: spec.round,
                group: spec.group,
                competitor_a: spec.competitor_a,
                competitor_b: spec.competitor_b,
                score_a: None,
                score_b: None,
                winner: spec.winner,
                is_bye: spec.is_bye,
                bye_resolved: false,
            };
            self.work.slots.insert(id, slot.clone());
            created.push(slot);
        }
        Ok(created)
    }

    async fn get_slot(&mut self, id: SlotId) -> StoreResult<Option<BracketSlot>> {
        Ok(self.work.slots.get(&id).cloned())
    }

    async fn find_slots(
        &mut self,
        tournament_id: TournamentId,
        filter: &SlotFilter,
    ) -> StoreResult<Vec<BracketSlot>> {
        Ok(self
            .work
            .slots
            .values()
            .filter(|s| s.tournament_id == tournament_id && filter.matches(s))
            .cloned()
            .collect())
    }

    async fn update_slot(&mut self, id: SlotId, update: &SlotUpdate) -> StoreResult<BracketSlot> {
        let slot = self
            .work
            .slots
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "slot", id })?;
        update.apply_to(slot);
        Ok(slot.clone())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
