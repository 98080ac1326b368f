//! Bracket and match result API handlers.
//!
//! # Examples
//!
//! Fetch the bracket (generated on first access):
//! ```bash
//! curl http://localhost:8080/api/v1/tournaments/1/matches
//! ```
//!
//! Record a result:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/matches/12 \
//!   -H "Content-Type: application/json" \
//!   -d '{"score_a": 3, "score_b": 1}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use knockout::bracket::{
    BracketSlot, CompetitorId, FINAL_ROUND, Group, SlotId, SlotState, TournamentId,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::errors::ApiError;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    pub score_a: i32,
    pub score_b: i32,
}

/// One bracket slot as presented to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub id: SlotId,
    pub round: i32,
    pub round_label: String,
    pub group: Group,
    pub competitor_a: Option<CompetitorId>,
    pub competitor_b: Option<CompetitorId>,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
    pub winner: Option<CompetitorId>,
    pub is_bye: bool,
    pub state: SlotState,
}

impl From<BracketSlot> for MatchResponse {
    fn from(slot: BracketSlot) -> Self {
        Self {
            round_label: slot.round_label().to_string(),
            state: slot.state(),
            id: slot.id,
            round: slot.round,
            group: slot.group,
            competitor_a: slot.competitor_a,
            competitor_b: slot.competitor_b,
            score_a: slot.score_a,
            score_b: slot.score_b,
            winner: slot.winner,
            is_bye: slot.is_bye,
        }
    }
}

/// Bracket of a tournament, first round first.
///
/// Generates the bracket when the tournament has none yet; registration is
/// closed from then on.
///
/// # Errors
///
/// - `404 Not Found`: Unknown tournament
/// - `422 Unprocessable Entity`: Fewer than two competitors
pub async fn list_matches(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<MatchResponse>>, ApiError> {
    let view = state.manager.open_bracket(tournament_id).await?;
    if let Some(built) = view.built {
        metrics::brackets_generated_total(built.competitors);
    }

    Ok(Json(view.slots.into_iter().map(MatchResponse::from).collect()))
}

/// Record the result of a ready match.
///
/// Returns `201 Created` with the decided slot.
///
/// # Errors
///
/// - `404 Not Found`: Unknown slot
/// - `409 Conflict`: Slot belongs to another tournament
/// - `422 Unprocessable Entity`: Result already recorded, slot not ready, or tied/negative score
pub async fn record_result(
    State(state): State<AppState>,
    Path((tournament_id, slot_id)): Path<(TournamentId, SlotId)>,
    Json(request): Json<RecordResultRequest>,
) -> Result<(StatusCode, Json<MatchResponse>), ApiError> {
    let slot = state
        .manager
        .record_result(slot_id, tournament_id, request.score_a, request.score_b)
        .await?;

    metrics::results_recorded_total(&slot.round_label().to_string());
    if slot.round <= FINAL_ROUND {
        let finalized = state
            .manager
            .get_tournament(tournament_id)
            .await
            .is_ok_and(|t| t.is_finalized);
        if finalized {
            metrics::tournaments_finalized_total();
        }
    }

    Ok((StatusCode::CREATED, Json(MatchResponse::from(slot))))
}
