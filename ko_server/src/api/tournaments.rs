//! Tournament and competitor API handlers.
//!
//! # Examples
//!
//! Create a tournament and register a competitor:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Spring Open"}'
//!
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/competitors \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Ana"}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use knockout::bracket::{Competitor, Standings, Tournament, TournamentFilter, TournamentId};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterCompetitorRequest {
    pub name: String,
}

/// Query string of the tournament search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub id: Option<TournamentId>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Create a tournament.
///
/// Returns `201 Created` with `{"id": <tournament id>}`.
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(request): Json<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let tournament = state.manager.create_tournament(&request.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse { id: tournament.id }),
    ))
}

/// Search tournaments by exact id or case-insensitive name.
///
/// Without a filter every tournament is returned.
///
/// # Errors
///
/// - `404 Not Found`: `id` given but unknown
pub async fn search_tournaments(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Tournament>>, ApiError> {
    let filter = TournamentFilter {
        id: query.id,
        name: query.name,
    };
    Ok(Json(state.manager.search_tournaments(&filter).await?))
}

/// Register a competitor.
///
/// Returns `201 Created` with `{"id": <competitor id>}`.
///
/// # Errors
///
/// - `404 Not Found`: Unknown tournament
/// - `403 Forbidden`: Bracket already generated
pub async fn register_competitor(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<RegisterCompetitorRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let competitor = state
        .manager
        .register_competitor(tournament_id, &request.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse { id: competitor.id }),
    ))
}

/// List the competitors of a tournament in registration order.
pub async fn list_competitors(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Competitor>>, ApiError> {
    Ok(Json(state.manager.list_competitors(tournament_id).await?))
}

/// Top four of a tournament.
///
/// # Errors
///
/// - `404 Not Found`: Unknown tournament
/// - `409 Conflict`: No bracket yet, or neither final nor third-place match decided
pub async fn standings(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Standings>, ApiError> {
    Ok(Json(state.manager.standings(tournament_id).await?))
}
