//! HTTP API for the bracket server.
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                        - Store health (public)
//! POST /api/v1/tournaments                            - Create tournament
//! GET  /api/v1/tournaments?id=&name=                  - Search tournaments
//! POST /api/v1/tournaments/{id}/competitors           - Register competitor
//! GET  /api/v1/tournaments/{id}/competitors           - List competitors
//! GET  /api/v1/tournaments/{id}/matches               - Bracket (generated on first access)
//! POST /api/v1/tournaments/{id}/matches/{slot_id}     - Record a result
//! GET  /api/v1/tournaments/{id}/standings             - Final placings
//! ```
//!
//! Errors are returned as `{"error": "<message>"}` with the status chosen by
//! [`errors::status_for`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ko_server::api::{AppState, create_router};
//! use knockout::{BracketManager, MemoryBracketStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = BracketManager::new(Arc::new(MemoryBracketStore::new()));
//! let app = create_router(AppState { manager });
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively.

pub mod errors;
pub mod matches;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use knockout::BracketManager;
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: BracketManager,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tournaments",
            get(tournaments::search_tournaments).post(tournaments::create_tournament),
        )
        .route(
            "/tournaments/{id}/competitors",
            get(tournaments::list_competitors).post(tournaments::register_competitor),
        )
        .route("/tournaments/{id}/matches", get(matches::list_matches))
        .route(
            "/tournaments/{id}/matches/{slot_id}",
            post(matches::record_result),
        )
        .route("/tournaments/{id}/standings", get(tournaments::standings))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the entity store answers, `503 Service Unavailable`
/// otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = state.manager.store().health_check().await.is_ok();

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
