//! Mapping of engine errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use knockout::{BracketError, db::StoreError};
use serde::{Deserialize, Serialize};

use crate::{logging, metrics};

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Engine error on its way to the client
#[derive(Debug)]
pub struct ApiError(pub BracketError);

impl From<BracketError> for ApiError {
    fn from(error: BracketError) -> Self {
        ApiError(error)
    }
}

/// HTTP status for an engine error
pub fn status_for(error: &BracketError) -> StatusCode {
    if error.is_fatal() {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    match error {
        BracketError::TournamentNotFound(_)
        | BracketError::SlotNotFound(_)
        | BracketError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        BracketError::TournamentAlreadyBracketed(_) => StatusCode::FORBIDDEN,
        BracketError::SlotTournamentMismatch { .. }
        | BracketError::TournamentNotBracketed(_)
        | BracketError::StandingsPending(_)
        | BracketError::Store(StoreError::Constraint(_)) => StatusCode::CONFLICT,
        BracketError::ResultAlreadyRecorded(_)
        | BracketError::SlotNotReady(_)
        | BracketError::InvalidScore { .. }
        | BracketError::InsufficientCompetitors { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        metrics::bracket_errors_total(self.0.kind());

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            logging::log_engine_failure(self.0.kind(), &self.0.to_string());
        } else {
            tracing::debug!(error_kind = self.0.kind(), "Request rejected: {}", self.0);
        }

        let body = ErrorResponse {
            error: self.0.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&BracketError::TournamentNotFound(1)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&BracketError::TournamentAlreadyBracketed(1)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&BracketError::SlotTournamentMismatch {
                slot_id: 1,
                tournament_id: 2
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&BracketError::InvalidScore {
                score_a: 1,
                score_b: 1
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&BracketError::BracketInvariantViolation("broken".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response =
            ApiError(BracketError::BracketInvariantViolation("slot 7 full".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
