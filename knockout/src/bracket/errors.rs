//! Bracket engine error types.

use super::models::{SlotId, TournamentId};
use crate::db::StoreError;
use thiserror::Error;

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Tournament does not exist
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Registration or bracket generation after the bracket was built
    #[error("Tournament {0} is already bracketed")]
    TournamentAlreadyBracketed(TournamentId),

    /// Standings requested before the bracket exists
    #[error("Tournament {0} has not been bracketed yet")]
    TournamentNotBracketed(TournamentId),

    /// Not enough competitors to build a bracket
    #[error("Insufficient competitors: need {needed}, have {current}")]
    InsufficientCompetitors { needed: usize, current: usize },

    /// Slot does not exist
    #[error("Bracket slot not found: {0}")]
    SlotNotFound(SlotId),

    /// Slot belongs to another tournament
    #[error("Bracket slot {slot_id} does not belong to tournament {tournament_id}")]
    SlotTournamentMismatch {
        slot_id: SlotId,
        tournament_id: TournamentId,
    },

    /// Result already stored for the slot
    #[error("Result already recorded for slot {0}")]
    ResultAlreadyRecorded(SlotId),

    /// Slot is missing one or both competitors
    #[error("Slot {0} is not ready to receive a result")]
    SlotNotReady(SlotId),

    /// Equal or negative scores
    #[error("Invalid score: {score_a} x {score_b}")]
    InvalidScore { score_a: i32, score_b: i32 },

    /// Neither the final nor the third-place match is decided
    #[error("Standings for tournament {0} are not available yet")]
    StandingsPending(TournamentId),

    /// The bracket tree is inconsistent
    #[error("Bracket invariant violated: {0}")]
    BracketInvariantViolation(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl BracketError {
    /// Errors the caller must not map to a user-facing outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BracketError::BracketInvariantViolation(_)
                | BracketError::Store(StoreError::Database(_))
        )
    }

    /// Stable name of the error kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            BracketError::TournamentNotFound(_) => "tournament_not_found",
            BracketError::TournamentAlreadyBracketed(_) => "tournament_already_bracketed",
            BracketError::TournamentNotBracketed(_) => "tournament_not_bracketed",
            BracketError::InsufficientCompetitors { .. } => "insufficient_competitors",
            BracketError::SlotNotFound(_) => "slot_not_found",
            BracketError::SlotTournamentMismatch { .. } => "slot_tournament_mismatch",
            BracketError::ResultAlreadyRecorded(_) => "result_already_recorded",
            BracketError::SlotNotReady(_) => "slot_not_ready",
            BracketError::InvalidScore { .. } => "invalid_score",
            BracketError::StandingsPending(_) => "standings_pending",
            BracketError::BracketInvariantViolation(_) => "bracket_invariant_violation",
            BracketError::Store(_) => "store",
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage and invariant details describe internal structure and are
    /// replaced by a generic message.
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Store(StoreError::NotFound { entity, .. }) => {
                format!("{entity} not found")
            }
            BracketError::Store(_) | BracketError::BracketInvariantViolation(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invariant_and_database_errors_are_fatal() {
        assert!(BracketError::BracketInvariantViolation("x".into()).is_fatal());
        assert!(BracketError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)).is_fatal());
        assert!(!BracketError::ResultAlreadyRecorded(1).is_fatal());
        assert!(!BracketError::SlotNotReady(1).is_fatal());
        assert!(!BracketError::Store(StoreError::Constraint("dup".into())).is_fatal());
    }

    #[test]
    fn test_client_message_hides_internals() {
        let err = BracketError::BracketInvariantViolation("no open slot in round 3".into());
        assert_eq!(err.client_message(), "Internal server error");

        let err = BracketError::Store(StoreError::NotFound {
            entity: "slot",
            id: 42,
        });
        assert_eq!(err.client_message(), "slot not found");

        let err = BracketError::InvalidScore {
            score_a: 2,
            score_b: 2,
        };
        assert_eq!(err.client_message(), "Invalid score: 2 x 2");
    }
}
