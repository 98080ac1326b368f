//! Knockout bracket engine.
//!
//! A tournament's competitors are split into two groups (A and B), each
//! playing its own elimination tree down to a group semifinal. The two group
//! winners meet in the final; the two semifinal losers meet for third place.
//!
//! Rounds are numbered by distance from the final: the final is round 1, the
//! third-place match round 0, and the first round played is the largest
//! number. Slots in rounds with an odd number of entering competitors may be
//! flagged as byes and are awarded to their lone occupant without a score.
//!
//! ## Example
//!
//! ```no_run
//! use knockout::bracket::{BracketManager, Draw};
//! use knockout::db::MemoryBracketStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryBracketStore::new());
//!     let manager = BracketManager::with_draw(store, Draw::ordered());
//!
//!     let tournament = manager.create_tournament("Spring Open").await?;
//!     for name in ["Ana", "Bo", "Cy", "Di"] {
//!         manager.register_competitor(tournament.id, name).await?;
//!     }
//!
//!     let slots = manager.bracket(tournament.id).await?;
//!     println!("{} slots", slots.len());
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod byes;
pub mod draw;
pub mod errors;
pub mod manager;
pub mod models;
pub mod plan;
pub mod progression;
pub mod results;

pub use builder::{BuildSummary, MIN_COMPETITORS};
pub use draw::Draw;
pub use errors::{BracketError, BracketResult};
pub use manager::{BracketManager, BracketView};
pub use models::{
    BracketSlot, Competitor, CompetitorId, FINAL_ROUND, Group, LAST_GROUP_ROUND, RoundLabel,
    Seat, SlotFilter, SlotId, SlotSpec, SlotState, SlotUpdate, Standings, THIRD_PLACE_ROUND,
    Tournament, TournamentFilter, TournamentId,
};
pub use plan::{BracketPlan, first_round_number};
pub use progression::Advancement;
