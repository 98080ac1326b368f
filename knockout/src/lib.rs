//! # Knockout
//!
//! A single-elimination tournament engine with a third-place match.
//!
//! Competitors register against a tournament; once the bracket is generated
//! registration closes and the engine tracks every match from the first
//! round to the final. Rounds with an odd number of entrants carry bye
//! slots, which are resolved automatically as competitors arrive in them.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Bracket building, bye resolution, result recording and progression
//! - [`db`]: Transactional storage (PostgreSQL and in-memory)
//!
//! Every engine operation runs inside a single store transaction: it either
//! commits completely or leaves the store untouched.

/// Bracket engine.
pub mod bracket;
pub use bracket::{
    BracketError, BracketManager, BracketResult, BracketSlot, Competitor, Draw, Group, Standings,
    Tournament,
};

/// Storage layer.
pub mod db;
pub use db::{BracketStore, Database, DatabaseConfig, MemoryBracketStore, PgBracketStore};
