//! HTTP front end for the knockout bracket engine.
//!
//! The binary in `main.rs` wires configuration, logging, metrics and the
//! chosen entity store into the router built by [`api::create_router`].

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
