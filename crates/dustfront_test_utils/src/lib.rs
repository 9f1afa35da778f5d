//! # Dustfront Test Utils
//!
//! Shared fixtures for integration tests: canned game setups, a
//! scenario clock, and spawn helpers.

#![forbid(unsafe_code)]

pub mod fixtures;

pub use fixtures::{
    clear_obstacles, duel_game, duel_setup, open_duel_game, run_secs, run_ticks, ScenarioLog,
};
