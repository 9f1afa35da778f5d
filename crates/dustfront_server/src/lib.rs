//! # Dustfront Dedicated Server
//!
//! Headless dedicated server: lobby, matchmaking, sessions, and one
//! tokio task per running game. The simulation itself lives in
//! `dustfront_core`; this crate only moves messages in and out of it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod http;
pub mod lobby;
pub mod protocol;
pub mod runner;
pub mod session;

/// Identifier of a game, as it appears in URLs.
pub type GameId = String;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Maximum concurrent games (active plus matchmaking).
    pub max_games: usize,
    /// Maximum players per game.
    pub max_players: u8,
    /// Tick rate (matches the simulation core).
    pub tick_rate: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7777,
            max_games: 64,
            max_players: 4,
            tick_rate: dustfront_core::config::TICK_RATE,
        }
    }
}
