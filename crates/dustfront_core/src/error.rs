//! Error types for the game simulation.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u32),

    /// Referenced faction does not exist in this game.
    #[error("Unknown faction: {0}")]
    UnknownFaction(u32),

    /// Not enough credits for the requested action.
    #[error("Insufficient credits: need {required}, have {available}")]
    InsufficientCredits {
        /// Credits required.
        required: i64,
        /// Credits available.
        available: i64,
    },

    /// Producing the unit would exceed the faction's upkeep cap.
    #[error("Upkeep cap exceeded: {current} + {additional} > {cap}")]
    UpkeepExceeded {
        /// Current upkeep in use.
        current: u32,
        /// Upkeep the new unit would add.
        additional: u32,
        /// Faction upkeep cap.
        cap: u32,
    },

    /// Research prerequisites not met or slots full.
    #[error("Research unavailable: {0}")]
    ResearchUnavailable(String),

    /// The game is full.
    #[error("Game is full ({0} players)")]
    GameFull(usize),

    /// The global concurrent-game cap was hit.
    #[error("Game capacity reached (cap {0})")]
    GameCapReached(usize),

    /// An unknown or expired session token was presented.
    #[error("Invalid session token")]
    InvalidSessionToken,

    /// Failed to parse a balance data override file.
    #[error("Failed to parse data '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
