//! # Dustfront Core
//!
//! Authoritative server-side simulation core for Dustfront, a
//! multiplayer 2D real-time-strategy game.
//!
//! This crate contains **only** simulation logic:
//! - No networking
//! - No rendering
//! - No IO
//!
//! Clients are thin renderers: the server owns all truth about entity
//! positions, combat, the economy, research, and victory. Each game is
//! a self-contained [`game::Game`] advanced by a fixed 60 Hz tick;
//! parallelism lives at the game granularity, never inside a tick.
//!
//! ## Crate Structure
//!
//! - [`game`] - per-game simulation loop
//! - [`command`] - the per-unit command state machine
//! - [`entities`] - entity store and target resolution
//! - [`combat`] - weapon firing, projectiles, beams, field effects
//! - [`economy`] - credits, upkeep, power, production, research
//! - [`physics`] - rigid-body world wrapper
//! - [`pathfinding`] - occupancy-grid A*
//! - [`snapshot`] - per-client world projection
//! - [`data`] - balance tables

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buildings;
pub mod combat;
pub mod command;
pub mod config;
pub mod data;
pub mod economy;
pub mod entities;
pub mod error;
pub mod events;
pub mod factions;
pub mod game;
pub mod input;
pub mod map;
pub mod math;
pub mod obstacles;
pub mod ordinance;
pub mod pathfinding;
pub mod physics;
pub mod snapshot;
pub mod targets;
pub mod units;
pub mod weapons;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{Building, BuildingKind, WallSegment};
    pub use crate::command::{CommandStatus, UnitCommand};
    pub use crate::config::{world_size_for_players, GameConfig, TICK_DT, TICK_RATE};
    pub use crate::entities::{GameEntities, ScanParams, TargetInfo};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventCategory, GameEvent};
    pub use crate::factions::{Faction, FactionKind};
    pub use crate::game::{Game, GameOver, GameSetup, PlayerSlot, TickOutput};
    pub use crate::input::{PlayerInput, WirePoint};
    pub use crate::map::{Biome, Density};
    pub use crate::math::Vec2;
    pub use crate::obstacles::{Obstacle, ObstacleShape, ResourceKind};
    pub use crate::ordinance::{Beam, FieldEffect, FieldEffectKind, Projectile};
    pub use crate::snapshot::GameStateSnapshot;
    pub use crate::targets::{Elevation, EntityId, TargetId, Targetable};
    pub use crate::units::{AiStance, PlayerId, Unit, UnitKind};
    pub use crate::weapons::{ElevationMask, OrdinanceKind, Weapon, WeaponSpec};
}
