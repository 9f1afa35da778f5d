//! The targetable capability shared by units, buildings, and wall segments.
//!
//! Combat code never holds references to concrete entities across ticks.
//! A [`TargetId`] is stored instead and re-resolved through the entity
//! store every tick; a failed lookup is the natural "target is gone"
//! completion signal for the owning command.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Unique identifier for entities. Monotonic per game across all
/// entity families; an id is never reused within a game.
pub type EntityId = u32;

/// Flight layer of a unit. Weapons declare which layers they can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Elevation {
    /// Ground units, buildings, walls.
    #[default]
    Ground,
    /// Low-flying craft: helicopters, drones, gunships.
    Low,
    /// High-altitude craft: bombers, interceptors.
    High,
}

/// Discriminates the entity family a target belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    /// A mobile unit.
    Unit,
    /// A placed building.
    Building,
    /// A wall segment.
    WallSegment,
}

/// A reference to a targetable entity, stored by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetId {
    /// Target is a unit.
    Unit(EntityId),
    /// Target is a building.
    Building(EntityId),
    /// Target is a wall segment.
    Wall(EntityId),
}

impl TargetId {
    /// The underlying entity id.
    #[must_use]
    pub const fn entity_id(self) -> EntityId {
        match self {
            Self::Unit(id) | Self::Building(id) | Self::Wall(id) => id,
        }
    }

    /// The entity family of this target.
    #[must_use]
    pub const fn kind(self) -> TargetKind {
        match self {
            Self::Unit(_) => TargetKind::Unit,
            Self::Building(_) => TargetKind::Building,
            Self::Wall(_) => TargetKind::WallSegment,
        }
    }
}

/// Capability shared by every entity that combat can damage.
///
/// Implemented by `Unit`, `Building`, and `WallSegment`. The resolver
/// works exclusively through this trait; the only downcast in the
/// codebase is the unit-only predictive-aim path.
pub trait Targetable {
    /// Entity id.
    fn id(&self) -> EntityId;
    /// World position.
    fn position(&self) -> Vec2;
    /// Team number; same-team entities never target each other.
    fn team(&self) -> u8;
    /// Flight layer for elevation-capability checks.
    fn elevation(&self) -> Elevation;
    /// Radius added to weapon range when resolving effective range.
    fn target_size(&self) -> f32;
    /// Entity family tag.
    fn target_kind(&self) -> TargetKind;
    /// False once destroyed or otherwise removed from play.
    fn is_active(&self) -> bool;
    /// Whether the entity is currently cloaked. Cloaked entities are
    /// only targetable within the observer's cloak detection range.
    fn is_cloaked(&self) -> bool {
        false
    }
    /// Apply damage from `source`. Health clamps at zero; the store
    /// culls inactive entities at the end of the tick.
    fn take_damage(&mut self, amount: f32, source: EntityId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_id_accessors() {
        assert_eq!(TargetId::Unit(7).entity_id(), 7);
        assert_eq!(TargetId::Building(9).kind(), TargetKind::Building);
        assert_eq!(TargetId::Wall(3).kind(), TargetKind::WallSegment);
    }

    #[test]
    fn test_elevation_wire_strings() {
        let s = serde_json::to_string(&Elevation::Low).unwrap();
        assert_eq!(s, "\"LOW\"");
    }
}
