//! Transient combat entities: projectiles, beams, and field effects.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::targets::{EntityId, TargetId};
use crate::weapons::{ElevationMask, OrdinanceKind};

/// A projectile in flight.
///
/// Projectiles advance by their velocity each tick and detonate when
/// they reach their aim point (or their homing target). Collision with
/// the intended victim is resolved by proximity, not by the physics
/// world; projectiles never carry rigid bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Entity id.
    pub id: EntityId,
    /// Ordinance classification (drives client rendering and AoE rules).
    pub kind: OrdinanceKind,
    /// Current position.
    pub position: Vec2,
    /// Current velocity (world units per second).
    pub velocity: Vec2,
    /// Travel speed, kept for homing re-aim.
    pub speed: f32,
    /// Damage applied on impact.
    pub damage: f32,
    /// Team of the shooter (friendly-fire filtering).
    pub team: u8,
    /// Entity that fired this projectile.
    pub source: EntityId,
    /// Aim point the projectile detonates at.
    pub aim_point: Vec2,
    /// Homing target; `None` for ballistic shots.
    pub homing: Option<TargetId>,
    /// Elevations the warhead can damage.
    pub hits: ElevationMask,
    /// Area-of-effect radius, zero for single-target.
    pub aoe_radius: f32,
    /// Whether area damage also hits the shooter's team.
    pub friendly_fire: bool,
    /// Remaining travel distance before the projectile fizzles.
    pub remaining_range: f32,
}

impl Projectile {
    /// Distance at which a projectile is considered to have arrived.
    pub const IMPACT_THRESHOLD: f32 = 8.0;
}

/// Beam flavor, for rendering and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeamKind {
    /// Short electric arc from arc tanks.
    Arc,
    /// Long tesla discharge from defensive towers.
    Tesla,
}

/// An instant-hit beam. Damage is applied when the beam spawns; the
/// entity lingers only so clients can draw it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    /// Entity id.
    pub id: EntityId,
    /// Beam flavor.
    pub kind: BeamKind,
    /// Ray origin.
    pub start: Vec2,
    /// Ray end (the struck target).
    pub end: Vec2,
    /// Tick the beam appeared.
    pub spawned_tick: u64,
    /// Ticks the beam stays visible.
    pub duration_ticks: u64,
}

impl Beam {
    /// True once the beam's display window has elapsed.
    #[must_use]
    pub fn is_expired(&self, tick: u64) -> bool {
        tick >= self.spawned_tick + self.duration_ticks
    }
}

/// Field effect flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldEffectKind {
    /// One-shot blast: damages everything in radius at spawn.
    Explosion,
    /// Crackling residual charge, periodic damage.
    Electric,
    /// Wandering sandstorm, periodic damage.
    Sandstorm,
    /// Air-burst flak cloud.
    FlakExplosion,
    /// Burning ground, periodic damage.
    Fire,
}

impl FieldEffectKind {
    /// Effects that apply damage repeatedly while entities stand inside.
    #[must_use]
    pub const fn has_periodic_damage(self) -> bool {
        matches!(self, Self::Electric | Self::Sandstorm | Self::Fire)
    }
}

/// A transient area entity applying damage or visuals over a lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldEffect {
    /// Entity id.
    pub id: EntityId,
    /// Effect flavor.
    pub kind: FieldEffectKind,
    /// Center of the area.
    pub center: Vec2,
    /// Area radius.
    pub radius: f32,
    /// Damage applied per damage interval (or once, for blasts).
    pub damage: f32,
    /// Team that created the effect.
    pub team: u8,
    /// Whether the effect damages its own team.
    pub friendly_fire: bool,
    /// Tick the effect expires.
    pub expires_tick: u64,
    /// Next tick at which periodic damage applies.
    pub next_damage_tick: u64,
}

impl FieldEffect {
    /// True once the lifetime has elapsed.
    #[must_use]
    pub fn is_expired(&self, tick: u64) -> bool {
        tick >= self.expires_tick
    }

    /// True if `point` lies inside the effect area.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beam_expiry() {
        let beam = Beam {
            id: 1,
            kind: BeamKind::Arc,
            start: Vec2::ZERO,
            end: Vec2::new(10.0, 0.0),
            spawned_tick: 100,
            duration_ticks: 12,
        };
        assert!(!beam.is_expired(111));
        assert!(beam.is_expired(112));
    }

    #[test]
    fn test_effect_containment() {
        let effect = FieldEffect {
            id: 2,
            kind: FieldEffectKind::Fire,
            center: Vec2::new(50.0, 50.0),
            radius: 20.0,
            damage: 4.0,
            team: 1,
            friendly_fire: true,
            expires_tick: 600,
            next_damage_tick: 30,
        };
        assert!(effect.contains(Vec2::new(60.0, 50.0)));
        assert!(!effect.contains(Vec2::new(80.0, 50.0)));
    }

    #[test]
    fn test_periodic_damage_kinds() {
        assert!(FieldEffectKind::Fire.has_periodic_damage());
        assert!(FieldEffectKind::Sandstorm.has_periodic_damage());
        assert!(FieldEffectKind::Electric.has_periodic_damage());
        assert!(!FieldEffectKind::Explosion.has_periodic_damage());
        assert!(!FieldEffectKind::FlakExplosion.has_periodic_damage());
    }
}
