//! Weapon definitions and firing state.
//!
//! A weapon couples a static spec (range, damage, rate of fire, ordinance
//! kind, elevation capability) with per-instance cooldown state. Firing
//! itself, spawning projectiles and beams, lives in [`crate::combat`].

use serde::{Deserialize, Serialize};

use crate::targets::Elevation;

/// Bit set of elevations a weapon can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevationMask(u8);

impl ElevationMask {
    /// Ground only.
    pub const GROUND: Self = Self(0b001);
    /// Low air only.
    pub const LOW: Self = Self(0b010);
    /// High air only.
    pub const HIGH: Self = Self(0b100);
    /// Ground and low air.
    pub const GROUND_LOW: Self = Self(0b011);
    /// Both air layers, no ground.
    pub const AIR: Self = Self(0b110);
    /// Every elevation.
    pub const ALL: Self = Self(0b111);

    /// Mask covering nothing.
    pub const NONE: Self = Self(0);

    /// True if the mask covers the given elevation.
    #[must_use]
    pub const fn contains(self, elevation: Elevation) -> bool {
        let bit = match elevation {
            Elevation::Ground => 0b001,
            Elevation::Low => 0b010,
            Elevation::High => 0b100,
        };
        self.0 & bit != 0
    }
}

impl std::ops::BitOr for ElevationMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for ElevationMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// What a weapon emits when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrdinanceKind {
    /// Fast small-arms round.
    Bullet,
    /// Cannon shell.
    Shell,
    /// Unguided rocket with splash.
    Rocket,
    /// Guided missile that homes on its target.
    Missile,
    /// Flak burst against aircraft.
    Flak,
    /// Gravity bomb dropped on a sortie run.
    Bomb,
    /// Instant electric arc (beam).
    ArcBolt,
    /// Instant long tesla discharge from defensive towers (beam).
    TeslaArc,
    /// Cone of burning fuel, leaves fire on the ground.
    FlameBurst,
}

impl OrdinanceKind {
    /// Beams resolve instantly at spawn; projectiles travel.
    #[must_use]
    pub const fn is_beam(self) -> bool {
        matches!(self, Self::ArcBolt | Self::TeslaArc)
    }

    /// Guided ordinance re-aims at its target every tick.
    #[must_use]
    pub const fn is_homing(self) -> bool {
        matches!(self, Self::Missile)
    }
}

/// Static parameters of one weapon type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Maximum firing range in world units (target size is added on top).
    pub range: f32,
    /// Damage per shot (or per beam strike).
    pub damage: f32,
    /// Seconds between shots.
    pub cooldown_secs: f32,
    /// Emitted ordinance.
    pub ordinance: OrdinanceKind,
    /// Projectile travel speed; ignored for beams.
    pub projectile_speed: f32,
    /// Elevations this weapon can hit.
    pub hits: ElevationMask,
    /// Area-of-effect radius on detonation, zero for single-target.
    pub aoe_radius: f32,
    /// Whether area damage also hits the shooter's own team.
    pub friendly_fire: bool,
}

impl WeaponSpec {
    /// True if the weapon can hit a target at the given elevation.
    #[must_use]
    pub const fn can_hit(&self, elevation: Elevation) -> bool {
        self.hits.contains(elevation)
    }

    /// True if detonation spawns an area effect.
    #[must_use]
    pub fn has_aoe(&self) -> bool {
        self.aoe_radius > 0.0
    }
}

/// A weapon instance carried by a unit or turret building.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Static parameters.
    pub spec: WeaponSpec,
    /// Seconds until the weapon may fire again.
    pub cooldown_remaining: f32,
}

impl Weapon {
    /// Create a weapon off cooldown.
    #[must_use]
    pub const fn new(spec: WeaponSpec) -> Self {
        Self {
            spec,
            cooldown_remaining: 0.0,
        }
    }

    /// True when the weapon may fire.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    /// Count down the cooldown by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if self.cooldown_remaining > 0.0 {
            self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        }
    }

    /// Restart the cooldown after firing.
    pub fn reset_cooldown(&mut self) {
        self.cooldown_remaining = self.spec.cooldown_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rifle() -> WeaponSpec {
        WeaponSpec {
            range: 150.0,
            damage: 8.0,
            cooldown_secs: 0.6,
            ordinance: OrdinanceKind::Bullet,
            projectile_speed: 900.0,
            hits: ElevationMask::GROUND_LOW,
            aoe_radius: 0.0,
            friendly_fire: false,
        }
    }

    #[test]
    fn test_elevation_mask() {
        assert!(ElevationMask::GROUND.contains(Elevation::Ground));
        assert!(!ElevationMask::GROUND.contains(Elevation::Low));
        assert!(ElevationMask::AIR.contains(Elevation::High));
        assert!(!ElevationMask::AIR.contains(Elevation::Ground));
        assert!(ElevationMask::ALL.contains(Elevation::Low));
    }

    #[test]
    fn test_weapon_cooldown_cycle() {
        let mut weapon = Weapon::new(rifle());
        assert!(weapon.ready());

        weapon.reset_cooldown();
        assert!(!weapon.ready());

        weapon.tick(0.3);
        assert!(!weapon.ready());
        weapon.tick(0.31);
        assert!(weapon.ready());
    }

    #[test]
    fn test_beam_classification() {
        assert!(OrdinanceKind::ArcBolt.is_beam());
        assert!(OrdinanceKind::TeslaArc.is_beam());
        assert!(!OrdinanceKind::Shell.is_beam());
        assert!(OrdinanceKind::Missile.is_homing());
        assert!(!OrdinanceKind::Rocket.is_homing());
    }
}
