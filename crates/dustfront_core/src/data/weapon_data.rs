//! Weapon balance table.

use serde::{Deserialize, Serialize};

use crate::weapons::{ElevationMask, OrdinanceKind, WeaponSpec};

/// Every weapon type carried by units and turret buildings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeaponKind {
    /// Standard infantry rifle.
    Rifle,
    /// Close-range SMG.
    Smg,
    /// Anti-infantry sniper rifle.
    SniperRifle,
    /// Arcing grenade launcher.
    GrenadeLauncher,
    /// Anti-armor rocket launcher.
    RocketLauncher,
    /// Short-range flamethrower.
    Flamethrower,
    /// Light tank cannon.
    Cannon,
    /// Heavy tank cannon.
    HeavyCannon,
    /// Long-range artillery gun.
    ArtilleryGun,
    /// Anti-air flak gun.
    FlakGun,
    /// Homing missile rack.
    MissileRack,
    /// Dedicated anti-air missile.
    AntiAirMissile,
    /// Rapid-fire chaingun.
    Chaingun,
    /// Arc tank's electric projector.
    ArcProjector,
    /// Defensive tower tesla discharge.
    TeslaDischarge,
    /// Building-mounted autocannon.
    TurretGun,
    /// Interceptor's air-to-air missile.
    InterceptorMissile,
    /// Gunship door gun.
    DoorGun,
}

/// Balance spec for a weapon kind.
#[must_use]
pub fn spec(kind: WeaponKind) -> WeaponSpec {
    let base = WeaponSpec {
        range: 150.0,
        damage: 10.0,
        cooldown_secs: 1.0,
        ordinance: OrdinanceKind::Bullet,
        projectile_speed: 900.0,
        hits: ElevationMask::GROUND_LOW,
        aoe_radius: 0.0,
        friendly_fire: false,
    };
    match kind {
        WeaponKind::Rifle => WeaponSpec {
            range: 150.0,
            damage: 8.0,
            cooldown_secs: 0.6,
            ..base
        },
        WeaponKind::Smg => WeaponSpec {
            range: 110.0,
            damage: 5.0,
            cooldown_secs: 0.25,
            ..base
        },
        WeaponKind::SniperRifle => WeaponSpec {
            range: 260.0,
            damage: 42.0,
            cooldown_secs: 2.2,
            projectile_speed: 1400.0,
            ..base
        },
        WeaponKind::GrenadeLauncher => WeaponSpec {
            range: 160.0,
            damage: 18.0,
            cooldown_secs: 1.8,
            ordinance: OrdinanceKind::Shell,
            projectile_speed: 320.0,
            hits: ElevationMask::GROUND,
            aoe_radius: 25.0,
            friendly_fire: true,
            ..base
        },
        WeaponKind::RocketLauncher => WeaponSpec {
            range: 200.0,
            damage: 30.0,
            cooldown_secs: 2.5,
            ordinance: OrdinanceKind::Rocket,
            projectile_speed: 380.0,
            hits: ElevationMask::ALL,
            aoe_radius: 18.0,
            friendly_fire: true,
            ..base
        },
        WeaponKind::Flamethrower => WeaponSpec {
            range: 85.0,
            damage: 6.0,
            cooldown_secs: 0.7,
            ordinance: OrdinanceKind::FlameBurst,
            projectile_speed: 220.0,
            hits: ElevationMask::GROUND,
            aoe_radius: 14.0,
            friendly_fire: true,
            ..base
        },
        WeaponKind::Cannon => WeaponSpec {
            range: 180.0,
            damage: 24.0,
            cooldown_secs: 1.6,
            ordinance: OrdinanceKind::Shell,
            projectile_speed: 620.0,
            hits: ElevationMask::GROUND,
            ..base
        },
        WeaponKind::HeavyCannon => WeaponSpec {
            range: 200.0,
            damage: 46.0,
            cooldown_secs: 2.4,
            ordinance: OrdinanceKind::Shell,
            projectile_speed: 620.0,
            hits: ElevationMask::GROUND,
            aoe_radius: 15.0,
            ..base
        },
        WeaponKind::ArtilleryGun => WeaponSpec {
            range: 380.0,
            damage: 60.0,
            cooldown_secs: 4.5,
            ordinance: OrdinanceKind::Shell,
            projectile_speed: 260.0,
            hits: ElevationMask::GROUND,
            aoe_radius: 40.0,
            friendly_fire: true,
            ..base
        },
        WeaponKind::FlakGun => WeaponSpec {
            range: 230.0,
            damage: 22.0,
            cooldown_secs: 1.1,
            ordinance: OrdinanceKind::Flak,
            projectile_speed: 750.0,
            hits: ElevationMask::AIR,
            aoe_radius: 28.0,
            ..base
        },
        WeaponKind::MissileRack => WeaponSpec {
            range: 250.0,
            damage: 34.0,
            cooldown_secs: 3.0,
            ordinance: OrdinanceKind::Missile,
            projectile_speed: 340.0,
            hits: ElevationMask::ALL,
            aoe_radius: 16.0,
            ..base
        },
        WeaponKind::AntiAirMissile => WeaponSpec {
            range: 290.0,
            damage: 45.0,
            cooldown_secs: 2.0,
            ordinance: OrdinanceKind::Missile,
            projectile_speed: 520.0,
            hits: ElevationMask::AIR,
            ..base
        },
        WeaponKind::Chaingun => WeaponSpec {
            range: 140.0,
            damage: 4.0,
            cooldown_secs: 0.15,
            ..base
        },
        WeaponKind::ArcProjector => WeaponSpec {
            range: 130.0,
            damage: 20.0,
            cooldown_secs: 1.4,
            ordinance: OrdinanceKind::ArcBolt,
            projectile_speed: 0.0,
            ..base
        },
        WeaponKind::TeslaDischarge => WeaponSpec {
            range: 210.0,
            damage: 55.0,
            cooldown_secs: 3.2,
            ordinance: OrdinanceKind::TeslaArc,
            projectile_speed: 0.0,
            ..base
        },
        WeaponKind::TurretGun => WeaponSpec {
            range: 240.0,
            damage: 12.0,
            cooldown_secs: 0.7,
            ..base
        },
        WeaponKind::InterceptorMissile => WeaponSpec {
            range: 220.0,
            damage: 36.0,
            cooldown_secs: 1.4,
            ordinance: OrdinanceKind::Missile,
            projectile_speed: 640.0,
            hits: ElevationMask::AIR,
            ..base
        },
        WeaponKind::DoorGun => WeaponSpec {
            range: 160.0,
            damage: 7.0,
            cooldown_secs: 0.35,
            ..base
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::Elevation;

    #[test]
    fn test_ground_only_weapons_cannot_hit_air() {
        let cannon = spec(WeaponKind::Cannon);
        assert!(cannon.can_hit(Elevation::Ground));
        assert!(!cannon.can_hit(Elevation::Low));
        assert!(!cannon.can_hit(Elevation::High));
    }

    #[test]
    fn test_flak_only_hits_air() {
        let flak = spec(WeaponKind::FlakGun);
        assert!(!flak.can_hit(Elevation::Ground));
        assert!(flak.can_hit(Elevation::Low));
        assert!(flak.can_hit(Elevation::High));
    }

    #[test]
    fn test_beam_weapons_have_no_travel() {
        assert!(spec(WeaponKind::ArcProjector).ordinance.is_beam());
        assert!(spec(WeaponKind::TeslaDischarge).ordinance.is_beam());
    }

    #[test]
    fn test_all_specs_sane() {
        for kind in [
            WeaponKind::Rifle,
            WeaponKind::Smg,
            WeaponKind::SniperRifle,
            WeaponKind::GrenadeLauncher,
            WeaponKind::RocketLauncher,
            WeaponKind::Flamethrower,
            WeaponKind::Cannon,
            WeaponKind::HeavyCannon,
            WeaponKind::ArtilleryGun,
            WeaponKind::FlakGun,
            WeaponKind::MissileRack,
            WeaponKind::AntiAirMissile,
            WeaponKind::Chaingun,
            WeaponKind::ArcProjector,
            WeaponKind::TeslaDischarge,
            WeaponKind::TurretGun,
            WeaponKind::InterceptorMissile,
            WeaponKind::DoorGun,
        ] {
            let s = spec(kind);
            assert!(s.range > 0.0, "{kind:?} range");
            assert!(s.damage > 0.0, "{kind:?} damage");
            assert!(s.cooldown_secs > 0.0, "{kind:?} cooldown");
            if !s.ordinance.is_beam() {
                assert!(s.projectile_speed > 0.0, "{kind:?} projectile speed");
            }
        }
    }
}
