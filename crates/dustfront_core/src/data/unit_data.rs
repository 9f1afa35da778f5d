//! Unit balance table.
//!
//! One spec per [`UnitKind`]. Faction research modifies these at spawn
//! or fire time; the table itself is immutable.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::data::weapon_data::WeaponKind;
use crate::targets::Elevation;
use crate::units::{CarryLoad, Pickaxe, UnitKind};

/// Fuel/ammo loadout for hangar-based aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HangarCraftSpec {
    /// Flight seconds on a full tank.
    pub fuel_secs: f32,
    /// Shots on a full rearm.
    pub ammo: u32,
}

/// Balance spec for a unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Flight layer.
    pub elevation: Elevation,
    /// Maximum health.
    pub max_health: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Collision radius.
    pub radius: f32,
    /// Vision radius.
    pub vision_range: f32,
    /// Primary weapon.
    pub weapon: Option<WeaponKind>,
    /// Second weapon (gunships).
    pub second_weapon: Option<WeaponKind>,
    /// Whether the unit carries a cloak generator.
    pub can_cloak: bool,
    /// Radius within which this unit reveals cloaked enemies.
    pub cloak_detection_range: f32,
    /// Worker carry component.
    pub carry: Option<CarryLoad>,
    /// Miner pickaxe component.
    pub pickaxe: Option<Pickaxe>,
    /// Hangar-based aircraft loadout.
    pub hangar_craft: Option<HangarCraftSpec>,
    /// Credit cost.
    pub cost: i64,
    /// Upkeep counted against the faction cap.
    pub upkeep: u32,
    /// Production time in seconds.
    pub build_secs: f32,
    /// Building that produces this unit.
    pub produced_at: BuildingKind,
}

const WORKER_CARRY: CarryLoad = CarryLoad {
    capacity: 50.0,
    current: 0.0,
    rate_per_sec: 10.0,
};

const MINER_PICKAXE: Pickaxe = Pickaxe {
    max_durability: 60.0,
    durability: 60.0,
    rate_per_sec: 8.0,
};

/// Balance spec for a unit kind.
#[must_use]
pub fn spec(kind: UnitKind) -> UnitSpec {
    let base = UnitSpec {
        elevation: Elevation::Ground,
        max_health: 100.0,
        speed: 60.0,
        radius: 8.0,
        vision_range: 300.0,
        weapon: None,
        second_weapon: None,
        can_cloak: false,
        cloak_detection_range: 100.0,
        carry: None,
        pickaxe: None,
        hangar_craft: None,
        cost: 100,
        upkeep: 1,
        build_secs: 8.0,
        produced_at: BuildingKind::Barracks,
    };
    let vehicle = UnitSpec {
        radius: 14.0,
        speed: 80.0,
        produced_at: BuildingKind::VehicleFactory,
        ..base
    };
    let aircraft_low = UnitSpec {
        elevation: Elevation::Low,
        radius: 12.0,
        speed: 120.0,
        produced_at: BuildingKind::Airfield,
        ..base
    };
    let aircraft_high = UnitSpec {
        elevation: Elevation::High,
        radius: 14.0,
        speed: 160.0,
        produced_at: BuildingKind::Airfield,
        ..base
    };

    match kind {
        // Economy tier
        UnitKind::Rigger => UnitSpec {
            max_health: 80.0,
            speed: 55.0,
            carry: Some(WORKER_CARRY),
            cost: 80,
            build_secs: 6.0,
            ..base
        },
        UnitKind::Prospector => UnitSpec {
            max_health: 80.0,
            speed: 55.0,
            pickaxe: Some(MINER_PICKAXE),
            cost: 90,
            build_secs: 6.0,
            ..base
        },
        UnitKind::Surveyor => UnitSpec {
            max_health: 60.0,
            speed: 110.0,
            vision_range: 500.0,
            cloak_detection_range: 220.0,
            cost: 70,
            build_secs: 5.0,
            ..base
        },
        UnitKind::Technician => UnitSpec {
            max_health: 70.0,
            speed: 60.0,
            cost: 90,
            build_secs: 6.0,
            ..base
        },

        // Coalition infantry
        UnitKind::Trooper => UnitSpec {
            max_health: 90.0,
            weapon: Some(WeaponKind::Rifle),
            ..base
        },
        UnitKind::Grenadier => UnitSpec {
            max_health: 95.0,
            weapon: Some(WeaponKind::GrenadeLauncher),
            cost: 140,
            build_secs: 10.0,
            ..base
        },
        UnitKind::Marksman => UnitSpec {
            max_health: 70.0,
            weapon: Some(WeaponKind::SniperRifle),
            vision_range: 360.0,
            cost: 160,
            build_secs: 12.0,
            ..base
        },
        UnitKind::RocketTrooper => UnitSpec {
            max_health: 85.0,
            weapon: Some(WeaponKind::RocketLauncher),
            cost: 170,
            upkeep: 2,
            build_secs: 12.0,
            ..base
        },
        UnitKind::FieldMedic => UnitSpec {
            max_health: 80.0,
            cost: 120,
            build_secs: 9.0,
            ..base
        },
        UnitKind::Sapper => UnitSpec {
            max_health: 85.0,
            weapon: Some(WeaponKind::GrenadeLauncher),
            cost: 150,
            build_secs: 10.0,
            ..base
        },

        // Syndicate infantry
        UnitKind::Enforcer => UnitSpec {
            max_health: 95.0,
            weapon: Some(WeaponKind::Smg),
            ..base
        },
        UnitKind::Shredder => UnitSpec {
            max_health: 130.0,
            speed: 50.0,
            weapon: Some(WeaponKind::Chaingun),
            cost: 180,
            upkeep: 2,
            build_secs: 12.0,
            ..base
        },
        UnitKind::Infiltrator => UnitSpec {
            max_health: 70.0,
            weapon: Some(WeaponKind::Smg),
            can_cloak: true,
            cost: 200,
            upkeep: 2,
            build_secs: 14.0,
            ..base
        },
        UnitKind::PyroTrooper => UnitSpec {
            max_health: 100.0,
            weapon: Some(WeaponKind::Flamethrower),
            cost: 150,
            build_secs: 10.0,
            ..base
        },

        // Nomad infantry
        UnitKind::Raider => UnitSpec {
            max_health: 85.0,
            speed: 75.0,
            weapon: Some(WeaponKind::Smg),
            cost: 90,
            build_secs: 7.0,
            ..base
        },
        UnitKind::DuneStalker => UnitSpec {
            max_health: 75.0,
            weapon: Some(WeaponKind::SniperRifle),
            can_cloak: true,
            cost: 210,
            upkeep: 2,
            build_secs: 14.0,
            ..base
        },
        UnitKind::StormCaller => UnitSpec {
            max_health: 90.0,
            cost: 250,
            upkeep: 3,
            build_secs: 16.0,
            ..base
        },

        // Vehicles
        UnitKind::Outrider => UnitSpec {
            max_health: 140.0,
            speed: 120.0,
            vision_range: 450.0,
            cloak_detection_range: 200.0,
            weapon: Some(WeaponKind::Rifle),
            cost: 180,
            upkeep: 2,
            build_secs: 10.0,
            ..vehicle
        },
        UnitKind::Warhound => UnitSpec {
            max_health: 260.0,
            weapon: Some(WeaponKind::Cannon),
            cost: 300,
            upkeep: 3,
            build_secs: 14.0,
            ..vehicle
        },
        UnitKind::Basilisk => UnitSpec {
            max_health: 420.0,
            speed: 60.0,
            radius: 17.0,
            weapon: Some(WeaponKind::HeavyCannon),
            cost: 500,
            upkeep: 5,
            build_secs: 22.0,
            ..vehicle
        },
        UnitKind::Phantom => UnitSpec {
            max_health: 240.0,
            weapon: Some(WeaponKind::Cannon),
            can_cloak: true,
            cost: 450,
            upkeep: 4,
            build_secs: 20.0,
            ..vehicle
        },
        UnitKind::ArcTank => UnitSpec {
            max_health: 280.0,
            weapon: Some(WeaponKind::ArcProjector),
            cost: 420,
            upkeep: 4,
            build_secs: 18.0,
            ..vehicle
        },
        UnitKind::Inferno => UnitSpec {
            max_health: 300.0,
            weapon: Some(WeaponKind::Flamethrower),
            cost: 380,
            upkeep: 4,
            build_secs: 16.0,
            ..vehicle
        },
        UnitKind::FlakTrack => UnitSpec {
            max_health: 220.0,
            weapon: Some(WeaponKind::FlakGun),
            cost: 320,
            upkeep: 3,
            build_secs: 14.0,
            ..vehicle
        },
        UnitKind::Howitzer => UnitSpec {
            max_health: 180.0,
            speed: 55.0,
            weapon: Some(WeaponKind::ArtilleryGun),
            cost: 550,
            upkeep: 5,
            build_secs: 24.0,
            ..vehicle
        },
        UnitKind::MissileCarrier => UnitSpec {
            max_health: 200.0,
            weapon: Some(WeaponKind::MissileRack),
            cost: 480,
            upkeep: 4,
            build_secs: 20.0,
            ..vehicle
        },
        UnitKind::Breacher => UnitSpec {
            max_health: 340.0,
            speed: 55.0,
            weapon: Some(WeaponKind::HeavyCannon),
            cost: 460,
            upkeep: 4,
            build_secs: 20.0,
            ..vehicle
        },
        UnitKind::Dustcrawler => UnitSpec {
            max_health: 320.0,
            radius: 16.0,
            cost: 300,
            upkeep: 3,
            build_secs: 14.0,
            ..vehicle
        },
        UnitKind::Reclaimer => UnitSpec {
            max_health: 250.0,
            speed: 65.0,
            cost: 280,
            upkeep: 3,
            build_secs: 14.0,
            ..vehicle
        },
        UnitKind::Juggernaut => UnitSpec {
            max_health: 700.0,
            speed: 45.0,
            radius: 20.0,
            weapon: Some(WeaponKind::HeavyCannon),
            second_weapon: Some(WeaponKind::Chaingun),
            cost: 900,
            upkeep: 8,
            build_secs: 36.0,
            ..vehicle
        },
        UnitKind::Ballista => UnitSpec {
            max_health: 190.0,
            speed: 55.0,
            weapon: Some(WeaponKind::Cannon),
            cost: 340,
            upkeep: 3,
            build_secs: 15.0,
            ..vehicle
        },
        UnitKind::Mirage => UnitSpec {
            max_health: 160.0,
            can_cloak: true,
            cost: 260,
            upkeep: 2,
            build_secs: 12.0,
            ..vehicle
        },
        UnitKind::Scarab => UnitSpec {
            max_health: 280.0,
            weapon: Some(WeaponKind::MissileRack),
            cost: 420,
            upkeep: 4,
            build_secs: 18.0,
            ..vehicle
        },

        // Low-altitude aircraft
        UnitKind::Gunship => UnitSpec {
            max_health: 260.0,
            weapon: Some(WeaponKind::MissileRack),
            second_weapon: Some(WeaponKind::DoorGun),
            cost: 600,
            upkeep: 6,
            build_secs: 24.0,
            ..aircraft_low
        },
        UnitKind::Dragonfly => UnitSpec {
            max_health: 90.0,
            speed: 150.0,
            vision_range: 520.0,
            cloak_detection_range: 240.0,
            cost: 150,
            upkeep: 1,
            build_secs: 8.0,
            ..aircraft_low
        },
        UnitKind::Hornet => UnitSpec {
            max_health: 200.0,
            weapon: Some(WeaponKind::RocketLauncher),
            cost: 450,
            upkeep: 4,
            build_secs: 18.0,
            ..aircraft_low
        },
        UnitKind::Vulture => UnitSpec {
            max_health: 110.0,
            weapon: Some(WeaponKind::Chaingun),
            cost: 220,
            upkeep: 2,
            build_secs: 10.0,
            ..aircraft_low
        },

        // High-altitude hangar craft
        UnitKind::Condor => UnitSpec {
            max_health: 300.0,
            hangar_craft: Some(HangarCraftSpec {
                fuel_secs: 60.0,
                ammo: 5,
            }),
            cost: 700,
            upkeep: 6,
            build_secs: 28.0,
            ..aircraft_high
        },
        UnitKind::Falcon => UnitSpec {
            max_health: 180.0,
            speed: 200.0,
            weapon: Some(WeaponKind::InterceptorMissile),
            hangar_craft: Some(HangarCraftSpec {
                fuel_secs: 45.0,
                ammo: 6,
            }),
            cost: 550,
            upkeep: 4,
            build_secs: 22.0,
            ..aircraft_high
        },
        UnitKind::Albatross => UnitSpec {
            max_health: 450.0,
            speed: 130.0,
            radius: 18.0,
            hangar_craft: Some(HangarCraftSpec {
                fuel_secs: 80.0,
                ammo: 8,
            }),
            cost: 1000,
            upkeep: 8,
            build_secs: 40.0,
            ..aircraft_high
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_specs_sane() {
        for kind in UnitKind::ALL {
            let s = spec(kind);
            assert!(s.max_health > 0.0, "{kind:?} health");
            assert!(s.speed > 0.0, "{kind:?} speed");
            assert!(s.radius > 0.0, "{kind:?} radius");
            assert!(s.cost > 0, "{kind:?} cost");
            assert!(s.build_secs > 0.0, "{kind:?} build time");
        }
    }

    #[test]
    fn test_hangar_craft_are_high_altitude() {
        for kind in UnitKind::ALL {
            let s = spec(kind);
            if s.hangar_craft.is_some() {
                assert_eq!(s.elevation, Elevation::High, "{kind:?}");
                assert_eq!(s.produced_at, BuildingKind::Airfield, "{kind:?}");
            }
        }
    }

    #[test]
    fn test_workers_have_components() {
        assert!(spec(UnitKind::Rigger).carry.is_some());
        assert!(spec(UnitKind::Prospector).pickaxe.is_some());
        assert!(spec(UnitKind::Trooper).carry.is_none());
    }

    #[test]
    fn test_cloak_roster() {
        let cloaked: Vec<UnitKind> = UnitKind::ALL
            .into_iter()
            .filter(|k| spec(*k).can_cloak)
            .collect();
        assert!(cloaked.contains(&UnitKind::Phantom));
        assert!(cloaked.contains(&UnitKind::Infiltrator));
    }
}
