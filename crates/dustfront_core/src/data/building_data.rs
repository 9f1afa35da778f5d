//! Building balance table.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::data::weapon_data::WeaponKind;
use crate::units::UnitKind;

/// Balance spec for a building kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    /// Maximum health.
    pub max_health: f32,
    /// Half-extent of the square footprint.
    pub half_extent: f32,
    /// Vision radius.
    pub vision_range: f32,
    /// Credit cost to place.
    pub cost: i64,
    /// Construction seconds of worker effort.
    pub build_secs: f32,
    /// Power generated while operating.
    pub power_generated: u32,
    /// Power consumed while operating.
    pub power_consumed: u32,
    /// Upkeep cap this building contributes.
    pub upkeep_provided: u32,
    /// Mounted defensive weapon.
    pub turret_weapon: Option<WeaponKind>,
    /// Defensive structures shut down on power deficit.
    pub defensive: bool,
    /// Infantry slots (bunkers).
    pub garrison_capacity: usize,
    /// Aircraft bays (airfields).
    pub hangar_capacity: usize,
}

/// Balance spec for a building kind.
#[must_use]
pub fn spec(kind: BuildingKind) -> BuildingSpec {
    let base = BuildingSpec {
        max_health: 800.0,
        half_extent: 40.0,
        vision_range: 350.0,
        cost: 300,
        build_secs: 20.0,
        power_generated: 0,
        power_consumed: 5,
        upkeep_provided: 0,
        turret_weapon: None,
        defensive: false,
        garrison_capacity: 0,
        hangar_capacity: 0,
    };
    match kind {
        BuildingKind::Headquarters => BuildingSpec {
            max_health: 2500.0,
            half_extent: 60.0,
            vision_range: 450.0,
            cost: 2000,
            build_secs: 60.0,
            power_generated: 30,
            power_consumed: 0,
            upkeep_provided: 20,
            ..base
        },
        BuildingKind::Refinery => BuildingSpec {
            max_health: 1000.0,
            half_extent: 45.0,
            cost: 400,
            build_secs: 25.0,
            ..base
        },
        BuildingKind::PowerPlant => BuildingSpec {
            max_health: 750.0,
            cost: 300,
            build_secs: 18.0,
            power_generated: 50,
            power_consumed: 0,
            ..base
        },
        BuildingKind::Barracks => BuildingSpec {
            max_health: 900.0,
            cost: 350,
            build_secs: 20.0,
            power_consumed: 10,
            ..base
        },
        BuildingKind::VehicleFactory => BuildingSpec {
            max_health: 1200.0,
            half_extent: 50.0,
            cost: 600,
            build_secs: 30.0,
            power_consumed: 15,
            ..base
        },
        BuildingKind::Airfield => BuildingSpec {
            max_health: 1100.0,
            half_extent: 55.0,
            cost: 700,
            build_secs: 32.0,
            power_consumed: 15,
            hangar_capacity: 2,
            ..base
        },
        BuildingKind::ResearchLab => BuildingSpec {
            max_health: 700.0,
            cost: 500,
            build_secs: 26.0,
            power_consumed: 20,
            ..base
        },
        BuildingKind::GunTurret => BuildingSpec {
            max_health: 600.0,
            half_extent: 20.0,
            cost: 250,
            build_secs: 14.0,
            power_consumed: 10,
            turret_weapon: Some(WeaponKind::TurretGun),
            defensive: true,
            ..base
        },
        BuildingKind::MissileTurret => BuildingSpec {
            max_health: 550.0,
            half_extent: 20.0,
            cost: 350,
            build_secs: 16.0,
            power_consumed: 10,
            turret_weapon: Some(WeaponKind::AntiAirMissile),
            defensive: true,
            ..base
        },
        BuildingKind::ArcTower => BuildingSpec {
            max_health: 650.0,
            half_extent: 22.0,
            cost: 450,
            build_secs: 18.0,
            power_consumed: 20,
            turret_weapon: Some(WeaponKind::TeslaDischarge),
            defensive: true,
            ..base
        },
        BuildingKind::Bunker => BuildingSpec {
            max_health: 900.0,
            half_extent: 25.0,
            cost: 300,
            build_secs: 16.0,
            power_consumed: 0,
            garrison_capacity: 4,
            ..base
        },
        BuildingKind::Armory => BuildingSpec {
            max_health: 850.0,
            cost: 400,
            build_secs: 22.0,
            power_consumed: 10,
            upkeep_provided: 15,
            ..base
        },
    }
}

/// Unit kinds a building of `kind` can produce.
#[must_use]
pub fn producible_units(kind: BuildingKind) -> Vec<UnitKind> {
    UnitKind::ALL
        .into_iter()
        .filter(|unit| crate::data::unit_data::spec(*unit).produced_at == kind)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_specs_sane() {
        for kind in BuildingKind::ALL {
            let s = spec(kind);
            assert!(s.max_health > 0.0, "{kind:?} health");
            assert!(s.half_extent > 0.0, "{kind:?} footprint");
            assert!(s.cost > 0, "{kind:?} cost");
        }
    }

    #[test]
    fn test_turrets_are_defensive() {
        for kind in BuildingKind::ALL {
            let s = spec(kind);
            assert_eq!(s.turret_weapon.is_some(), s.defensive, "{kind:?}");
        }
    }

    #[test]
    fn test_production_routing() {
        assert!(producible_units(BuildingKind::Barracks).contains(&UnitKind::Trooper));
        assert!(producible_units(BuildingKind::VehicleFactory).contains(&UnitKind::Basilisk));
        assert!(producible_units(BuildingKind::Airfield).contains(&UnitKind::Condor));
        assert!(producible_units(BuildingKind::Bunker).is_empty());
    }

    #[test]
    fn test_headquarters_provides_upkeep_and_power() {
        let hq = spec(BuildingKind::Headquarters);
        assert!(hq.upkeep_provided > 0);
        assert!(hq.power_generated > 0);
    }
}
