//! Per-faction starting state and the static catalog served over HTTP.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::data::{building_data, research_data, unit_data};
use crate::data::research_data::ResearchId;
use crate::factions::FactionKind;
use crate::units::UnitKind;

/// Starting economy for a freshly spawned faction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactionStart {
    /// Starting credits.
    pub credits: i64,
    /// Number of workers spawned next to the headquarters.
    pub starting_workers: u32,
}

/// Starting economy for a faction kind.
#[must_use]
pub fn start(kind: FactionKind) -> FactionStart {
    match kind {
        FactionKind::Coalition => FactionStart {
            credits: 1000,
            starting_workers: 3,
        },
        FactionKind::Syndicate => FactionStart {
            credits: 1200,
            starting_workers: 2,
        },
        FactionKind::Nomads => FactionStart {
            credits: 900,
            starting_workers: 4,
        },
    }
}

/// Unit kinds a faction may produce.
///
/// The economy tier, vehicles, and aircraft are shared; infantry lines
/// are faction-flavored.
#[must_use]
pub fn roster(kind: FactionKind) -> Vec<UnitKind> {
    let shared = [
        UnitKind::Rigger,
        UnitKind::Prospector,
        UnitKind::Surveyor,
        UnitKind::Technician,
        UnitKind::Outrider,
        UnitKind::Warhound,
        UnitKind::Basilisk,
        UnitKind::FlakTrack,
        UnitKind::Howitzer,
        UnitKind::MissileCarrier,
        UnitKind::Dustcrawler,
        UnitKind::Reclaimer,
        UnitKind::Ballista,
        UnitKind::Gunship,
        UnitKind::Dragonfly,
        UnitKind::Hornet,
        UnitKind::Vulture,
        UnitKind::Condor,
        UnitKind::Falcon,
        UnitKind::Albatross,
    ];
    let flavored: &[UnitKind] = match kind {
        FactionKind::Coalition => &[
            UnitKind::Trooper,
            UnitKind::Grenadier,
            UnitKind::Marksman,
            UnitKind::RocketTrooper,
            UnitKind::FieldMedic,
            UnitKind::Sapper,
            UnitKind::Juggernaut,
            UnitKind::Breacher,
        ],
        FactionKind::Syndicate => &[
            UnitKind::Enforcer,
            UnitKind::Shredder,
            UnitKind::Infiltrator,
            UnitKind::PyroTrooper,
            UnitKind::Phantom,
            UnitKind::ArcTank,
            UnitKind::Mirage,
        ],
        FactionKind::Nomads => &[
            UnitKind::Raider,
            UnitKind::DuneStalker,
            UnitKind::StormCaller,
            UnitKind::Inferno,
            UnitKind::Scarab,
        ],
    };
    shared.into_iter().chain(flavored.iter().copied()).collect()
}

/// Catalog entry for one producible unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitCatalogEntry {
    /// Unit type.
    pub unit_type: UnitKind,
    /// Credit cost.
    pub cost: i64,
    /// Upkeep against the faction cap.
    pub upkeep: u32,
    /// Production seconds.
    pub build_secs: f32,
    /// Producing building.
    pub produced_at: BuildingKind,
}

/// Catalog entry for one building.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingCatalogEntry {
    /// Building type.
    pub building_type: BuildingKind,
    /// Credit cost.
    pub cost: i64,
    /// Construction seconds.
    pub build_secs: f32,
    /// Power generated.
    pub power_generated: u32,
    /// Power consumed.
    pub power_consumed: u32,
}

/// Catalog entry for one research project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchCatalogEntry {
    /// Research id.
    pub research: ResearchId,
    /// Credit cost.
    pub cost: i64,
    /// Research seconds.
    pub duration_secs: f32,
    /// Required completed projects.
    pub prerequisites: Vec<ResearchId>,
}

/// Static faction data served by `GET /api/rts/factions/{factionType}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionCatalog {
    /// Faction rule variant.
    pub faction_type: FactionKind,
    /// Available buildings.
    pub buildings: Vec<BuildingCatalogEntry>,
    /// Producible units with costs and upkeep.
    pub units: Vec<UnitCatalogEntry>,
    /// Research tree with prerequisites.
    pub research: Vec<ResearchCatalogEntry>,
}

/// Build the static catalog for a faction kind.
#[must_use]
pub fn catalog(kind: FactionKind) -> FactionCatalog {
    let buildings = BuildingKind::ALL
        .into_iter()
        .map(|b| {
            let s = building_data::spec(b);
            BuildingCatalogEntry {
                building_type: b,
                cost: s.cost,
                build_secs: s.build_secs,
                power_generated: s.power_generated,
                power_consumed: s.power_consumed,
            }
        })
        .collect();
    let units = roster(kind)
        .into_iter()
        .map(|u| {
            let s = unit_data::spec(u);
            UnitCatalogEntry {
                unit_type: u,
                cost: s.cost,
                upkeep: s.upkeep,
                build_secs: s.build_secs,
                produced_at: s.produced_at,
            }
        })
        .collect();
    let research = ResearchId::ALL
        .into_iter()
        .map(|r| {
            let s = research_data::spec(r);
            ResearchCatalogEntry {
                research: r,
                cost: s.cost,
                duration_secs: s.duration_secs,
                prerequisites: s.prerequisites.to_vec(),
            }
        })
        .collect();
    FactionCatalog {
        faction_type: kind,
        buildings,
        units,
        research,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rosters_share_economy_tier() {
        for kind in [
            FactionKind::Coalition,
            FactionKind::Syndicate,
            FactionKind::Nomads,
        ] {
            let units = roster(kind);
            assert!(units.contains(&UnitKind::Rigger), "{kind:?}");
            assert!(units.contains(&UnitKind::Prospector), "{kind:?}");
        }
    }

    #[test]
    fn test_flavored_units_are_exclusive() {
        let coalition = roster(FactionKind::Coalition);
        let syndicate = roster(FactionKind::Syndicate);
        assert!(coalition.contains(&UnitKind::Trooper));
        assert!(!syndicate.contains(&UnitKind::Trooper));
        assert!(syndicate.contains(&UnitKind::Phantom));
        assert!(!coalition.contains(&UnitKind::Phantom));
    }

    #[test]
    fn test_catalog_is_complete() {
        let cat = catalog(FactionKind::Coalition);
        assert_eq!(cat.buildings.len(), BuildingKind::ALL.len());
        assert_eq!(cat.research.len(), ResearchId::ALL.len());
        assert_eq!(cat.units.len(), roster(FactionKind::Coalition).len());
    }

    #[test]
    fn test_catalog_serializes_camel_case() {
        let cat = catalog(FactionKind::Nomads);
        let json = serde_json::to_value(&cat).unwrap();
        assert!(json.get("factionType").is_some());
        assert!(json.get("buildings").is_some());
    }
}
