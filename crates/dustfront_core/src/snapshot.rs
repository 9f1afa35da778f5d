//! Snapshot builder and per-team visibility filter.
//!
//! Snapshots are diff-free full state; clients reconcile by id. Floats
//! are rounded to two decimals on the wire and non-finite values
//! serialize as the 999999 sentinel. Entities on an enemy team that no
//! friendly vision source covers are omitted.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::data::research_data::ResearchId;
use crate::entities::GameEntities;
use crate::factions::{Faction, FactionKind};
use crate::map::Biome;
use crate::obstacles::{ObstacleShape, ResourceKind};
use crate::ordinance::{BeamKind, FieldEffectKind};
use crate::targets::{Elevation, EntityId, Targetable};
use crate::units::{PlayerId, UnitKind};
use crate::weapons::OrdinanceKind;

/// Sentinel for non-finite doubles on the wire.
const INFINITY_SENTINEL: f64 = 999_999.0;

/// Two-decimal wire rounding with the infinity sentinel.
mod round2 {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::INFINITY_SENTINEL;

    pub fn serialize<S>(value: &f32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = if value.is_finite() {
            (f64::from(*value) * 100.0).round() / 100.0
        } else {
            INFINITY_SENTINEL
        };
        serializer.serialize_f64(wire)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Ok(value as f32)
    }
}

/// A wire point rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapPoint {
    /// X coordinate.
    #[serde(with = "round2")]
    pub x: f32,
    /// Y coordinate.
    #[serde(with = "round2")]
    pub y: f32,
}

impl From<crate::math::Vec2> for SnapPoint {
    fn from(v: crate::math::Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// The active command as clients see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSnapshot {
    /// Command tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Phase tag for multi-phase commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Destination the command is working toward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_location: Option<SnapPoint>,
    /// The unit's home anchor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_location: Option<SnapPoint>,
}

/// One unit in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// X position.
    #[serde(with = "round2")]
    pub x: f32,
    /// Y position.
    #[serde(with = "round2")]
    pub y: f32,
    /// Team number.
    pub team: u8,
    /// Owning player.
    pub owner_id: PlayerId,
    /// Current health.
    #[serde(with = "round2")]
    pub health: f32,
    /// Maximum health.
    #[serde(with = "round2")]
    pub max_health: f32,
    /// Unit type tag.
    #[serde(rename = "type")]
    pub unit_type: UnitKind,
    /// Facing in radians.
    #[serde(with = "round2")]
    pub rotation: f32,
    /// Body radius.
    #[serde(with = "round2")]
    pub radius: f32,
    /// Selected by the receiving client.
    pub selected: bool,
    /// Special ability (cloak/storm) engaged.
    pub special_ability_active: bool,
    /// Currently cloaked.
    pub cloaked: bool,
    /// Flight layer tag.
    pub elevation: Elevation,
    /// Active command.
    pub current_command: CommandSnapshot,
}

/// One building in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// X position.
    #[serde(with = "round2")]
    pub x: f32,
    /// Y position.
    #[serde(with = "round2")]
    pub y: f32,
    /// Team number.
    pub team: u8,
    /// Owning player.
    pub owner_id: PlayerId,
    /// Current health.
    #[serde(with = "round2")]
    pub health: f32,
    /// Maximum health.
    #[serde(with = "round2")]
    pub max_health: f32,
    /// Building type tag.
    #[serde(rename = "type")]
    pub building_type: BuildingKind,
    /// Footprint half-extent.
    #[serde(with = "round2")]
    pub half_extent: f32,
    /// Still a construction site.
    pub under_construction: bool,
    /// Construction completion in [0, 1].
    #[serde(with = "round2")]
    pub construction_progress: f32,
    /// Queued production, front first.
    pub production_queue: Vec<UnitKind>,
    /// Seconds of progress on the front queue item.
    #[serde(with = "round2")]
    pub production_progress: f32,
    /// Rally point, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rally_point: Option<SnapPoint>,
    /// Garrisoned unit count.
    pub garrison_count: u32,
    /// Aircraft housed in bays.
    pub hangar_occupied: u32,
    /// Any craft currently out on sortie.
    pub hangar_on_sortie: bool,
    /// Turret facing in radians.
    #[serde(with = "round2")]
    pub turret_rotation: f32,
}

/// One obstacle in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObstacleSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// X position.
    #[serde(with = "round2")]
    pub x: f32,
    /// Y position.
    #[serde(with = "round2")]
    pub y: f32,
    /// Polygon outline for physics-accurate rendering (circle
    /// obstacles send an empty list plus `radius`).
    pub vertices: Vec<SnapPoint>,
    /// Radius for circular obstacles.
    #[serde(with = "round2")]
    pub radius: f32,
    /// Resource carried, if harvestable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceKind>,
    /// Remaining resource.
    #[serde(with = "round2")]
    pub resource_remaining: f32,
}

/// One wall segment in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Midpoint x.
    #[serde(with = "round2")]
    pub x: f32,
    /// Midpoint y.
    #[serde(with = "round2")]
    pub y: f32,
    /// Team number.
    pub team: u8,
    /// Owning player.
    pub owner_id: PlayerId,
    /// Current health.
    #[serde(with = "round2")]
    pub health: f32,
    /// Maximum health.
    #[serde(with = "round2")]
    pub max_health: f32,
    /// Segment endpoints.
    pub vertices: Vec<SnapPoint>,
}

/// One projectile in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// X position.
    #[serde(with = "round2")]
    pub x: f32,
    /// Y position.
    #[serde(with = "round2")]
    pub y: f32,
    /// Ordinance tag.
    #[serde(rename = "type")]
    pub ordinance_type: OrdinanceKind,
    /// Velocity x.
    #[serde(with = "round2")]
    pub vx: f32,
    /// Velocity y.
    #[serde(with = "round2")]
    pub vy: f32,
}

/// One beam in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Beam tag.
    #[serde(rename = "type")]
    pub beam_type: BeamKind,
    /// Endpoints.
    pub vertices: Vec<SnapPoint>,
}

/// One field effect in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEffectSnapshot {
    /// Entity id.
    pub id: EntityId,
    /// Center x.
    #[serde(with = "round2")]
    pub x: f32,
    /// Center y.
    #[serde(with = "round2")]
    pub y: f32,
    /// Effect tag.
    #[serde(rename = "type")]
    pub effect_type: FieldEffectKind,
    /// Area radius.
    #[serde(with = "round2")]
    pub radius: f32,
}

/// In-progress research in a faction snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveResearchSnapshot {
    /// The project.
    pub research: ResearchId,
    /// Progress seconds.
    #[serde(with = "round2")]
    pub progress_secs: f32,
}

/// One faction in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionSnapshot {
    /// Player id.
    pub player_id: PlayerId,
    /// Rule variant.
    pub faction_type: FactionKind,
    /// Team number.
    pub team: u8,
    /// Credit balance (integer on the wire).
    pub credits: i64,
    /// Upkeep in use.
    pub current_upkeep: u32,
    /// Upkeep cap.
    pub max_upkeep: u32,
    /// Power generated.
    pub power_generated: u32,
    /// Power consumed.
    pub power_consumed: u32,
    /// Power deficit flag.
    pub has_low_power: bool,
    /// Completed research ids.
    pub completed_research: Vec<ResearchId>,
    /// Research in progress.
    pub active_research: Vec<ActiveResearchSnapshot>,
}

/// Full game state as broadcast to one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    /// Visible units.
    pub units: Vec<UnitSnapshot>,
    /// Visible buildings.
    pub buildings: Vec<BuildingSnapshot>,
    /// All obstacles (terrain is common knowledge).
    pub obstacles: Vec<ObstacleSnapshot>,
    /// Visible wall segments.
    pub wall_segments: Vec<WallSnapshot>,
    /// Visible projectiles.
    pub projectiles: Vec<ProjectileSnapshot>,
    /// Visible beams.
    pub beams: Vec<BeamSnapshot>,
    /// Visible field effects.
    pub field_effects: Vec<FieldEffectSnapshot>,
    /// Factions keyed by player id.
    pub factions: BTreeMap<String, FactionSnapshot>,
    /// Base vision radius hint for the client fog mask.
    #[serde(with = "round2")]
    pub vision_range: f32,
    /// Map biome.
    pub biome: Biome,
    /// World width.
    #[serde(with = "round2")]
    pub world_width: f32,
    /// World height.
    #[serde(with = "round2")]
    pub world_height: f32,
}

/// Borrowed state needed to build snapshots.
pub struct SnapshotInputs<'a> {
    /// The entity store.
    pub entities: &'a GameEntities,
    /// All factions.
    pub factions: &'a BTreeMap<PlayerId, Faction>,
    /// Map biome.
    pub biome: Biome,
    /// World side length.
    pub world_size: f32,
}

/// Build the per-client projection of the world for `viewer`.
#[must_use]
pub fn build_game_state(
    inputs: &SnapshotInputs<'_>,
    viewer: PlayerId,
    viewer_team: u8,
    selected: &BTreeSet<EntityId>,
) -> GameStateSnapshot {
    let vision = inputs.entities.vision_field(viewer_team);
    let sees = |team: u8, position: crate::math::Vec2, cloaked: bool| {
        if team == viewer_team {
            return true;
        }
        if !vision.sees(position) {
            return false;
        }
        !cloaked || vision.detects_cloaked(position)
    };

    let mut units = Vec::new();
    for unit in inputs.entities.units.values() {
        if !unit.active || unit.housed {
            continue;
        }
        if !sees(unit.team, unit.position, unit.is_cloaked()) {
            continue;
        }
        units.push(UnitSnapshot {
            id: unit.id,
            x: unit.position.x,
            y: unit.position.y,
            team: unit.team,
            owner_id: unit.owner,
            health: unit.health,
            max_health: unit.max_health,
            unit_type: unit.kind,
            rotation: unit.rotation,
            radius: unit.radius,
            selected: selected.contains(&unit.id),
            special_ability_active: unit.is_cloaked(),
            cloaked: unit.is_cloaked(),
            elevation: unit.elevation,
            current_command: CommandSnapshot {
                kind: unit.command.wire_type().to_string(),
                phase: unit.command.wire_phase().map(str::to_string),
                target_location: unit.command.target_location().map(SnapPoint::from),
                home_location: Some(SnapPoint::from(unit.home_position)),
            },
        });
    }

    let mut buildings = Vec::new();
    for building in inputs.entities.buildings.values() {
        if !building.active {
            continue;
        }
        if !sees(building.team, building.position, false) {
            continue;
        }
        let production_progress = building
            .production_queue
            .front()
            .map_or(0.0, |o| o.progress_secs);
        buildings.push(BuildingSnapshot {
            id: building.id,
            x: building.position.x,
            y: building.position.y,
            team: building.team,
            owner_id: building.owner,
            health: building.health,
            max_health: building.max_health,
            building_type: building.kind,
            half_extent: building.half_extent,
            under_construction: building.under_construction,
            construction_progress: building.construction_fraction(),
            production_queue: building.production_queue.iter().map(|o| o.kind).collect(),
            production_progress,
            rally_point: building.rally_point.map(SnapPoint::from),
            garrison_count: building.garrison.len() as u32,
            hangar_occupied: building.hangar_bays.len() as u32,
            hangar_on_sortie: !building.hangar_on_sortie.is_empty(),
            turret_rotation: building.turret_rotation,
        });
    }

    let mut obstacles = Vec::new();
    for obstacle in inputs.entities.obstacles.values() {
        if !obstacle.active {
            continue;
        }
        let (vertices, radius) = match &obstacle.shape {
            ObstacleShape::Circle { radius } => (Vec::new(), *radius),
            ObstacleShape::Rectangle {
                half_width,
                half_height,
            } => {
                let (w, h) = (*half_width, *half_height);
                let corners = [
                    crate::math::Vec2::new(-w, -h),
                    crate::math::Vec2::new(w, -h),
                    crate::math::Vec2::new(w, h),
                    crate::math::Vec2::new(-w, h),
                ];
                (corners.into_iter().map(SnapPoint::from).collect(), 0.0)
            }
            ObstacleShape::Polygon { vertices } | ObstacleShape::IrregularPolygon { vertices } => {
                (vertices.iter().copied().map(SnapPoint::from).collect(), 0.0)
            }
        };
        obstacles.push(ObstacleSnapshot {
            id: obstacle.id,
            x: obstacle.position.x,
            y: obstacle.position.y,
            vertices,
            radius,
            resource_type: obstacle.resource.map(|(kind, _)| kind),
            resource_remaining: obstacle.resource.map_or(0.0, |(_, left)| left),
        });
    }

    let mut wall_segments = Vec::new();
    for wall in inputs.entities.walls.values() {
        if !wall.active {
            continue;
        }
        if !sees(wall.team, wall.center(), false) {
            continue;
        }
        wall_segments.push(WallSnapshot {
            id: wall.id,
            x: wall.center().x,
            y: wall.center().y,
            team: wall.team,
            owner_id: wall.owner,
            health: wall.health,
            max_health: wall.max_health,
            vertices: vec![SnapPoint::from(wall.start), SnapPoint::from(wall.end)],
        });
    }

    let mut projectiles = Vec::new();
    for projectile in inputs.entities.projectiles.values() {
        if projectile.team != viewer_team && !vision.sees(projectile.position) {
            continue;
        }
        projectiles.push(ProjectileSnapshot {
            id: projectile.id,
            x: projectile.position.x,
            y: projectile.position.y,
            ordinance_type: projectile.kind,
            vx: projectile.velocity.x,
            vy: projectile.velocity.y,
        });
    }

    let mut beams = Vec::new();
    for beam in inputs.entities.beams.values() {
        if vision.sees(beam.start) || vision.sees(beam.end) {
            beams.push(BeamSnapshot {
                id: beam.id,
                beam_type: beam.kind,
                vertices: vec![SnapPoint::from(beam.start), SnapPoint::from(beam.end)],
            });
        }
    }

    let mut field_effects = Vec::new();
    for fx in inputs.entities.field_effects.values() {
        if fx.team != viewer_team && !vision.sees(fx.center) {
            continue;
        }
        field_effects.push(FieldEffectSnapshot {
            id: fx.id,
            x: fx.center.x,
            y: fx.center.y,
            effect_type: fx.kind,
            radius: fx.radius,
        });
    }

    let mut factions = BTreeMap::new();
    for faction in inputs.factions.values() {
        factions.insert(
            faction.player.to_string(),
            FactionSnapshot {
                player_id: faction.player,
                faction_type: faction.kind,
                team: faction.team,
                credits: faction.credits,
                current_upkeep: faction.current_upkeep,
                max_upkeep: faction.max_upkeep,
                power_generated: faction.power_generated,
                power_consumed: faction.power_consumed,
                has_low_power: faction.has_low_power(),
                completed_research: faction.completed_research.iter().copied().collect(),
                active_research: faction
                    .active_research
                    .values()
                    .map(|r| ActiveResearchSnapshot {
                        research: r.id,
                        progress_secs: r.progress_secs,
                    })
                    .collect(),
            },
        );
    }

    let vision_range = inputs
        .entities
        .units
        .values()
        .filter(|u| u.team == viewer_team && Targetable::is_active(*u))
        .map(|u| u.vision_range)
        .fold(300.0_f32, f32::max);

    GameStateSnapshot {
        units,
        buildings,
        obstacles,
        wall_segments,
        projectiles,
        beams,
        field_effects,
        factions,
        vision_range,
        biome: inputs.biome,
        world_width: inputs.world_size,
        world_height: inputs.world_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::Faction;
    use crate::math::Vec2;
    use crate::units::{Unit, UnitKind};

    fn store_with_two_teams() -> (GameEntities, BTreeMap<PlayerId, Faction>) {
        let mut entities = GameEntities::new();
        let mut factions = BTreeMap::new();
        factions.insert(1, Faction::new(1, FactionKind::Coalition, 1, 500));
        factions.insert(2, Faction::new(2, FactionKind::Nomads, 2, 500));

        let friendly = entities.allocate_id();
        entities.add_unit(Unit::from_spec(
            friendly,
            UnitKind::Trooper,
            1,
            1,
            Vec2::new(500.0, 500.0),
            1.0,
        ));
        (entities, factions)
    }

    fn snapshot_for_team_1(
        entities: &GameEntities,
        factions: &BTreeMap<PlayerId, Faction>,
    ) -> GameStateSnapshot {
        let inputs = SnapshotInputs {
            entities,
            factions,
            biome: Biome::Dunes,
            world_size: 3000.0,
        };
        build_game_state(&inputs, 1, 1, &BTreeSet::new())
    }

    #[test]
    fn test_enemy_outside_vision_is_omitted() {
        let (mut entities, factions) = store_with_two_teams();
        let far_enemy = entities.allocate_id();
        entities.add_unit(Unit::from_spec(
            far_enemy,
            UnitKind::Trooper,
            2,
            2,
            Vec2::new(2500.0, 2500.0),
            1.0,
        ));

        let snapshot = snapshot_for_team_1(&entities, &factions);
        assert_eq!(snapshot.units.len(), 1);
        assert!(snapshot.units.iter().all(|u| u.id != far_enemy));
    }

    #[test]
    fn test_enemy_inside_vision_is_included() {
        let (mut entities, factions) = store_with_two_teams();
        let near_enemy = entities.allocate_id();
        entities.add_unit(Unit::from_spec(
            near_enemy,
            UnitKind::Trooper,
            2,
            2,
            Vec2::new(650.0, 500.0),
            1.0,
        ));

        let snapshot = snapshot_for_team_1(&entities, &factions);
        assert!(snapshot.units.iter().any(|u| u.id == near_enemy));
    }

    #[test]
    fn test_cloaked_enemy_needs_detection() {
        let (mut entities, factions) = store_with_two_teams();
        let phantom = entities.allocate_id();
        let mut unit = Unit::from_spec(
            phantom,
            UnitKind::Phantom,
            2,
            2,
            // Inside vision (300) but outside detection (100).
            Vec2::new(650.0, 500.0),
            1.0,
        );
        unit.cloak.as_mut().unwrap().active = true;
        entities.add_unit(unit);

        let snapshot = snapshot_for_team_1(&entities, &factions);
        assert!(snapshot.units.iter().all(|u| u.id != phantom));
    }

    #[test]
    fn test_round_trip_preserves_two_decimals() {
        let (mut entities, factions) = store_with_two_teams();
        if let Some(unit) = entities.units.values_mut().next() {
            unit.position = Vec2::new(123.456_78, 987.654_3);
            unit.health = 73.333_33;
        }

        let snapshot = snapshot_for_team_1(&entities, &factions);
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: GameStateSnapshot = serde_json::from_str(&json).unwrap();

        let unit = &decoded.units[0];
        assert!((unit.x - 123.46).abs() < 1e-3);
        assert!((unit.y - 987.65).abs() < 1e-3);
        assert!((unit.health - 73.33).abs() < 1e-3);

        // A second round trip is stable.
        let json2 = serde_json::to_string(&decoded).unwrap();
        assert_eq!(json, json2);
    }

    #[test]
    fn test_infinity_sentinel() {
        let (mut entities, factions) = store_with_two_teams();
        if let Some(unit) = entities.units.values_mut().next() {
            unit.max_health = f32::INFINITY;
        }
        let snapshot = snapshot_for_team_1(&entities, &factions);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["units"][0]["maxHealth"], 999_999.0);
    }

    #[test]
    fn test_factions_keyed_by_player() {
        let (entities, factions) = store_with_two_teams();
        let snapshot = snapshot_for_team_1(&entities, &factions);
        assert!(snapshot.factions.contains_key("1"));
        assert!(snapshot.factions.contains_key("2"));
        assert_eq!(snapshot.factions["1"].credits, 500);
    }
}
