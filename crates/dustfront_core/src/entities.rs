//! The per-game entity store.
//!
//! Ordered maps keyed by entity id give deterministic iteration and make
//! "lower id wins" tie-breaking fall out of scan order. All mutation
//! happens inside the owning game's tick; nothing here is shared across
//! games.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingKind, WallSegment};
use crate::math::Vec2;
use crate::obstacles::Obstacle;
use crate::ordinance::{Beam, FieldEffect, Projectile};
use crate::physics::PhysicsWorld;
use crate::targets::{Elevation, EntityId, TargetId, Targetable};
use crate::units::{PlayerId, Unit};
use crate::weapons::ElevationMask;

/// Copy of a target's combat-relevant state, taken at resolution time.
///
/// Commands hold a [`TargetId`] and re-resolve it into this snapshot
/// every tick, so a removed entity simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    /// The resolved target.
    pub id: TargetId,
    /// Position this tick.
    pub position: Vec2,
    /// Velocity this tick (zero for buildings and walls).
    pub velocity: Vec2,
    /// Team number.
    pub team: u8,
    /// Flight layer.
    pub elevation: Elevation,
    /// Radius added to weapon range.
    pub target_size: f32,
    /// Whether the target is currently cloaked.
    pub cloaked: bool,
}

/// Parameters for a nearest-enemy scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanParams {
    /// Observer position.
    pub position: Vec2,
    /// Observer team.
    pub team: u8,
    /// Elevations the observer's weapons can hit.
    pub hits: ElevationMask,
    /// Radius within which cloaked targets are revealed to the observer.
    pub cloak_detection_range: f32,
    /// Maximum search distance.
    pub radius: f32,
}

/// Per-team union of friendly vision sources, for snapshot filtering
/// and cloak detection.
#[derive(Debug, Clone, Default)]
pub struct VisionField {
    sources: Vec<(Vec2, f32, f32)>,
}

impl VisionField {
    /// True if `point` is inside any friendly vision radius.
    #[must_use]
    pub fn sees(&self, point: Vec2) -> bool {
        self.sources
            .iter()
            .any(|(pos, vision, _)| pos.distance_squared(point) <= vision * vision)
    }

    /// True if a cloaked entity at `point` is revealed.
    #[must_use]
    pub fn detects_cloaked(&self, point: Vec2) -> bool {
        self.sources
            .iter()
            .any(|(pos, _, detect)| pos.distance_squared(point) <= detect * detect)
    }
}

/// Keyed collections of every entity family plus reverse indexes.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GameEntities {
    /// Mobile units.
    pub units: BTreeMap<EntityId, Unit>,
    /// Buildings.
    pub buildings: BTreeMap<EntityId, Building>,
    /// Obstacles.
    pub obstacles: BTreeMap<EntityId, Obstacle>,
    /// Wall segments.
    pub walls: BTreeMap<EntityId, WallSegment>,
    /// Projectiles in flight.
    pub projectiles: BTreeMap<EntityId, Projectile>,
    /// Visible beams.
    pub beams: BTreeMap<EntityId, Beam>,
    /// Field effects.
    pub field_effects: BTreeMap<EntityId, FieldEffect>,
    units_by_team: BTreeMap<u8, BTreeSet<EntityId>>,
    buildings_by_owner: BTreeMap<PlayerId, BTreeSet<EntityId>>,
    next_id: EntityId,
}

impl GameEntities {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next monotonic entity id.
    pub fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    /// Insert a unit, maintaining the team index.
    pub fn add_unit(&mut self, unit: Unit) {
        self.units_by_team
            .entry(unit.team)
            .or_default()
            .insert(unit.id);
        self.units.insert(unit.id, unit);
    }

    /// Remove a unit. Returns it so callers can release its body.
    pub fn remove_unit(&mut self, id: EntityId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        if let Some(set) = self.units_by_team.get_mut(&unit.team) {
            set.remove(&id);
        }
        Some(unit)
    }

    /// Take a unit out of the map for in-tick processing.
    ///
    /// The team index deliberately keeps the id; [`Self::put_back_unit`]
    /// must be called before the tick ends. Scans resolve through the
    /// map, so a detached unit is simply skipped.
    pub fn detach_unit(&mut self, id: EntityId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Re-insert a unit taken with [`Self::detach_unit`].
    pub fn put_back_unit(&mut self, unit: Unit) {
        self.units.insert(unit.id, unit);
    }

    /// Insert a building, maintaining the owner index.
    pub fn add_building(&mut self, building: Building) {
        self.buildings_by_owner
            .entry(building.owner)
            .or_default()
            .insert(building.id);
        self.buildings.insert(building.id, building);
    }

    /// Remove a building.
    pub fn remove_building(&mut self, id: EntityId) -> Option<Building> {
        let building = self.buildings.remove(&id)?;
        if let Some(set) = self.buildings_by_owner.get_mut(&building.owner) {
            set.remove(&id);
        }
        Some(building)
    }

    /// Ids of all units on `team`.
    #[must_use]
    pub fn unit_ids_on_team(&self, team: u8) -> Vec<EntityId> {
        self.units_by_team
            .get(&team)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ids of all buildings owned by `player`.
    #[must_use]
    pub fn building_ids_of(&self, player: PlayerId) -> Vec<EntityId> {
        self.buildings_by_owner
            .get(&player)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Count of operating (completed, alive) buildings of `kind` owned
    /// by `player`.
    #[must_use]
    pub fn operating_building_count(&self, player: PlayerId, kind: BuildingKind) -> usize {
        self.building_ids_of(player)
            .iter()
            .filter_map(|id| self.buildings.get(id))
            .filter(|b| b.active && !b.under_construction && b.kind == kind)
            .count()
    }

    /// Resolve a target id into a combat snapshot, or `None` when the
    /// target no longer exists or is inactive.
    #[must_use]
    pub fn resolve_target(&self, id: TargetId) -> Option<TargetInfo> {
        match id {
            TargetId::Unit(unit_id) => {
                let unit = self.units.get(&unit_id)?;
                if !Targetable::is_active(unit) {
                    return None;
                }
                Some(TargetInfo {
                    id,
                    position: unit.position,
                    velocity: unit.velocity,
                    team: unit.team,
                    elevation: unit.elevation,
                    target_size: unit.radius,
                    cloaked: unit.is_cloaked(),
                })
            }
            TargetId::Building(building_id) => {
                let building = self.buildings.get(&building_id)?;
                if !building.active {
                    return None;
                }
                Some(TargetInfo {
                    id,
                    position: building.position,
                    velocity: Vec2::ZERO,
                    team: building.team,
                    elevation: Elevation::Ground,
                    target_size: building.half_extent,
                    cloaked: false,
                })
            }
            TargetId::Wall(wall_id) => {
                let wall = self.walls.get(&wall_id)?;
                if !wall.active {
                    return None;
                }
                Some(TargetInfo {
                    id,
                    position: wall.center(),
                    velocity: Vec2::ZERO,
                    team: wall.team,
                    elevation: Elevation::Ground,
                    target_size: wall.length() * 0.5,
                    cloaked: false,
                })
            }
        }
    }

    /// Route damage to whichever entity the id refers to.
    pub fn apply_damage(&mut self, target: TargetId, amount: f32, source: EntityId) {
        match target {
            TargetId::Unit(id) => {
                if let Some(unit) = self.units.get_mut(&id) {
                    unit.take_damage(amount, source);
                }
            }
            TargetId::Building(id) => {
                if let Some(building) = self.buildings.get_mut(&id) {
                    building.take_damage(amount, source);
                }
            }
            TargetId::Wall(id) => {
                if let Some(wall) = self.walls.get_mut(&id) {
                    wall.take_damage(amount, source);
                }
            }
        }
    }

    /// Nearest enemy targetable under the scan constraints.
    ///
    /// Candidates are filtered by team, liveness, elevation capability,
    /// cloak visibility, and distance; ties resolve to the lower team
    /// number, then the lower id.
    #[must_use]
    pub fn find_nearest_enemy_targetable(&self, scan: &ScanParams) -> Option<TargetId> {
        let mut best: Option<(f32, u8, EntityId, TargetId)> = None;
        let radius_sq = scan.radius * scan.radius;
        let detect_sq = scan.cloak_detection_range * scan.cloak_detection_range;

        let mut consider = |candidate: TargetInfo| {
            if candidate.team == scan.team {
                return;
            }
            if !scan.hits.contains(candidate.elevation) {
                return;
            }
            let dist_sq = scan.position.distance_squared(candidate.position);
            if dist_sq > radius_sq {
                return;
            }
            if candidate.cloaked && dist_sq > detect_sq {
                return;
            }
            let key = (dist_sq, candidate.team, candidate.id.entity_id());
            let better = match &best {
                None => true,
                Some((best_dist, best_team, best_id, _)) => {
                    (key.0, key.1, key.2) < (*best_dist, *best_team, *best_id)
                }
            };
            if better {
                best = Some((key.0, key.1, key.2, candidate.id));
            }
        };

        for (&id, unit) in &self.units {
            if Targetable::is_active(unit) {
                if let Some(info) = self.resolve_target(TargetId::Unit(id)) {
                    consider(info);
                }
            }
        }
        for (&id, building) in &self.buildings {
            if building.active {
                if let Some(info) = self.resolve_target(TargetId::Building(id)) {
                    consider(info);
                }
            }
        }
        for (&id, wall) in &self.walls {
            if wall.active {
                if let Some(info) = self.resolve_target(TargetId::Wall(id)) {
                    consider(info);
                }
            }
        }

        best.map(|(_, _, _, id)| id)
    }

    /// Union of vision sources for `team`.
    #[must_use]
    pub fn vision_field(&self, team: u8) -> VisionField {
        let mut sources = Vec::new();
        for unit in self.units.values() {
            if unit.team == team && Targetable::is_active(unit) {
                sources.push((unit.position, unit.vision_range, unit.cloak_detection_range));
            }
        }
        for building in self.buildings.values() {
            if building.team == team && building.active {
                sources.push((building.position, building.vision_range, 0.0));
            }
        }
        VisionField { sources }
    }

    /// Teams that still own an active headquarters.
    #[must_use]
    pub fn teams_with_headquarters(&self) -> BTreeSet<u8> {
        self.buildings
            .values()
            .filter(|b| b.active && b.kind == BuildingKind::Headquarters)
            .map(|b| b.team)
            .collect()
    }

    /// Remove every inactive or expired entity, releasing physics bodies.
    pub fn cull(&mut self, physics: &mut PhysicsWorld, tick: u64) {
        let dead_units: Vec<EntityId> = self
            .units
            .iter()
            .filter(|(_, u)| !u.active)
            .map(|(&id, _)| id)
            .collect();
        for id in dead_units {
            if let Some(unit) = self.remove_unit(id) {
                if let Some(body) = unit.body {
                    physics.remove_body(body);
                }
            }
        }

        let dead_buildings: Vec<EntityId> = self
            .buildings
            .iter()
            .filter(|(_, b)| !b.active)
            .map(|(&id, _)| id)
            .collect();
        for id in dead_buildings {
            if let Some(building) = self.remove_building(id) {
                if let Some(body) = building.body {
                    physics.remove_body(body);
                }
            }
        }

        let dead_walls: Vec<EntityId> = self
            .walls
            .iter()
            .filter(|(_, w)| !w.active)
            .map(|(&id, _)| id)
            .collect();
        for id in dead_walls {
            if let Some(wall) = self.walls.remove(&id) {
                if let Some(body) = wall.body {
                    physics.remove_body(body);
                }
            }
        }

        let dead_obstacles: Vec<EntityId> = self
            .obstacles
            .iter()
            .filter(|(_, o)| !o.active)
            .map(|(&id, _)| id)
            .collect();
        for id in dead_obstacles {
            if let Some(obstacle) = self.obstacles.remove(&id) {
                if let Some(body) = obstacle.body {
                    physics.remove_body(body);
                }
            }
        }

        self.beams.retain(|_, beam| !beam.is_expired(tick));
        self.field_effects.retain(|_, fx| !fx.is_expired(tick));
    }
}
