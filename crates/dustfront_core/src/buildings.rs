//! Buildings and wall segments.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::data::building_data;
use crate::math::Vec2;
use crate::physics::BodyHandle;
use crate::targets::{Elevation, EntityId, TargetKind, Targetable};
use crate::units::{PlayerId, UnitKind};
use crate::weapons::Weapon;

/// Every building type in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildingKind {
    /// Faction nerve center. Losing all headquarters loses the game.
    Headquarters,
    /// Resource drop-off; each operating refinery adds credit income.
    Refinery,
    /// Generates power.
    PowerPlant,
    /// Produces infantry.
    Barracks,
    /// Produces vehicles.
    VehicleFactory,
    /// Produces and houses hangar-based aircraft.
    Airfield,
    /// Runs research.
    ResearchLab,
    /// Anti-ground gun turret.
    GunTurret,
    /// Anti-air missile turret.
    MissileTurret,
    /// Short-range tesla defense tower.
    ArcTower,
    /// Garrisonable infantry bunker.
    Bunker,
    /// Raises the faction upkeep cap.
    Armory,
}

impl BuildingKind {
    /// All kinds, in declaration order.
    pub const ALL: [BuildingKind; 12] = [
        BuildingKind::Headquarters,
        BuildingKind::Refinery,
        BuildingKind::PowerPlant,
        BuildingKind::Barracks,
        BuildingKind::VehicleFactory,
        BuildingKind::Airfield,
        BuildingKind::ResearchLab,
        BuildingKind::GunTurret,
        BuildingKind::MissileTurret,
        BuildingKind::ArcTower,
        BuildingKind::Bunker,
        BuildingKind::Armory,
    ];
}

/// One queued unit production order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionOrder {
    /// Unit kind being produced.
    pub kind: UnitKind,
    /// Build seconds accumulated so far (first item in queue only).
    pub progress_secs: f32,
}

/// A placed building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    /// Entity id.
    pub id: EntityId,
    /// Building type.
    pub kind: BuildingKind,
    /// Owning player.
    pub owner: PlayerId,
    /// Team number.
    pub team: u8,
    /// World position (center).
    pub position: Vec2,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Half-extent of the square footprint.
    pub half_extent: f32,
    /// Vision radius.
    pub vision_range: f32,
    /// True until a worker finishes construction.
    pub under_construction: bool,
    /// Construction seconds accumulated by workers.
    pub construction_progress_secs: f32,
    /// Unit production queue (front item is in progress).
    pub production_queue: VecDeque<ProductionOrder>,
    /// Where produced units walk to after spawning.
    pub rally_point: Option<Vec2>,
    /// Garrisoned unit ids (bunkers).
    pub garrison: Vec<EntityId>,
    /// Housed aircraft ids (airfields).
    pub hangar_bays: Vec<EntityId>,
    /// Aircraft currently flying a mission from this hangar.
    pub hangar_on_sortie: Vec<EntityId>,
    /// Rotating defensive weapon (turret buildings).
    pub turret_weapon: Option<Weapon>,
    /// Current turret facing in radians.
    pub turret_rotation: f32,
    /// Physics body handle.
    #[serde(skip)]
    pub body: Option<BodyHandle>,
    /// False once destroyed; culled at end of tick.
    pub active: bool,
}

impl Building {
    /// Create a building of `kind` at `position` from its balance spec.
    ///
    /// Buildings placed by a build order start under construction with a
    /// sliver of health; `completed` spawns (map setup) start finished.
    #[must_use]
    pub fn from_spec(
        id: EntityId,
        kind: BuildingKind,
        owner: PlayerId,
        team: u8,
        position: Vec2,
        completed: bool,
    ) -> Self {
        let spec = building_data::spec(kind);
        Self {
            id,
            kind,
            owner,
            team,
            position,
            health: if completed {
                spec.max_health
            } else {
                spec.max_health * 0.1
            },
            max_health: spec.max_health,
            half_extent: spec.half_extent,
            vision_range: spec.vision_range,
            under_construction: !completed,
            construction_progress_secs: 0.0,
            production_queue: VecDeque::new(),
            rally_point: None,
            garrison: Vec::new(),
            hangar_bays: Vec::new(),
            hangar_on_sortie: Vec::new(),
            turret_weapon: spec
                .turret_weapon
                .map(|k| Weapon::new(crate::data::weapon_data::spec(k))),
            turret_rotation: 0.0,
            body: None,
            active: true,
        }
    }

    /// Construction completion in `[0, 1]`.
    #[must_use]
    pub fn construction_fraction(&self) -> f32 {
        let total = building_data::spec(self.kind).build_secs;
        if total <= 0.0 {
            1.0
        } else {
            (self.construction_progress_secs / total).min(1.0)
        }
    }

    /// Apply `secs` of worker construction effort. Returns true when the
    /// building just finished.
    pub fn advance_construction(&mut self, secs: f32) -> bool {
        if !self.under_construction {
            return false;
        }
        let spec = building_data::spec(self.kind);
        self.construction_progress_secs += secs;
        // Health scales up alongside construction progress.
        self.health =
            (self.max_health * (0.1 + 0.9 * self.construction_fraction())).min(self.max_health);
        if self.construction_progress_secs >= spec.build_secs {
            self.under_construction = false;
            self.health = self.max_health;
            true
        } else {
            false
        }
    }

    /// True for turret buildings that shut down on power deficit.
    #[must_use]
    pub fn is_defensive(&self) -> bool {
        building_data::spec(self.kind).defensive
    }

    /// Free garrison capacity (zero for non-bunkers).
    #[must_use]
    pub fn garrison_space(&self) -> usize {
        building_data::spec(self.kind)
            .garrison_capacity
            .saturating_sub(self.garrison.len())
    }

    /// Free hangar bays (zero for non-airfields). Craft on sortie still
    /// claim their bay.
    #[must_use]
    pub fn hangar_space(&self) -> usize {
        building_data::spec(self.kind)
            .hangar_capacity
            .saturating_sub(self.hangar_bays.len() + self.hangar_on_sortie.len())
    }
}

impl Targetable for Building {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn team(&self) -> u8 {
        self.team
    }

    fn elevation(&self) -> Elevation {
        Elevation::Ground
    }

    fn target_size(&self) -> f32 {
        self.half_extent
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Building
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn take_damage(&mut self, amount: f32, _source: EntityId) {
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.active = false;
        }
    }
}

/// A short attackable wall segment. Blocks ground movement; airborne
/// units overfly it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallSegment {
    /// Entity id.
    pub id: EntityId,
    /// Owning player.
    pub owner: PlayerId,
    /// Team number.
    pub team: u8,
    /// Segment start point.
    pub start: Vec2,
    /// Segment end point.
    pub end: Vec2,
    /// Current hit points.
    pub health: f32,
    /// Maximum hit points.
    pub max_health: f32,
    /// Physics body handle.
    #[serde(skip)]
    pub body: Option<BodyHandle>,
    /// False once destroyed.
    pub active: bool,
}

impl WallSegment {
    /// Wall segment hit points.
    pub const MAX_HEALTH: f32 = 400.0;

    /// Create a segment spanning `start`..`end`.
    #[must_use]
    pub fn new(id: EntityId, owner: PlayerId, team: u8, start: Vec2, end: Vec2) -> Self {
        Self {
            id,
            owner,
            team,
            start,
            end,
            health: Self::MAX_HEALTH,
            max_health: Self::MAX_HEALTH,
            body: None,
            active: true,
        }
    }

    /// Segment midpoint.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.start + self.end) * 0.5
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

impl Targetable for WallSegment {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.center()
    }

    fn team(&self) -> u8 {
        self.team
    }

    fn elevation(&self) -> Elevation {
        Elevation::Ground
    }

    fn target_size(&self) -> f32 {
        self.length() * 0.5
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::WallSegment
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn take_damage(&mut self, amount: f32, _source: EntityId) {
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_progression() {
        let mut b = Building::from_spec(1, BuildingKind::Barracks, 0, 1, Vec2::ZERO, false);
        assert!(b.under_construction);
        assert!(b.health < b.max_health);

        let total = building_data::spec(BuildingKind::Barracks).build_secs;
        assert!(!b.advance_construction(total * 0.5));
        assert!(b.under_construction);

        assert!(b.advance_construction(total * 0.6));
        assert!(!b.under_construction);
        assert_eq!(b.health, b.max_health);

        // Further effort is a no-op.
        assert!(!b.advance_construction(1.0));
    }

    #[test]
    fn test_completed_spawn_is_finished() {
        let b = Building::from_spec(1, BuildingKind::Headquarters, 0, 1, Vec2::ZERO, true);
        assert!(!b.under_construction);
        assert_eq!(b.health, b.max_health);
    }

    #[test]
    fn test_bunker_garrison_space() {
        let mut b = Building::from_spec(1, BuildingKind::Bunker, 0, 1, Vec2::ZERO, true);
        let capacity = building_data::spec(BuildingKind::Bunker).garrison_capacity;
        assert_eq!(b.garrison_space(), capacity);
        b.garrison.push(10);
        assert_eq!(b.garrison_space(), capacity - 1);
    }

    #[test]
    fn test_hangar_space_counts_sorties() {
        let mut b = Building::from_spec(1, BuildingKind::Airfield, 0, 1, Vec2::ZERO, true);
        let capacity = building_data::spec(BuildingKind::Airfield).hangar_capacity;
        b.hangar_bays.push(5);
        b.hangar_on_sortie.push(6);
        assert_eq!(b.hangar_space(), capacity - 2);
    }

    #[test]
    fn test_wall_destruction() {
        let mut wall = WallSegment::new(3, 0, 1, Vec2::ZERO, Vec2::new(40.0, 0.0));
        assert_eq!(wall.center(), Vec2::new(20.0, 0.0));
        wall.take_damage(WallSegment::MAX_HEALTH, 9);
        assert!(!wall.active);
    }
}
