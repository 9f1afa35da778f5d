//! Mobile units: kinds, AI stance, per-unit component bag.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::command::UnitCommand;
use crate::data::unit_data;
use crate::math::Vec2;
use crate::physics::BodyHandle;
use crate::targets::{Elevation, EntityId, TargetKind, Targetable};
use crate::weapons::Weapon;

/// Identifier of the owning player/faction within a game.
pub type PlayerId = u32;

/// Every unit type in the game.
///
/// The roster spans three factions plus a shared worker/economy tier;
/// balance lives in [`crate::data::unit_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitKind {
    // Economy tier (all factions)
    /// Construction and harvest worker.
    Rigger,
    /// Ore miner with a consumable pickaxe.
    Prospector,
    /// Fast unarmed scout with wide vision.
    Surveyor,
    /// Repair technician for vehicles and structures.
    Technician,

    // Coalition infantry
    /// Basic rifle infantry.
    Trooper,
    /// Grenade launcher infantry.
    Grenadier,
    /// Long-range anti-infantry specialist.
    Marksman,
    /// Anti-armor rocket infantry.
    RocketTrooper,
    /// Support medic.
    FieldMedic,
    /// Demolitions specialist.
    Sapper,

    // Syndicate infantry
    /// SMG shock infantry.
    Enforcer,
    /// Chaingun heavy infantry.
    Shredder,
    /// Cloak-capable saboteur.
    Infiltrator,
    /// Flame infantry.
    PyroTrooper,

    // Nomad infantry
    /// Raiding skirmisher.
    Raider,
    /// Camouflaged desert sniper.
    DuneStalker,
    /// Caster projecting sandstorms.
    StormCaller,

    // Vehicles
    /// Scout buggy.
    Outrider,
    /// Light tank.
    Warhound,
    /// Heavy battle tank.
    Basilisk,
    /// Cloaking tank.
    Phantom,
    /// Electric arc tank.
    ArcTank,
    /// Flame tank.
    Inferno,
    /// Anti-air flak vehicle.
    FlakTrack,
    /// Long-range artillery.
    Howitzer,
    /// Homing missile carrier.
    MissileCarrier,
    /// Siege vehicle specialized against structures.
    Breacher,
    /// Armored personnel carrier.
    Dustcrawler,
    /// Battlefield salvage and repair vehicle.
    Reclaimer,
    /// Super-heavy assault platform.
    Juggernaut,
    /// Anti-tank gun platform.
    Ballista,
    /// Holographic decoy projector.
    Mirage,
    /// Drone-carrier vehicle.
    Scarab,

    // Low-altitude aircraft
    /// Dual-weapon gunship.
    Gunship,
    /// Scout drone.
    Dragonfly,
    /// Attack helicopter.
    Hornet,
    /// Expendable attack drone.
    Vulture,

    // High-altitude aircraft (hangar-based)
    /// Carpet bomber.
    Condor,
    /// Air-superiority interceptor.
    Falcon,
    /// Heavy strategic bomber.
    Albatross,
}

impl UnitKind {
    /// All kinds, in declaration order. Used by catalogs and tests.
    pub const ALL: [UnitKind; 40] = [
        UnitKind::Rigger,
        UnitKind::Prospector,
        UnitKind::Surveyor,
        UnitKind::Technician,
        UnitKind::Trooper,
        UnitKind::Grenadier,
        UnitKind::Marksman,
        UnitKind::RocketTrooper,
        UnitKind::FieldMedic,
        UnitKind::Sapper,
        UnitKind::Enforcer,
        UnitKind::Shredder,
        UnitKind::Infiltrator,
        UnitKind::PyroTrooper,
        UnitKind::Raider,
        UnitKind::DuneStalker,
        UnitKind::StormCaller,
        UnitKind::Outrider,
        UnitKind::Warhound,
        UnitKind::Basilisk,
        UnitKind::Phantom,
        UnitKind::ArcTank,
        UnitKind::Inferno,
        UnitKind::FlakTrack,
        UnitKind::Howitzer,
        UnitKind::MissileCarrier,
        UnitKind::Breacher,
        UnitKind::Dustcrawler,
        UnitKind::Reclaimer,
        UnitKind::Juggernaut,
        UnitKind::Ballista,
        UnitKind::Mirage,
        UnitKind::Scarab,
        UnitKind::Gunship,
        UnitKind::Dragonfly,
        UnitKind::Hornet,
        UnitKind::Vulture,
        UnitKind::Condor,
        UnitKind::Falcon,
        UnitKind::Albatross,
    ];
}

/// AI stance controlling auto-attack behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiStance {
    /// Auto-engage, but never chase farther than the leash from home.
    #[default]
    Defensive,
    /// Never auto-acquire targets.
    HoldPosition,
    /// Auto-engage anything in scan range.
    Aggressive,
}

impl AiStance {
    /// Whether idle units with this stance scan for targets.
    #[must_use]
    pub const fn auto_acquires(self) -> bool {
        !matches!(self, Self::HoldPosition)
    }
}

/// Cloak component state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CloakState {
    /// Whether the cloak is currently engaged.
    pub active: bool,
}

/// Worker carry component: resources picked up while harvesting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarryLoad {
    /// Maximum load.
    pub capacity: f32,
    /// Current load.
    pub current: f32,
    /// Harvest rate in resource units per second.
    pub rate_per_sec: f32,
}

impl CarryLoad {
    /// True when the worker cannot carry more.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current >= self.capacity
    }
}

/// Miner pickaxe component: wears down while mining, restored on return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pickaxe {
    /// Durability when fresh.
    pub max_durability: f32,
    /// Remaining durability.
    pub durability: f32,
    /// Mining yield in credits per second.
    pub rate_per_sec: f32,
}

impl Pickaxe {
    /// True when the pickaxe needs re-forging at the headquarters.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.durability <= 0.0
    }
}

/// Hangar-based aircraft component: fuel/ammo plus the home hangar link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    /// Remaining flight seconds before a forced return.
    pub fuel_secs: f32,
    /// Flight seconds when fully fueled.
    pub max_fuel_secs: f32,
    /// Remaining shots before a forced return.
    pub ammo: u32,
    /// Shots when fully armed.
    pub max_ammo: u32,
    /// Home hangar building id.
    pub home_hangar: EntityId,
}

impl AircraftState {
    /// True when the craft must head home for fuel or ammo.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.fuel_secs <= 0.0 || self.ammo == 0
    }

    /// Refill fuel and ammo (hangar turnaround).
    pub fn replenish(&mut self) {
        self.fuel_secs = self.max_fuel_secs;
        self.ammo = self.max_ammo;
    }
}

/// A mobile unit.
///
/// Position and rotation mirror the physics body after each solver step;
/// command logic writes the body's target velocity, never the transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// Entity id.
    pub id: EntityId,
    /// Unit type.
    pub kind: UnitKind,
    /// Owning player.
    pub owner: PlayerId,
    /// Team number.
    pub team: u8,
    /// World position (mirror of the physics body).
    pub position: Vec2,
    /// Facing in radians.
    pub rotation: f32,
    /// Velocity (mirror of the physics body), consumed by predictive aim.
    pub velocity: Vec2,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// AI stance.
    pub stance: AiStance,
    /// Flight layer.
    pub elevation: Elevation,
    /// Collision/selection radius.
    pub radius: f32,
    /// Vision radius for the snapshot filter and target scans.
    pub vision_range: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Primary weapon.
    pub weapon: Option<Weapon>,
    /// Second weapon (gunships fire both).
    pub second_weapon: Option<Weapon>,
    /// Active command. Exactly one at all times.
    pub command: UnitCommand,
    /// Shift-queued follow-up commands.
    pub command_queue: VecDeque<UnitCommand>,
    /// Anchor for the defensive-stance leash.
    pub home_position: Vec2,
    /// Physics body handle; `None` while garrisoned or hangar-housed.
    #[serde(skip)]
    pub body: Option<BodyHandle>,
    /// Cloak component.
    pub cloak: Option<CloakState>,
    /// Radius within which this unit reveals cloaked enemies.
    pub cloak_detection_range: f32,
    /// Worker carry component.
    pub carry: Option<CarryLoad>,
    /// Miner pickaxe component.
    pub pickaxe: Option<Pickaxe>,
    /// Hangar-based aircraft component.
    pub aircraft: Option<AircraftState>,
    /// Suspended inside a bunker or hangar (no body, not targetable).
    pub housed: bool,
    /// Last entity that damaged this unit.
    pub last_attacker: Option<EntityId>,
    /// Tick at which the special ability can trigger again.
    pub ability_ready_tick: u64,
    /// False once destroyed; culled at end of tick.
    pub active: bool,
}

impl Unit {
    /// Create a unit of `kind` at `position` from its balance spec.
    ///
    /// `health_mult` comes from the owning faction's completed research.
    #[must_use]
    pub fn from_spec(
        id: EntityId,
        kind: UnitKind,
        owner: PlayerId,
        team: u8,
        position: Vec2,
        health_mult: f32,
    ) -> Self {
        let spec = unit_data::spec(kind);
        let max_health = spec.max_health * health_mult;
        Self {
            id,
            kind,
            owner,
            team,
            position,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            health: max_health,
            max_health,
            stance: AiStance::default(),
            elevation: spec.elevation,
            radius: spec.radius,
            vision_range: spec.vision_range,
            speed: spec.speed,
            weapon: spec.weapon.map(|k| Weapon::new(crate::data::weapon_data::spec(k))),
            second_weapon: spec
                .second_weapon
                .map(|k| Weapon::new(crate::data::weapon_data::spec(k))),
            command: UnitCommand::default(),
            command_queue: VecDeque::new(),
            home_position: position,
            body: None,
            cloak: spec.can_cloak.then(CloakState::default),
            cloak_detection_range: spec.cloak_detection_range,
            carry: spec.carry,
            pickaxe: spec.pickaxe,
            aircraft: None,
            housed: false,
            last_attacker: None,
            ability_ready_tick: 0,
            active: true,
        }
    }

    /// True for low- or high-altitude craft.
    #[must_use]
    pub fn is_airborne(&self) -> bool {
        !matches!(self.elevation, Elevation::Ground)
    }

    /// True if the unit carries at least one weapon.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.weapon.is_some()
    }

    /// Longest weapon range this unit can bring to bear, zero if unarmed.
    #[must_use]
    pub fn max_weapon_range(&self) -> f32 {
        let primary = self.weapon.map_or(0.0, |w| w.spec.range);
        let second = self.second_weapon.map_or(0.0, |w| w.spec.range);
        primary.max(second)
    }

    /// Count down weapon cooldowns.
    pub fn tick_weapons(&mut self, dt: f32) {
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.tick(dt);
        }
        if let Some(weapon) = self.second_weapon.as_mut() {
            weapon.tick(dt);
        }
    }

    /// Replace the active command, pushing nothing to the queue.
    /// The previous command's cancel hook must already have run.
    pub fn set_command(&mut self, command: UnitCommand) {
        self.command = command;
        self.command_queue.clear();
    }

    /// Append a shift-queued command.
    pub fn queue_command(&mut self, command: UnitCommand) {
        self.command_queue.push_back(command);
    }

    /// Advance to the next queued command, or Idle.
    pub fn next_command(&mut self) {
        self.command = self.command_queue.pop_front().unwrap_or_default();
    }
}

impl Targetable for Unit {
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
        self.elevation
    }

    fn target_size(&self) -> f32 {
        self.radius
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Unit
    }

    fn is_active(&self) -> bool {
        self.active && !self.housed
    }

    fn is_cloaked(&self) -> bool {
        self.cloak.is_some_and(|c| c.active)
    }

    fn take_damage(&mut self, amount: f32, source: EntityId) {
        self.health = (self.health - amount).max(0.0);
        self.last_attacker = Some(source);
        if self.health <= 0.0 {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_size() {
        assert_eq!(UnitKind::ALL.len(), 40);
    }

    #[test]
    fn test_from_spec_applies_health_mult() {
        let unit = Unit::from_spec(1, UnitKind::Trooper, 0, 1, Vec2::ZERO, 1.2);
        assert!((unit.max_health - unit_data::spec(UnitKind::Trooper).max_health * 1.2).abs() < 1e-3);
        assert_eq!(unit.health, unit.max_health);
    }

    #[test]
    fn test_damage_kills_and_records_attacker() {
        let mut unit = Unit::from_spec(1, UnitKind::Trooper, 0, 1, Vec2::ZERO, 1.0);
        unit.take_damage(unit.max_health + 10.0, 42);
        assert_eq!(unit.health, 0.0);
        assert!(!unit.active);
        assert!(!Targetable::is_active(&unit));
        assert_eq!(unit.last_attacker, Some(42));
    }

    #[test]
    fn test_cloaked_units_report_cloak() {
        let mut unit = Unit::from_spec(1, UnitKind::Phantom, 0, 1, Vec2::ZERO, 1.0);
        assert!(unit.cloak.is_some());
        assert!(!unit.is_cloaked());
        unit.cloak.as_mut().unwrap().active = true;
        assert!(unit.is_cloaked());
    }

    #[test]
    fn test_housed_units_not_targetable() {
        let mut unit = Unit::from_spec(1, UnitKind::Falcon, 0, 1, Vec2::ZERO, 1.0);
        unit.housed = true;
        assert!(!Targetable::is_active(&unit));
    }

    #[test]
    fn test_stance_auto_acquire() {
        assert!(AiStance::Defensive.auto_acquires());
        assert!(AiStance::Aggressive.auto_acquires());
        assert!(!AiStance::HoldPosition.auto_acquires());
    }

    #[test]
    fn test_kind_wire_string() {
        let s = serde_json::to_string(&UnitKind::RocketTrooper).unwrap();
        assert_eq!(s, "\"ROCKET_TROOPER\"");
    }
}
