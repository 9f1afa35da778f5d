//! The per-unit command state machine.
//!
//! Every unit owns exactly one active [`UnitCommand`] plus a queue of
//! shift-queued follow-ups. The game loop drives four hooks per tick,
//! in order: [`UnitCommand::update`], [`UnitCommand::update_movement`],
//! [`UnitCommand::update_combat`], and [`UnitCommand::on_cancel`] when
//! a command is replaced.
//!
//! Commands reference other entities by id and re-resolve them through
//! the store every tick; a missing entity completes the command.

pub mod aircraft;
pub mod attack;
pub mod steering;
pub mod worker;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::entities::GameEntities;
use crate::factions::{Faction, FactionMods};
use crate::math::Vec2;
use crate::pathfinding::NavGrid;
use crate::physics::PhysicsWorld;
use crate::targets::{EntityId, TargetId};
use crate::units::{PlayerId, Unit};

use steering::PathPlan;

/// Everything a command may touch during one tick.
///
/// The unit being updated is detached from the store for the duration
/// of its hooks, so lookups through `entities` never alias it.
pub struct CommandCtx<'a> {
    /// The entity store (the updated unit is detached).
    pub entities: &'a mut GameEntities,
    /// The physics world.
    pub physics: &'a mut PhysicsWorld,
    /// Current occupancy grid.
    pub nav: &'a NavGrid,
    /// All factions, keyed by player.
    pub factions: &'a mut BTreeMap<PlayerId, Faction>,
    /// Game tuning constants.
    pub config: &'a GameConfig,
    /// Current tick.
    pub tick: u64,
    /// Tick duration in seconds.
    pub dt: f32,
}

impl CommandCtx<'_> {
    /// Research modifiers of `player`, or defaults for unknown owners.
    #[must_use]
    pub fn mods_for(&self, player: PlayerId) -> FactionMods {
        self.factions
            .get(&player)
            .map_or_else(FactionMods::default, |f| f.mods)
    }
}

/// Outcome of a command's `update` hook.
#[derive(Debug)]
pub enum CommandStatus {
    /// Keep running.
    Continue,
    /// Completed or aborted; fall through to the next queued command.
    Done,
    /// Replace the active command without touching the queue
    /// (AI-originated orders are never queued).
    Switch(Box<UnitCommand>),
}

/// Idle state: periodic target scanning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdleState {
    /// Next tick at which to scan for targets.
    pub next_scan_tick: u64,
}

/// Plain move order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveState {
    /// Destination point.
    pub destination: Vec2,
    /// Path plan.
    pub path: PathPlan,
}

/// Attack-move order: advance, engaging targets of opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackMoveState {
    /// Final destination.
    pub destination: Vec2,
    /// Path plan.
    pub path: PathPlan,
    /// Currently engaged target of opportunity.
    pub auto_target: Option<TargetId>,
    /// Next tick at which to scan for targets.
    pub next_scan_tick: u64,
}

/// Attack a specific targetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackTargetableState {
    /// The target.
    pub target: TargetId,
    /// Chase path plan.
    pub path: PathPlan,
}

/// Force-fire at a fixed world point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackGroundState {
    /// Aim point.
    pub point: Vec2,
    /// Approach path plan.
    pub path: PathPlan,
}

/// Worker construction loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructState {
    /// Construction site building id.
    pub site: EntityId,
    /// Path plan to the site.
    pub path: PathPlan,
}

/// Phase of the harvest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarvestPhase {
    /// Walking to the deposit.
    ToDeposit,
    /// Filling the carry load.
    Harvesting,
    /// Walking the load to a refinery.
    Returning,
}

/// Worker harvest loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestState {
    /// Harvested obstacle id.
    pub deposit: EntityId,
    /// Current phase.
    pub phase: HarvestPhase,
    /// Delivery building id (refinery or headquarters).
    pub dropoff: Option<EntityId>,
    /// Path plan.
    pub path: PathPlan,
}

/// Phase of the mining loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MinePhase {
    /// Walking to the seam.
    ToSeam,
    /// Swinging the pickaxe.
    Mining,
    /// Returning to the headquarters to deliver and re-forge.
    Returning,
}

/// Miner loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineState {
    /// Mined obstacle id.
    pub seam: EntityId,
    /// Current phase.
    pub phase: MinePhase,
    /// Credits worth of ore carried.
    pub stash: f32,
    /// Path plan.
    pub path: PathPlan,
}

/// Move into a bunker and garrison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarrisonState {
    /// Bunker building id.
    pub bunker: EntityId,
    /// Path plan.
    pub path: PathPlan,
}

/// Polygon patrol around a station point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnStationState {
    /// Patrol center.
    pub station: Vec2,
    /// Index of the polygon corner being flown to.
    pub corner: u32,
    /// Air target engaged while patrolling (gunships).
    pub auto_target: Option<TargetId>,
    /// Next tick at which to scan for targets.
    pub next_scan_tick: u64,
}

/// Phase of a sortie mission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortiePhase {
    /// Flying to the target.
    Outbound,
    /// Attack run over the target.
    Attack,
    /// Flying back to the hangar.
    Inbound,
    /// Decelerating onto the pad.
    Landing,
}

/// Four-phase hangar aircraft mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortieState {
    /// Strike location.
    pub target: Vec2,
    /// Current phase.
    pub phase: SortiePhase,
    /// Seconds spent in the attack run.
    pub run_elapsed: f32,
    /// Whether the payload has been released this run.
    pub payload_dropped: bool,
    /// Heading locked at the start of the attack run.
    pub run_heading: Vec2,
}

/// Fly home and get housed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnToHangarState {}

/// The polymorphic per-unit command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitCommand {
    /// Stand by, scanning for targets.
    Idle(IdleState),
    /// Move to a point.
    Move(MoveState),
    /// Attack-move to a point.
    AttackMove(AttackMoveState),
    /// Attack a specific target.
    AttackTargetable(AttackTargetableState),
    /// Force-fire at the ground.
    AttackGround(AttackGroundState),
    /// Build a construction site.
    Construct(ConstructState),
    /// Harvest a deposit.
    Harvest(HarvestState),
    /// Mine a seam.
    Mine(MineState),
    /// Garrison a bunker.
    GarrisonBunker(GarrisonState),
    /// Patrol on station.
    OnStation(OnStationState),
    /// Fly a sortie.
    Sortie(SortieState),
    /// Return to the hangar.
    ReturnToHangar(ReturnToHangarState),
}

impl Default for UnitCommand {
    fn default() -> Self {
        Self::Idle(IdleState::default())
    }
}

impl UnitCommand {
    /// Convenience constructor for a move order.
    #[must_use]
    pub fn move_to(destination: Vec2) -> Self {
        Self::Move(MoveState {
            destination,
            path: PathPlan::new(),
        })
    }

    /// Convenience constructor for an attack-move order.
    #[must_use]
    pub fn attack_move(destination: Vec2) -> Self {
        Self::AttackMove(AttackMoveState {
            destination,
            path: PathPlan::new(),
            auto_target: None,
            next_scan_tick: 0,
        })
    }

    /// Convenience constructor for a direct attack order.
    #[must_use]
    pub fn attack(target: TargetId) -> Self {
        Self::AttackTargetable(AttackTargetableState {
            target,
            path: PathPlan::new(),
        })
    }

    /// Wire tag of the command, for snapshots.
    #[must_use]
    pub fn wire_type(&self) -> &'static str {
        match self {
            Self::Idle(_) => "IDLE",
            Self::Move(_) => "MOVE",
            Self::AttackMove(_) => "ATTACK_MOVE",
            Self::AttackTargetable(_) => "ATTACK_TARGETABLE",
            Self::AttackGround(_) => "ATTACK_GROUND",
            Self::Construct(_) => "CONSTRUCT",
            Self::Harvest(_) => "HARVEST",
            Self::Mine(_) => "MINE",
            Self::GarrisonBunker(_) => "GARRISON_BUNKER",
            Self::OnStation(_) => "ON_STATION",
            Self::Sortie(_) => "SORTIE",
            Self::ReturnToHangar(_) => "RETURN_TO_HANGAR",
        }
    }

    /// Wire phase of multi-phase commands.
    #[must_use]
    pub fn wire_phase(&self) -> Option<&'static str> {
        match self {
            Self::Harvest(s) => Some(match s.phase {
                HarvestPhase::ToDeposit => "TO_DEPOSIT",
                HarvestPhase::Harvesting => "HARVESTING",
                HarvestPhase::Returning => "RETURNING",
            }),
            Self::Mine(s) => Some(match s.phase {
                MinePhase::ToSeam => "TO_SEAM",
                MinePhase::Mining => "MINING",
                MinePhase::Returning => "RETURNING",
            }),
            Self::Sortie(s) => Some(match s.phase {
                SortiePhase::Outbound => "OUTBOUND",
                SortiePhase::Attack => "ATTACK",
                SortiePhase::Inbound => "INBOUND",
                SortiePhase::Landing => "LANDING",
            }),
            _ => None,
        }
    }

    /// Destination the command is working toward, for snapshots.
    #[must_use]
    pub fn target_location(&self) -> Option<Vec2> {
        match self {
            Self::Move(s) => Some(s.destination),
            Self::AttackMove(s) => Some(s.destination),
            Self::AttackGround(s) => Some(s.point),
            Self::OnStation(s) => Some(s.station),
            Self::Sortie(s) => Some(s.target),
            _ => None,
        }
    }

    /// Per-tick state transition hook.
    pub fn update(&mut self, unit: &mut Unit, ctx: &mut CommandCtx<'_>) -> CommandStatus {
        match self {
            Self::Idle(state) => attack::idle_update(state, unit, ctx),
            Self::Move(state) => {
                // A computed-but-empty path means the start is off-grid;
                // treat it like any other transient failure.
                if state.path.is_computed() && state.path.is_empty() {
                    return CommandStatus::Done;
                }
                if unit.position.distance(state.destination) <= ctx.config.move_arrival_threshold {
                    CommandStatus::Done
                } else {
                    CommandStatus::Continue
                }
            }
            Self::AttackMove(state) => attack::attack_move_update(state, unit, ctx),
            Self::AttackTargetable(state) => attack::attack_update(state, unit, ctx),
            Self::AttackGround(_) => CommandStatus::Continue,
            Self::Construct(state) => worker::construct_update(state, unit, ctx),
            Self::Harvest(state) => worker::harvest_update(state, unit, ctx),
            Self::Mine(state) => worker::mine_update(state, unit, ctx),
            Self::GarrisonBunker(state) => worker::garrison_update(state, unit, ctx),
            Self::OnStation(state) => aircraft::on_station_update(state, unit, ctx),
            Self::Sortie(state) => aircraft::sortie_update(state, unit, ctx),
            Self::ReturnToHangar(state) => aircraft::return_update(state, unit, ctx),
        }
    }

    /// Per-tick movement hook: writes the body's target velocity.
    pub fn update_movement(&mut self, unit: &mut Unit, ctx: &mut CommandCtx<'_>) {
        match self {
            Self::Idle(_) => steering::stop(unit, ctx),
            Self::ReturnToHangar(state) => aircraft::return_movement(state, unit, ctx),
            Self::Move(state) => {
                let repath = ctx.config.repath_displacement;
                let arrival = ctx.config.move_arrival_threshold;
                state.path.ensure(unit, ctx, state.destination, repath);
                state.path.follow(unit, ctx, arrival);
            }
            Self::AttackMove(state) => attack::attack_move_movement(state, unit, ctx),
            Self::AttackTargetable(state) => attack::attack_movement(state, unit, ctx),
            Self::AttackGround(state) => attack::attack_ground_movement(state, unit, ctx),
            Self::Construct(state) => worker::construct_movement(state, unit, ctx),
            Self::Harvest(state) => worker::harvest_movement(state, unit, ctx),
            Self::Mine(state) => worker::mine_movement(state, unit, ctx),
            Self::GarrisonBunker(state) => worker::garrison_movement(state, unit, ctx),
            Self::OnStation(state) => aircraft::on_station_movement(state, unit, ctx),
            Self::Sortie(state) => aircraft::sortie_movement(state, unit, ctx),
        }
    }

    /// Per-tick combat hook: fires weapons, spawning ordinance into the
    /// store.
    pub fn update_combat(&mut self, unit: &mut Unit, ctx: &mut CommandCtx<'_>) {
        match self {
            Self::AttackMove(state) => attack::attack_move_combat(state, unit, ctx),
            Self::AttackTargetable(state) => attack::attack_combat(state, unit, ctx),
            Self::AttackGround(state) => attack::attack_ground_combat(state, unit, ctx),
            Self::OnStation(state) => aircraft::on_station_combat(state, unit, ctx),
            _ => {}
        }
    }

    /// Cancellation hook: zero the body's velocity.
    pub fn on_cancel(&mut self, unit: &Unit, ctx: &mut CommandCtx<'_>) {
        steering::stop(unit, ctx);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::TICK_DT;
    use crate::data::faction_data;
    use crate::factions::FactionKind;
    use crate::targets::Targetable;
    use crate::units::UnitKind;

    /// Shared fixture for command-level tests: a small world with two
    /// factions (players 1 and 2 on teams 1 and 2).
    pub struct CtxHarness {
        pub entities: GameEntities,
        pub physics: PhysicsWorld,
        pub nav: NavGrid,
        pub factions: BTreeMap<PlayerId, Faction>,
        pub config: GameConfig,
        pub tick: u64,
    }

    impl CtxHarness {
        pub fn ctx(&mut self, tick: u64) -> CommandCtx<'_> {
            CommandCtx {
                entities: &mut self.entities,
                physics: &mut self.physics,
                nav: &self.nav,
                factions: &mut self.factions,
                config: &self.config,
                tick,
                dt: TICK_DT,
            }
        }

        pub fn spawn_unit(&mut self, kind: UnitKind, team: u8, position: Vec2) -> EntityId {
            let id = self.entities.allocate_id();
            let mut unit = Unit::from_spec(id, kind, u32::from(team), team, position, 1.0);
            unit.body = Some(self.physics.add_unit_body(
                id,
                position,
                unit.radius,
                unit.elevation,
            ));
            self.entities.add_unit(unit);
            id
        }

        pub fn spawn_building(
            &mut self,
            kind: crate::buildings::BuildingKind,
            team: u8,
            position: Vec2,
        ) -> EntityId {
            let id = self.entities.allocate_id();
            let mut building =
                crate::buildings::Building::from_spec(id, kind, u32::from(team), team, position, true);
            building.body = Some(self.physics.add_fixed_square(
                id,
                position,
                building.half_extent,
            ));
            self.entities.add_building(building);
            id
        }

        /// Step the solver and mirror body transforms back onto units.
        pub fn step_physics_and_sync(&mut self) {
            self.physics.step();
            for unit in self.entities.units.values_mut() {
                if let Some(body) = unit.body {
                    if let Some(pos) = self.physics.position(body) {
                        unit.position = pos;
                    }
                    unit.velocity = self.physics.linear_velocity(body);
                }
            }
        }

        /// Run the full hook cycle for one unit for `ticks` ticks. The
        /// harness tick counter persists across calls.
        pub fn run_unit(&mut self, id: EntityId, ticks: u64) {
            for _ in 0..ticks {
                let tick = self.tick;
                self.tick += 1;
                let Some(mut unit) = self.entities.detach_unit(id) else {
                    return;
                };
                if !Targetable::is_active(&unit) {
                    self.entities.put_back_unit(unit);
                    return;
                }
                unit.tick_weapons(TICK_DT);
                let mut command = std::mem::take(&mut unit.command);
                let mut ctx = self.ctx(tick);
                match command.update(&mut unit, &mut ctx) {
                    CommandStatus::Continue => {}
                    CommandStatus::Done => {
                        command.on_cancel(&unit, &mut ctx);
                        unit.command = UnitCommand::default();
                        unit.next_command();
                        command = std::mem::take(&mut unit.command);
                    }
                    CommandStatus::Switch(next) => command = *next,
                }
                command.update_movement(&mut unit, &mut ctx);
                command.update_combat(&mut unit, &mut ctx);
                unit.command = command;
                self.entities.put_back_unit(unit);
                self.step_physics_and_sync();
            }
        }
    }

    pub fn test_ctx(world_size: f32) -> CtxHarness {
        let entities = GameEntities::new();
        let nav = NavGrid::new(world_size, 25.0);
        let mut factions = BTreeMap::new();
        for (player, team) in [(1u32, 1u8), (2, 2)] {
            let start = faction_data::start(FactionKind::Coalition);
            factions.insert(player, Faction::new(player, FactionKind::Coalition, team, start.credits));
        }
        CtxHarness {
            entities,
            physics: PhysicsWorld::new(),
            nav,
            factions,
            config: GameConfig::default(),
            tick: 0,
        }
    }

    #[test]
    fn test_default_command_is_idle() {
        assert!(matches!(UnitCommand::default(), UnitCommand::Idle(_)));
    }

    #[test]
    fn test_wire_tags() {
        assert_eq!(UnitCommand::move_to(Vec2::ZERO).wire_type(), "MOVE");
        assert_eq!(
            UnitCommand::attack(TargetId::Unit(1)).wire_type(),
            "ATTACK_TARGETABLE"
        );
        let sortie = UnitCommand::Sortie(SortieState {
            target: Vec2::new(10.0, 0.0),
            phase: SortiePhase::Outbound,
            run_elapsed: 0.0,
            payload_dropped: false,
            run_heading: Vec2::new(1.0, 0.0),
        });
        assert_eq!(sortie.wire_phase(), Some("OUTBOUND"));
        assert_eq!(sortie.target_location(), Some(Vec2::new(10.0, 0.0)));
    }

    #[test]
    fn test_move_command_completes_on_arrival() {
        let mut harness = test_ctx(1000.0);
        let id = harness.spawn_unit(UnitKind::Trooper, 1, Vec2::new(100.0, 100.0));
        harness.entities.units.get_mut(&id).unwrap().command =
            UnitCommand::move_to(Vec2::new(250.0, 100.0));

        harness.run_unit(id, 600);
        let unit = harness.entities.units.get(&id).unwrap();
        assert!(
            unit.position.distance(Vec2::new(250.0, 100.0)) <= 15.0,
            "stopped at {:?}",
            unit.position
        );
        assert!(matches!(unit.command, UnitCommand::Idle(_)));
    }
}
