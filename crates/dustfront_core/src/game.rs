//! The per-game simulation driver.
//!
//! A [`Game`] owns everything about one match: physics, entities,
//! factions, the occupancy grid, queued inputs, and the tick counter.
//! All mutation happens inside [`Game::tick`], which runs the fixed
//! step order: inputs, unit commands and movement, physics, combat,
//! projectiles, field effects, economy, culling, and victory.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::buildings::{Building, BuildingKind, WallSegment};
use crate::combat;
use crate::command::{CommandCtx, CommandStatus, GarrisonState, HarvestState, MineState};
use crate::command::{
    ConstructState, HarvestPhase, MinePhase, ReturnToHangarState, SortiePhase, SortieState,
    UnitCommand,
};
use crate::config::{GameConfig, TICK_DT};
use crate::data::building_data;
use crate::economy::{self, EconomyEvent};
use crate::entities::GameEntities;
use crate::events::GameEvent;
use crate::factions::{Faction, FactionKind};
use crate::input::PlayerInput;
use crate::map::{self, Biome, Density};
use crate::math::Vec2;
use crate::pathfinding::NavGrid;
use crate::physics::PhysicsWorld;
use crate::snapshot::{self, GameStateSnapshot, SnapshotInputs};
use crate::targets::{EntityId, TargetId};
use crate::units::{PlayerId, Unit};

/// Cooldown between special-ability uses, in ticks (10 s).
const ABILITY_COOLDOWN_TICKS: u64 = 600;

/// One player slot at game construction.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSlot {
    /// Player id.
    pub player: PlayerId,
    /// Chosen faction.
    pub faction: FactionKind,
    /// Team number.
    pub team: u8,
}

/// Parameters for creating a game.
#[derive(Debug, Clone)]
pub struct GameSetup {
    /// Player slots.
    pub players: Vec<PlayerSlot>,
    /// Map biome.
    pub biome: Biome,
    /// Obstacle density.
    pub density: Density,
    /// Map generation seed.
    pub seed: u64,
    /// Tuning constants.
    pub config: GameConfig,
}

/// Terminal game result. Fired at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOver {
    /// The winning team, or -1 for a simultaneous wipe.
    pub winning_team: i32,
    /// Reason tag (`elimination`, `draw`, `internal_error`).
    pub reason: String,
}

/// Everything a tick produced that the transport layer cares about.
#[derive(Debug, Default)]
pub struct TickOutput {
    /// Player-directed events.
    pub events: Vec<(PlayerId, GameEvent)>,
    /// Set on the tick the game ended.
    pub game_over: Option<GameOver>,
}

/// A single match.
pub struct Game {
    config: GameConfig,
    world_size: f32,
    biome: Biome,
    physics: PhysicsWorld,
    entities: GameEntities,
    factions: BTreeMap<PlayerId, Faction>,
    nav: NavGrid,
    nav_stamp: (usize, usize, usize),
    tick: u64,
    initial_team_count: usize,
    input_queue: VecDeque<(PlayerId, PlayerInput)>,
    selections: BTreeMap<PlayerId, BTreeSet<EntityId>>,
    game_over: Option<GameOver>,
    pending_events: Vec<(PlayerId, GameEvent)>,
}

impl Game {
    /// Create a game: world sizing, map generation, starting bases.
    #[must_use]
    pub fn new(setup: GameSetup) -> Self {
        let world_size = crate::config::world_size_for_players(setup.players.len());
        let mut physics = PhysicsWorld::new();
        let mut entities = GameEntities::new();
        let mut factions = BTreeMap::new();

        let bases = map::spawn_points(world_size, setup.players.len());
        map::generate_obstacles(
            &mut entities,
            &mut physics,
            world_size,
            setup.biome,
            setup.density,
            setup.seed,
            &bases,
        );

        for (slot, base) in setup.players.iter().zip(bases) {
            let mut faction = map::build_faction(slot.player, slot.faction, slot.team);
            map::place_starting_base(&mut entities, &mut physics, &mut faction, base);
            factions.insert(slot.player, faction);
        }
        economy::refresh_faction_tallies(&entities, &mut factions);

        let nav = NavGrid::from_entities(world_size, setup.config.path_cell_size, &entities);
        let nav_stamp = Self::static_stamp(&entities);
        let initial_team_count = factions
            .values()
            .map(|f| f.team)
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            config: setup.config,
            world_size,
            biome: setup.biome,
            physics,
            entities,
            factions,
            nav,
            nav_stamp,
            tick: 0,
            initial_team_count,
            input_queue: VecDeque::new(),
            selections: BTreeMap::new(),
            game_over: None,
            pending_events: Vec::new(),
        }
    }

    /// Current tick.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// World side length.
    #[must_use]
    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    /// The entity store (read access for tests and snapshots).
    #[must_use]
    pub fn entities(&self) -> &GameEntities {
        &self.entities
    }

    /// Mutable entity store access (scenario setup).
    pub fn entities_mut(&mut self) -> &mut GameEntities {
        &mut self.entities
    }

    /// The physics world (scenario setup).
    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    /// All factions.
    #[must_use]
    pub fn factions(&self) -> &BTreeMap<PlayerId, Faction> {
        &self.factions
    }

    /// Mutable faction access (scenario setup).
    pub fn factions_mut(&mut self) -> &mut BTreeMap<PlayerId, Faction> {
        &mut self.factions
    }

    /// True once a game-over was produced.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.game_over.is_some()
    }

    /// Team of a player, if present.
    #[must_use]
    pub fn team_of(&self, player: PlayerId) -> Option<u8> {
        self.factions.get(&player).map(|f| f.team)
    }

    /// Queue an input for application at the start of the next tick.
    pub fn enqueue_input(&mut self, player: PlayerId, input: PlayerInput) {
        self.input_queue.push_back((player, input));
    }

    /// Spawn a unit directly (scenario setup and tests).
    pub fn spawn_unit_at(
        &mut self,
        kind: crate::units::UnitKind,
        player: PlayerId,
        position: Vec2,
    ) -> EntityId {
        let team = self.team_of(player).unwrap_or(u8::try_from(player).unwrap_or(0));
        let health_mult = self
            .factions
            .get(&player)
            .map_or(1.0, |f| f.mods.health_mult);
        let id = self.entities.allocate_id();
        let mut unit = Unit::from_spec(id, kind, player, team, position, health_mult);
        unit.body = Some(
            self.physics
                .add_unit_body(id, position, unit.radius, unit.elevation),
        );
        self.entities.add_unit(unit);
        id
    }

    /// Place a wall segment (scenario setup; the building UI places
    /// walls through its own flow).
    pub fn place_wall(&mut self, player: PlayerId, start: Vec2, end: Vec2) -> EntityId {
        let team = self.team_of(player).unwrap_or(0);
        let id = self.entities.allocate_id();
        let mut wall = WallSegment::new(id, player, team, start, end);
        wall.body = Some(self.physics.add_fixed_segment(id, start, end));
        self.entities.walls.insert(id, wall);
        id
    }

    /// Build the snapshot for one player.
    #[must_use]
    pub fn snapshot_for(&self, player: PlayerId) -> GameStateSnapshot {
        let team = self.team_of(player).unwrap_or(0);
        let empty = BTreeSet::new();
        let selected = self.selections.get(&player).unwrap_or(&empty);
        let inputs = SnapshotInputs {
            entities: &self.entities,
            factions: &self.factions,
            biome: self.biome,
            world_size: self.world_size,
        };
        snapshot::build_game_state(&inputs, player, team, selected)
    }

    /// Advance the simulation by one fixed tick.
    pub fn tick(&mut self) -> TickOutput {
        let mut output = TickOutput::default();
        if self.game_over.is_some() {
            return output;
        }

        // 1. Inputs.
        while let Some((player, input)) = self.input_queue.pop_front() {
            self.apply_input(player, &input);
        }

        // 2. Commands and movement.
        self.run_command_phase();

        // 3. Physics.
        self.physics.step();
        self.sync_transforms();

        // 4. Combat.
        self.run_combat_phase();

        // 5. Projectiles.
        combat::advance_projectiles(&mut self.entities, &self.config, self.tick, TICK_DT);

        // 6. Field effects.
        combat::tick_field_effects(&mut self.entities, &self.config, self.tick);

        // 7. Economy.
        let economy_events = economy::tick_economy(
            &mut self.entities,
            &mut self.physics,
            &mut self.factions,
            &self.config,
            TICK_DT,
        );
        self.surface_economy_events(economy_events);

        // 8. Lifecycle: finished sites get bodies, doomed occupants die,
        // then the store culls.
        self.materialize_completed_buildings();
        self.kill_occupants_of_dead_buildings();
        self.entities.cull(&mut self.physics, self.tick);
        self.prune_selections();
        self.refresh_nav_if_static_changed();

        // 9. Victory.
        if let Some(game_over) = self.check_victory() {
            self.game_over = Some(game_over.clone());
            output.game_over = Some(game_over);
        }

        self.tick += 1;
        output.events = std::mem::take(&mut self.pending_events);
        output
    }

    fn ctx<'a>(
        physics: &'a mut PhysicsWorld,
        entities: &'a mut GameEntities,
        nav: &'a NavGrid,
        factions: &'a mut BTreeMap<PlayerId, Faction>,
        config: &'a GameConfig,
        tick: u64,
    ) -> CommandCtx<'a> {
        CommandCtx {
            entities,
            physics,
            nav,
            factions,
            config,
            tick,
            dt: TICK_DT,
        }
    }

    fn run_command_phase(&mut self) {
        let ids: Vec<EntityId> = self.entities.units.keys().copied().collect();
        for id in ids {
            let Some(mut unit) = self.entities.detach_unit(id) else {
                continue;
            };
            if !unit.active || unit.housed {
                self.entities.put_back_unit(unit);
                continue;
            }

            // Fuel burn and the forced return for hangar craft.
            if let Some(aircraft) = unit.aircraft.as_mut() {
                aircraft.fuel_secs = (aircraft.fuel_secs - TICK_DT).max(0.0);
                let must_return = aircraft.is_depleted()
                    && !matches!(
                        unit.command,
                        UnitCommand::Sortie(_) | UnitCommand::ReturnToHangar(_)
                    );
                if must_return {
                    unit.command = UnitCommand::ReturnToHangar(ReturnToHangarState::default());
                    unit.command_queue.clear();
                }
            }

            unit.tick_weapons(TICK_DT);

            let mut command = std::mem::take(&mut unit.command);
            let mut ctx = Self::ctx(
                &mut self.physics,
                &mut self.entities,
                &self.nav,
                &mut self.factions,
                &self.config,
                self.tick,
            );

            // Completion may chain through a few queued commands, but
            // never unboundedly within one tick.
            for _ in 0..4 {
                match command.update(&mut unit, &mut ctx) {
                    CommandStatus::Continue => break,
                    CommandStatus::Switch(next) => {
                        command = *next;
                        break;
                    }
                    CommandStatus::Done => {
                        command.on_cancel(&unit, &mut ctx);
                        unit.next_command();
                        command = std::mem::replace(&mut unit.command, UnitCommand::default());
                    }
                }
            }
            if unit.active && !unit.housed {
                command.update_movement(&mut unit, &mut ctx);
            }

            unit.command = command;
            self.entities.put_back_unit(unit);
        }
    }

    fn run_combat_phase(&mut self) {
        let ids: Vec<EntityId> = self.entities.units.keys().copied().collect();
        for id in ids {
            let Some(mut unit) = self.entities.detach_unit(id) else {
                continue;
            };
            if !unit.active || unit.housed {
                self.entities.put_back_unit(unit);
                continue;
            }
            let mut command = std::mem::take(&mut unit.command);
            let mut ctx = Self::ctx(
                &mut self.physics,
                &mut self.entities,
                &self.nav,
                &mut self.factions,
                &self.config,
                self.tick,
            );
            command.update_combat(&mut unit, &mut ctx);
            unit.command = command;
            self.entities.put_back_unit(unit);
        }

        self.run_turret_phase();
    }

    /// Defensive turret buildings acquire and fire on their own.
    fn run_turret_phase(&mut self) {
        let ids: Vec<EntityId> = self.entities.buildings.keys().copied().collect();
        for id in ids {
            let (position, team, owner, defensive) = {
                let Some(building) = self.entities.buildings.get(&id) else {
                    continue;
                };
                if !building.active
                    || building.under_construction
                    || building.turret_weapon.is_none()
                {
                    continue;
                }
                (
                    building.position,
                    building.team,
                    building.owner,
                    building.is_defensive(),
                )
            };

            // Power deficit shuts defensive structures down.
            let low_power = self
                .factions
                .get(&owner)
                .is_some_and(Faction::has_low_power);
            if defensive && low_power {
                continue;
            }

            let Some(building) = self.entities.buildings.get_mut(&id) else {
                continue;
            };
            let Some(mut weapon) = building.turret_weapon.take() else {
                continue;
            };
            weapon.tick(TICK_DT);

            let mods = self
                .factions
                .get(&owner)
                .map_or_else(crate::factions::FactionMods::default, |f| f.mods);
            let scan = crate::entities::ScanParams {
                position,
                team,
                hits: weapon.spec.hits,
                cloak_detection_range: 0.0,
                radius: combat::effective_range(&weapon, &mods, 0.0),
            };
            let target = self
                .entities
                .find_nearest_enemy_targetable(&scan)
                .and_then(|t| self.entities.resolve_target(t));

            if let Some(info) = target {
                let mut ctx = Self::ctx(
                    &mut self.physics,
                    &mut self.entities,
                    &self.nav,
                    &mut self.factions,
                    &self.config,
                    self.tick,
                );
                combat::fire_weapon_at_target(&mut ctx, id, position, team, &mut weapon, &mods, &info);
                if let Some(building) = self.entities.buildings.get_mut(&id) {
                    building.turret_rotation = (info.position - position).angle();
                }
            }

            if let Some(building) = self.entities.buildings.get_mut(&id) {
                building.turret_weapon = Some(weapon);
            }
        }
    }

    fn sync_transforms(&mut self) {
        let bound = self.world_size;
        let mut clamps: Vec<(crate::physics::BodyHandle, Vec2)> = Vec::new();
        for unit in self.entities.units.values_mut() {
            let Some(body) = unit.body else { continue };
            if let Some(position) = self.physics.position(body) {
                let clamped = Vec2::new(
                    position.x.clamp(0.0, bound),
                    position.y.clamp(0.0, bound),
                );
                unit.position = clamped;
                if clamped != position {
                    clamps.push((body, clamped));
                }
            }
            unit.velocity = self.physics.linear_velocity(body);
        }
        for (body, position) in clamps {
            self.physics.set_position(body, position);
        }
    }

    fn surface_economy_events(&mut self, events: Vec<EconomyEvent>) {
        for event in events {
            match event {
                EconomyEvent::ProductionComplete { player, kind, .. } => {
                    self.pending_events.push((
                        player,
                        GameEvent::economy(format!("{kind:?} ready")),
                    ));
                }
                EconomyEvent::ResearchComplete { player, research } => {
                    self.pending_events.push((
                        player,
                        GameEvent::info(format!("Research complete: {research:?}")),
                    ));
                }
            }
        }
    }

    /// Construction sites get their physics body the moment they finish.
    fn materialize_completed_buildings(&mut self) {
        let pending: Vec<EntityId> = self
            .entities
            .buildings
            .iter()
            .filter(|(_, b)| b.active && !b.under_construction && b.body.is_none())
            .map(|(&id, _)| id)
            .collect();
        for id in pending {
            let (position, half_extent) = {
                let building = self.entities.buildings.get(&id).unwrap();
                (building.position, building.half_extent)
            };
            let body = self.physics.add_fixed_square(id, position, half_extent);
            if let Some(building) = self.entities.buildings.get_mut(&id) {
                building.body = Some(body);
            }
        }
    }

    /// Units housed in a destroyed bunker or hangar die with it.
    fn kill_occupants_of_dead_buildings(&mut self) {
        let mut doomed: Vec<EntityId> = Vec::new();
        for building in self.entities.buildings.values() {
            if building.active {
                continue;
            }
            doomed.extend(building.garrison.iter().copied());
            doomed.extend(building.hangar_bays.iter().copied());
        }
        for id in doomed {
            if let Some(unit) = self.entities.units.get_mut(&id) {
                unit.active = false;
            }
        }
    }

    fn prune_selections(&mut self) {
        for selection in self.selections.values_mut() {
            selection.retain(|id| self.entities.units.contains_key(id));
        }
    }

    fn static_stamp(entities: &GameEntities) -> (usize, usize, usize) {
        let completed_buildings = entities
            .buildings
            .values()
            .filter(|b| b.active && !b.under_construction)
            .count();
        let walls = entities.walls.values().filter(|w| w.active).count();
        let obstacles = entities.obstacles.values().filter(|o| o.active).count();
        (completed_buildings, walls, obstacles)
    }

    fn refresh_nav_if_static_changed(&mut self) {
        let stamp = Self::static_stamp(&self.entities);
        if stamp != self.nav_stamp {
            self.nav = NavGrid::from_entities(self.world_size, self.config.path_cell_size, &self.entities);
            self.nav_stamp = stamp;
        }
    }

    fn check_victory(&self) -> Option<GameOver> {
        if self.initial_team_count < 2 {
            return None;
        }
        let alive = self.entities.teams_with_headquarters();
        match alive.len() {
            0 => Some(GameOver {
                winning_team: -1,
                reason: "draw".to_string(),
            }),
            1 => Some(GameOver {
                winning_team: i32::from(*alive.iter().next().unwrap()),
                reason: "elimination".to_string(),
            }),
            _ => None,
        }
    }

    // -----------------------------------------------------------------
    // Input application
    // -----------------------------------------------------------------

    fn apply_input(&mut self, player: PlayerId, input: &PlayerInput) {
        if !self.factions.contains_key(&player) {
            tracing::warn!(player, "input from unknown player dropped");
            return;
        }
        let queued = input.is_queued();

        if let Some(ids) = &input.select_units {
            self.apply_selection(player, ids);
        }
        if let Some(stance) = input.set_stance {
            for id in self.selected_units(player) {
                if let Some(unit) = self.entities.units.get_mut(&id) {
                    unit.stance = stance;
                    unit.home_position = unit.position;
                }
            }
        }

        if let Some(point) = input.move_order {
            self.order_selected(player, queued, |_| Some(UnitCommand::move_to(point.into())));
        }
        if let Some(point) = input.attack_move_order {
            self.order_selected(player, queued, |unit| {
                unit.is_armed().then(|| UnitCommand::attack_move(point.into()))
            });
        }
        if let Some(point) = input.force_attack_order {
            self.order_selected(player, queued, |unit| {
                unit.is_armed().then(|| {
                    UnitCommand::AttackGround(crate::command::AttackGroundState {
                        point: point.into(),
                        path: crate::command::steering::PathPlan::new(),
                    })
                })
            });
        }
        if let Some(target) = input.attack_unit_order {
            self.apply_attack_order(player, queued, TargetId::Unit(target));
        }
        if let Some(target) = input.attack_building_order {
            self.apply_attack_order(player, queued, TargetId::Building(target));
        }
        if let Some(target) = input.attack_wall_segment_order {
            self.apply_attack_order(player, queued, TargetId::Wall(target));
        }

        if let Some(deposit) = input.harvest_order {
            if self.obstacle_harvestable(deposit) {
                self.order_selected(player, queued, |unit| {
                    unit.carry.is_some().then(|| {
                        UnitCommand::Harvest(HarvestState {
                            deposit,
                            phase: HarvestPhase::ToDeposit,
                            dropoff: None,
                            path: crate::command::steering::PathPlan::new(),
                        })
                    })
                });
            } else {
                tracing::warn!(player, deposit, "harvest order on invalid obstacle");
            }
        }
        if let Some(seam) = input.mine_order {
            if self.obstacle_harvestable(seam) {
                self.order_selected(player, queued, |unit| {
                    unit.pickaxe.is_some().then(|| {
                        UnitCommand::Mine(MineState {
                            seam,
                            phase: MinePhase::ToSeam,
                            stash: 0.0,
                            path: crate::command::steering::PathPlan::new(),
                        })
                    })
                });
            } else {
                tracing::warn!(player, seam, "mine order on invalid obstacle");
            }
        }
        if let Some(site) = input.construct_order {
            let valid = self
                .entities
                .buildings
                .get(&site)
                .is_some_and(|b| b.active && b.under_construction && b.owner == player);
            if valid {
                self.order_selected(player, queued, |unit| {
                    unit.carry.is_some().then(|| {
                        UnitCommand::Construct(ConstructState {
                            site,
                            path: crate::command::steering::PathPlan::new(),
                        })
                    })
                });
            } else {
                tracing::warn!(player, site, "construct order on invalid site");
            }
        }
        if let Some(bunker) = input.garrison_order {
            let valid = self
                .entities
                .buildings
                .get(&bunker)
                .is_some_and(|b| b.active && b.kind == BuildingKind::Bunker && b.team == self.team_of(player).unwrap_or(0));
            if valid {
                self.order_selected(player, queued, |unit| {
                    (unit.elevation == crate::targets::Elevation::Ground && unit.radius < 12.0)
                        .then(|| {
                            UnitCommand::GarrisonBunker(GarrisonState {
                                bunker,
                                path: crate::command::steering::PathPlan::new(),
                            })
                        })
                });
            } else {
                tracing::warn!(player, bunker, "garrison order on invalid bunker");
            }
        }
        if let Some(bunker) = input.ungarrison_building_id {
            self.apply_ungarrison(player, bunker, input.ungarrison_all.unwrap_or(false));
        }

        if let (Some(kind), Some(location)) = (input.build_order, input.build_location) {
            self.apply_build_order(player, kind, location.into());
        }
        if let (Some(kind), Some(building)) = (input.produce_unit_order, input.produce_building_id)
        {
            if let Err(error) =
                economy::try_enqueue_unit(&mut self.entities, &mut self.factions, player, building, kind)
            {
                tracing::warn!(player, %error, "production rejected");
                self.pending_events
                    .push((player, GameEvent::warning(error.to_string())));
            }
        }
        if let (Some(building), Some(point)) = (input.set_rally_building_id, input.rally_point) {
            let owned = self
                .entities
                .buildings
                .get_mut(&building)
                .filter(|b| b.owner == player);
            if let Some(b) = owned {
                b.rally_point = Some(point.into());
            }
        }
        if let (Some(research), Some(lab)) =
            (input.start_research_order, input.research_building_id)
        {
            if let Err(error) =
                economy::try_start_research(&self.entities, &mut self.factions, player, lab, research)
            {
                tracing::warn!(player, %error, "research rejected");
                self.pending_events
                    .push((player, GameEvent::warning(error.to_string())));
            }
        }
        if let Some(lab) = input.cancel_research_building_id {
            economy::cancel_research(&mut self.factions, player, lab);
        }
        if let (Some(hangar), Some(target)) =
            (input.sortie_hangar_id, input.sortie_target_location)
        {
            self.apply_sortie_order(player, hangar, target.into());
        }
        if input.activate_special_ability == Some(true) {
            self.apply_special_ability(player, input.special_ability_target.map(Into::into));
        }
    }

    fn selected_units(&self, player: PlayerId) -> Vec<EntityId> {
        self.selections
            .get(&player)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn apply_selection(&mut self, player: PlayerId, ids: &[EntityId]) {
        let owned: BTreeSet<EntityId> = ids
            .iter()
            .copied()
            .filter(|id| {
                self.entities
                    .units
                    .get(id)
                    .is_some_and(|u| u.owner == player && u.active)
            })
            .collect();
        self.selections.insert(player, owned);
    }

    /// Issue `make` to every selected unit it applies to, replacing or
    /// queueing per the shift flag.
    fn order_selected<F>(&mut self, player: PlayerId, queued: bool, make: F)
    where
        F: Fn(&Unit) -> Option<UnitCommand>,
    {
        for id in self.selected_units(player) {
            let Some(unit) = self.entities.units.get(&id) else {
                continue;
            };
            if unit.housed {
                continue;
            }
            let Some(command) = make(unit) else {
                continue;
            };
            self.issue_command(id, command, queued);
        }
    }

    fn issue_command(&mut self, unit_id: EntityId, command: UnitCommand, queued: bool) {
        let Some(unit) = self.entities.units.get_mut(&unit_id) else {
            return;
        };
        if queued {
            unit.queue_command(command);
        } else {
            if let Some(body) = unit.body {
                self.physics.set_linear_velocity(body, Vec2::ZERO);
            }
            unit.set_command(command);
        }
    }

    fn apply_attack_order(&mut self, player: PlayerId, queued: bool, target: TargetId) {
        let team = self.team_of(player).unwrap_or(0);
        let Some(info) = self.entities.resolve_target(target) else {
            tracing::warn!(player, ?target, "attack order on missing target");
            return;
        };
        if info.team == team {
            tracing::warn!(player, ?target, "attack order on own team dropped");
            return;
        }
        self.order_selected(player, queued, |unit| {
            unit.is_armed().then(|| UnitCommand::attack(target))
        });
    }

    fn obstacle_harvestable(&self, id: EntityId) -> bool {
        self.entities
            .obstacles
            .get(&id)
            .is_some_and(|o| o.active && o.is_harvestable())
    }

    fn apply_ungarrison(&mut self, player: PlayerId, bunker_id: EntityId, all: bool) {
        let Some(bunker) = self.entities.buildings.get_mut(&bunker_id) else {
            return;
        };
        if bunker.owner != player || !bunker.active {
            return;
        }
        let mut released = Vec::new();
        if all {
            released.append(&mut bunker.garrison);
        } else if let Some(id) = bunker.garrison.pop() {
            released.push(id);
        }
        let exit_base = bunker.position;
        let half_extent = bunker.half_extent;

        for (index, id) in released.into_iter().enumerate() {
            let Some(unit) = self.entities.units.get_mut(&id) else {
                continue;
            };
            let angle = index as f32 / 4.0 * std::f32::consts::TAU;
            let position =
                exit_base + Vec2::from_angle(angle) * (half_extent + unit.radius + 8.0);
            unit.housed = false;
            unit.position = position;
            unit.command = UnitCommand::default();
            unit.command_queue.clear();
            unit.body = Some(self.physics.add_unit_body(
                id,
                position,
                unit.radius,
                unit.elevation,
            ));
        }
    }

    fn apply_build_order(&mut self, player: PlayerId, kind: BuildingKind, location: Vec2) {
        let spec = building_data::spec(kind);
        let margin = spec.half_extent;
        if location.x < margin
            || location.y < margin
            || location.x > self.world_size - margin
            || location.y > self.world_size - margin
        {
            tracing::warn!(player, ?kind, "build order out of bounds");
            return;
        }
        // The footprint must be clear of bodies.
        if !self.physics.query_circle(location, spec.half_extent * 1.2).is_empty() {
            self.pending_events.push((
                player,
                GameEvent::warning("Build site is obstructed".to_string()),
            ));
            return;
        }
        let Some(faction) = self.factions.get_mut(&player) else {
            return;
        };
        if !faction.debit(spec.cost) {
            self.pending_events.push((
                player,
                GameEvent::warning(format!("Not enough credits for {kind:?}")),
            ));
            return;
        }
        let team = faction.team;
        let building_health_mult = faction.mods.building_health_mult;

        let id = self.entities.allocate_id();
        let mut building = Building::from_spec(id, kind, player, team, location, false);
        building.max_health *= building_health_mult;
        building.health = building.max_health * 0.1;
        self.entities.add_building(building);
    }

    fn apply_sortie_order(&mut self, player: PlayerId, hangar_id: EntityId, target: Vec2) {
        let craft = {
            let Some(hangar) = self.entities.buildings.get(&hangar_id) else {
                tracing::warn!(player, hangar_id, "sortie order on missing hangar");
                return;
            };
            if hangar.owner != player || !hangar.active || hangar.kind != BuildingKind::Airfield {
                tracing::warn!(player, hangar_id, "sortie order on invalid hangar");
                return;
            }
            hangar.hangar_bays.first().copied()
        };
        let Some(craft_id) = craft else {
            self.pending_events.push((
                player,
                GameEvent::warning("No aircraft available for sortie".to_string()),
            ));
            return;
        };

        let launch_position = {
            let hangar = self.entities.buildings.get_mut(&hangar_id).unwrap();
            hangar.hangar_bays.retain(|&id| id != craft_id);
            hangar.hangar_on_sortie.push(craft_id);
            hangar.position
        };

        if let Some(unit) = self.entities.units.get_mut(&craft_id) {
            unit.housed = false;
            unit.position = launch_position;
            unit.body = Some(self.physics.add_unit_body(
                craft_id,
                launch_position,
                unit.radius,
                unit.elevation,
            ));
            // Armed craft (interceptors) scramble to a patrol station;
            // bombers fly the four-phase strike mission.
            unit.command = if unit.is_armed() {
                UnitCommand::OnStation(crate::command::OnStationState {
                    station: target,
                    corner: 0,
                    auto_target: None,
                    next_scan_tick: 0,
                })
            } else {
                UnitCommand::Sortie(SortieState {
                    target,
                    phase: SortiePhase::Outbound,
                    run_elapsed: 0.0,
                    payload_dropped: false,
                    run_heading: (target - launch_position).normalize_or_zero(),
                })
            };
            unit.command_queue.clear();
        }
    }

    fn apply_special_ability(&mut self, player: PlayerId, target: Option<Vec2>) {
        let mods = self
            .factions
            .get(&player)
            .map_or_else(crate::factions::FactionMods::default, |f| f.mods);
        let team = self.team_of(player).unwrap_or(0);

        for id in self.selected_units(player) {
            let Some(unit) = self.entities.units.get_mut(&id) else {
                continue;
            };
            if ability_on_cooldown(unit, self.tick) {
                continue;
            }
            // Cloak toggle.
            if let Some(cloak) = unit.cloak.as_mut() {
                if mods.cloak_unlocked {
                    cloak.active = !cloak.active;
                    unit.ability_ready_tick = self.tick + ABILITY_COOLDOWN_TICKS;
                }
                continue;
            }
            // Sandstorm projection.
            if unit.kind == crate::units::UnitKind::StormCaller {
                if let (true, Some(point)) = (mods.sandstorm_unlocked, target) {
                    unit.ability_ready_tick = self.tick + ABILITY_COOLDOWN_TICKS;
                    combat::spawn_sandstorm(&mut self.entities, &self.config, self.tick, team, point);
                    break;
                }
            }
        }
    }
}

fn ability_on_cooldown(unit: &Unit, tick: u64) -> bool {
    tick < unit.ability_ready_tick
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitKind;

    fn two_player_setup() -> GameSetup {
        GameSetup {
            players: vec![
                PlayerSlot {
                    player: 1,
                    faction: FactionKind::Coalition,
                    team: 1,
                },
                PlayerSlot {
                    player: 2,
                    faction: FactionKind::Nomads,
                    team: 2,
                },
            ],
            biome: Biome::Dunes,
            density: Density::Low,
            seed: 11,
            config: GameConfig::default(),
        }
    }

    #[test]
    fn test_new_game_has_bases_and_workers() {
        let game = Game::new(two_player_setup());
        assert_eq!(game.world_size(), 3000.0);
        assert_eq!(game.entities().teams_with_headquarters().len(), 2);
        assert!(!game.entities().units.is_empty());
    }

    #[test]
    fn test_tick_advances_and_produces_no_events_when_idle() {
        let mut game = Game::new(two_player_setup());
        let output = game.tick();
        assert_eq!(game.tick_count(), 1);
        assert!(output.game_over.is_none());
    }

    #[test]
    fn test_inputs_apply_before_tick() {
        let mut game = Game::new(two_player_setup());
        let worker = *game
            .entities()
            .units
            .iter()
            .find(|(_, u)| u.owner == 1)
            .map(|(id, _)| id)
            .unwrap();

        game.enqueue_input(
            1,
            PlayerInput {
                select_units: Some(vec![worker]),
                ..Default::default()
            },
        );
        game.enqueue_input(
            1,
            PlayerInput {
                move_order: Some(crate::input::WirePoint { x: 900.0, y: 900.0 }),
                ..Default::default()
            },
        );
        game.tick();

        let unit = game.entities().units.get(&worker).unwrap();
        assert!(matches!(unit.command, UnitCommand::Move(_)));
    }

    #[test]
    fn test_selection_rejects_enemy_units() {
        let mut game = Game::new(two_player_setup());
        let enemy_unit = *game
            .entities()
            .units
            .iter()
            .find(|(_, u)| u.owner == 2)
            .map(|(id, _)| id)
            .unwrap();

        game.enqueue_input(
            1,
            PlayerInput {
                select_units: Some(vec![enemy_unit]),
                ..Default::default()
            },
        );
        game.tick();
        assert!(game.selections.get(&1).unwrap().is_empty());
    }

    #[test]
    fn test_victory_on_hq_destruction() {
        let mut game = Game::new(two_player_setup());
        let enemy_hq = *game
            .entities()
            .buildings
            .iter()
            .find(|(_, b)| b.team == 2 && b.kind == BuildingKind::Headquarters)
            .map(|(id, _)| id)
            .unwrap();
        game.entities_mut()
            .buildings
            .get_mut(&enemy_hq)
            .unwrap()
            .active = false;

        let output = game.tick();
        let game_over = output.game_over.expect("no game over");
        assert_eq!(game_over.winning_team, 1);
        assert_eq!(game_over.reason, "elimination");
        assert!(game.is_over());

        // Fires at most once.
        let next = game.tick();
        assert!(next.game_over.is_none());
    }

    #[test]
    fn test_draw_when_all_hqs_die() {
        let mut game = Game::new(two_player_setup());
        let hqs: Vec<EntityId> = game
            .entities()
            .buildings
            .iter()
            .filter(|(_, b)| b.kind == BuildingKind::Headquarters)
            .map(|(&id, _)| id)
            .collect();
        for id in hqs {
            game.entities_mut().buildings.get_mut(&id).unwrap().active = false;
        }
        let output = game.tick();
        assert_eq!(output.game_over.unwrap().winning_team, -1);
    }

    #[test]
    fn test_production_rejection_surfaces_warning_event() {
        let mut game = Game::new(two_player_setup());
        let barracks_location = Vec2::new(700.0, 700.0);
        // Give player 1 a barracks directly.
        let id = game.entities_mut().allocate_id();
        let building = Building::from_spec(
            id,
            BuildingKind::Barracks,
            1,
            1,
            barracks_location,
            true,
        );
        game.entities_mut().add_building(building);
        game.factions_mut().get_mut(&1).unwrap().credits = 0;

        game.enqueue_input(
            1,
            PlayerInput {
                produce_unit_order: Some(UnitKind::Trooper),
                produce_building_id: Some(id),
                ..Default::default()
            },
        );
        let output = game.tick();
        let warning = output
            .events
            .iter()
            .find(|(player, event)| *player == 1 && event.category == crate::events::EventCategory::Warning);
        assert!(warning.is_some(), "no warning event: {:?}", output.events);
    }

    #[test]
    fn test_command_single_ownership_after_input_batch() {
        let mut game = Game::new(two_player_setup());
        let workers: Vec<EntityId> = game
            .entities()
            .units
            .iter()
            .filter(|(_, u)| u.owner == 1)
            .map(|(&id, _)| id)
            .collect();

        game.enqueue_input(
            1,
            PlayerInput {
                select_units: Some(workers.clone()),
                move_order: Some(crate::input::WirePoint { x: 800.0, y: 800.0 }),
                ..Default::default()
            },
        );
        game.enqueue_input(
            1,
            PlayerInput {
                move_order: Some(crate::input::WirePoint { x: 900.0, y: 600.0 }),
                ..Default::default()
            },
        );
        game.tick();

        // Each unit holds exactly one active command; the second order
        // replaced the first.
        for id in workers {
            let unit = game.entities().units.get(&id).unwrap();
            match &unit.command {
                UnitCommand::Move(state) => {
                    assert_eq!(state.destination, Vec2::new(900.0, 600.0));
                }
                other => panic!("unexpected command {}", other.wire_type()),
            }
            assert!(unit.command_queue.is_empty());
        }
    }

    #[test]
    fn test_sortie_order_scrambles_interceptor_to_station() {
        let mut game = Game::new(two_player_setup());
        let airfield = game.entities.allocate_id();
        game.entities.add_building(Building::from_spec(
            airfield,
            BuildingKind::Airfield,
            1,
            1,
            Vec2::new(800.0, 500.0),
            true,
        ));

        let falcon = game.entities.allocate_id();
        let mut unit = Unit::from_spec(
            falcon,
            crate::units::UnitKind::Falcon,
            1,
            1,
            Vec2::new(800.0, 500.0),
            1.0,
        );
        unit.aircraft = Some(crate::units::AircraftState {
            fuel_secs: 45.0,
            max_fuel_secs: 45.0,
            ammo: 6,
            max_ammo: 6,
            home_hangar: airfield,
        });
        unit.housed = true;
        game.entities.add_unit(unit);
        game.entities
            .buildings
            .get_mut(&airfield)
            .unwrap()
            .hangar_bays
            .push(falcon);

        game.enqueue_input(
            1,
            PlayerInput {
                sortie_hangar_id: Some(airfield),
                sortie_target_location: Some(crate::input::WirePoint { x: 1500.0, y: 900.0 }),
                ..Default::default()
            },
        );
        game.tick();

        let unit = game.entities().units.get(&falcon).unwrap();
        assert!(!unit.housed);
        match &unit.command {
            UnitCommand::OnStation(state) => {
                assert_eq!(state.station, Vec2::new(1500.0, 900.0));
            }
            other => panic!("expected on-station, got {}", other.wire_type()),
        }
        let hangar = game.entities().buildings.get(&airfield).unwrap();
        assert_eq!(hangar.hangar_on_sortie, vec![falcon]);
    }

    #[test]
    fn test_shift_queue_appends() {
        let mut game = Game::new(two_player_setup());
        let worker = *game
            .entities()
            .units
            .iter()
            .find(|(_, u)| u.owner == 1)
            .map(|(id, _)| id)
            .unwrap();

        game.enqueue_input(
            1,
            PlayerInput {
                select_units: Some(vec![worker]),
                move_order: Some(crate::input::WirePoint { x: 800.0, y: 800.0 }),
                ..Default::default()
            },
        );
        game.enqueue_input(
            1,
            PlayerInput {
                move_order: Some(crate::input::WirePoint { x: 900.0, y: 600.0 }),
                queue_order: Some(true),
                ..Default::default()
            },
        );
        game.tick();

        let unit = game.entities().units.get(&worker).unwrap();
        assert!(matches!(unit.command, UnitCommand::Move(_)));
        assert_eq!(unit.command_queue.len(), 1);
    }
}
