//! Faction economy: income, upkeep and power bookkeeping, unit
//! production, and research progression.

use std::collections::BTreeMap;

use crate::buildings::{BuildingKind, ProductionOrder};
use crate::config::GameConfig;
use crate::data::research_data::{self, ResearchId};
use crate::data::{building_data, faction_data, unit_data};
use crate::entities::GameEntities;
use crate::error::{GameError, Result};
use crate::factions::{ActiveResearch, Faction};
use crate::math::Vec2;
use crate::physics::PhysicsWorld;
use crate::targets::EntityId;
use crate::units::{AircraftState, PlayerId, Unit, UnitKind};

/// Events generated by the economy tick, surfaced as game events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EconomyEvent {
    /// A unit finished production.
    ProductionComplete {
        /// Producing player.
        player: PlayerId,
        /// Producing building.
        building: EntityId,
        /// The new unit.
        unit: EntityId,
        /// Unit kind.
        kind: UnitKind,
    },
    /// A research project completed.
    ResearchComplete {
        /// Researching player.
        player: PlayerId,
        /// The finished project.
        research: ResearchId,
    },
}

/// Recompute upkeep and power tallies from the entity store.
///
/// The store is the source of truth; factions only cache the totals.
pub fn refresh_faction_tallies(
    entities: &GameEntities,
    factions: &mut BTreeMap<PlayerId, Faction>,
) {
    for faction in factions.values_mut() {
        let mut max_upkeep = 0;
        let mut power_generated = 0;
        let mut power_consumed = 0;
        for id in entities.building_ids_of(faction.player) {
            let Some(building) = entities.buildings.get(&id) else {
                continue;
            };
            if !building.active || building.under_construction {
                continue;
            }
            let spec = building_data::spec(building.kind);
            max_upkeep += spec.upkeep_provided;
            power_generated += spec.power_generated;
            power_consumed += spec.power_consumed;
        }

        let mut current_upkeep = 0;
        for unit in entities.units.values() {
            if unit.owner == faction.player && unit.active {
                current_upkeep += unit_data::spec(unit.kind).upkeep;
            }
        }

        faction.max_upkeep = max_upkeep;
        faction.power_generated = power_generated;
        faction.power_consumed = power_consumed;
        faction.current_upkeep = current_upkeep;
    }
}

/// Advance income, production, and research by one tick.
pub fn tick_economy(
    entities: &mut GameEntities,
    physics: &mut PhysicsWorld,
    factions: &mut BTreeMap<PlayerId, Faction>,
    config: &GameConfig,
    dt: f32,
) -> Vec<EconomyEvent> {
    let mut events = Vec::new();

    refresh_faction_tallies(entities, factions);

    let players: Vec<PlayerId> = factions.keys().copied().collect();
    for player in players {
        tick_income(entities, factions, config, dt, player);
        tick_production(entities, physics, factions, config, dt, player, &mut events);
        tick_research(factions, dt, player, &mut events);
    }

    events
}

fn tick_income(
    entities: &GameEntities,
    factions: &mut BTreeMap<PlayerId, Faction>,
    config: &GameConfig,
    dt: f32,
    player: PlayerId,
) {
    let refineries = entities.operating_building_count(player, BuildingKind::Refinery);
    let Some(faction) = factions.get_mut(&player) else {
        return;
    };
    let power_mod = if faction.has_low_power() {
        config.low_power_modifier
    } else {
        1.0
    };
    let rate = (config.base_income_per_sec
        + refineries as f32 * config.refinery_income_per_sec * faction.mods.income_mult)
        * power_mod;

    faction.income_accumulator += rate * dt;
    let whole = faction.income_accumulator.floor();
    if whole >= 1.0 {
        faction.deposit(whole as i64);
        faction.income_accumulator -= whole;
    }
}

fn tick_production(
    entities: &mut GameEntities,
    physics: &mut PhysicsWorld,
    factions: &mut BTreeMap<PlayerId, Faction>,
    config: &GameConfig,
    dt: f32,
    player: PlayerId,
    events: &mut Vec<EconomyEvent>,
) {
    let (power_mod, production_mult) = match factions.get(&player) {
        Some(f) => (
            if f.has_low_power() {
                config.low_power_modifier
            } else {
                1.0
            },
            f.mods.production_mult,
        ),
        None => return,
    };

    let building_ids = entities.building_ids_of(player);
    for building_id in building_ids {
        let finished_kind = {
            let Some(building) = entities.buildings.get_mut(&building_id) else {
                continue;
            };
            if !building.active || building.under_construction {
                continue;
            }
            let Some(order) = building.production_queue.front_mut() else {
                continue;
            };
            order.progress_secs += dt * power_mod * production_mult;
            let total = unit_data::spec(order.kind).build_secs;
            if order.progress_secs >= total {
                let kind = order.kind;
                building.production_queue.pop_front();
                Some(kind)
            } else {
                None
            }
        };

        if let Some(kind) = finished_kind {
            if let Some(faction) = factions.get(&player) {
                if let Some(unit) =
                    spawn_produced_unit(entities, physics, faction, building_id, kind)
                {
                    events.push(EconomyEvent::ProductionComplete {
                        player,
                        building: building_id,
                        unit,
                        kind,
                    });
                }
            }
        }
    }
}

fn tick_research(
    factions: &mut BTreeMap<PlayerId, Faction>,
    dt: f32,
    player: PlayerId,
    events: &mut Vec<EconomyEvent>,
) {
    let Some(faction) = factions.get_mut(&player) else {
        return;
    };

    let mut finished: Vec<(EntityId, ResearchId)> = Vec::new();
    for (&lab, research) in &mut faction.active_research {
        research.progress_secs += dt;
        if research.progress_secs >= research_data::spec(research.id).duration_secs {
            finished.push((lab, research.id));
        }
    }
    for (lab, id) in finished {
        faction.active_research.remove(&lab);
        faction.complete_research(id);
        events.push(EconomyEvent::ResearchComplete {
            player,
            research: id,
        });
    }
}

/// Spawn a just-produced unit.
///
/// Hangar craft go straight into a bay of the producing airfield.
/// Everything else appears at the building's rally point (or the
/// nearest free spot), falling back to a ring around the building.
pub fn spawn_produced_unit(
    entities: &mut GameEntities,
    physics: &mut PhysicsWorld,
    faction: &Faction,
    building_id: EntityId,
    kind: UnitKind,
) -> Option<EntityId> {
    let (building_pos, half_extent, rally) = {
        let building = entities.buildings.get(&building_id)?;
        (building.position, building.half_extent, building.rally_point)
    };

    let spec = unit_data::spec(kind);
    let id = entities.allocate_id();

    if spec.hangar_craft.is_some() {
        // Born housed.
        let mut unit = Unit::from_spec(
            id,
            kind,
            faction.player,
            faction.team,
            building_pos,
            faction.mods.health_mult,
        );
        let loadout = spec.hangar_craft.unwrap();
        unit.aircraft = Some(AircraftState {
            fuel_secs: loadout.fuel_secs,
            max_fuel_secs: loadout.fuel_secs,
            ammo: loadout.ammo,
            max_ammo: loadout.ammo,
            home_hangar: building_id,
        });
        unit.speed *= faction.mods.aircraft_speed_mult;
        unit.housed = true;
        entities.add_unit(unit);
        if let Some(building) = entities.buildings.get_mut(&building_id) {
            building.hangar_bays.push(id);
        }
        return Some(id);
    }

    // Units appear at the rally point (or the nearest free spot around
    // it); without a rally they ring the producing building.
    let spawn_pos = match rally {
        Some(rally) => free_point_near(physics, rally, spec.radius),
        None => free_spawn_point(physics, building_pos, half_extent, spec.radius),
    };
    let mut unit = Unit::from_spec(
        id,
        kind,
        faction.player,
        faction.team,
        spawn_pos,
        faction.mods.health_mult,
    );
    if unit.is_airborne() {
        unit.speed *= faction.mods.aircraft_speed_mult;
    }
    unit.body = Some(physics.add_unit_body(id, spawn_pos, unit.radius, unit.elevation));
    entities.add_unit(unit);
    Some(id)
}

/// The point itself when free, else the first free spot ringed around
/// it.
fn free_point_near(physics: &PhysicsWorld, point: Vec2, unit_radius: f32) -> Vec2 {
    if physics.query_circle(point, unit_radius).is_empty() {
        return point;
    }
    for step in 0..8 {
        let angle = step as f32 / 8.0 * std::f32::consts::TAU;
        let candidate = point + Vec2::from_angle(angle) * (unit_radius * 3.0);
        if physics.query_circle(candidate, unit_radius).is_empty() {
            return candidate;
        }
    }
    point
}

/// First free point ringed around a building footprint.
fn free_spawn_point(
    physics: &PhysicsWorld,
    center: Vec2,
    half_extent: f32,
    unit_radius: f32,
) -> Vec2 {
    let ring = half_extent + unit_radius + 6.0;
    for step in 0..8 {
        let angle = step as f32 / 8.0 * std::f32::consts::TAU;
        let candidate = center + Vec2::from_angle(angle) * ring;
        if physics
            .query_circle(candidate, unit_radius)
            .is_empty()
        {
            return candidate;
        }
    }
    // Fully ringed: overlap on the first point and let separation sort
    // the pile out.
    center + Vec2::new(ring, 0.0)
}

/// Validate and enqueue a unit production order, debiting its cost.
pub fn try_enqueue_unit(
    entities: &mut GameEntities,
    factions: &mut BTreeMap<PlayerId, Faction>,
    player: PlayerId,
    building_id: EntityId,
    kind: UnitKind,
) -> Result<()> {
    let faction = factions
        .get_mut(&player)
        .ok_or(GameError::UnknownFaction(player))?;

    if !faction_data::roster(faction.kind).contains(&kind) {
        return Err(GameError::InvalidState(format!(
            "faction cannot produce {kind:?}"
        )));
    }

    let spec = unit_data::spec(kind);
    {
        let building = entities
            .buildings
            .get(&building_id)
            .ok_or(GameError::EntityNotFound(building_id))?;
        if building.owner != player || !building.active || building.under_construction {
            return Err(GameError::InvalidState("building unavailable".into()));
        }
        if spec.produced_at != building.kind {
            return Err(GameError::InvalidState(format!(
                "{kind:?} is not produced at a {:?}",
                building.kind
            )));
        }
        if spec.hangar_craft.is_some() && building.hangar_space() == 0 {
            return Err(GameError::InvalidState("hangar is full".into()));
        }
    }

    if faction.current_upkeep + spec.upkeep > faction.max_upkeep {
        return Err(GameError::UpkeepExceeded {
            current: faction.current_upkeep,
            additional: spec.upkeep,
            cap: faction.max_upkeep,
        });
    }
    if !faction.debit(spec.cost) {
        return Err(GameError::InsufficientCredits {
            required: spec.cost,
            available: faction.credits,
        });
    }

    if let Some(building) = entities.buildings.get_mut(&building_id) {
        building.production_queue.push_back(ProductionOrder {
            kind,
            progress_secs: 0.0,
        });
    }
    Ok(())
}

/// Validate and start a research project at a lab, debiting its cost.
pub fn try_start_research(
    entities: &GameEntities,
    factions: &mut BTreeMap<PlayerId, Faction>,
    player: PlayerId,
    lab_id: EntityId,
    research: ResearchId,
) -> Result<()> {
    let faction = factions
        .get_mut(&player)
        .ok_or(GameError::UnknownFaction(player))?;

    let lab = entities
        .buildings
        .get(&lab_id)
        .ok_or(GameError::EntityNotFound(lab_id))?;
    if lab.owner != player
        || !lab.active
        || lab.under_construction
        || lab.kind != BuildingKind::ResearchLab
    {
        return Err(GameError::InvalidState("lab unavailable".into()));
    }

    if faction.active_research.contains_key(&lab_id) {
        return Err(GameError::ResearchUnavailable("lab is busy".into()));
    }
    if faction.active_research.len() >= faction.research_slots() {
        return Err(GameError::ResearchUnavailable(
            "all research slots in use".into(),
        ));
    }
    if !faction.can_start_research(research) {
        return Err(GameError::ResearchUnavailable(format!(
            "{research:?} prerequisites not met"
        )));
    }

    let cost = research_data::spec(research).cost;
    if !faction.debit(cost) {
        return Err(GameError::InsufficientCredits {
            required: cost,
            available: faction.credits,
        });
    }

    faction.active_research.insert(
        lab_id,
        ActiveResearch {
            id: research,
            progress_secs: 0.0,
        },
    );
    Ok(())
}

/// Cancel the research running at a lab. No refund.
pub fn cancel_research(
    factions: &mut BTreeMap<PlayerId, Faction>,
    player: PlayerId,
    lab_id: EntityId,
) -> bool {
    factions
        .get_mut(&player)
        .and_then(|f| f.active_research.remove(&lab_id))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::Building;
    use crate::factions::FactionKind;

    struct Fixture {
        entities: GameEntities,
        physics: PhysicsWorld,
        factions: BTreeMap<PlayerId, Faction>,
        config: GameConfig,
    }

    fn fixture() -> Fixture {
        let mut entities = GameEntities::new();
        let mut factions = BTreeMap::new();
        let mut faction = Faction::new(1, FactionKind::Coalition, 1, 2000);

        let hq_id = entities.allocate_id();
        entities.add_building(Building::from_spec(
            hq_id,
            BuildingKind::Headquarters,
            1,
            1,
            Vec2::new(500.0, 500.0),
            true,
        ));
        faction.home_hq = Some(hq_id);
        factions.insert(1, faction);

        Fixture {
            entities,
            physics: PhysicsWorld::new(),
            factions,
            config: GameConfig::default(),
        }
    }

    fn add_building(fx: &mut Fixture, kind: BuildingKind, pos: Vec2) -> EntityId {
        let id = fx.entities.allocate_id();
        fx.entities
            .add_building(Building::from_spec(id, kind, 1, 1, pos, true));
        id
    }

    fn run_secs(fx: &mut Fixture, secs: f32) -> Vec<EconomyEvent> {
        let ticks = (secs / crate::config::TICK_DT).ceil() as u32;
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(tick_economy(
                &mut fx.entities,
                &mut fx.physics,
                &mut fx.factions,
                &fx.config,
                crate::config::TICK_DT,
            ));
        }
        events
    }

    #[test]
    fn test_income_scales_with_refineries() {
        let mut fx = fixture();
        let before = fx.factions.get(&1).unwrap().credits;
        run_secs(&mut fx, 10.0);
        let base_gain = fx.factions.get(&1).unwrap().credits - before;

        add_building(&mut fx, BuildingKind::Refinery, Vec2::new(700.0, 500.0));
        add_building(&mut fx, BuildingKind::PowerPlant, Vec2::new(300.0, 500.0));
        let mid = fx.factions.get(&1).unwrap().credits;
        run_secs(&mut fx, 10.0);
        let refinery_gain = fx.factions.get(&1).unwrap().credits - mid;

        assert!(
            refinery_gain > base_gain,
            "refinery added no income: {base_gain} vs {refinery_gain}"
        );
    }

    #[test]
    fn test_low_power_halves_income() {
        let mut fx = fixture();
        // Lab + turrets push consumption past the HQ's generation.
        add_building(&mut fx, BuildingKind::ResearchLab, Vec2::new(700.0, 500.0));
        add_building(&mut fx, BuildingKind::GunTurret, Vec2::new(760.0, 500.0));
        add_building(&mut fx, BuildingKind::GunTurret, Vec2::new(820.0, 500.0));
        refresh_faction_tallies(&fx.entities, &mut fx.factions);
        assert!(fx.factions.get(&1).unwrap().has_low_power());

        let before = fx.factions.get(&1).unwrap().credits;
        run_secs(&mut fx, 10.0);
        let gain = fx.factions.get(&1).unwrap().credits - before;
        let expected = (fx.config.base_income_per_sec * 10.0 * fx.config.low_power_modifier) as i64;
        assert!(
            (gain - expected).abs() <= 2,
            "low-power income {gain}, expected ~{expected}"
        );
    }

    #[test]
    fn test_production_completes_and_spawns_at_rally() {
        let mut fx = fixture();
        let barracks = add_building(&mut fx, BuildingKind::Barracks, Vec2::new(700.0, 500.0));
        add_building(&mut fx, BuildingKind::PowerPlant, Vec2::new(300.0, 500.0));
        fx.entities
            .buildings
            .get_mut(&barracks)
            .unwrap()
            .rally_point = Some(Vec2::new(900.0, 500.0));

        try_enqueue_unit(&mut fx.entities, &mut fx.factions, 1, barracks, UnitKind::Trooper)
            .unwrap();

        let build_secs = unit_data::spec(UnitKind::Trooper).build_secs;
        let events = run_secs(&mut fx, build_secs + 1.0);
        let spawned = events.iter().find_map(|e| match e {
            EconomyEvent::ProductionComplete { unit, kind, .. } => Some((*unit, *kind)),
            EconomyEvent::ResearchComplete { .. } => None,
        });
        let (unit_id, kind) = spawned.expect("production never completed");
        assert_eq!(kind, UnitKind::Trooper);

        // Spawned at the rally point, not at the barracks door.
        let unit = fx.entities.units.get(&unit_id).unwrap();
        assert!(
            unit.position.distance(Vec2::new(900.0, 500.0)) <= 60.0,
            "spawned at {:?}",
            unit.position
        );
    }

    #[test]
    fn test_enqueue_rejects_insufficient_credits() {
        let mut fx = fixture();
        let barracks = add_building(&mut fx, BuildingKind::Barracks, Vec2::new(700.0, 500.0));
        fx.factions.get_mut(&1).unwrap().credits = 10;
        refresh_faction_tallies(&fx.entities, &mut fx.factions);

        let err = try_enqueue_unit(
            &mut fx.entities,
            &mut fx.factions,
            1,
            barracks,
            UnitKind::Trooper,
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InsufficientCredits { .. }));
        let queue = &fx.entities.buildings.get(&barracks).unwrap().production_queue;
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_rejects_upkeep_cap() {
        let mut fx = fixture();
        let barracks = add_building(&mut fx, BuildingKind::Barracks, Vec2::new(700.0, 500.0));
        refresh_faction_tallies(&fx.entities, &mut fx.factions);
        // Cap is the HQ's 20; claim it all.
        fx.factions.get_mut(&1).unwrap().current_upkeep = 20;

        let err = try_enqueue_unit(
            &mut fx.entities,
            &mut fx.factions,
            1,
            barracks,
            UnitKind::Trooper,
        )
        .unwrap_err();
        assert!(matches!(err, GameError::UpkeepExceeded { .. }));
    }

    #[test]
    fn test_research_lifecycle() {
        let mut fx = fixture();
        let lab = add_building(&mut fx, BuildingKind::ResearchLab, Vec2::new(700.0, 500.0));
        add_building(&mut fx, BuildingKind::PowerPlant, Vec2::new(300.0, 500.0));
        refresh_faction_tallies(&fx.entities, &mut fx.factions);

        try_start_research(
            &fx.entities,
            &mut fx.factions,
            1,
            lab,
            ResearchId::TungstenRounds,
        )
        .unwrap();

        // The single default slot is now occupied.
        let second = try_start_research(
            &fx.entities,
            &mut fx.factions,
            1,
            lab,
            ResearchId::ArmorPlating,
        );
        assert!(second.is_err());

        let secs = research_data::spec(ResearchId::TungstenRounds).duration_secs;
        let events = run_secs(&mut fx, secs + 1.0);
        assert!(events.iter().any(|e| matches!(
            e,
            EconomyEvent::ResearchComplete {
                research: ResearchId::TungstenRounds,
                ..
            }
        )));
        let faction = fx.factions.get(&1).unwrap();
        assert!(faction.has_research(ResearchId::TungstenRounds));
        assert!(faction.mods.damage_mult > 1.0);
        assert!(faction.active_research.is_empty());
    }

    #[test]
    fn test_cancel_research_no_refund() {
        let mut fx = fixture();
        let lab = add_building(&mut fx, BuildingKind::ResearchLab, Vec2::new(700.0, 500.0));
        refresh_faction_tallies(&fx.entities, &mut fx.factions);

        let before = fx.factions.get(&1).unwrap().credits;
        try_start_research(
            &fx.entities,
            &mut fx.factions,
            1,
            lab,
            ResearchId::TungstenRounds,
        )
        .unwrap();
        let after_start = fx.factions.get(&1).unwrap().credits;
        assert!(after_start < before);

        assert!(cancel_research(&mut fx.factions, 1, lab));
        assert_eq!(fx.factions.get(&1).unwrap().credits, after_start);
        assert!(!cancel_research(&mut fx.factions, 1, lab));
    }

    #[test]
    fn test_hangar_craft_born_housed() {
        let mut fx = fixture();
        let airfield = add_building(&mut fx, BuildingKind::Airfield, Vec2::new(700.0, 500.0));
        add_building(&mut fx, BuildingKind::PowerPlant, Vec2::new(300.0, 500.0));
        refresh_faction_tallies(&fx.entities, &mut fx.factions);

        try_enqueue_unit(&mut fx.entities, &mut fx.factions, 1, airfield, UnitKind::Condor)
            .unwrap();
        let build_secs = unit_data::spec(UnitKind::Condor).build_secs;
        run_secs(&mut fx, build_secs + 1.0);

        let hangar = fx.entities.buildings.get(&airfield).unwrap();
        assert_eq!(hangar.hangar_bays.len(), 1);
        let craft = fx.entities.units.get(&hangar.hangar_bays[0]).unwrap();
        assert!(craft.housed);
        assert_eq!(craft.aircraft.as_ref().unwrap().home_hangar, airfield);
    }
}
