//! Worker loops: construction, harvesting, mining, and garrisoning.

use crate::buildings::BuildingKind;
use crate::math::Vec2;
use crate::targets::EntityId;
use crate::units::Unit;

use super::steering;
use super::{
    CommandCtx, CommandStatus, ConstructState, GarrisonState, HarvestPhase, HarvestState,
    MinePhase, MineState,
};

/// Extra reach beyond footprints for work interactions.
const WORK_REACH: f32 = 15.0;
/// Pickaxe wear in durability points per second of mining.
const PICKAXE_WEAR_PER_SEC: f32 = 1.0;

fn within_building_reach(unit: &Unit, position: Vec2, half_extent: f32) -> bool {
    unit.position.distance(position) <= half_extent + unit.radius + WORK_REACH
}

/// Nearest completed, active building of one of `kinds` owned by the
/// unit's owner. Ties resolve to the lower id via scan order.
fn nearest_own_building(
    ctx: &CommandCtx<'_>,
    unit: &Unit,
    kinds: &[BuildingKind],
) -> Option<EntityId> {
    let mut best: Option<(f32, EntityId)> = None;
    for kind in kinds {
        for id in ctx.entities.building_ids_of(unit.owner) {
            let Some(building) = ctx.entities.buildings.get(&id) else {
                continue;
            };
            if !building.active || building.under_construction || building.kind != *kind {
                continue;
            }
            let dist = unit.position.distance(building.position);
            if best.map_or(true, |(d, i)| (dist, id) < (d, i)) {
                best = Some((dist, id));
            }
        }
        // Prefer the first kind in the list when any exists.
        if best.is_some() {
            break;
        }
    }
    best.map(|(_, id)| id)
}

// ---------------------------------------------------------------------------
// Construct
// ---------------------------------------------------------------------------

pub(super) fn construct_update(
    state: &mut ConstructState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    let Some(building) = ctx.entities.buildings.get(&state.site) else {
        return CommandStatus::Done;
    };
    if !building.active || !building.under_construction {
        return CommandStatus::Done;
    }

    let (position, half_extent) = (building.position, building.half_extent);
    if within_building_reach(unit, position, half_extent) {
        if let Some(site) = ctx.entities.buildings.get_mut(&state.site) {
            site.advance_construction(ctx.dt);
        }
    }
    CommandStatus::Continue
}

pub(super) fn construct_movement(
    state: &mut ConstructState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    let Some(building) = ctx.entities.buildings.get(&state.site) else {
        steering::stop(unit, ctx);
        return;
    };
    let position = building.position;
    let half_extent = building.half_extent;
    if within_building_reach(unit, position, half_extent) {
        steering::stop(unit, ctx);
        steering::face(unit, ctx, position);
        return;
    }
    let repath = ctx.config.repath_displacement;
    state.path.ensure(unit, ctx, position, repath);
    let arrival = half_extent + unit.radius + WORK_REACH * 0.5;
    state.path.follow(unit, ctx, arrival);
}

// ---------------------------------------------------------------------------
// Harvest
// ---------------------------------------------------------------------------

pub(super) fn harvest_update(
    state: &mut HarvestState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    if unit.carry.is_none() {
        return CommandStatus::Done;
    }

    match state.phase {
        HarvestPhase::ToDeposit => {
            let deposit_alive = ctx
                .entities
                .obstacles
                .get(&state.deposit)
                .is_some_and(|o| o.active && o.is_harvestable());
            if !deposit_alive {
                let carrying = unit.carry.is_some_and(|c| c.current > 0.0);
                if carrying {
                    state.phase = HarvestPhase::Returning;
                    state.path.invalidate();
                    return CommandStatus::Continue;
                }
                return CommandStatus::Done;
            }
            let (position, reach) = {
                let deposit = ctx.entities.obstacles.get(&state.deposit).unwrap();
                (deposit.position, deposit.shape.bounding_radius())
            };
            if unit.position.distance(position) <= reach + unit.radius + WORK_REACH {
                state.phase = HarvestPhase::Harvesting;
            }
            CommandStatus::Continue
        }
        HarvestPhase::Harvesting => {
            let mods = ctx.mods_for(unit.owner);
            let Some(carry) = unit.carry.as_mut() else {
                return CommandStatus::Done;
            };
            let Some(deposit) = ctx.entities.obstacles.get_mut(&state.deposit) else {
                state.phase = HarvestPhase::Returning;
                state.path.invalidate();
                return CommandStatus::Continue;
            };
            if !deposit.is_harvestable() {
                state.phase = if carry.current > 0.0 {
                    HarvestPhase::Returning
                } else {
                    return CommandStatus::Done;
                };
                state.path.invalidate();
                return CommandStatus::Continue;
            }

            let want = (carry.rate_per_sec * mods.harvest_mult * ctx.dt)
                .min(carry.capacity - carry.current);
            carry.current += deposit.extract(want);

            if carry.is_full() {
                state.phase = HarvestPhase::Returning;
                state.path.invalidate();
            }
            CommandStatus::Continue
        }
        HarvestPhase::Returning => {
            if state.dropoff.is_none() {
                state.dropoff = nearest_own_building(
                    ctx,
                    unit,
                    &[BuildingKind::Refinery, BuildingKind::Headquarters],
                );
            }
            let Some(dropoff_id) = state.dropoff else {
                // Nowhere to deliver.
                return CommandStatus::Done;
            };
            let Some(dropoff) = ctx.entities.buildings.get(&dropoff_id) else {
                state.dropoff = None;
                state.path.invalidate();
                return CommandStatus::Continue;
            };
            let (position, half_extent, alive) =
                (dropoff.position, dropoff.half_extent, dropoff.active);
            if !alive {
                state.dropoff = None;
                state.path.invalidate();
                return CommandStatus::Continue;
            }

            if within_building_reach(unit, position, half_extent) {
                let delivered = unit.carry.map_or(0.0, |c| c.current);
                if let Some(carry) = unit.carry.as_mut() {
                    carry.current = 0.0;
                }
                if let Some(faction) = ctx.factions.get_mut(&unit.owner) {
                    faction.deposit(delivered.round() as i64);
                }
                let deposit_alive = ctx
                    .entities
                    .obstacles
                    .get(&state.deposit)
                    .is_some_and(|o| o.active && o.is_harvestable());
                if deposit_alive {
                    state.phase = HarvestPhase::ToDeposit;
                    state.path.invalidate();
                    return CommandStatus::Continue;
                }
                return CommandStatus::Done;
            }
            CommandStatus::Continue
        }
    }
}

pub(super) fn harvest_movement(
    state: &mut HarvestState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    match state.phase {
        HarvestPhase::ToDeposit => {
            let Some(deposit) = ctx.entities.obstacles.get(&state.deposit) else {
                steering::stop(unit, ctx);
                return;
            };
            let goal = deposit.position;
            let reach = deposit.shape.bounding_radius() + unit.radius + WORK_REACH * 0.5;
            let repath = ctx.config.repath_displacement;
            state.path.ensure(unit, ctx, goal, repath);
            state.path.follow(unit, ctx, reach);
        }
        HarvestPhase::Harvesting => steering::stop(unit, ctx),
        HarvestPhase::Returning => {
            let Some(dropoff) = state.dropoff.and_then(|id| ctx.entities.buildings.get(&id))
            else {
                steering::stop(unit, ctx);
                return;
            };
            let goal = dropoff.position;
            let reach = dropoff.half_extent + unit.radius + WORK_REACH * 0.5;
            let repath = ctx.config.repath_displacement;
            state.path.ensure(unit, ctx, goal, repath);
            state.path.follow(unit, ctx, reach);
        }
    }
}

// ---------------------------------------------------------------------------
// Mine
// ---------------------------------------------------------------------------

pub(super) fn mine_update(
    state: &mut MineState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    if unit.pickaxe.is_none() {
        return CommandStatus::Done;
    }

    match state.phase {
        MinePhase::ToSeam => {
            let seam_alive = ctx
                .entities
                .obstacles
                .get(&state.seam)
                .is_some_and(|o| o.active && o.is_harvestable());
            if !seam_alive {
                if state.stash > 0.0 {
                    state.phase = MinePhase::Returning;
                    state.path.invalidate();
                    return CommandStatus::Continue;
                }
                return CommandStatus::Done;
            }
            let (position, reach) = {
                let seam = ctx.entities.obstacles.get(&state.seam).unwrap();
                (seam.position, seam.shape.bounding_radius())
            };
            if unit.position.distance(position) <= reach + unit.radius + WORK_REACH {
                state.phase = MinePhase::Mining;
            }
            CommandStatus::Continue
        }
        MinePhase::Mining => {
            let mods = ctx.mods_for(unit.owner);
            let Some(pickaxe) = unit.pickaxe.as_mut() else {
                return CommandStatus::Done;
            };
            let Some(seam) = ctx.entities.obstacles.get_mut(&state.seam) else {
                state.phase = MinePhase::Returning;
                state.path.invalidate();
                return CommandStatus::Continue;
            };
            if !seam.is_harvestable() || pickaxe.is_broken() {
                state.phase = if state.stash > 0.0 || pickaxe.is_broken() {
                    MinePhase::Returning
                } else {
                    return CommandStatus::Done;
                };
                state.path.invalidate();
                return CommandStatus::Continue;
            }

            let yielded = seam.extract(pickaxe.rate_per_sec * mods.mining_mult * ctx.dt);
            state.stash += yielded;
            pickaxe.durability -= PICKAXE_WEAR_PER_SEC * ctx.dt;
            CommandStatus::Continue
        }
        MinePhase::Returning => {
            let Some(hq_id) = nearest_own_building(ctx, unit, &[BuildingKind::Headquarters])
            else {
                return CommandStatus::Done;
            };
            let Some(hq) = ctx.entities.buildings.get(&hq_id) else {
                return CommandStatus::Done;
            };
            let (position, half_extent) = (hq.position, hq.half_extent);

            if within_building_reach(unit, position, half_extent) {
                if let Some(faction) = ctx.factions.get_mut(&unit.owner) {
                    faction.deposit(state.stash.round() as i64);
                }
                state.stash = 0.0;
                if let Some(pickaxe) = unit.pickaxe.as_mut() {
                    pickaxe.durability = pickaxe.max_durability;
                }
                let seam_alive = ctx
                    .entities
                    .obstacles
                    .get(&state.seam)
                    .is_some_and(|o| o.active && o.is_harvestable());
                if seam_alive {
                    state.phase = MinePhase::ToSeam;
                    state.path.invalidate();
                    return CommandStatus::Continue;
                }
                return CommandStatus::Done;
            }
            CommandStatus::Continue
        }
    }
}

pub(super) fn mine_movement(state: &mut MineState, unit: &mut Unit, ctx: &mut CommandCtx<'_>) {
    match state.phase {
        MinePhase::ToSeam => {
            let Some(seam) = ctx.entities.obstacles.get(&state.seam) else {
                steering::stop(unit, ctx);
                return;
            };
            let goal = seam.position;
            let reach = seam.shape.bounding_radius() + unit.radius + WORK_REACH * 0.5;
            let repath = ctx.config.repath_displacement;
            state.path.ensure(unit, ctx, goal, repath);
            state.path.follow(unit, ctx, reach);
        }
        MinePhase::Mining => steering::stop(unit, ctx),
        MinePhase::Returning => {
            let hq = nearest_own_building(ctx, unit, &[BuildingKind::Headquarters])
                .and_then(|id| ctx.entities.buildings.get(&id));
            let Some(hq) = hq else {
                steering::stop(unit, ctx);
                return;
            };
            let goal = hq.position;
            let reach = hq.half_extent + unit.radius + WORK_REACH * 0.5;
            let repath = ctx.config.repath_displacement;
            state.path.ensure(unit, ctx, goal, repath);
            state.path.follow(unit, ctx, reach);
        }
    }
}

// ---------------------------------------------------------------------------
// Garrison
// ---------------------------------------------------------------------------

pub(super) fn garrison_update(
    state: &mut GarrisonState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    let Some(bunker) = ctx.entities.buildings.get(&state.bunker) else {
        return CommandStatus::Done;
    };
    if !bunker.active || bunker.garrison_space() == 0 {
        return CommandStatus::Done;
    }
    let (position, half_extent) = (bunker.position, bunker.half_extent);

    if unit.position.distance(position) <= half_extent + ctx.config.hangar_proximity {
        // Atomic hand-off: suspend the body and join the garrison list.
        if let Some(body) = unit.body.take() {
            ctx.physics.remove_body(body);
        }
        unit.housed = true;
        unit.position = position;
        unit.velocity = crate::math::Vec2::ZERO;
        if let Some(bunker) = ctx.entities.buildings.get_mut(&state.bunker) {
            bunker.garrison.push(unit.id);
        }
        return CommandStatus::Done;
    }
    CommandStatus::Continue
}

pub(super) fn garrison_movement(
    state: &mut GarrisonState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    if unit.housed {
        return;
    }
    let Some(bunker) = ctx.entities.buildings.get(&state.bunker) else {
        steering::stop(unit, ctx);
        return;
    };
    let goal = bunker.position;
    let arrival = bunker.half_extent + ctx.config.hangar_proximity * 0.5;
    let repath = ctx.config.repath_displacement;
    state.path.ensure(unit, ctx, goal, repath);
    state.path.follow(unit, ctx, arrival);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::test_ctx;
    use crate::command::UnitCommand;
    use crate::obstacles::{Obstacle, ObstacleShape, ResourceKind};
    use crate::units::UnitKind;

    #[test]
    fn test_harvest_loop_deposits_credits() {
        let mut harness = test_ctx(2000.0);
        let worker = harness.spawn_unit(UnitKind::Rigger, 1, Vec2::new(400.0, 400.0));
        harness.spawn_building(crate::buildings::BuildingKind::Refinery, 1, Vec2::new(300.0, 400.0));

        let deposit_id = harness.entities.allocate_id();
        harness.entities.obstacles.insert(
            deposit_id,
            Obstacle::deposit(
                deposit_id,
                Vec2::new(600.0, 400.0),
                ObstacleShape::Circle { radius: 20.0 },
                ResourceKind::Spice,
                10_000.0,
            ),
        );

        harness.entities.units.get_mut(&worker).unwrap().command =
            UnitCommand::Harvest(HarvestState {
                deposit: deposit_id,
                phase: HarvestPhase::ToDeposit,
                dropoff: None,
                path: crate::command::steering::PathPlan::new(),
            });

        let before = harness.factions.get(&1).unwrap().credits;
        // Enough ticks for walk + fill (50 capacity at 10/s) + return.
        harness.run_unit(worker, 3600);
        let after = harness.factions.get(&1).unwrap().credits;
        assert!(after > before, "no credits delivered: {before} -> {after}");
    }

    #[test]
    fn test_harvest_completes_when_deposit_gone() {
        let mut harness = test_ctx(2000.0);
        let worker = harness.spawn_unit(UnitKind::Rigger, 1, Vec2::new(400.0, 400.0));
        let missing = 9999;
        harness.entities.units.get_mut(&worker).unwrap().command =
            UnitCommand::Harvest(HarvestState {
                deposit: missing,
                phase: HarvestPhase::ToDeposit,
                dropoff: None,
                path: crate::command::steering::PathPlan::new(),
            });

        harness.run_unit(worker, 3);
        let unit = harness.entities.units.get(&worker).unwrap();
        assert!(matches!(unit.command, UnitCommand::Idle(_)));
    }

    #[test]
    fn test_construction_by_worker() {
        let mut harness = test_ctx(2000.0);
        let worker = harness.spawn_unit(UnitKind::Rigger, 1, Vec2::new(400.0, 400.0));
        let site = {
            let id = harness.entities.allocate_id();
            let building = crate::buildings::Building::from_spec(
                id,
                crate::buildings::BuildingKind::PowerPlant,
                1,
                1,
                Vec2::new(480.0, 400.0),
                false,
            );
            harness.entities.add_building(building);
            id
        };
        harness.entities.units.get_mut(&worker).unwrap().command =
            UnitCommand::Construct(ConstructState {
                site,
                path: crate::command::steering::PathPlan::new(),
            });

        // Power plant takes 18 s of effort; allow walk time too.
        harness.run_unit(worker, 60 * 25);
        let building = harness.entities.buildings.get(&site).unwrap();
        assert!(!building.under_construction, "construction unfinished");
        let unit = harness.entities.units.get(&worker).unwrap();
        assert!(matches!(unit.command, UnitCommand::Idle(_)));
    }

    #[test]
    fn test_garrison_hand_off() {
        let mut harness = test_ctx(2000.0);
        let trooper = harness.spawn_unit(UnitKind::Trooper, 1, Vec2::new(400.0, 400.0));
        let bunker = harness.spawn_building(
            crate::buildings::BuildingKind::Bunker,
            1,
            Vec2::new(500.0, 400.0),
        );
        harness.entities.units.get_mut(&trooper).unwrap().command =
            UnitCommand::GarrisonBunker(GarrisonState {
                bunker,
                path: crate::command::steering::PathPlan::new(),
            });

        harness.run_unit(trooper, 60 * 10);
        let unit = harness.entities.units.get(&trooper).unwrap();
        assert!(unit.housed, "unit not housed");
        assert!(unit.body.is_none());
        let bunker = harness.entities.buildings.get(&bunker).unwrap();
        assert_eq!(bunker.garrison, vec![trooper]);
    }
}
