//! Idle scanning and the three attack commands.

use crate::combat;
use crate::entities::{ScanParams, TargetInfo};
use crate::targets::TargetId;
use crate::units::{AiStance, Unit};
use crate::weapons::ElevationMask;

use super::steering;
use super::{
    AttackGroundState, AttackMoveState, AttackTargetableState, CommandCtx, CommandStatus,
    IdleState, UnitCommand,
};

/// Union of elevations the unit's weapons can hit.
pub(super) fn weapon_mask(unit: &Unit) -> ElevationMask {
    let mut mask = ElevationMask::NONE;
    if let Some(weapon) = unit.weapon {
        mask = mask | weapon.spec.hits;
    }
    if let Some(weapon) = unit.second_weapon {
        mask = mask | weapon.spec.hits;
    }
    mask
}

/// Longest effective range the unit can bring against `target`.
fn best_effective_range(unit: &Unit, ctx: &CommandCtx<'_>, target: &TargetInfo) -> f32 {
    let mods = ctx.mods_for(unit.owner);
    let mut best = 0.0_f32;
    for weapon in [unit.weapon.as_ref(), unit.second_weapon.as_ref()]
        .into_iter()
        .flatten()
    {
        if weapon.spec.can_hit(target.elevation) {
            best = best.max(combat::effective_range(weapon, &mods, target.target_size));
        }
    }
    best
}

/// Scan for the nearest enemy this unit can engage.
///
/// DEFENSIVE stance additionally rejects targets beyond the leash from
/// the unit's home position.
pub(super) fn scan_for_target(unit: &Unit, ctx: &CommandCtx<'_>) -> Option<TargetId> {
    let mask = weapon_mask(unit);
    let scan = ScanParams {
        position: unit.position,
        team: unit.team,
        hits: mask,
        cloak_detection_range: unit.cloak_detection_range,
        radius: unit.vision_range,
    };
    let target = ctx.entities.find_nearest_enemy_targetable(&scan)?;
    if unit.stance == AiStance::Defensive {
        let info = ctx.entities.resolve_target(target)?;
        if info.position.distance(unit.home_position) > ctx.config.defensive_leash {
            return None;
        }
    }
    Some(target)
}

/// Fire every weapon that bears on `target`, spending interceptor ammo.
pub(super) fn fire_all_weapons(unit: &mut Unit, ctx: &mut CommandCtx<'_>, target: &TargetInfo) {
    let mods = ctx.mods_for(unit.owner);
    let shooter = unit.id;
    let position = unit.position;
    let team = unit.team;
    let mut shots = 0u32;

    if let Some(weapon) = unit.weapon.as_mut() {
        if combat::fire_weapon_at_target(ctx, shooter, position, team, weapon, &mods, target) {
            shots += 1;
        }
    }
    if let Some(weapon) = unit.second_weapon.as_mut() {
        if combat::fire_weapon_at_target(ctx, shooter, position, team, weapon, &mods, target) {
            shots += 1;
        }
    }

    if shots > 0 {
        if let Some(aircraft) = unit.aircraft.as_mut() {
            aircraft.ammo = aircraft.ammo.saturating_sub(shots);
        }
    }
}

// ---------------------------------------------------------------------------
// Idle
// ---------------------------------------------------------------------------

/// Idle scan: every scan interval, armed units not on HOLD_POSITION look
/// for a target and switch to an attack command.
pub(super) fn idle_update(
    state: &mut IdleState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    if unit.housed || !unit.is_armed() || !unit.stance.auto_acquires() {
        return CommandStatus::Continue;
    }
    if ctx.tick < state.next_scan_tick {
        return CommandStatus::Continue;
    }
    state.next_scan_tick = ctx.tick + ctx.config.scan_interval_ticks;

    match scan_for_target(unit, ctx) {
        Some(target) => CommandStatus::Switch(Box::new(UnitCommand::attack(target))),
        None => CommandStatus::Continue,
    }
}

// ---------------------------------------------------------------------------
// Attack-move
// ---------------------------------------------------------------------------

fn attack_move_arrival(unit: &Unit) -> f32 {
    (unit.radius * 0.75).max(6.0)
}

pub(super) fn attack_move_update(
    state: &mut AttackMoveState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    // Drop the auto target once it dies, cloaks away, or leaves vision.
    if let Some(target) = state.auto_target {
        let keep = match ctx.entities.resolve_target(target) {
            Some(info) => {
                let dist = unit.position.distance(info.position);
                dist <= unit.vision_range
                    && (!info.cloaked || dist <= unit.cloak_detection_range)
            }
            None => false,
        };
        if !keep {
            state.auto_target = None;
            state.path.invalidate();
        }
    }

    if state.auto_target.is_none() && unit.is_armed() && ctx.tick >= state.next_scan_tick {
        state.next_scan_tick = ctx.tick + ctx.config.scan_interval_ticks;
        state.auto_target = scan_for_target(unit, ctx);
    }

    if unit.position.distance(state.destination) <= attack_move_arrival(unit) {
        return CommandStatus::Done;
    }
    CommandStatus::Continue
}

pub(super) fn attack_move_movement(
    state: &mut AttackMoveState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    if let Some(target) = state.auto_target {
        if let Some(info) = ctx.entities.resolve_target(target) {
            let range = best_effective_range(unit, ctx, &info);
            if unit.position.distance(info.position) <= range {
                steering::stop(unit, ctx);
                steering::face(unit, ctx, info.position);
                return;
            }
            // Close on the target of opportunity.
            let repath = ctx.config.repath_displacement;
            state.path.ensure(unit, ctx, info.position, repath);
            let arrival = attack_move_arrival(unit);
            state.path.follow(unit, ctx, arrival);
            return;
        }
    }

    let repath = ctx.config.repath_displacement;
    state.path.ensure(unit, ctx, state.destination, repath);
    let arrival = attack_move_arrival(unit);
    state.path.follow(unit, ctx, arrival);
}

pub(super) fn attack_move_combat(
    state: &mut AttackMoveState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    let Some(target) = state.auto_target else {
        return;
    };
    let Some(info) = ctx.entities.resolve_target(target) else {
        return;
    };
    fire_all_weapons(unit, ctx, &info);
}

// ---------------------------------------------------------------------------
// Attack targetable
// ---------------------------------------------------------------------------

pub(super) fn attack_update(
    state: &mut AttackTargetableState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    let Some(info) = ctx.entities.resolve_target(state.target) else {
        return CommandStatus::Done;
    };
    // A cloaked target that slipped outside detection range is lost.
    if info.cloaked && unit.position.distance(info.position) > unit.cloak_detection_range {
        return CommandStatus::Done;
    }
    CommandStatus::Continue
}

pub(super) fn attack_movement(
    state: &mut AttackTargetableState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    let Some(info) = ctx.entities.resolve_target(state.target) else {
        steering::stop(unit, ctx);
        return;
    };

    let range = best_effective_range(unit, ctx, &info);
    let distance = unit.position.distance(info.position);
    if range > 0.0 && distance <= range * ctx.config.standoff_factor {
        steering::stop(unit, ctx);
        steering::face(unit, ctx, info.position);
        return;
    }

    // Chase. The plan recomputes only when the target has strayed far
    // enough from the last computed goal, throttled to 500 ms.
    let repath = ctx.config.repath_displacement;
    state.path.ensure(unit, ctx, info.position, repath);
    let arrival = (range * ctx.config.standoff_factor).max(unit.radius);
    state.path.follow(unit, ctx, arrival);
}

pub(super) fn attack_combat(
    state: &mut AttackTargetableState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    let Some(info) = ctx.entities.resolve_target(state.target) else {
        return;
    };
    fire_all_weapons(unit, ctx, &info);
}

// ---------------------------------------------------------------------------
// Attack ground
// ---------------------------------------------------------------------------

pub(super) fn attack_ground_movement(
    state: &mut AttackGroundState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    let mods = ctx.mods_for(unit.owner);
    let range = unit
        .weapon
        .map_or(0.0, |w| w.spec.range * mods.range_mult);
    let distance = unit.position.distance(state.point);
    if range > 0.0 && distance <= range * ctx.config.standoff_factor {
        steering::stop(unit, ctx);
        steering::face(unit, ctx, state.point);
        return;
    }
    let repath = ctx.config.repath_displacement;
    state.path.ensure(unit, ctx, state.point, repath);
    let arrival = (range * ctx.config.standoff_factor).max(unit.radius);
    state.path.follow(unit, ctx, arrival);
}

pub(super) fn attack_ground_combat(
    state: &mut AttackGroundState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    let mods = ctx.mods_for(unit.owner);
    let shooter = unit.id;
    let position = unit.position;
    let team = unit.team;
    let point = state.point;
    if let Some(weapon) = unit.weapon.as_mut() {
        combat::fire_weapon_at_ground(ctx, shooter, position, team, weapon, &mods, point);
    }
    if let Some(weapon) = unit.second_weapon.as_mut() {
        combat::fire_weapon_at_ground(ctx, shooter, position, team, weapon, &mods, point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::test_ctx;
    use crate::math::Vec2;
    use crate::targets::Targetable;
    use crate::units::UnitKind;

    #[test]
    fn test_idle_scan_acquires_and_switches() {
        let mut harness = test_ctx(2000.0);
        let attacker = harness.spawn_unit(UnitKind::Trooper, 1, Vec2::new(500.0, 500.0));
        let victim = harness.spawn_unit(UnitKind::Trooper, 2, Vec2::new(650.0, 500.0));

        harness.run_unit(attacker, 40);
        let unit = harness.entities.units.get(&attacker).unwrap();
        match &unit.command {
            UnitCommand::AttackTargetable(state) => {
                assert_eq!(state.target, TargetId::Unit(victim));
            }
            other => panic!("expected attack command, got {}", other.wire_type()),
        }
    }

    #[test]
    fn test_hold_position_never_scans() {
        let mut harness = test_ctx(2000.0);
        let attacker = harness.spawn_unit(UnitKind::Trooper, 1, Vec2::new(500.0, 500.0));
        harness.spawn_unit(UnitKind::Trooper, 2, Vec2::new(650.0, 500.0));
        harness.entities.units.get_mut(&attacker).unwrap().stance = AiStance::HoldPosition;

        harness.run_unit(attacker, 120);
        let unit = harness.entities.units.get(&attacker).unwrap();
        assert!(matches!(unit.command, UnitCommand::Idle(_)));
    }

    #[test]
    fn test_defensive_leash_rejects_far_targets() {
        let mut harness = test_ctx(2000.0);
        let attacker = harness.spawn_unit(UnitKind::Marksman, 1, Vec2::new(500.0, 500.0));
        // Inside vision (360) but outside the 300 leash.
        harness.spawn_unit(UnitKind::Trooper, 2, Vec2::new(840.0, 500.0));

        harness.run_unit(attacker, 120);
        let unit = harness.entities.units.get(&attacker).unwrap();
        assert!(matches!(unit.command, UnitCommand::Idle(_)));
    }

    #[test]
    fn test_attack_kills_target() {
        let mut harness = test_ctx(2000.0);
        let attacker = harness.spawn_unit(UnitKind::Warhound, 1, Vec2::new(400.0, 500.0));
        let victim = harness.spawn_unit(UnitKind::Trooper, 2, Vec2::new(560.0, 500.0));
        harness.entities.units.get_mut(&attacker).unwrap().command =
            UnitCommand::attack(TargetId::Unit(victim));

        for tick in 0..600 {
            harness.run_unit(attacker, 1);
            let config = crate::config::GameConfig::default();
            crate::combat::advance_projectiles(
                &mut harness.entities,
                &config,
                tick,
                crate::config::TICK_DT,
            );
            let dead = harness
                .entities
                .units
                .get(&victim)
                .map_or(true, |u| !Targetable::is_active(u));
            if dead {
                break;
            }
        }

        let victim_unit = harness.entities.units.get(&victim).unwrap();
        assert!(!victim_unit.active, "victim survived");

        // With the victim gone the command completes on the next update.
        harness.run_unit(attacker, 2);
        let unit = harness.entities.units.get(&attacker).unwrap();
        assert!(matches!(unit.command, UnitCommand::Idle(_)));
    }

    #[test]
    fn test_ground_weapon_ignores_high_bomber() {
        let mut harness = test_ctx(2000.0);
        let attacker = harness.spawn_unit(UnitKind::Warhound, 1, Vec2::new(500.0, 500.0));
        harness.spawn_unit(UnitKind::Condor, 2, Vec2::new(600.0, 500.0));

        harness.run_unit(attacker, 120);
        // Cannon cannot hit HIGH, so no target is ever acquired.
        let unit = harness.entities.units.get(&attacker).unwrap();
        assert!(matches!(unit.command, UnitCommand::Idle(_)));
    }
}
