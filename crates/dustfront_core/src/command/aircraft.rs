//! Aircraft commands: on-station patrol, sorties, and hangar returns.

use crate::combat;
use crate::entities::ScanParams;
use crate::math::Vec2;
use crate::targets::{EntityId, Targetable};
use crate::units::Unit;
use crate::weapons::ElevationMask;

use super::attack::{fire_all_weapons, weapon_mask};
use super::steering;
use super::{
    CommandCtx, CommandStatus, OnStationState, ReturnToHangarState, SortiePhase, SortieState,
    UnitCommand,
};

/// Distance from the target at which the attack run begins.
const ATTACK_RUN_TRIGGER: f32 = 60.0;
/// Spacing between payload impacts along the flight axis.
const PAYLOAD_SPACING: f32 = 16.0;
/// Payload blast radius.
const PAYLOAD_RADIUS: f32 = 30.0;
/// Payload blast damage.
const PAYLOAD_DAMAGE: f32 = 40.0;
/// Touch-down distance for the landing phase.
const TOUCHDOWN_DISTANCE: f32 = 12.0;

/// Resolve the unit's home hangar if it still stands.
fn home_hangar(unit: &Unit, ctx: &CommandCtx<'_>) -> Option<(EntityId, Vec2, f32)> {
    let hangar_id = unit.aircraft.as_ref()?.home_hangar;
    let hangar = ctx.entities.buildings.get(&hangar_id)?;
    if !hangar.active {
        return None;
    }
    Some((hangar_id, hangar.position, hangar.half_extent))
}

/// Hangar craft die with their hangar, whatever they were doing.
fn destroy_orphaned_craft(unit: &mut Unit) -> CommandStatus {
    unit.take_damage(unit.health + 1.0, unit.id);
    CommandStatus::Done
}

/// Move the unit into the hangar: suspend the body, claim a bay, and
/// replenish fuel and ammo.
pub(super) fn house_in_hangar(
    unit: &mut Unit,
    hangar_id: EntityId,
    ctx: &mut CommandCtx<'_>,
) -> bool {
    let Some(hangar) = ctx.entities.buildings.get_mut(&hangar_id) else {
        return false;
    };
    if !hangar.active {
        return false;
    }
    hangar.hangar_on_sortie.retain(|&id| id != unit.id);
    if !hangar.hangar_bays.contains(&unit.id) {
        hangar.hangar_bays.push(unit.id);
    }
    let pad = hangar.position;

    if let Some(body) = unit.body.take() {
        ctx.physics.remove_body(body);
    }
    unit.housed = true;
    unit.position = pad;
    unit.velocity = Vec2::ZERO;
    if let Some(aircraft) = unit.aircraft.as_mut() {
        aircraft.replenish();
    }
    true
}

// ---------------------------------------------------------------------------
// On station
// ---------------------------------------------------------------------------

pub(super) fn on_station_update(
    state: &mut OnStationState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    if unit.aircraft.is_some() {
        if home_hangar(unit, ctx).is_none() {
            return destroy_orphaned_craft(unit);
        }
        if unit.aircraft.as_ref().is_some_and(|a| a.is_depleted()) {
            return CommandStatus::Switch(Box::new(UnitCommand::ReturnToHangar(
                ReturnToHangarState::default(),
            )));
        }
    }

    // Drop a dead or escaped engagement target.
    if let Some(target) = state.auto_target {
        let keep = ctx.entities.resolve_target(target).is_some_and(|info| {
            unit.position.distance(info.position) <= unit.max_weapon_range() * 1.5
        });
        if !keep {
            state.auto_target = None;
        }
    }

    if state.auto_target.is_none() && unit.is_armed() && ctx.tick >= state.next_scan_tick {
        state.next_scan_tick = ctx.tick + ctx.config.scan_interval_ticks;
        // Station guards only engage aircraft, and only inside weapon
        // range rather than full vision.
        let scan = ScanParams {
            position: unit.position,
            team: unit.team,
            hits: weapon_mask(unit) & ElevationMask::AIR,
            cloak_detection_range: unit.cloak_detection_range,
            radius: unit.max_weapon_range(),
        };
        if let Some(target) = ctx.entities.find_nearest_enemy_targetable(&scan) {
            if unit.aircraft.is_some() {
                // Interceptors break station to chase.
                return CommandStatus::Switch(Box::new(UnitCommand::attack(target)));
            }
            state.auto_target = Some(target);
        }
    }

    CommandStatus::Continue
}

pub(super) fn on_station_movement(
    state: &mut OnStationState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    let corners = ctx.config.station_corners.max(3);
    let angle = (state.corner % corners) as f32 / corners as f32 * std::f32::consts::TAU;
    let corner_point = state.station + Vec2::from_angle(angle) * ctx.config.station_radius;

    if unit.position.distance(corner_point) <= ctx.config.waypoint_threshold {
        state.corner = (state.corner + 1) % corners;
    }
    steering::seek(unit, ctx, corner_point, false);
}

pub(super) fn on_station_combat(
    state: &mut OnStationState,
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
// Sortie
// ---------------------------------------------------------------------------

pub(super) fn sortie_update(
    state: &mut SortieState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    let Some((hangar_id, hangar_pos, hangar_extent)) = home_hangar(unit, ctx) else {
        return destroy_orphaned_craft(unit);
    };

    match state.phase {
        SortiePhase::Outbound => {
            if unit.position.distance(state.target) <= ATTACK_RUN_TRIGGER {
                state.phase = SortiePhase::Attack;
                state.run_elapsed = 0.0;
                state.payload_dropped = false;
                let heading = (state.target - unit.position).normalize_or_zero();
                state.run_heading = if heading.length_squared() > 0.0 {
                    heading
                } else {
                    Vec2::from_angle(unit.rotation)
                };
            }
            CommandStatus::Continue
        }
        SortiePhase::Attack => {
            state.run_elapsed += ctx.dt;

            if !state.payload_dropped && state.run_elapsed >= ctx.config.sortie_payload_secs {
                state.payload_dropped = true;
                let mods = ctx.mods_for(unit.owner);
                let count = ctx.config.sortie_payload_count + mods.extra_sortie_payload;
                let half_span = (count.saturating_sub(1)) as f32 * 0.5;
                for i in 0..count {
                    let offset = (i as f32 - half_span) * PAYLOAD_SPACING;
                    let impact = state.target + state.run_heading * offset;
                    combat::spawn_bomb_explosion(
                        ctx.entities,
                        ctx.tick,
                        unit.team,
                        unit.id,
                        impact,
                        PAYLOAD_RADIUS,
                        PAYLOAD_DAMAGE,
                    );
                }
                if let Some(aircraft) = unit.aircraft.as_mut() {
                    aircraft.ammo = aircraft.ammo.saturating_sub(count.min(aircraft.ammo));
                }
            }

            if state.run_elapsed >= ctx.config.sortie_attack_secs {
                state.phase = SortiePhase::Inbound;
            }
            CommandStatus::Continue
        }
        SortiePhase::Inbound => {
            let threshold = hangar_extent + ctx.config.hangar_proximity;
            if unit.position.distance(hangar_pos) <= threshold {
                state.phase = SortiePhase::Landing;
            }
            CommandStatus::Continue
        }
        SortiePhase::Landing => {
            if unit.position.distance(hangar_pos) <= TOUCHDOWN_DISTANCE {
                if house_in_hangar(unit, hangar_id, ctx) {
                    return CommandStatus::Done;
                }
                return destroy_orphaned_craft(unit);
            }
            CommandStatus::Continue
        }
    }
}

pub(super) fn sortie_movement(
    state: &mut SortieState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    match state.phase {
        SortiePhase::Outbound => steering::seek(unit, ctx, state.target, false),
        SortiePhase::Attack => {
            // Locked heading at full throttle keeps the forward-speed
            // requirement of the run.
            let velocity = state.run_heading * unit.speed;
            if let Some(body) = unit.body {
                ctx.physics.set_linear_velocity(body, velocity);
                let heading = velocity.angle();
                ctx.physics.set_rotation(body, heading);
                unit.rotation = heading;
            }
        }
        SortiePhase::Inbound => {
            let hangar = home_hangar(unit, ctx).map(|(_, pos, _)| pos);
            match hangar {
                Some(pos) => steering::seek(unit, ctx, pos, false),
                None => steering::stop(unit, ctx),
            }
        }
        SortiePhase::Landing => {
            let hangar = home_hangar(unit, ctx).map(|(_, pos, _)| pos);
            match hangar {
                Some(pos) => steering::seek(unit, ctx, pos, true),
                None => steering::stop(unit, ctx),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Return to hangar
// ---------------------------------------------------------------------------

pub(super) fn return_update(
    _state: &mut ReturnToHangarState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) -> CommandStatus {
    let Some((hangar_id, hangar_pos, hangar_extent)) = home_hangar(unit, ctx) else {
        return destroy_orphaned_craft(unit);
    };
    if unit.position.distance(hangar_pos) <= hangar_extent + ctx.config.hangar_proximity {
        if house_in_hangar(unit, hangar_id, ctx) {
            return CommandStatus::Done;
        }
        return destroy_orphaned_craft(unit);
    }
    CommandStatus::Continue
}

pub(super) fn return_movement(
    _state: &mut ReturnToHangarState,
    unit: &mut Unit,
    ctx: &mut CommandCtx<'_>,
) {
    match home_hangar(unit, ctx) {
        Some((_, pos, _)) => steering::seek(unit, ctx, pos, true),
        None => steering::stop(unit, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::test_ctx;
    use crate::buildings::BuildingKind;
    use crate::ordinance::FieldEffectKind;
    use crate::units::{AircraftState, UnitKind};

    fn spawn_hangar_craft(
        harness: &mut crate::command::tests::CtxHarness,
        kind: UnitKind,
        team: u8,
        hangar: EntityId,
        position: Vec2,
    ) -> EntityId {
        let id = harness.spawn_unit(kind, team, position);
        let spec = crate::data::unit_data::spec(kind);
        let loadout = spec.hangar_craft.unwrap();
        let unit = harness.entities.units.get_mut(&id).unwrap();
        unit.aircraft = Some(AircraftState {
            fuel_secs: loadout.fuel_secs,
            max_fuel_secs: loadout.fuel_secs,
            ammo: loadout.ammo,
            max_ammo: loadout.ammo,
            home_hangar: hangar,
        });
        id
    }

    #[test]
    fn test_sortie_full_mission() {
        let mut harness = test_ctx(4000.0);
        let hangar = harness.spawn_building(BuildingKind::Airfield, 1, Vec2::new(200.0, 200.0));
        let bomber = spawn_hangar_craft(
            &mut harness,
            UnitKind::Condor,
            1,
            hangar,
            Vec2::new(200.0, 200.0),
        );
        harness
            .entities
            .buildings
            .get_mut(&hangar)
            .unwrap()
            .hangar_on_sortie
            .push(bomber);
        harness.entities.units.get_mut(&bomber).unwrap().command =
            UnitCommand::Sortie(SortieState {
                target: Vec2::new(1700.0, 200.0),
                phase: SortiePhase::Outbound,
                run_elapsed: 0.0,
                payload_dropped: false,
                run_heading: Vec2::new(1.0, 0.0),
            });

        // Out, strike, back, land: give it two minutes of sim time.
        harness.run_unit(bomber, 60 * 120);

        let unit = harness.entities.units.get(&bomber).unwrap();
        assert!(unit.housed, "bomber not housed, command {:?}", unit.command.wire_type());
        let hangar = harness.entities.buildings.get(&hangar).unwrap();
        assert_eq!(hangar.hangar_bays, vec![bomber]);
        assert!(hangar.hangar_on_sortie.is_empty());

        // Payload landed near the target along the flight axis.
        let blasts: Vec<_> = harness
            .entities
            .field_effects
            .values()
            .filter(|fx| fx.kind == FieldEffectKind::Explosion)
            .collect();
        assert_eq!(blasts.len() as u32, harness.config.sortie_payload_count);
        for fx in blasts {
            assert!((fx.center.x - 1700.0).abs() <= 40.0, "off-axis at {:?}", fx.center);
            assert!((fx.center.y - 200.0).abs() <= 40.0);
        }
    }

    #[test]
    fn test_sortie_aborts_when_hangar_destroyed() {
        let mut harness = test_ctx(4000.0);
        let hangar = harness.spawn_building(BuildingKind::Airfield, 1, Vec2::new(200.0, 200.0));
        let bomber = spawn_hangar_craft(
            &mut harness,
            UnitKind::Condor,
            1,
            hangar,
            Vec2::new(600.0, 200.0),
        );
        harness.entities.units.get_mut(&bomber).unwrap().command =
            UnitCommand::Sortie(SortieState {
                target: Vec2::new(1700.0, 200.0),
                phase: SortiePhase::Outbound,
                run_elapsed: 0.0,
                payload_dropped: false,
                run_heading: Vec2::new(1.0, 0.0),
            });

        harness.entities.buildings.get_mut(&hangar).unwrap().active = false;
        harness.run_unit(bomber, 2);

        let unit = harness.entities.units.get(&bomber).unwrap();
        assert!(!unit.active, "orphaned bomber survived");
    }

    #[test]
    fn test_on_station_patrols_and_interceptor_breaks_off() {
        let mut harness = test_ctx(4000.0);
        let hangar = harness.spawn_building(BuildingKind::Airfield, 1, Vec2::new(200.0, 200.0));
        let falcon = spawn_hangar_craft(
            &mut harness,
            UnitKind::Falcon,
            1,
            hangar,
            Vec2::new(1000.0, 1000.0),
        );
        harness.entities.units.get_mut(&falcon).unwrap().command =
            UnitCommand::OnStation(OnStationState {
                station: Vec2::new(1000.0, 1000.0),
                corner: 0,
                auto_target: None,
                next_scan_tick: 0,
            });

        // No enemies: stays on station.
        harness.run_unit(falcon, 120);
        assert!(matches!(
            harness.entities.units.get(&falcon).unwrap().command,
            UnitCommand::OnStation(_)
        ));

        // Enemy bomber inside weapon range: interceptor switches to attack.
        harness.spawn_unit(UnitKind::Condor, 2, Vec2::new(1050.0, 1000.0));
        harness.run_unit(falcon, 40);
        assert!(matches!(
            harness.entities.units.get(&falcon).unwrap().command,
            UnitCommand::AttackTargetable(_)
        ));
    }

    #[test]
    fn test_return_to_hangar_replenishes() {
        let mut harness = test_ctx(4000.0);
        let hangar = harness.spawn_building(BuildingKind::Airfield, 1, Vec2::new(200.0, 200.0));
        let falcon = spawn_hangar_craft(
            &mut harness,
            UnitKind::Falcon,
            1,
            hangar,
            Vec2::new(700.0, 200.0),
        );
        {
            let unit = harness.entities.units.get_mut(&falcon).unwrap();
            unit.aircraft.as_mut().unwrap().fuel_secs = 0.0;
            unit.aircraft.as_mut().unwrap().ammo = 0;
            unit.command = UnitCommand::ReturnToHangar(ReturnToHangarState::default());
        }

        harness.run_unit(falcon, 60 * 30);
        let unit = harness.entities.units.get(&falcon).unwrap();
        assert!(unit.housed, "falcon not housed");
        let aircraft = unit.aircraft.as_ref().unwrap();
        assert!(aircraft.fuel_secs > 0.0);
        assert!(aircraft.ammo > 0);
    }
}
