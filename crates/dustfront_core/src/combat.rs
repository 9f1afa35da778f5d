//! Combat resolution: weapon firing, projectile flight, beams, and
//! area field effects.
//!
//! Firing spawns ordinance straight into the entity store. Beams apply
//! their damage at spawn and linger only for rendering; projectiles
//! travel and detonate, possibly leaving a field effect behind.

use crate::command::CommandCtx;
use crate::entities::{GameEntities, TargetInfo};
use crate::factions::FactionMods;
use crate::math::{intercept_point, Vec2};
use crate::ordinance::{Beam, BeamKind, FieldEffect, FieldEffectKind, Projectile};
use crate::targets::{Elevation, EntityId, TargetId, Targetable};
use crate::weapons::{ElevationMask, OrdinanceKind, Weapon};

/// Ticks a beam stays visible after spawning.
const BEAM_DISPLAY_TICKS: u64 = 12;
/// Lifetime of a one-shot explosion effect, for rendering.
const EXPLOSION_DISPLAY_SECS: f32 = 0.5;
/// Lifetime of the burning ground left by flame ordinance.
const FIRE_LIFETIME_SECS: f32 = 3.0;
/// Lifetime of a projected sandstorm.
const SANDSTORM_LIFETIME_SECS: f32 = 8.0;
/// Sandstorm radius.
const SANDSTORM_RADIUS: f32 = 120.0;
/// Sandstorm damage per damage interval.
const SANDSTORM_DAMAGE: f32 = 6.0;

/// Effective range of a weapon against a target of the given size.
#[must_use]
pub fn effective_range(weapon: &Weapon, mods: &FactionMods, target_size: f32) -> f32 {
    weapon.spec.range * mods.range_mult + target_size
}

/// Elevations an area effect of this kind damages.
fn effect_hits(kind: FieldEffectKind) -> ElevationMask {
    match kind {
        FieldEffectKind::FlakExplosion => ElevationMask::AIR,
        _ => ElevationMask::GROUND_LOW,
    }
}

/// Field-effect kind produced when an ordinance detonates with AoE.
fn aoe_effect_kind(ordinance: OrdinanceKind) -> FieldEffectKind {
    match ordinance {
        OrdinanceKind::Flak => FieldEffectKind::FlakExplosion,
        OrdinanceKind::FlameBurst => FieldEffectKind::Fire,
        _ => FieldEffectKind::Explosion,
    }
}

/// Fire `weapon` at a resolved target, honoring cooldown, elevation
/// capability, and effective range. Returns whether a shot happened.
///
/// Moving unit targets get predictive aim; buildings, walls, and
/// stationary units are aimed at directly.
pub fn fire_weapon_at_target(
    ctx: &mut CommandCtx<'_>,
    shooter: EntityId,
    shooter_pos: Vec2,
    team: u8,
    weapon: &mut Weapon,
    mods: &FactionMods,
    target: &TargetInfo,
) -> bool {
    if !weapon.ready() || !weapon.spec.can_hit(target.elevation) {
        return false;
    }
    let range = effective_range(weapon, mods, target.target_size);
    if shooter_pos.distance(target.position) > range {
        return false;
    }

    let damage = weapon.spec.damage * mods.damage_mult;
    if weapon.spec.ordinance.is_beam() {
        spawn_beam(ctx.entities, ctx.tick, shooter_pos, weapon, damage, shooter, target);
    } else {
        let aim = if matches!(target.id, TargetId::Unit(_)) && target.velocity.length() > 1.0 {
            intercept_point(
                shooter_pos,
                target.position,
                target.velocity,
                weapon.spec.projectile_speed,
            )
        } else {
            target.position
        };
        let homing = weapon.spec.ordinance.is_homing().then_some(target.id);
        spawn_projectile(ctx.entities, shooter_pos, weapon, damage, team, shooter, aim, homing);
    }
    weapon.reset_cooldown();
    true
}

/// Force-fire `weapon` at a fixed ground point. Returns whether a shot
/// happened.
pub fn fire_weapon_at_ground(
    ctx: &mut CommandCtx<'_>,
    shooter: EntityId,
    shooter_pos: Vec2,
    team: u8,
    weapon: &mut Weapon,
    mods: &FactionMods,
    point: Vec2,
) -> bool {
    if !weapon.ready() || weapon.spec.ordinance.is_beam() {
        return false;
    }
    if shooter_pos.distance(point) > weapon.spec.range * mods.range_mult {
        return false;
    }
    let damage = weapon.spec.damage * mods.damage_mult;
    spawn_projectile(ctx.entities, shooter_pos, weapon, damage, team, shooter, point, None);
    weapon.reset_cooldown();
    true
}

fn spawn_beam(
    entities: &mut GameEntities,
    tick: u64,
    shooter_pos: Vec2,
    weapon: &Weapon,
    damage: f32,
    shooter: EntityId,
    target: &TargetInfo,
) {
    let kind = match weapon.spec.ordinance {
        OrdinanceKind::TeslaArc => BeamKind::Tesla,
        _ => BeamKind::Arc,
    };
    let id = entities.allocate_id();
    entities.beams.insert(
        id,
        Beam {
            id,
            kind,
            start: shooter_pos,
            end: target.position,
            spawned_tick: tick,
            duration_ticks: BEAM_DISPLAY_TICKS,
        },
    );
    entities.apply_damage(target.id, damage, shooter);
}

#[allow(clippy::too_many_arguments)]
fn spawn_projectile(
    entities: &mut GameEntities,
    shooter_pos: Vec2,
    weapon: &Weapon,
    damage: f32,
    team: u8,
    shooter: EntityId,
    aim: Vec2,
    homing: Option<TargetId>,
) {
    let id = entities.allocate_id();
    let direction = (aim - shooter_pos).normalize_or_zero();
    let speed = weapon.spec.projectile_speed;
    entities.projectiles.insert(
        id,
        Projectile {
            id,
            kind: weapon.spec.ordinance,
            position: shooter_pos,
            velocity: direction * speed,
            speed,
            damage,
            team,
            source: shooter,
            aim_point: aim,
            homing,
            hits: weapon.spec.hits,
            aoe_radius: weapon.spec.aoe_radius,
            friendly_fire: weapon.spec.friendly_fire,
            // Generous overshoot so lobbed shots at max range still land.
            remaining_range: shooter_pos.distance(aim) + 200.0,
        },
    );
}

/// Advance all projectiles, resolve impacts, and detonate.
pub fn advance_projectiles(
    entities: &mut GameEntities,
    config: &crate::config::GameConfig,
    tick: u64,
    dt: f32,
) {
    let ids: Vec<EntityId> = entities.projectiles.keys().copied().collect();
    for id in ids {
        let Some(mut projectile) = entities.projectiles.remove(&id) else {
            continue;
        };

        // Homing shots chase their target; losing it turns them ballistic.
        if let Some(target_id) = projectile.homing {
            match entities.resolve_target(target_id) {
                Some(info) => {
                    projectile.aim_point = info.position;
                    projectile.velocity = (info.position - projectile.position)
                        .normalize_or_zero()
                        * projectile.speed;
                }
                None => projectile.homing = None,
            }
        }

        let step = projectile.velocity * dt;
        projectile.position += step;
        projectile.remaining_range -= projectile.speed * dt;

        let reached_aim =
            projectile.position.distance(projectile.aim_point) <= Projectile::IMPACT_THRESHOLD;
        let direct_hit = projectile.homing.and_then(|t| entities.resolve_target(t)).map_or(
            false,
            |info| {
                projectile.position.distance(info.position)
                    <= info.target_size + Projectile::IMPACT_THRESHOLD
            },
        );

        if reached_aim || direct_hit || projectile.remaining_range <= 0.0 {
            detonate(entities, config, tick, &projectile);
        } else {
            entities.projectiles.insert(id, projectile);
        }
    }
}

/// Resolve a projectile's detonation at its current position.
fn detonate(
    entities: &mut GameEntities,
    config: &crate::config::GameConfig,
    tick: u64,
    projectile: &Projectile,
) {
    if projectile.aoe_radius > 0.0 {
        let kind = aoe_effect_kind(projectile.kind);
        let lifetime = if kind == FieldEffectKind::Fire {
            FIRE_LIFETIME_SECS
        } else {
            EXPLOSION_DISPLAY_SECS
        };
        let fx = FieldEffect {
            id: entities.allocate_id(),
            kind,
            center: projectile.position,
            radius: projectile.aoe_radius,
            damage: projectile.damage,
            team: projectile.team,
            friendly_fire: projectile.friendly_fire,
            expires_tick: tick + (lifetime * crate::config::TICK_RATE as f32) as u64,
            next_damage_tick: tick + config.effect_damage_interval_ticks,
        };
        // Blast kinds apply their damage once, at spawn.
        if !kind.has_periodic_damage() {
            apply_area_damage(entities, &fx, projectile.source);
        }
        entities.field_effects.insert(fx.id, fx);
    } else if let Some(victim) = direct_victim(entities, projectile) {
        entities.apply_damage(victim, projectile.damage, projectile.source);
    }
}

/// The single entity a non-AoE projectile strikes, if any.
fn direct_victim(entities: &GameEntities, projectile: &Projectile) -> Option<TargetId> {
    if let Some(target_id) = projectile.homing {
        if entities.resolve_target(target_id).is_some() {
            return Some(target_id);
        }
    }

    let mut best: Option<(f32, u8, EntityId, TargetId)> = None;
    let mut consider = |info: TargetInfo| {
        if info.team == projectile.team {
            return;
        }
        if !projectile.hits.contains(info.elevation) {
            return;
        }
        let dist = projectile.position.distance(info.position);
        if dist > info.target_size + Projectile::IMPACT_THRESHOLD {
            return;
        }
        let key = (dist, info.team, info.id.entity_id());
        if best.map_or(true, |(d, t, i, _)| (key.0, key.1, key.2) < (d, t, i)) {
            best = Some((key.0, key.1, key.2, info.id));
        }
    };

    for &id in entities.units.keys() {
        if let Some(info) = entities.resolve_target(TargetId::Unit(id)) {
            consider(info);
        }
    }
    for &id in entities.buildings.keys() {
        if let Some(info) = entities.resolve_target(TargetId::Building(id)) {
            consider(info);
        }
    }
    for &id in entities.walls.keys() {
        if let Some(info) = entities.resolve_target(TargetId::Wall(id)) {
            consider(info);
        }
    }
    best.map(|(_, _, _, id)| id)
}

/// Apply one round of an effect's area damage.
fn apply_area_damage(entities: &mut GameEntities, fx: &FieldEffect, source: EntityId) {
    let hits = effect_hits(fx.kind);
    let mut victims: Vec<TargetId> = Vec::new();

    for (&id, unit) in &entities.units {
        if Targetable::is_active(unit)
            && hits.contains(unit.elevation)
            && (fx.friendly_fire || unit.team != fx.team)
            && fx.contains(unit.position)
        {
            victims.push(TargetId::Unit(id));
        }
    }
    for (&id, building) in &entities.buildings {
        if building.active
            && hits.contains(Elevation::Ground)
            && (fx.friendly_fire || building.team != fx.team)
            && fx.contains(building.position)
        {
            victims.push(TargetId::Building(id));
        }
    }
    for (&id, wall) in &entities.walls {
        if wall.active
            && hits.contains(Elevation::Ground)
            && (fx.friendly_fire || wall.team != fx.team)
            && fx.contains(wall.center())
        {
            victims.push(TargetId::Wall(id));
        }
    }

    for victim in victims {
        entities.apply_damage(victim, fx.damage, source);
    }
}

/// Apply periodic damage for ongoing field effects.
pub fn tick_field_effects(
    entities: &mut GameEntities,
    config: &crate::config::GameConfig,
    tick: u64,
) {
    let due: Vec<EntityId> = entities
        .field_effects
        .iter()
        .filter(|(_, fx)| fx.kind.has_periodic_damage() && tick >= fx.next_damage_tick)
        .map(|(&id, _)| id)
        .collect();

    for id in due {
        let Some(mut fx) = entities.field_effects.remove(&id) else {
            continue;
        };
        apply_area_damage(entities, &fx, fx.id);
        fx.next_damage_tick = tick + config.effect_damage_interval_ticks;
        entities.field_effects.insert(id, fx);
    }
}

/// Project a sandstorm at a point (storm-caller special ability).
pub fn spawn_sandstorm(
    entities: &mut GameEntities,
    config: &crate::config::GameConfig,
    tick: u64,
    team: u8,
    center: Vec2,
) -> EntityId {
    let id = entities.allocate_id();
    entities.field_effects.insert(
        id,
        FieldEffect {
            id,
            kind: FieldEffectKind::Sandstorm,
            center,
            radius: SANDSTORM_RADIUS,
            damage: SANDSTORM_DAMAGE,
            team,
            friendly_fire: true,
            expires_tick: tick + (SANDSTORM_LIFETIME_SECS * crate::config::TICK_RATE as f32) as u64,
            next_damage_tick: tick + config.effect_damage_interval_ticks,
        },
    );
    id
}

/// Spawn a sortie payload explosion at a point, applying blast damage.
pub fn spawn_bomb_explosion(
    entities: &mut GameEntities,
    tick: u64,
    team: u8,
    source: EntityId,
    center: Vec2,
    radius: f32,
    damage: f32,
) -> EntityId {
    let fx = FieldEffect {
        id: entities.allocate_id(),
        kind: FieldEffectKind::Explosion,
        center,
        radius,
        damage,
        team,
        friendly_fire: true,
        expires_tick: tick + (EXPLOSION_DISPLAY_SECS * crate::config::TICK_RATE as f32) as u64,
        next_damage_tick: tick,
    };
    apply_area_damage(entities, &fx, source);
    let id = fx.id;
    entities.field_effects.insert(id, fx);
    id
}
