//! Steering and path-following shared by all movement commands.
//!
//! Commands own a [`PathPlan`] and drive the unit's physics body by
//! velocity only. Steering combines seek, arrival slow-down, and
//! separation from nearby friendly movers.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::pathfinding;
use crate::targets::Targetable;
use crate::units::Unit;

use super::CommandCtx;

/// Distance inside which arrival behavior starts braking.
const ARRIVE_SLOW_RADIUS: f32 = 60.0;
/// Radius of the separation query relative to the unit radius.
const SEPARATION_RADIUS_FACTOR: f32 = 3.0;
/// Strength of the separation push.
const SEPARATION_WEIGHT: f32 = 0.6;

/// A computed waypoint path plus the recompute throttle state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathPlan {
    waypoints: Vec<Vec2>,
    next: usize,
    goal: Vec2,
    computed_tick: Option<u64>,
}

impl PathPlan {
    /// A plan with no path computed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The goal the current path was computed for.
    #[must_use]
    pub fn goal(&self) -> Vec2 {
        self.goal
    }

    /// True if no path has been computed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// True once a compute attempt has happened (even if it failed).
    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.computed_tick.is_some()
    }

    /// Recompute the path if the throttle allows and the goal moved
    /// beyond `displacement_threshold` (or no path exists yet).
    ///
    /// Airborne movers get a straight-line "path" without consulting
    /// the grid.
    pub fn ensure(
        &mut self,
        unit: &Unit,
        ctx: &CommandCtx<'_>,
        goal: Vec2,
        displacement_threshold: f32,
    ) {
        let need_initial = self.computed_tick.is_none();
        let goal_moved = self.goal.distance(goal) > displacement_threshold;
        if !need_initial && !goal_moved {
            return;
        }
        if let Some(last) = self.computed_tick {
            if ctx.tick.saturating_sub(last) < ctx.config.repath_interval_ticks {
                return;
            }
        }

        self.goal = goal;
        self.computed_tick = Some(ctx.tick);
        self.next = 0;
        if unit.is_airborne() {
            self.waypoints = vec![goal];
        } else {
            self.waypoints = pathfinding::find_path(ctx.nav, unit.position, goal, unit.radius);
        }
    }

    /// Drop the computed path, forcing a recompute on the next ensure.
    pub fn invalidate(&mut self) {
        self.waypoints.clear();
        self.next = 0;
        self.computed_tick = None;
    }

    /// Current waypoint to steer at, advancing past reached ones.
    ///
    /// Intermediate waypoints use the configured waypoint threshold;
    /// the final waypoint is left to the caller's arrival check.
    fn current_waypoint(&mut self, position: Vec2, waypoint_threshold: f32) -> Option<Vec2> {
        while self.next + 1 < self.waypoints.len() {
            let wp = self.waypoints[self.next];
            if position.distance(wp) <= waypoint_threshold {
                self.next += 1;
            } else {
                break;
            }
        }
        self.waypoints.get(self.next).copied()
    }

    /// Steer the unit along the path. Returns true once the unit is
    /// within `arrival_threshold` of the final waypoint.
    pub fn follow(
        &mut self,
        unit: &mut Unit,
        ctx: &mut CommandCtx<'_>,
        arrival_threshold: f32,
    ) -> bool {
        let Some(waypoint) = self.current_waypoint(unit.position, ctx.config.waypoint_threshold)
        else {
            stop(unit, ctx);
            return true;
        };

        let is_final = self.next + 1 == self.waypoints.len();
        if is_final && unit.position.distance(waypoint) <= arrival_threshold {
            stop(unit, ctx);
            return true;
        }

        seek(unit, ctx, waypoint, is_final);
        false
    }
}

/// Steer directly toward a point with arrival braking on demand.
pub fn seek(unit: &mut Unit, ctx: &mut CommandCtx<'_>, target: Vec2, arrive: bool) {
    let to_target = target - unit.position;
    let distance = to_target.length();
    if distance <= f32::EPSILON {
        stop(unit, ctx);
        return;
    }

    let speed = if arrive && distance < ARRIVE_SLOW_RADIUS {
        unit.speed * (distance / ARRIVE_SLOW_RADIUS).max(0.2)
    } else {
        unit.speed
    };

    let desired = to_target.normalize_or_zero() * speed;
    let velocity = (desired + separation(unit, ctx) * unit.speed).clamp_length(unit.speed);

    if let Some(body) = unit.body {
        ctx.physics.set_linear_velocity(body, velocity);
        let heading = velocity.angle();
        ctx.physics.set_rotation(body, heading);
        unit.rotation = heading;
    }
}

/// Zero the unit's velocity.
pub fn stop(unit: &Unit, ctx: &mut CommandCtx<'_>) {
    if let Some(body) = unit.body {
        ctx.physics.set_linear_velocity(body, Vec2::ZERO);
    }
}

/// Turn in place to face a point.
pub fn face(unit: &mut Unit, ctx: &mut CommandCtx<'_>, point: Vec2) {
    let heading = (point - unit.position).angle();
    unit.rotation = heading;
    if let Some(body) = unit.body {
        ctx.physics.set_rotation(body, heading);
    }
}

/// Separation push away from nearby movers at the same elevation.
fn separation(unit: &Unit, ctx: &CommandCtx<'_>) -> Vec2 {
    let radius = unit.radius * SEPARATION_RADIUS_FACTOR;
    let mut push = Vec2::ZERO;
    for id in ctx.physics.query_circle(unit.position, radius) {
        if id == unit.id {
            continue;
        }
        let Some(other) = ctx.entities.units.get(&id) else {
            continue;
        };
        if other.elevation != unit.elevation || !Targetable::is_active(other) {
            continue;
        }
        let away = unit.position - other.position;
        let distance = away.length();
        if distance <= f32::EPSILON || distance >= radius {
            continue;
        }
        push += away.normalize_or_zero() * (1.0 - distance / radius);
    }
    push * SEPARATION_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::test_ctx;
    use crate::targets::Elevation;
    use crate::units::UnitKind;

    #[test]
    fn test_path_plan_throttles_recompute() {
        let mut harness = test_ctx(1000.0);
        let unit = harness.spawn_unit(UnitKind::Trooper, 1, Vec2::new(100.0, 100.0));
        let mut unit = harness.entities.detach_unit(unit).unwrap();
        let mut plan = PathPlan::new();

        let mut ctx = harness.ctx(0);
        plan.ensure(&unit, &ctx, Vec2::new(800.0, 100.0), 10.0);
        assert!(!plan.is_empty());
        let first_goal = plan.goal();

        // Goal moved beyond threshold, but the throttle blocks recompute.
        ctx.tick = 5;
        plan.ensure(&unit, &ctx, Vec2::new(800.0, 300.0), 10.0);
        assert_eq!(plan.goal(), first_goal);

        // After the throttle window the recompute happens.
        ctx.tick = 40;
        plan.ensure(&unit, &ctx, Vec2::new(800.0, 300.0), 10.0);
        assert_eq!(plan.goal(), Vec2::new(800.0, 300.0));

        unit.active = false;
        harness.entities.put_back_unit(unit);
    }

    #[test]
    fn test_airborne_path_is_straight() {
        let mut harness = test_ctx(1000.0);
        let id = harness.spawn_unit(UnitKind::Hornet, 1, Vec2::new(100.0, 100.0));
        let unit = harness.entities.detach_unit(id).unwrap();
        assert_eq!(unit.elevation, Elevation::Low);

        let mut plan = PathPlan::new();
        let ctx = harness.ctx(0);
        plan.ensure(&unit, &ctx, Vec2::new(900.0, 900.0), 10.0);
        assert_eq!(plan.goal(), Vec2::new(900.0, 900.0));
        harness.entities.put_back_unit(unit);
    }

    #[test]
    fn test_follow_reaches_goal() {
        let mut harness = test_ctx(1000.0);
        let id = harness.spawn_unit(UnitKind::Trooper, 1, Vec2::new(100.0, 100.0));
        let goal = Vec2::new(300.0, 100.0);

        let mut plan = PathPlan::new();
        let mut arrived = false;
        for tick in 0..1200 {
            let mut unit = harness.entities.detach_unit(id).unwrap();
            let mut ctx = harness.ctx(tick);
            plan.ensure(&unit, &ctx, goal, 10.0);
            arrived = plan.follow(&mut unit, &mut ctx, 10.0);
            harness.entities.put_back_unit(unit);
            harness.step_physics_and_sync();
            if arrived {
                break;
            }
        }
        assert!(arrived, "unit never arrived");
        let unit = harness.entities.units.get(&id).unwrap();
        assert!(unit.position.distance(goal) <= 15.0, "{:?}", unit.position);
    }
}
