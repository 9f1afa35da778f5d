//! Rigid-body world wrapper.
//!
//! Thin façade over rapier2d exposing exactly what the simulation
//! needs: add/remove bodies, write velocities, step, and overlap
//! queries. Body operations never panic mid-tick; operations on a
//! missing body are no-ops.
//!
//! Collision layers: ground movers collide with statics and each
//! other; airborne movers only with other airborne movers at the same
//! layer, so they overfly walls and buildings freely.

use rapier2d::prelude::*;

use crate::config::TICK_DT;
use crate::math::Vec2;
use crate::targets::{Elevation, EntityId};

/// Handle to a rigid body owned by the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyHandle(RigidBodyHandle);

const STATIC_GROUP: Group = Group::GROUP_1;
const GROUND_GROUP: Group = Group::GROUP_2;
const LOW_AIR_GROUP: Group = Group::GROUP_3;
const HIGH_AIR_GROUP: Group = Group::GROUP_4;

fn groups_for(elevation: Elevation) -> InteractionGroups {
    match elevation {
        Elevation::Ground => InteractionGroups::new(GROUND_GROUP, STATIC_GROUP | GROUND_GROUP),
        Elevation::Low => InteractionGroups::new(LOW_AIR_GROUP, LOW_AIR_GROUP),
        Elevation::High => InteractionGroups::new(HIGH_AIR_GROUP, HIGH_AIR_GROUP),
    }
}

/// The per-game physics world.
pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Linear damping applied to every mobile body.
    const UNIT_DAMPING: f32 = 4.0;

    /// Create an empty world with no gravity (top-down view).
    #[must_use]
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = TICK_DT;
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Add a dynamic circle body for a mobile unit.
    pub fn add_unit_body(
        &mut self,
        entity: EntityId,
        position: Vec2,
        radius: f32,
        elevation: Elevation,
    ) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y])
            .linear_damping(Self::UNIT_DAMPING)
            .lock_rotations()
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(groups_for(elevation))
            .user_data(u128::from(entity))
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        BodyHandle(handle)
    }

    /// Add a fixed square body (buildings).
    pub fn add_fixed_square(
        &mut self,
        entity: EntityId,
        position: Vec2,
        half_extent: f32,
    ) -> BodyHandle {
        let collider = ColliderBuilder::cuboid(half_extent, half_extent);
        self.add_fixed(entity, position, collider)
    }

    /// Add a fixed circle body (round obstacles).
    pub fn add_fixed_circle(
        &mut self,
        entity: EntityId,
        position: Vec2,
        radius: f32,
    ) -> BodyHandle {
        let collider = ColliderBuilder::ball(radius);
        self.add_fixed(entity, position, collider)
    }

    /// Add a fixed convex-polygon body. Falls back to a bounding circle
    /// when the vertices do not form a convex hull.
    pub fn add_fixed_polygon(
        &mut self,
        entity: EntityId,
        position: Vec2,
        vertices: &[Vec2],
        fallback_radius: f32,
    ) -> BodyHandle {
        let points: Vec<Point<Real>> = vertices.iter().map(|v| point![v.x, v.y]).collect();
        let collider = ColliderBuilder::convex_hull(&points)
            .unwrap_or_else(|| ColliderBuilder::ball(fallback_radius.max(1.0)));
        self.add_fixed(entity, position, collider)
    }

    /// Add a fixed segment body (wall segments). The segment is given in
    /// world space; the body origin sits at the midpoint.
    pub fn add_fixed_segment(&mut self, entity: EntityId, start: Vec2, end: Vec2) -> BodyHandle {
        let center = (start + end) * 0.5;
        let a = start - center;
        let b = end - center;
        let collider = ColliderBuilder::segment(point![a.x, a.y], point![b.x, b.y]);
        self.add_fixed(entity, center, collider)
    }

    fn add_fixed(
        &mut self,
        entity: EntityId,
        position: Vec2,
        collider: ColliderBuilder,
    ) -> BodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(vector![position.x, position.y])
            .build();
        let handle = self.bodies.insert(body);
        let collider = collider
            .collision_groups(InteractionGroups::new(STATIC_GROUP, GROUND_GROUP))
            .user_data(u128::from(entity))
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        BodyHandle(handle)
    }

    /// Remove a body and its colliders. Missing bodies are a no-op.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        if self.bodies.get(handle.0).is_some() {
            self.bodies.remove(
                handle.0,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
            self.query_pipeline.update(&self.colliders);
        }
    }

    /// Advance the solver by one fixed tick.
    pub fn step(&mut self) {
        self.pipeline.step(
            &vector![0.0, 0.0],
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Set a body's linear velocity. No-op for missing bodies.
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle.0) {
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    /// Read a body's linear velocity. Zero for missing bodies.
    #[must_use]
    pub fn linear_velocity(&self, handle: BodyHandle) -> Vec2 {
        self.bodies
            .get(handle.0)
            .map_or(Vec2::ZERO, |body| Vec2::new(body.linvel().x, body.linvel().y))
    }

    /// Read a body's position. `None` for missing bodies.
    #[must_use]
    pub fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies
            .get(handle.0)
            .map(|body| Vec2::new(body.translation().x, body.translation().y))
    }

    /// Teleport a body. No-op for missing bodies.
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle.0) {
            body.set_translation(vector![position.x, position.y], true);
        }
    }

    /// Set a body's facing angle in radians. No-op for missing bodies.
    pub fn set_rotation(&mut self, handle: BodyHandle, radians: f32) {
        if let Some(body) = self.bodies.get_mut(handle.0) {
            body.set_rotation(Rotation::new(radians), true);
        }
    }

    /// Read a body's facing angle. Zero for missing bodies.
    #[must_use]
    pub fn rotation(&self, handle: BodyHandle) -> f32 {
        self.bodies.get(handle.0).map_or(0.0, |b| b.rotation().angle())
    }

    /// Entity ids of all bodies overlapping the given circle.
    #[must_use]
    pub fn query_circle(&self, center: Vec2, radius: f32) -> Vec<EntityId> {
        let mut hits = Vec::new();
        let shape = Ball::new(radius);
        let shape_pos = Isometry::translation(center.x, center.y);
        self.query_pipeline.intersections_with_shape(
            &self.bodies,
            &self.colliders,
            &shape_pos,
            &shape,
            QueryFilter::default(),
            |collider| {
                if let Some(c) = self.colliders.get(collider) {
                    hits.push(c.user_data as EntityId);
                }
                true
            },
        );
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    /// Number of rigid bodies currently in the world.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_body_velocity_integration() {
        let mut world = PhysicsWorld::new();
        let handle = world.add_unit_body(1, Vec2::ZERO, 8.0, Elevation::Ground);

        for _ in 0..10 {
            // Re-assert velocity each tick; damping would bleed it off.
            world.set_linear_velocity(handle, Vec2::new(60.0, 0.0));
            world.step();
        }

        let pos = world.position(handle).unwrap();
        assert!(pos.x > 5.0, "body should have moved, got {pos:?}");
        assert!(pos.y.abs() < 1e-3);
    }

    #[test]
    fn test_missing_body_ops_are_noops() {
        let mut world = PhysicsWorld::new();
        let handle = world.add_unit_body(1, Vec2::ZERO, 8.0, Elevation::Ground);
        world.remove_body(handle);

        // None of these may panic.
        world.remove_body(handle);
        world.set_linear_velocity(handle, Vec2::new(1.0, 1.0));
        world.set_position(handle, Vec2::new(5.0, 5.0));
        assert_eq!(world.linear_velocity(handle), Vec2::ZERO);
        assert_eq!(world.position(handle), None);
        assert_eq!(world.rotation(handle), 0.0);
    }

    #[test]
    fn test_query_circle_finds_overlaps() {
        let mut world = PhysicsWorld::new();
        world.add_unit_body(1, Vec2::new(0.0, 0.0), 8.0, Elevation::Ground);
        world.add_unit_body(2, Vec2::new(30.0, 0.0), 8.0, Elevation::Ground);
        world.add_unit_body(3, Vec2::new(500.0, 0.0), 8.0, Elevation::Ground);

        let hits = world.query_circle(Vec2::ZERO, 50.0);
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn test_air_flies_over_statics() {
        let mut world = PhysicsWorld::new();
        world.add_fixed_square(10, Vec2::new(50.0, 0.0), 40.0);
        let aircraft = world.add_unit_body(1, Vec2::ZERO, 10.0, Elevation::Low);

        for _ in 0..120 {
            world.set_linear_velocity(aircraft, Vec2::new(120.0, 0.0));
            world.step();
        }

        // A ground unit would be stopped by the block at x≈50.
        let pos = world.position(aircraft).unwrap();
        assert!(pos.x > 120.0, "aircraft blocked at {pos:?}");
    }
}
