//! Rapier-backed physics world
//!
//! Characters are upright capsules with rotations locked. The player is a
//! kinematic body moved by game logic; triggers are parentless sensor
//! colliders that rays never see. Stepping is fixed-size substeps, and bodies
//! are walked in handle order, so a run replays exactly in-process.

use std::collections::BTreeMap;

use glam::Vec3;
use rapier3d::parry::query::intersection_test;
use rapier3d::prelude as rapier;

use super::{BodyHandle, PhysicsWorld, RayHit, Shape, TriggerHandle};
use crate::consts::{GRAVITY, PHYSICS_STEP};

/// Rough size of a character; scales rapier's internal tolerances
const LENGTH_UNIT: f32 = 30.0;

/// Rays that start on or inside a body report it at ~0; those are skipped
const MIN_RAY_TOI: f32 = 1e-6;

fn to_vector(v: Vec3) -> rapier::Vector<f32> {
    rapier::Vector::new(v.x, v.y, v.z)
}

fn to_point(v: Vec3) -> rapier::Point<f32> {
    rapier::Point::new(v.x, v.y, v.z)
}

fn from_vector(v: &rapier::Vector<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn shared_shape(shape: Shape) -> rapier::SharedShape {
    match shape {
        Shape::Sphere { radius } => rapier::SharedShape::ball(radius),
        Shape::Capsule { radius, height } => rapier::SharedShape::capsule_y(height * 0.5, radius),
        Shape::Box { half_extents } => {
            rapier::SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BodyEntry {
    body: rapier::RigidBodyHandle,
    collider: rapier::ColliderHandle,
}

pub struct RapierWorld {
    pipeline: rapier::PhysicsPipeline,
    gravity: rapier::Vector<f32>,
    integration_params: rapier::IntegrationParameters,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    query_pipeline: rapier::QueryPipeline,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,

    body_handles: BTreeMap<u32, BodyEntry>,
    trigger_handles: BTreeMap<u32, rapier::ColliderHandle>,
    next_id: u32,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, GRAVITY, 0.0))
    }
}

impl RapierWorld {
    pub fn new(gravity: Vec3) -> Self {
        let mut integration_params = rapier::IntegrationParameters::default();
        integration_params.dt = PHYSICS_STEP;
        integration_params.length_unit = LENGTH_UNIT;

        Self {
            pipeline: rapier::PhysicsPipeline::new(),
            gravity: to_vector(gravity),
            integration_params,
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            query_pipeline: rapier::QueryPipeline::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            body_handles: BTreeMap::new(),
            trigger_handles: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn next_handle(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn body_count(&self) -> usize {
        self.body_handles.len()
    }

    pub fn trigger_count(&self) -> usize {
        self.trigger_handles.len()
    }

    pub fn trigger_position(&self, trigger: TriggerHandle) -> Option<Vec3> {
        let handle = self.trigger_handles.get(&trigger.0)?;
        let collider = self.colliders.get(*handle)?;
        Some(from_vector(collider.translation()))
    }

    fn rigid_body(&self, body: BodyHandle) -> Option<&rapier::RigidBody> {
        let entry = self.body_handles.get(&body.0)?;
        self.bodies.get(entry.body)
    }

    fn rigid_body_mut(&mut self, body: BodyHandle) -> Option<&mut rapier::RigidBody> {
        let entry = self.body_handles.get(&body.0)?;
        self.bodies.get_mut(entry.body)
    }

    /// Push moved bodies into their colliders so queries see the new poses
    fn sync_queries(&mut self) {
        self.bodies.propagate_modified_body_positions_to_colliders(&mut self.colliders);
        self.query_pipeline.update(&self.colliders);
    }
}

impl PhysicsWorld for RapierWorld {
    fn create_body(&mut self, mass: f32, shape: Shape, position: Vec3) -> BodyHandle {
        let id = self.next_handle();
        let builder = if mass > 0.0 {
            rapier::RigidBodyBuilder::dynamic().lock_rotations().can_sleep(false)
        } else {
            rapier::RigidBodyBuilder::fixed()
        };
        let body = self
            .bodies
            .insert(builder.translation(to_vector(position)).user_data(id as u128));

        let mut collider = rapier::ColliderBuilder::new(shared_shape(shape))
            .friction(0.0)
            .friction_combine_rule(rapier::CoefficientCombineRule::Min);
        if mass > 0.0 {
            collider = collider.mass(mass);
        }
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);

        self.body_handles.insert(id, BodyEntry { body, collider });
        self.query_pipeline.update(&self.colliders);
        BodyHandle(id)
    }

    fn set_kinematic(&mut self, body: BodyHandle) {
        if let Some(b) = self.rigid_body_mut(body) {
            b.set_body_type(rapier::RigidBodyType::KinematicPositionBased, true);
            b.set_linvel(rapier::Vector::zeros(), true);
        }
    }

    fn remove_body(&mut self, body: BodyHandle) {
        let Some(entry) = self.body_handles.remove(&body.0) else {
            return;
        };
        self.bodies.remove(
            entry.body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.query_pipeline.update(&self.colliders);
    }

    fn body_position(&self, body: BodyHandle) -> Option<Vec3> {
        self.rigid_body(body).map(|b| from_vector(b.translation()))
    }

    fn set_body_position(&mut self, body: BodyHandle, position: Vec3) {
        let Some(b) = self.rigid_body_mut(body) else {
            return;
        };
        // Also sets the next kinematic pose, so the step does not pull it back
        b.set_translation(to_vector(position), true);
        self.sync_queries();
    }

    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.rigid_body(body).map(|b| from_vector(b.linvel()))
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.rigid_body_mut(body) {
            if b.is_dynamic() {
                b.set_linvel(to_vector(velocity), true);
            }
        }
    }

    fn step_simulation(&mut self, dt: f32, max_substeps: u32) {
        if dt <= 0.0 {
            return;
        }
        let steps = ((dt / PHYSICS_STEP).ceil() as u32).clamp(1, max_substeps.max(1));
        self.integration_params.dt = dt / steps as f32;
        for _ in 0..steps {
            self.pipeline.step(
                &self.gravity,
                &self.integration_params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                None,
                &(),
                &(),
            );
        }
        self.query_pipeline.update(&self.colliders);
    }

    fn ray_test(&self, from: Vec3, to: Vec3) -> RayHit {
        let delta = to - from;
        if delta.length_squared() <= f32::EPSILON {
            return RayHit::miss();
        }
        let ray = rapier::Ray::new(to_point(from), to_vector(delta));
        let filter = rapier::QueryFilter::new().exclude_sensors();

        let mut closest: Option<(rapier::ColliderHandle, f32, Vec3)> = None;
        self.query_pipeline.intersections_with_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            1.0,
            true,
            filter,
            |handle, inter| {
                let toi = inter.time_of_impact;
                if toi > MIN_RAY_TOI && closest.is_none_or(|(_, best, _)| toi < best) {
                    closest = Some((handle, toi, from_vector(&inter.normal)));
                }
                true
            },
        );

        let Some((handle, toi, normal)) = closest else {
            return RayHit::miss();
        };
        let body = self
            .colliders
            .get(handle)
            .and_then(|c| c.parent())
            .and_then(|parent| self.bodies.get(parent))
            .map(|b| BodyHandle(b.user_data as u32));
        RayHit {
            hit: true,
            body,
            point: from + delta * toi,
            normal,
        }
    }

    fn add_trigger(&mut self, radius: f32, position: Vec3) -> TriggerHandle {
        let id = self.next_handle();
        let collider = rapier::ColliderBuilder::ball(radius)
            .sensor(true)
            .translation(to_vector(position))
            .user_data(id as u128);
        let handle = self.colliders.insert(collider);
        self.trigger_handles.insert(id, handle);
        self.query_pipeline.update(&self.colliders);
        TriggerHandle(id)
    }

    fn set_trigger_position(&mut self, trigger: TriggerHandle, position: Vec3) {
        let Some(handle) = self.trigger_handles.get(&trigger.0) else {
            return;
        };
        if let Some(collider) = self.colliders.get_mut(*handle) {
            collider.set_translation(to_vector(position));
            self.query_pipeline.update(&self.colliders);
        }
    }

    fn remove_trigger(&mut self, trigger: TriggerHandle) {
        if let Some(handle) = self.trigger_handles.remove(&trigger.0) {
            self.colliders
                .remove(handle, &mut self.islands, &mut self.bodies, true);
            self.query_pipeline.update(&self.colliders);
        }
    }

    /// Exact shape test on current poses; triggers move after the step, so
    /// the narrow phase's cached pairs would lag a frame
    fn is_overlapping(&self, trigger: TriggerHandle, body: BodyHandle) -> bool {
        let (Some(t), Some(b)) = (self.trigger_handles.get(&trigger.0), self.body_handles.get(&body.0)) else {
            return false;
        };
        let (Some(sensor), Some(target)) = (self.colliders.get(*t), self.colliders.get(b.collider)) else {
            return false;
        };
        intersection_test(sensor.position(), sensor.shape(), target.position(), target.shape()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 16.0;

    const CAPSULE: Shape = Shape::Capsule {
        radius: 15.0,
        height: 30.0,
    };

    fn ground(world: &mut RapierWorld) -> BodyHandle {
        world.create_body(
            0.0,
            Shape::Box {
                half_extents: Vec3::new(2000.0, 1.0, 2000.0),
            },
            Vec3::new(0.0, -26.0, 0.0),
        )
    }

    fn run(world: &mut RapierWorld, frames: usize) {
        for _ in 0..frames {
            world.step_simulation(DT, 10);
        }
    }

    #[test]
    fn test_capsule_settles_on_ground() {
        let mut world = RapierWorld::default();
        ground(&mut world);
        let enemy = world.create_body(10.0, CAPSULE, Vec3::new(0.0, 60.0, 0.0));
        run(&mut world, 48);
        // Bottom of the capsule (30 below center) rests on the top face at -25
        let y = world.body_position(enemy).unwrap().y;
        assert!((y - 5.0).abs() < 1.5, "y = {y}");
        assert!(world.linear_velocity(enemy).unwrap().y.abs() < 5.0);
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut world = RapierWorld::default();
        let pillar = world.create_body(0.0, CAPSULE, Vec3::new(5.0, 0.0, 5.0));
        world.set_linear_velocity(pillar, Vec3::X * 100.0);
        run(&mut world, 8);
        assert_eq!(world.body_position(pillar), Some(Vec3::new(5.0, 0.0, 5.0)));
    }

    #[test]
    fn test_kinematic_body_follows_game_logic() {
        let mut world = RapierWorld::default();
        let player = world.create_body(10.0, CAPSULE, Vec3::ZERO);
        world.set_kinematic(player);
        world.set_linear_velocity(player, Vec3::X * 100.0);
        run(&mut world, 4);
        assert!(world.body_position(player).unwrap().distance(Vec3::ZERO) < 1e-3);

        world.set_body_position(player, Vec3::new(40.0, 0.0, -10.0));
        assert_eq!(world.body_position(player), Some(Vec3::new(40.0, 0.0, -10.0)));
        run(&mut world, 2);
        assert!(world.body_position(player).unwrap().distance(Vec3::new(40.0, 0.0, -10.0)) < 1e-3);
    }

    #[test]
    fn test_kinematic_body_shoves_characters() {
        let mut world = RapierWorld::new(Vec3::ZERO);
        let player = world.create_body(10.0, CAPSULE, Vec3::ZERO);
        world.set_kinematic(player);
        let enemy = world.create_body(10.0, CAPSULE, Vec3::new(20.0, 0.0, 0.0));
        run(&mut world, 16);
        assert!(world.body_position(player).unwrap().distance(Vec3::ZERO) < 1e-3);
        let x = world.body_position(enemy).unwrap().x;
        assert!(x > 28.0, "x = {x}");
    }

    #[test]
    fn test_velocity_moves_dynamic_body() {
        let mut world = RapierWorld::new(Vec3::ZERO);
        let enemy = world.create_body(10.0, CAPSULE, Vec3::ZERO);
        world.set_horizontal_velocity(enemy, Vec3::Z, 80.0);
        assert_eq!(world.linear_velocity(enemy), Some(Vec3::new(0.0, 0.0, 80.0)));
        run(&mut world, 16);
        let z = world.body_position(enemy).unwrap().z;
        assert!((z - 80.0).abs() < 1.0, "z = {z}");

        world.stop_horizontal(enemy);
        assert_eq!(world.linear_velocity(enemy), Some(Vec3::ZERO));
    }

    #[test]
    fn test_ray_reports_closest_body() {
        let mut world = RapierWorld::new(Vec3::ZERO);
        let far = world.create_body(10.0, CAPSULE, Vec3::new(0.0, 0.0, 300.0));
        let near = world.create_body(10.0, CAPSULE, Vec3::new(0.0, 0.0, 100.0));

        let hit = world.ray_test(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 10.0, 500.0));
        assert!(hit.hit);
        assert_eq!(hit.body, Some(near));
        assert!((hit.point.z - 85.0).abs() < 1e-2, "point = {:?}", hit.point);
        assert!(hit.normal.z < -0.99);

        world.remove_body(near);
        let hit = world.ray_test(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 10.0, 500.0));
        assert_eq!(hit.body, Some(far));
    }

    #[test]
    fn test_ray_passes_over_capsule_cap() {
        let mut world = RapierWorld::new(Vec3::ZERO);
        world.create_body(10.0, CAPSULE, Vec3::ZERO);
        // Inside the bounding cylinder but above the rounded cap, which
        // tops out near y = 20.4 at x = 14
        let hit = world.ray_test(Vec3::new(14.0, 29.0, -500.0), Vec3::new(14.0, 29.0, 500.0));
        assert!(!hit.hit);

        let hit = world.ray_test(Vec3::new(0.0, 29.0, -500.0), Vec3::new(0.0, 29.0, 500.0));
        assert!(hit.hit);
    }

    #[test]
    fn test_ray_skips_body_it_starts_in() {
        let mut world = RapierWorld::new(Vec3::ZERO);
        let player = world.create_body(10.0, CAPSULE, Vec3::ZERO);
        world.set_kinematic(player);
        let enemy = world.create_body(10.0, CAPSULE, Vec3::new(0.0, 0.0, 200.0));

        let hit = world.ray_test(Vec3::new(0.0, 20.0, 0.0), Vec3::new(0.0, 20.0, 600.0));
        assert_eq!(hit.body, Some(enemy));
    }

    #[test]
    fn test_ray_ignores_triggers_and_short_segments() {
        let mut world = RapierWorld::new(Vec3::ZERO);
        world.add_trigger(40.0, Vec3::new(0.0, 0.0, 100.0));
        assert!(!world.ray_test(Vec3::ZERO, Vec3::Z * 500.0).hit);

        world.create_body(0.0, CAPSULE, Vec3::new(0.0, 0.0, 300.0));
        assert!(!world.ray_test(Vec3::ZERO, Vec3::Z * 200.0).hit);
        assert!(!world.ray_test(Vec3::ZERO, Vec3::ZERO).hit);
    }

    #[test]
    fn test_ray_hits_static_ground() {
        let mut world = RapierWorld::default();
        let floor = ground(&mut world);
        let hit = world.ray_test(Vec3::new(10.0, 100.0, 10.0), Vec3::new(10.0, -100.0, 10.0));
        assert_eq!(hit.body, Some(floor));
        assert!((hit.point.y + 25.0).abs() < 1e-2);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn test_trigger_overlap_follows_repositioning() {
        let mut world = RapierWorld::default();
        ground(&mut world);
        let player = world.create_body(10.0, CAPSULE, Vec3::ZERO);
        world.set_kinematic(player);
        let trigger = world.add_trigger(20.0, Vec3::new(0.0, 30.0, 60.0));
        assert!(!world.is_overlapping(trigger, player));

        world.set_trigger_position(trigger, Vec3::new(0.0, 30.0, 30.0));
        assert_eq!(world.trigger_position(trigger), Some(Vec3::new(0.0, 30.0, 30.0)));
        assert!(world.is_overlapping(trigger, player));

        world.set_body_position(player, Vec3::new(-100.0, 0.0, 0.0));
        assert!(!world.is_overlapping(trigger, player));
    }

    #[test]
    fn test_removed_handles_stop_resolving() {
        let mut world = RapierWorld::default();
        let body = world.create_body(10.0, CAPSULE, Vec3::ZERO);
        let trigger = world.add_trigger(10.0, Vec3::ZERO);
        assert!(world.is_overlapping(trigger, body));

        world.remove_body(body);
        world.remove_trigger(trigger);
        assert_eq!(world.body_position(body), None);
        assert_eq!(world.linear_velocity(body), None);
        assert_eq!(world.trigger_position(trigger), None);
        assert!(!world.is_overlapping(trigger, body));
        assert_eq!((world.body_count(), world.trigger_count()), (0, 0));

        // Stale handles are inert
        world.set_body_position(body, Vec3::X);
        world.set_trigger_position(trigger, Vec3::X);
        world.remove_body(body);
        run(&mut world, 1);
    }

    proptest! {
        #[test]
        fn prop_fresh_handles_never_alias(n in 1usize..20, drop in 0usize..20) {
            let mut world = RapierWorld::new(Vec3::ZERO);
            let mut handles: Vec<BodyHandle> = (0..n)
                .map(|i| world.create_body(0.0, CAPSULE, Vec3::X * (i as f32 * 100.0)))
                .collect();
            let removed = handles.remove(drop % n);
            world.remove_body(removed);

            let fresh = world.create_body(0.0, CAPSULE, Vec3::ZERO);
            prop_assert_ne!(fresh, removed);
            prop_assert!(!handles.contains(&fresh));
            prop_assert_eq!(world.body_position(removed), None);
            prop_assert_eq!(world.body_count(), n);
        }
    }
}
