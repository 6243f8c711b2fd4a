//! Physics collaborator contract
//!
//! Bodies and triggers are addressed by handles. Handles are never reused, so
//! a stale handle simply stops resolving instead of aliasing a newer body.

pub mod world;

pub use world::RapierWorld;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Collision shape, centered on the body position. Capsules stand upright.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    /// `height` is the cylinder section; total height is `height + 2 * radius`
    Capsule { radius: f32, height: f32 },
    Box { half_extents: Vec3 },
}

/// Rigid body handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

/// Ghost/trigger volume handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerHandle(pub u32);

/// Result of a ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub hit: bool,
    pub body: Option<BodyHandle>,
    pub point: Vec3,
    pub normal: Vec3,
}

impl RayHit {
    pub fn miss() -> Self {
        Self {
            hit: false,
            body: None,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
        }
    }
}

/// What the simulation needs from a rigid-body world
pub trait PhysicsWorld {
    /// Create a body; mass 0 makes it static
    fn create_body(&mut self, mass: f32, shape: Shape, position: Vec3) -> BodyHandle;
    /// Drive the body from game logic instead of integration
    fn set_kinematic(&mut self, body: BodyHandle);
    fn remove_body(&mut self, body: BodyHandle);

    fn body_position(&self, body: BodyHandle) -> Option<Vec3>;
    fn set_body_position(&mut self, body: BodyHandle, position: Vec3);
    fn linear_velocity(&self, body: BodyHandle) -> Option<Vec3>;
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3);

    fn step_simulation(&mut self, dt: f32, max_substeps: u32);

    /// Closest body along the segment; triggers are never reported
    fn ray_test(&self, from: Vec3, to: Vec3) -> RayHit;

    /// Register a sphere trigger; its owner repositions it every frame
    fn add_trigger(&mut self, radius: f32, position: Vec3) -> TriggerHandle;
    fn set_trigger_position(&mut self, trigger: TriggerHandle, position: Vec3);
    fn remove_trigger(&mut self, trigger: TriggerHandle);
    fn is_overlapping(&self, trigger: TriggerHandle, body: BodyHandle) -> bool;

    /// Zero horizontal velocity while keeping whatever gravity has built up
    fn stop_horizontal(&mut self, body: BodyHandle) {
        if let Some(v) = self.linear_velocity(body) {
            self.set_linear_velocity(body, Vec3::new(0.0, v.y, 0.0));
        }
    }

    /// Set horizontal velocity from a ground-plane direction, Y preserved
    fn set_horizontal_velocity(&mut self, body: BodyHandle, dir: Vec3, speed: f32) {
        if let Some(v) = self.linear_velocity(body) {
            self.set_linear_velocity(body, Vec3::new(dir.x * speed, v.y, dir.z * speed));
        }
    }
}
