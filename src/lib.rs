//! Survive - arena shooter simulation core
//!
//! Core modules:
//! - `sim`: Actor behavior, AI state machines and the per-frame combat director
//! - `physics`: Physics collaborator contract plus the rapier-backed world
//! - `renderer`: Renderer collaborator contract plus a recording implementation
//! - `audio`: Sound collaborator contract, effect catalogue, salute rate limiting
//! - `platform`: Collaborator bundle and frame clock
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod error;
pub mod physics;
pub mod platform;
pub mod renderer;
pub mod sim;
pub mod tuning;

pub use error::TuningError;
pub use tuning::Tuning;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Largest frame delta the simulation accepts (stall protection)
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Maximum physics substeps per frame
    pub const MAX_SUBSTEPS: u32 = 10;
    /// Physics substep length
    pub const PHYSICS_STEP: f32 = 1.0 / 60.0;
    /// World gravity (units/s², Y up)
    pub const GRAVITY: f32 = -981.0;

    /// MD2 models face +X; yaw 0 faces +Z
    pub const MD2_ROTATION_OFFSET: f32 = -90.0;

    /// Distance at which attack permission is released back to chase
    pub const ATTACK_RELEASE_FACTOR: f32 = 1.5;
}

/// Unit forward vector on the ground plane for a yaw in degrees
#[inline]
pub fn yaw_to_forward(yaw_degrees: f32) -> Vec3 {
    let rad = yaw_degrees.to_radians();
    Vec3::new(rad.sin(), 0.0, rad.cos())
}

/// Right-hand vector on the ground plane for a yaw in degrees
#[inline]
pub fn yaw_to_right(yaw_degrees: f32) -> Vec3 {
    let rad = yaw_degrees.to_radians();
    Vec3::new(rad.cos(), 0.0, -rad.sin())
}

/// Yaw in degrees that faces along `dir` (Y ignored)
#[inline]
pub fn forward_to_yaw(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z).to_degrees()
}

/// Direction from `from` to `to` projected onto the ground plane and normalized
#[inline]
pub fn ground_direction(from: Vec3, to: Vec3) -> Vec3 {
    let mut dir = to - from;
    dir.y = 0.0;
    dir.normalize_or_zero()
}

/// Perpendicular of a ground-plane direction (rotated +90° about Y)
#[inline]
pub fn ground_perpendicular(dir: Vec3) -> Vec3 {
    Vec3::new(-dir.z, 0.0, dir.x)
}
