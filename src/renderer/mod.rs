//! Renderer collaborator contract
//!
//! The simulation only creates, moves and animates scene nodes; meshes and
//! textures are opaque [`Model`] identifiers resolved by the renderer.

pub mod recording;

pub use recording::{NodeState, RecordingRenderer};

use glam::Vec3;

/// Scene node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u32);

/// Opaque visual resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Player,
    /// Weapon attached to the player node
    PlayerWeapon,
    Enemy,
    FastEnemy,
    FogEnemy,
    Grenade,
    AmmoCrate,
    SpeedBoost,
    DamageBoost,
    GodMode,
    Pillar,
    Ground,
}

/// Keyframed animation sets shared by every character model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pose {
    Stand,
    Run,
    Attack,
    PainA,
    PainB,
    /// Dry-fire gesture
    Wave,
    Salute,
    Fallback,
    DeathFallback,
}

/// Global fog setting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParams {
    pub color: [u8; 4],
    pub start: f32,
    pub end: f32,
    pub density: f32,
    pub linear: bool,
    pub enabled: bool,
}

/// What the simulation needs from a scene graph
pub trait Renderer {
    fn create_node(&mut self, model: Model, parent: Option<NodeHandle>, position: Vec3) -> NodeHandle;
    fn remove_node(&mut self, node: NodeHandle);

    fn node_position(&self, node: NodeHandle) -> Option<Vec3>;
    fn set_position(&mut self, node: NodeHandle, position: Vec3);
    /// Euler rotation in degrees
    fn set_rotation(&mut self, node: NodeHandle, rotation: Vec3);
    fn set_scale(&mut self, node: NodeHandle, scale: Vec3);
    fn set_pose(&mut self, node: NodeHandle, pose: Pose, looped: bool);
    fn set_visible(&mut self, node: NodeHandle, visible: bool);

    fn set_fog(&mut self, fog: FogParams);
    fn draw_debug_line(&mut self, from: Vec3, to: Vec3, color: [u8; 4]);
}
