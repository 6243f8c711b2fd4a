//! Shared actor plumbing
//!
//! Every actor owns an optional visual node and an optional physics body.
//! Position prefers the body (physics truth) over the node.

use glam::Vec3;

use crate::physics::{BodyHandle, PhysicsWorld};
use crate::platform::Ctx;
use crate::renderer::{NodeHandle, Renderer};

/// Handles and lifecycle flags common to every actor
#[derive(Debug, Clone, Default)]
pub struct ActorBase {
    pub node: Option<NodeHandle>,
    pub body: Option<BodyHandle>,
    pub alive: bool,
    remove_me: bool,
}

impl ActorBase {
    pub fn new(node: Option<NodeHandle>, body: Option<BodyHandle>) -> Self {
        Self {
            node,
            body,
            alive: true,
            remove_me: false,
        }
    }

    pub fn position(&self, physics: &dyn PhysicsWorld, renderer: &dyn Renderer) -> Vec3 {
        self.body
            .and_then(|b| physics.body_position(b))
            .or_else(|| self.node.and_then(|n| renderer.node_position(n)))
            .unwrap_or(Vec3::ZERO)
    }

    /// Remove the physics body; later calls are no-ops
    pub fn destroy_body(&mut self, physics: &mut dyn PhysicsWorld) {
        if let Some(body) = self.body.take() {
            physics.remove_body(body);
        }
    }

    /// Flag for the next cleanup pass. Cannot be undone.
    pub fn mark_for_removal(&mut self) {
        self.remove_me = true;
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.remove_me
    }

    /// Move the node to where physics put the body
    pub fn sync_node(&self, ctx: &mut Ctx) {
        if let (Some(node), Some(body)) = (self.node, self.body) {
            if let Some(pos) = ctx.physics.body_position(body) {
                ctx.renderer.set_position(node, pos);
            }
        }
    }

    /// Drop the body and the node
    pub fn release(&mut self, ctx: &mut Ctx) {
        self.destroy_body(&mut *ctx.physics);
        if let Some(node) = self.node.take() {
            ctx.renderer.remove_node(node);
        }
    }
}

/// Common actor behavior used by the director
pub trait Actor {
    fn base(&self) -> &ActorBase;
    fn base_mut(&mut self) -> &mut ActorBase;

    /// Post-physics update of visuals and owned volumes
    fn sync(&mut self, dt: f32, ctx: &mut Ctx);

    fn is_removable(&self) -> bool {
        self.base().is_marked_for_removal()
    }

    /// Free every collaborator resource the actor owns
    fn release(&mut self, ctx: &mut Ctx) {
        self.base_mut().release(ctx);
    }
}

/// Outcome of applying damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// Zero damage, or the target was already dead
    Ignored,
    Hurt,
    /// This hit took health to zero
    Killed,
}

/// Health pool clamped at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vitals {
    health: u32,
    max: u32,
}

impl Vitals {
    pub fn new(max: u32) -> Self {
        Self { health: max, max }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub fn apply(&mut self, amount: u32) -> Hit {
        if self.health == 0 || amount == 0 {
            return Hit::Ignored;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 { Hit::Killed } else { Hit::Hurt }
    }
}
