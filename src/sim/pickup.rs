//! Trigger-volume items
//!
//! Ammo crates sit at fixed spots and respawn after being taken. Powerups are
//! spawned by the director, and vanish when collected or when their lifetime
//! runs out.

use glam::Vec3;

use crate::physics::TriggerHandle;
use crate::platform::Ctx;
use crate::renderer::Model;
use crate::tuning::{PickupTuning, PowerupTuning};

use super::actor::{Actor, ActorBase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerupKind {
    SpeedBoost,
    DamageBoost,
    GodMode,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 3] = [
        PowerupKind::SpeedBoost,
        PowerupKind::DamageBoost,
        PowerupKind::GodMode,
    ];

    pub fn model(&self) -> Model {
        match self {
            PowerupKind::SpeedBoost => Model::SpeedBoost,
            PowerupKind::DamageBoost => Model::DamageBoost,
            PowerupKind::GodMode => Model::GodMode,
        }
    }

    /// How long the effect lasts once collected
    pub fn duration(&self, cfg: &PowerupTuning) -> f32 {
        match self {
            PowerupKind::SpeedBoost => cfg.speed_boost_duration,
            PowerupKind::DamageBoost => cfg.damage_boost_duration,
            PowerupKind::GodMode => cfg.god_mode_duration,
        }
    }
}

/// Ammo crate
#[derive(Debug)]
pub struct Pickup {
    base: ActorBase,
    trigger: Option<TriggerHandle>,
    spawn_pos: Vec3,
    amount: u32,
    respawn_time: f32,
    rotate_speed: f32,
    spin: f32,
    collected: bool,
    respawn_timer: f32,
}

impl Pickup {
    pub fn spawn(position: Vec3, cfg: &PickupTuning, ctx: &mut Ctx) -> Self {
        let visual = position + Vec3::new(0.0, cfg.hover_height, 0.0);
        let node = ctx.renderer.create_node(Model::AmmoCrate, None, visual);
        let trigger = ctx.physics.add_trigger(cfg.trigger_radius, position);

        Self {
            base: ActorBase::new(Some(node), None),
            trigger: Some(trigger),
            spawn_pos: position,
            amount: cfg.ammo_amount,
            respawn_time: cfg.respawn_time,
            rotate_speed: cfg.rotate_speed,
            spin: 0.0,
            collected: false,
            respawn_timer: 0.0,
        }
    }

    pub fn trigger(&self) -> Option<TriggerHandle> {
        self.trigger
    }

    /// Ammo granted on collection
    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    /// Count down the respawn. Returns true on the frame it becomes available again.
    pub fn update(&mut self, dt: f32, ctx: &mut Ctx) -> bool {
        if !self.collected {
            return false;
        }
        self.respawn_timer -= dt;
        if self.respawn_timer > 0.0 {
            return false;
        }
        self.collected = false;
        self.respawn_timer = 0.0;
        if let Some(node) = self.base.node {
            ctx.renderer.set_visible(node, true);
        }
        log::debug!("Ammo crate respawned at ({:.0}, {:.0})", self.spawn_pos.x, self.spawn_pos.z);
        true
    }

    /// Hide the crate and start the respawn countdown
    pub fn collect(&mut self, ctx: &mut Ctx) {
        if self.collected {
            return;
        }
        self.collected = true;
        self.respawn_timer = self.respawn_time;
        if let Some(node) = self.base.node {
            ctx.renderer.set_visible(node, false);
        }
    }
}

impl Actor for Pickup {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn sync(&mut self, dt: f32, ctx: &mut Ctx) {
        if self.collected {
            return;
        }
        self.spin = (self.spin + self.rotate_speed * dt) % 360.0;
        if let Some(node) = self.base.node {
            ctx.renderer.set_rotation(node, Vec3::new(0.0, self.spin, 0.0));
        }
    }

    fn release(&mut self, ctx: &mut Ctx) {
        if let Some(trigger) = self.trigger.take() {
            ctx.physics.remove_trigger(trigger);
        }
        self.base.release(ctx);
    }
}

/// Timed effect item
#[derive(Debug)]
pub struct Powerup {
    base: ActorBase,
    kind: PowerupKind,
    trigger: Option<TriggerHandle>,
    rotate_speed: f32,
    spin: f32,
    lifetime: f32,
    collected: bool,
}

impl Powerup {
    pub fn spawn(kind: PowerupKind, position: Vec3, cfg: &PowerupTuning, ctx: &mut Ctx) -> Self {
        let visual = position + Vec3::new(0.0, cfg.hover_height, 0.0);
        let node = ctx.renderer.create_node(kind.model(), None, visual);
        // Billboard plane stands upright
        ctx.renderer.set_rotation(node, Vec3::new(90.0, 0.0, 0.0));
        let trigger = ctx.physics.add_trigger(cfg.trigger_radius, position);
        log::info!("Spawned {:?} at ({:.0}, {:.0})", kind, position.x, position.z);

        Self {
            base: ActorBase::new(Some(node), None),
            kind,
            trigger: Some(trigger),
            rotate_speed: cfg.rotate_speed,
            spin: 0.0,
            lifetime: cfg.lifetime,
            collected: false,
        }
    }

    pub fn kind(&self) -> PowerupKind {
        self.kind
    }

    pub fn trigger(&self) -> Option<TriggerHandle> {
        self.trigger
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    pub fn update(&mut self, dt: f32) {
        if self.collected || self.base.is_marked_for_removal() {
            return;
        }
        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            log::debug!("{:?} expired", self.kind);
            self.base.mark_for_removal();
        }
    }

    pub fn collect(&mut self, ctx: &mut Ctx) {
        if self.collected {
            return;
        }
        self.collected = true;
        if let Some(node) = self.base.node {
            ctx.renderer.set_visible(node, false);
        }
        self.base.mark_for_removal();
    }
}

impl Actor for Powerup {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn sync(&mut self, dt: f32, ctx: &mut Ctx) {
        if self.collected {
            return;
        }
        self.spin = (self.spin + self.rotate_speed * dt) % 360.0;
        if let Some(node) = self.base.node {
            ctx.renderer.set_rotation(node, Vec3::new(90.0, self.spin, 0.0));
        }
    }

    fn release(&mut self, ctx: &mut Ctx) {
        if let Some(trigger) = self.trigger.take() {
            ctx.physics.remove_trigger(trigger);
        }
        self.base.release(ctx);
    }
}
