//! Player actor
//!
//! Kinematic capsule driven directly by input: movement repositions the body,
//! shooting is a hitscan ray from chest height. The director reads
//! [`Player::last_hit`] once per frame to apply damage.

use glam::Vec3;

use crate::audio::{SoundEffect, SoundId};
use crate::consts::MD2_ROTATION_OFFSET;
use crate::physics::{BodyHandle, Shape};
use crate::platform::Ctx;
use crate::renderer::{Model, NodeHandle, Pose};
use crate::tuning::{PlayerTuning, PowerupTuning};
use crate::{forward_to_yaw, ground_perpendicular, yaw_to_forward, yaw_to_right};

use super::actor::{Actor, ActorBase, Hit, Vitals};
use super::pickup::PowerupKind;

/// Input state for one frame
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    /// Hold to face the camera direction while moving slower
    pub aim: bool,
    pub fire: bool,
    /// Camera yaw in degrees
    pub camera_yaw: f32,
}

/// Last shot, kept for the debug overlay
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DebugRay {
    pub start: Vec3,
    pub end: Vec3,
    pub active: bool,
    /// Seconds left on screen
    pub ttl: f32,
}

/// Remaining powerup time per effect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEffects {
    pub speed_boost: f32,
    pub speed_multiplier: f32,
    pub damage_boost: f32,
    pub damage_multiplier: u32,
    pub god_mode: f32,
}

impl Default for ActiveEffects {
    fn default() -> Self {
        Self {
            speed_boost: 0.0,
            speed_multiplier: 1.0,
            damage_boost: 0.0,
            damage_multiplier: 1,
            god_mode: 0.0,
        }
    }
}

impl ActiveEffects {
    pub fn tick(&mut self, dt: f32) {
        self.speed_boost = (self.speed_boost - dt).max(0.0);
        self.damage_boost = (self.damage_boost - dt).max(0.0);
        self.god_mode = (self.god_mode - dt).max(0.0);
    }

    pub fn speed_factor(&self) -> f32 {
        if self.speed_boost > 0.0 { self.speed_multiplier } else { 1.0 }
    }

    pub fn damage_factor(&self) -> u32 {
        if self.damage_boost > 0.0 { self.damage_multiplier } else { 1 }
    }

    pub fn is_god(&self) -> bool {
        self.god_mode > 0.0
    }

    /// Start (or restart) the timer for a collected powerup
    pub fn grant(&mut self, kind: PowerupKind, cfg: &PowerupTuning) {
        let duration = kind.duration(cfg);
        match kind {
            PowerupKind::SpeedBoost => {
                self.speed_boost = duration;
                self.speed_multiplier = cfg.speed_boost_multiplier;
            }
            PowerupKind::DamageBoost => {
                self.damage_boost = duration;
                self.damage_multiplier = cfg.damage_boost_multiplier;
            }
            PowerupKind::GodMode => self.god_mode = duration,
        }
    }
}

#[derive(Debug)]
pub struct Player {
    base: ActorBase,
    weapon: Option<NodeHandle>,
    cfg: PlayerTuning,
    vitals: Vitals,
    ammo: u32,
    yaw: f32,
    forward: Vec3,
    right: Vec3,
    moving: bool,
    shooting: bool,
    dead: bool,
    in_pain: bool,
    pain_timer: f32,
    shoot_cooldown: f32,
    attack_anim_timer: f32,
    last_hit: Option<BodyHandle>,
    debug_ray: DebugRay,
    effects: ActiveEffects,
    run_sound: Option<SoundId>,
}

impl Player {
    pub fn spawn(cfg: &PlayerTuning, position: Vec3, ctx: &mut Ctx) -> Self {
        let node = ctx.renderer.create_node(Model::Player, None, position);
        let weapon = ctx.renderer.create_node(Model::PlayerWeapon, Some(node), Vec3::ZERO);
        let body = ctx.physics.create_body(
            0.0,
            Shape::Capsule {
                radius: cfg.capsule_radius,
                height: cfg.capsule_height,
            },
            position,
        );
        ctx.physics.set_kinematic(body);

        Self {
            base: ActorBase::new(Some(node), Some(body)),
            weapon: Some(weapon),
            cfg: cfg.clone(),
            vitals: Vitals::new(cfg.max_health),
            ammo: cfg.start_ammo,
            yaw: 0.0,
            forward: Vec3::Z,
            right: Vec3::X,
            moving: false,
            shooting: false,
            dead: false,
            in_pain: false,
            pain_timer: 0.0,
            shoot_cooldown: 0.0,
            attack_anim_timer: 0.0,
            last_hit: None,
            debug_ray: DebugRay::default(),
            effects: ActiveEffects::default(),
            run_sound: None,
        }
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.base.body
    }

    pub fn health(&self) -> u32 {
        self.vitals.health()
    }

    pub fn max_health(&self) -> u32 {
        self.vitals.max()
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_in_pain(&self) -> bool {
        self.in_pain
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn is_shooting(&self) -> bool {
        self.shooting
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Body hit by this frame's shot, if any
    pub fn last_hit(&self) -> Option<BodyHandle> {
        self.last_hit
    }

    pub fn debug_ray(&self) -> DebugRay {
        self.debug_ray
    }

    pub fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    /// Damage one shot deals right now
    pub fn shot_damage(&self) -> u32 {
        self.cfg.shot_damage.saturating_mul(self.effects.damage_factor())
    }

    pub fn handle_input(&mut self, dt: f32, input: &PlayerInput, ctx: &mut Ctx) {
        self.last_hit = None;

        if self.debug_ray.active {
            self.debug_ray.ttl -= dt;
            if self.debug_ray.ttl <= 0.0 {
                self.debug_ray.active = false;
            }
        }
        self.effects.tick(dt);

        if self.dead {
            return;
        }

        if self.in_pain {
            self.pain_timer -= dt;
            if self.pain_timer > 0.0 {
                return;
            }
            self.in_pain = false;
            self.set_pose(ctx, self.locomotion_pose(), true);
        }

        self.handle_movement(dt, input, ctx);
        self.handle_shooting(dt, input, ctx);
    }

    fn handle_movement(&mut self, dt: f32, input: &PlayerInput, ctx: &mut Ctx) {
        let cam_forward = yaw_to_forward(input.camera_yaw);
        let cam_right = yaw_to_right(input.camera_yaw);

        let mut move_dir = Vec3::ZERO;
        let mut moving = false;
        if input.forward {
            move_dir += cam_forward;
            moving = true;
        }
        if input.back {
            move_dir -= cam_forward;
            moving = true;
        }
        if input.left {
            move_dir -= cam_right;
            moving = true;
        }
        if input.right {
            move_dir += cam_right;
            moving = true;
        }
        let move_dir = move_dir.normalize_or_zero();

        let mut speed = self.cfg.speed * self.effects.speed_factor();
        if input.aim {
            speed -= self.cfg.aim_speed_penalty;
            self.yaw = input.camera_yaw;
            self.forward = cam_forward;
        } else if move_dir != Vec3::ZERO {
            self.yaw = forward_to_yaw(move_dir);
            self.forward = move_dir;
        }
        self.right = ground_perpendicular(self.forward);

        let (move_dir, moving) = if self.shooting {
            (Vec3::ZERO, false)
        } else {
            (move_dir, moving)
        };

        if let Some(body) = self.base.body {
            let pos = self.base.position(&*ctx.physics, &*ctx.renderer);
            ctx.physics.set_body_position(body, pos + move_dir * speed * dt);
        }

        self.update_animation(moving, ctx);
    }

    fn handle_shooting(&mut self, dt: f32, input: &PlayerInput, ctx: &mut Ctx) {
        self.shoot_cooldown = (self.shoot_cooldown - dt).max(0.0);

        if self.attack_anim_timer > 0.0 {
            self.attack_anim_timer -= dt;
            if self.attack_anim_timer <= 0.0 {
                self.shooting = false;
                self.set_pose(ctx, self.locomotion_pose(), true);
            }
        }

        if !input.fire || self.shoot_cooldown > 0.0 {
            return;
        }

        if self.ammo == 0 {
            self.shoot_cooldown = self.cfg.empty_fire_cooldown;
            self.attack_anim_timer = self.cfg.empty_fire_cooldown;
            self.shooting = true;
            self.set_pose(ctx, Pose::Wave, true);
            return;
        }

        self.ammo -= 1;
        self.shoot_cooldown = self.cfg.fire_rate;
        self.attack_anim_timer = self.cfg.attack_anim_duration;
        self.shooting = true;
        ctx.play(SoundEffect::Shoot);
        self.set_pose(ctx, Pose::Attack, true);

        let start = self.base.position(&*ctx.physics, &*ctx.renderer) + Vec3::new(0.0, self.cfg.chest_height, 0.0);
        let end = start + self.forward * self.cfg.shoot_range;
        self.debug_ray = DebugRay {
            start,
            end,
            active: true,
            ttl: self.cfg.attack_anim_duration,
        };

        let hit = ctx.physics.ray_test(start, end);
        if hit.hit && hit.body != self.base.body {
            self.last_hit = hit.body;
        }
    }

    fn update_animation(&mut self, moving: bool, ctx: &mut Ctx) {
        if self.shooting {
            self.moving = moving;
            return;
        }

        if moving && !self.moving {
            self.set_pose(ctx, Pose::Run, true);
            self.stop_run_sound(ctx);
            self.run_sound = ctx.play_tracked(SoundEffect::Run);
        } else if !moving && self.moving {
            self.set_pose(ctx, Pose::Stand, true);
            self.stop_run_sound(ctx);
        }
        self.moving = moving;
    }

    fn locomotion_pose(&self) -> Pose {
        if self.moving { Pose::Run } else { Pose::Stand }
    }

    /// Pose both the body and the weapon
    fn set_pose(&self, ctx: &mut Ctx, pose: Pose, looped: bool) {
        for node in [self.base.node, self.weapon].into_iter().flatten() {
            ctx.renderer.set_pose(node, pose, looped);
        }
    }

    fn stop_run_sound(&mut self, ctx: &mut Ctx) {
        if let Some(id) = self.run_sound.take() {
            ctx.sound.stop(id);
            ctx.sound.release(id);
        }
    }

    /// Apply incoming damage. Ignored once dead or while god mode runs.
    pub fn take_damage(&mut self, amount: u32, ctx: &mut Ctx) -> Hit {
        if self.dead || self.effects.is_god() {
            return Hit::Ignored;
        }

        let hit = self.vitals.apply(amount);
        match hit {
            Hit::Killed => {
                self.dead = true;
                self.stop_run_sound(ctx);
                ctx.play(SoundEffect::PlayerDeath);
                if let Some(node) = self.base.node {
                    ctx.renderer.set_pose(node, Pose::DeathFallback, false);
                }
                if let Some(weapon) = self.weapon {
                    ctx.renderer.set_visible(weapon, false);
                }
                log::info!("Player died");
            }
            Hit::Hurt => {
                self.in_pain = true;
                self.shooting = false;
                self.pain_timer = self.cfg.pain_duration;
                ctx.play(SoundEffect::PlayerPain);
                self.set_pose(ctx, Pose::PainA, true);
            }
            Hit::Ignored => {}
        }
        hit
    }

    pub fn add_ammo(&mut self, amount: u32, ctx: &mut Ctx) {
        self.ammo = self.ammo.saturating_add(amount);
        ctx.play(SoundEffect::AmmoPickup);
    }

    pub fn apply_powerup(&mut self, kind: PowerupKind, cfg: &PowerupTuning, ctx: &mut Ctx) {
        self.effects.grant(kind, cfg);
        ctx.play(SoundEffect::PowerupPickup);
        log::info!("Powerup collected: {kind:?}");
    }
}

impl Actor for Player {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn sync(&mut self, _dt: f32, ctx: &mut Ctx) {
        self.base.sync_node(ctx);
        if let Some(node) = self.base.node {
            ctx.renderer
                .set_rotation(node, Vec3::new(0.0, self.yaw + MD2_ROTATION_OFFSET, 0.0));
        }
    }

    fn release(&mut self, ctx: &mut Ctx) {
        self.stop_run_sound(ctx);
        if let Some(weapon) = self.weapon.take() {
            ctx.renderer.remove_node(weapon);
        }
        self.base.release(ctx);
    }
}
