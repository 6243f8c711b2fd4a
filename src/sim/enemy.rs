//! Melee enemy actor
//!
//! Lifecycle: walk in through a gate without a body, salute, then chase the
//! player. Attacks are gated by a permission the director hands out so only
//! one enemy at a time closes in for the hit. Pain and salutes interrupt the
//! primary state without replacing it.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::audio::{SaluteSoundPool, SoundEffect};
use crate::consts::{ATTACK_RELEASE_FACTOR, MD2_ROTATION_OFFSET};
use crate::physics::{BodyHandle, Shape, TriggerHandle};
use crate::platform::Ctx;
use crate::renderer::{Model, Pose};
use crate::tuning::{EnemyStats, EnemyTuning, SteeringTuning};
use crate::{forward_to_yaw, ground_direction, yaw_to_forward};

use super::actor::{Actor, ActorBase, Hit, Vitals};
use super::steering::Steering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    Basic,
    /// Smaller, quicker, weaker
    Fast,
}

impl EnemyKind {
    pub fn stats(&self, cfg: &EnemyTuning) -> EnemyStats {
        match self {
            EnemyKind::Basic => cfg.basic,
            EnemyKind::Fast => cfg.fast,
        }
    }

    pub fn model(&self) -> Model {
        match self {
            EnemyKind::Basic => Model::Enemy,
            EnemyKind::Fast => Model::FastEnemy,
        }
    }
}

/// Primary AI state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyState {
    /// Walking in from a gate, no body yet
    Spawning,
    /// Arrival salute before the first chase
    Saluting,
    Idle,
    Chase,
    /// In range but another enemy holds the attack permission
    WaitAttack,
    Attack,
    Dead,
}

/// What the enemy knows about the world when picking its next state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Senses {
    pub distance: f32,
    pub attack_allowed: bool,
    pub spawn_walk_done: bool,
    pub salute_done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranges {
    pub attack: f32,
    pub chase: f32,
}

impl Ranges {
    pub fn from_tuning(cfg: &EnemyTuning) -> Self {
        Self {
            attack: cfg.attack_range,
            chase: cfg.chase_range,
        }
    }

    /// Beyond this an engaged enemy gives up and chases again
    pub fn release(&self) -> f32 {
        self.attack * ATTACK_RELEASE_FACTOR
    }
}

/// Primary state transition. Death and pain are applied by
/// [`Enemy::take_damage`], not here.
pub fn next_state(state: EnemyState, senses: &Senses, ranges: &Ranges) -> EnemyState {
    use EnemyState::*;

    let d = senses.distance;
    match state {
        Dead => Dead,
        Spawning if senses.spawn_walk_done => Saluting,
        Spawning => Spawning,
        Saluting if senses.salute_done => Chase,
        Saluting => Saluting,
        Idle if d < ranges.chase => Chase,
        Idle => Idle,
        Chase if d < ranges.attack && senses.attack_allowed => Attack,
        Chase if d < ranges.attack => WaitAttack,
        Chase => Chase,
        WaitAttack if d > ranges.release() => Chase,
        WaitAttack if senses.attack_allowed && d < ranges.attack => Attack,
        // Permission but out of reach: close the gap
        WaitAttack if senses.attack_allowed => Chase,
        WaitAttack => WaitAttack,
        Attack if d > ranges.release() => Chase,
        Attack => Attack,
    }
}

#[derive(Debug)]
pub struct Enemy {
    base: ActorBase,
    kind: EnemyKind,
    stats: EnemyStats,
    cfg: EnemyTuning,
    steer_cfg: SteeringTuning,
    vitals: Vitals,
    state: EnemyState,
    yaw: f32,
    moving: bool,
    pain_timer: f32,
    death_timer: f32,
    attack_cooldown: f32,
    salute_timer: f32,
    salute_cooldown: f32,
    spawn_forward: Vec3,
    spawn_walked: f32,
    attack_allowed: bool,
    salute_allowed: bool,
    attack_trigger: Option<TriggerHandle>,
    steering: Steering,
    rng: Pcg32,
}

impl Enemy {
    /// Place an enemy at a gate; it walks along `forward` before becoming solid
    pub fn spawn(
        kind: EnemyKind,
        position: Vec3,
        forward: Vec3,
        cfg: &EnemyTuning,
        steer_cfg: &SteeringTuning,
        seed: u64,
        ctx: &mut Ctx,
    ) -> Self {
        let stats = kind.stats(cfg);
        let node = ctx.renderer.create_node(kind.model(), None, position);
        ctx.renderer.set_scale(node, Vec3::splat(stats.scale));
        ctx.renderer.set_pose(node, Pose::Run, true);

        let mut rng = Pcg32::seed_from_u64(seed);
        let salute_cooldown = rng.random_range(cfg.salute_cooldown_min..=cfg.salute_cooldown_max);
        let spawn_forward = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();

        Self {
            base: ActorBase::new(Some(node), None),
            kind,
            stats,
            cfg: cfg.clone(),
            steer_cfg: steer_cfg.clone(),
            vitals: Vitals::new(stats.health),
            state: EnemyState::Spawning,
            yaw: forward_to_yaw(spawn_forward),
            moving: true,
            pain_timer: 0.0,
            death_timer: 0.0,
            attack_cooldown: 0.0,
            salute_timer: 0.0,
            salute_cooldown,
            spawn_forward,
            spawn_walked: 0.0,
            attack_allowed: false,
            salute_allowed: false,
            attack_trigger: None,
            steering: Steering::new(position),
            rng,
        }
    }

    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub fn state(&self) -> EnemyState {
        self.state
    }

    pub fn health(&self) -> u32 {
        self.vitals.health()
    }

    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    pub fn is_in_pain(&self) -> bool {
        self.pain_timer > 0.0
    }

    /// Arrival salute or a chase salute in progress
    pub fn is_saluting(&self) -> bool {
        self.state == EnemyState::Saluting || self.salute_timer > 0.0
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.base.body
    }

    pub fn attack_trigger(&self) -> Option<TriggerHandle> {
        self.attack_trigger
    }

    pub fn set_attack_allowed(&mut self, allowed: bool) {
        self.attack_allowed = allowed;
    }

    pub fn set_salute_allowed(&mut self, allowed: bool) {
        self.salute_allowed = allowed;
    }

    pub fn damage(&self) -> u32 {
        self.stats.damage
    }

    pub fn wants_to_deal_damage(&self) -> bool {
        self.state == EnemyState::Attack && self.attack_cooldown <= 0.0 && !self.vitals.is_dead()
    }

    pub fn reset_attack_cooldown(&mut self, ctx: &mut Ctx) {
        self.attack_cooldown = self.cfg.attack_cooldown;
        ctx.play(SoundEffect::EnemyAttack);
    }

    pub fn update_ai(&mut self, dt: f32, player_pos: Vec3, ctx: &mut Ctx, salutes: &mut SaluteSoundPool) {
        if self.is_removable() {
            return;
        }

        if self.state == EnemyState::Dead {
            self.death_timer -= dt;
            if self.death_timer <= 0.0 {
                self.base.mark_for_removal();
            }
            self.stop(ctx);
            return;
        }

        if self.pain_timer > 0.0 {
            self.pain_timer -= dt;
            if self.pain_timer > 0.0 {
                self.stop(ctx);
                return;
            }
            self.set_state(EnemyState::Chase);
            self.moving = false;
        }

        match self.state {
            EnemyState::Spawning => self.walk_in(dt, ctx, salutes),
            EnemyState::Saluting => {
                self.salute_timer -= dt;
                self.stop(ctx);
                if self.salute_timer <= 0.0 {
                    self.salute_timer = 0.0;
                    self.set_state(EnemyState::Chase);
                    self.moving = false;
                }
            }
            _ => self.engage(dt, player_pos, ctx, salutes),
        }
    }

    fn walk_in(&mut self, dt: f32, ctx: &mut Ctx, salutes: &mut SaluteSoundPool) {
        let Some(node) = self.base.node else {
            return;
        };
        let step = self.stats.speed * dt;
        let pos = ctx.renderer.node_position(node).unwrap_or(Vec3::ZERO) + self.spawn_forward * step;
        ctx.renderer.set_position(node, pos);
        self.spawn_walked += step;

        let senses = Senses {
            distance: f32::MAX,
            attack_allowed: false,
            spawn_walk_done: self.spawn_walked >= self.cfg.spawn_walk_distance,
            salute_done: false,
        };
        if next_state(self.state, &senses, &Ranges::from_tuning(&self.cfg)) == EnemyState::Saluting {
            self.arrive(pos, ctx, salutes);
        }
    }

    /// Become a physical combatant at the end of the gate walk
    fn arrive(&mut self, pos: Vec3, ctx: &mut Ctx, salutes: &mut SaluteSoundPool) {
        let shape = Shape::Capsule {
            radius: self.cfg.capsule_radius,
            height: self.cfg.capsule_height,
        };
        self.base.body = Some(ctx.physics.create_body(self.cfg.mass, shape, pos));
        let trigger_pos = pos + yaw_to_forward(self.yaw) * self.cfg.attack_trigger_offset;
        self.attack_trigger = Some(ctx.physics.add_trigger(self.cfg.attack_trigger_radius, trigger_pos));
        self.steering.reset(pos);

        self.set_state(EnemyState::Saluting);
        self.salute_timer = self.cfg.salute_duration;
        self.moving = false;
        self.set_pose(ctx, Pose::Salute, true);
        salutes.try_play(&mut *ctx.sound, ctx.mix);
    }

    fn engage(&mut self, dt: f32, player_pos: Vec3, ctx: &mut Ctx, salutes: &mut SaluteSoundPool) {
        let pos = self.base.position(&*ctx.physics, &*ctx.renderer);
        let distance = pos.distance(player_pos);

        if self.state == EnemyState::Chase && self.chase_salute(dt, distance, pos, ctx, salutes) {
            return;
        }

        let senses = Senses {
            distance,
            attack_allowed: self.attack_allowed,
            spawn_walk_done: true,
            salute_done: true,
        };
        let next = next_state(self.state, &senses, &Ranges::from_tuning(&self.cfg));
        if next != self.state {
            let from = self.state;
            self.set_state(next);
            match next {
                EnemyState::Attack => {
                    self.moving = false;
                    self.set_pose(ctx, Pose::Attack, true);
                }
                EnemyState::WaitAttack => {
                    self.moving = false;
                    self.face(pos, player_pos);
                    self.set_pose(ctx, Pose::Stand, true);
                }
                EnemyState::Chase => {
                    if from == EnemyState::Attack {
                        self.attack_cooldown = 0.0;
                    }
                    self.moving = false;
                    self.steering.reset(pos);
                }
                _ => {}
            }
        }

        match self.state {
            EnemyState::Idle => self.stop(ctx),
            EnemyState::Chase => self.chase(dt, pos, player_pos, ctx),
            EnemyState::WaitAttack => {
                self.stop(ctx);
                self.face(pos, player_pos);
            }
            EnemyState::Attack => {
                self.attack_cooldown -= dt;
                self.stop(ctx);
                self.face(pos, player_pos);
            }
            _ => {}
        }
    }

    /// Salute sub-mode of CHASE. Returns true while the salute holds the enemy.
    fn chase_salute(
        &mut self,
        dt: f32,
        distance: f32,
        pos: Vec3,
        ctx: &mut Ctx,
        salutes: &mut SaluteSoundPool,
    ) -> bool {
        if self.salute_timer > 0.0 {
            self.salute_timer -= dt;
            self.stop(ctx);
            if self.salute_timer <= 0.0 {
                self.salute_timer = 0.0;
                self.moving = false;
                self.steering.reset(pos);
            }
            return true;
        }

        self.salute_cooldown -= dt;
        if self.salute_cooldown > 0.0 || !self.salute_allowed || distance < self.cfg.attack_range {
            return false;
        }

        self.salute_timer = self.cfg.salute_duration;
        self.salute_cooldown = self
            .rng
            .random_range(self.cfg.salute_cooldown_min..=self.cfg.salute_cooldown_max);
        self.stop(ctx);
        self.set_pose(ctx, Pose::Salute, true);
        salutes.try_play(&mut *ctx.sound, ctx.mix);
        log::debug!("{:?} enemy salutes", self.kind);
        true
    }

    fn chase(&mut self, dt: f32, pos: Vec3, player_pos: Vec3, ctx: &mut Ctx) {
        let dir = ground_direction(pos, player_pos);
        let move_dir = self.steering.steer(dt, pos, dir, &self.steer_cfg);
        if let Some(body) = self.base.body {
            ctx.physics.set_horizontal_velocity(body, move_dir, self.stats.speed);
        }
        if dir != Vec3::ZERO {
            self.yaw = forward_to_yaw(dir);
        }
        if !self.moving {
            self.moving = true;
            self.set_pose(ctx, Pose::Run, true);
        }
    }

    fn face(&mut self, pos: Vec3, target: Vec3) {
        let dir = ground_direction(pos, target);
        if dir != Vec3::ZERO {
            self.yaw = forward_to_yaw(dir);
        }
    }

    fn stop(&self, ctx: &mut Ctx) {
        if let Some(body) = self.base.body {
            ctx.physics.stop_horizontal(body);
        }
    }

    fn set_pose(&self, ctx: &mut Ctx, pose: Pose, looped: bool) {
        if let Some(node) = self.base.node {
            ctx.renderer.set_pose(node, pose, looped);
        }
    }

    fn set_state(&mut self, next: EnemyState) {
        if next != self.state {
            log::debug!("{:?} enemy: {:?} -> {:?}", self.kind, self.state, next);
            self.state = next;
        }
    }

    fn remove_trigger(&mut self, ctx: &mut Ctx) {
        if let Some(trigger) = self.attack_trigger.take() {
            ctx.physics.remove_trigger(trigger);
        }
    }

    pub fn take_damage(&mut self, amount: u32, ctx: &mut Ctx) -> Hit {
        if self.state == EnemyState::Dead {
            return Hit::Ignored;
        }

        let hit = self.vitals.apply(amount);
        match hit {
            Hit::Killed => {
                self.set_state(EnemyState::Dead);
                self.base.alive = false;
                self.death_timer = self.cfg.death_duration;
                self.pain_timer = 0.0;
                self.salute_timer = 0.0;
                self.attack_allowed = false;
                self.stop(ctx);
                self.base.destroy_body(&mut *ctx.physics);
                self.remove_trigger(ctx);
                self.set_pose(ctx, Pose::DeathFallback, false);
                ctx.play(SoundEffect::EnemyDeath);
            }
            Hit::Hurt => {
                self.pain_timer = self.cfg.pain_duration;
                self.salute_timer = 0.0;
                self.moving = false;
                self.set_pose(ctx, Pose::PainA, true);
                ctx.play(SoundEffect::EnemyPain);
            }
            Hit::Ignored => {}
        }
        hit
    }
}

impl Actor for Enemy {
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
        if let Some(trigger) = self.attack_trigger {
            let pos = self.base.position(&*ctx.physics, &*ctx.renderer);
            let ahead = pos + yaw_to_forward(self.yaw) * self.cfg.attack_trigger_offset;
            ctx.physics.set_trigger_position(trigger, ahead);
        }
    }

    fn release(&mut self, ctx: &mut Ctx) {
        self.remove_trigger(ctx);
        self.base.release(ctx);
    }
}
