//! Fog-throwing enemy
//!
//! Walks in, falls back, lobs a single grenade that blankets the arena in fog,
//! then retreats to a waypoint. The grenade and the fog belong to the thrower
//! and outlive its death: removal waits until both are gone.

use glam::Vec3;

use crate::audio::SoundEffect;
use crate::consts::MD2_ROTATION_OFFSET;
use crate::physics::{BodyHandle, Shape};
use crate::platform::Ctx;
use crate::renderer::{FogParams, Model, NodeHandle, Pose};
use crate::tuning::{FogEnemyTuning, SteeringTuning};
use crate::{forward_to_yaw, ground_direction, yaw_to_forward};

use super::actor::{Actor, ActorBase, Hit, Vitals};
use super::steering::Steering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FogEnemyState {
    Spawning,
    Fallback,
    Throwing,
    Reposition,
    Idle,
    Dead,
}

/// Ballistic projectile; no world collision
#[derive(Debug, Clone)]
pub struct Grenade {
    pub position: Vec3,
    pub velocity: Vec3,
    node: Option<NodeHandle>,
}

impl Grenade {
    /// Launch along `yaw` with the configured horizontal speed and lift
    pub fn launch(from: Vec3, yaw: f32, cfg: &FogEnemyTuning) -> Self {
        let dir = yaw_to_forward(yaw);
        Self {
            position: from,
            velocity: Vec3::new(dir.x * cfg.grenade_speed, cfg.grenade_lift, dir.z * cfg.grenade_speed),
            node: None,
        }
    }

    /// Integrate one frame. Returns true once it reaches detonation height.
    pub fn step(&mut self, dt: f32, cfg: &FogEnemyTuning) -> bool {
        self.velocity.y -= cfg.grenade_gravity * dt;
        self.position += self.velocity * dt;
        self.position.y <= cfg.grenade_detonate_height
    }
}

/// Area fog: full strength plateau, then a linear fade back to clear
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogEffect {
    active: bool,
    fading: bool,
    timer: f32,
    start: f32,
    end: f32,
}

impl FogEffect {
    pub fn clear(cfg: &FogEnemyTuning) -> Self {
        Self {
            active: false,
            fading: false,
            timer: 0.0,
            start: cfg.fog_start_final,
            end: cfg.fog_end_final,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn distances(&self) -> (f32, f32) {
        (self.start, self.end)
    }

    pub fn activate(&mut self, cfg: &FogEnemyTuning) -> FogParams {
        self.active = true;
        self.fading = false;
        self.timer = cfg.fog_duration;
        self.start = cfg.fog_start_initial;
        self.end = cfg.fog_end_initial;
        self.params(cfg)
    }

    /// Advance the effect; returns the fog to push when it changed
    pub fn update(&mut self, dt: f32, cfg: &FogEnemyTuning) -> Option<FogParams> {
        if !self.active {
            return None;
        }
        self.timer -= dt;

        if !self.fading {
            if self.timer > 0.0 {
                return None;
            }
            self.fading = true;
            self.timer = cfg.fog_fade_duration;
        }

        if self.timer <= 0.0 {
            *self = Self::clear(cfg);
        } else {
            let t = 1.0 - self.timer / cfg.fog_fade_duration;
            self.start = cfg.fog_start_initial + (cfg.fog_start_final - cfg.fog_start_initial) * t;
            self.end = cfg.fog_end_initial + (cfg.fog_end_final - cfg.fog_end_initial) * t;
        }
        Some(self.params(cfg))
    }

    pub fn params(&self, cfg: &FogEnemyTuning) -> FogParams {
        FogParams {
            color: cfg.fog_color,
            start: self.start,
            end: self.end,
            density: 0.0,
            linear: true,
            enabled: self.active,
        }
    }
}

#[derive(Debug)]
pub struct FogEnemy {
    base: ActorBase,
    cfg: FogEnemyTuning,
    steer_cfg: SteeringTuning,
    vitals: Vitals,
    state: FogEnemyState,
    yaw: f32,
    state_timer: f32,
    death_timer: f32,
    pain_timer: f32,
    spawn_forward: Vec3,
    spawn_walked: f32,
    grenade: Option<Grenade>,
    fog: FogEffect,
    target: Option<Vec3>,
    steering: Steering,
}

impl FogEnemy {
    pub fn spawn(
        position: Vec3,
        forward: Vec3,
        cfg: &FogEnemyTuning,
        steer_cfg: &SteeringTuning,
        ctx: &mut Ctx,
    ) -> Self {
        let node = ctx.renderer.create_node(Model::FogEnemy, None, position);
        ctx.renderer.set_pose(node, Pose::Run, true);
        let spawn_forward = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();

        Self {
            base: ActorBase::new(Some(node), None),
            cfg: cfg.clone(),
            steer_cfg: steer_cfg.clone(),
            vitals: Vitals::new(cfg.health),
            state: FogEnemyState::Spawning,
            yaw: forward_to_yaw(spawn_forward),
            state_timer: 0.0,
            death_timer: 0.0,
            pain_timer: 0.0,
            spawn_forward,
            spawn_walked: 0.0,
            grenade: None,
            fog: FogEffect::clear(cfg),
            target: None,
            steering: Steering::new(position),
        }
    }

    pub fn state(&self) -> FogEnemyState {
        self.state
    }

    pub fn health(&self) -> u32 {
        self.vitals.health()
    }

    pub fn is_dead(&self) -> bool {
        self.state == FogEnemyState::Dead
    }

    pub fn is_in_pain(&self) -> bool {
        self.pain_timer > 0.0
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.base.body
    }

    pub fn grenade(&self) -> Option<&Grenade> {
        self.grenade.as_ref()
    }

    pub fn fog(&self) -> &FogEffect {
        &self.fog
    }

    /// Waypoint being walked to while repositioning
    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    pub fn update_ai(&mut self, dt: f32, player_pos: Vec3, ctx: &mut Ctx) {
        if self.is_removable() {
            return;
        }

        if self.state == FogEnemyState::Dead {
            self.death_timer -= dt;
            if self.death_timer <= 0.0 {
                if let Some(node) = self.base.node {
                    ctx.renderer.set_visible(node, false);
                }
                if !self.fog.is_active() && self.grenade.is_none() {
                    self.base.mark_for_removal();
                }
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
            match self.state {
                FogEnemyState::Idle => self.set_pose(ctx, Pose::Stand, true),
                FogEnemyState::Reposition => self.set_pose(ctx, Pose::Run, true),
                _ => {}
            }
        }

        match self.state {
            FogEnemyState::Spawning => self.walk_in(dt, ctx),
            FogEnemyState::Fallback => {
                self.stop(ctx);
                self.state_timer -= dt;
                if self.state_timer <= 0.0 {
                    self.throw(player_pos, ctx);
                }
            }
            FogEnemyState::Throwing => {
                self.stop(ctx);
                self.state_timer -= dt;
                if self.state_timer <= 0.0 {
                    self.pick_waypoint(ctx);
                }
            }
            FogEnemyState::Reposition => self.reposition(dt, ctx),
            FogEnemyState::Idle => self.stop(ctx),
            FogEnemyState::Dead => {}
        }
    }

    fn walk_in(&mut self, dt: f32, ctx: &mut Ctx) {
        let Some(node) = self.base.node else {
            return;
        };
        let step = self.cfg.speed * dt;
        let pos = ctx.renderer.node_position(node).unwrap_or(Vec3::ZERO) + self.spawn_forward * step;
        ctx.renderer.set_position(node, pos);
        self.spawn_walked += step;
        if self.spawn_walked < self.cfg.spawn_walk_distance {
            return;
        }

        let shape = Shape::Capsule {
            radius: self.cfg.capsule_radius,
            height: self.cfg.capsule_height,
        };
        self.base.body = Some(ctx.physics.create_body(self.cfg.mass, shape, pos));
        self.steering.reset(pos);
        self.set_state(FogEnemyState::Fallback);
        self.state_timer = self.cfg.fallback_duration;
        self.set_pose(ctx, Pose::Fallback, false);
    }

    fn throw(&mut self, player_pos: Vec3, ctx: &mut Ctx) {
        self.set_state(FogEnemyState::Throwing);
        self.state_timer = self.cfg.throw_duration;
        self.set_pose(ctx, Pose::Attack, false);

        let pos = self.base.position(&*ctx.physics, &*ctx.renderer);
        let dir = ground_direction(pos, player_pos);
        if dir != Vec3::ZERO {
            self.yaw = forward_to_yaw(dir);
        }

        // One grenade in the air at a time
        if self.grenade.is_some() {
            return;
        }
        let from = pos + Vec3::new(0.0, self.cfg.grenade_spawn_height, 0.0);
        let mut grenade = Grenade::launch(from, self.yaw, &self.cfg);
        grenade.node = Some(ctx.renderer.create_node(Model::Grenade, None, from));
        self.grenade = Some(grenade);
        ctx.play(SoundEffect::GrenadeThrow);
    }

    fn pick_waypoint(&mut self, ctx: &mut Ctx) {
        self.target = self.cfg.waypoints.get(self.cfg.reposition_index).copied();
        if self.target.is_some() {
            self.set_state(FogEnemyState::Reposition);
            self.set_pose(ctx, Pose::Run, true);
            let pos = self.base.position(&*ctx.physics, &*ctx.renderer);
            self.steering.reset(pos);
        } else {
            self.set_state(FogEnemyState::Idle);
            self.set_pose(ctx, Pose::Stand, true);
        }
    }

    fn reposition(&mut self, dt: f32, ctx: &mut Ctx) {
        let Some(target) = self.target else {
            self.set_state(FogEnemyState::Idle);
            return;
        };
        let pos = self.base.position(&*ctx.physics, &*ctx.renderer);

        if pos.distance(target) < self.cfg.arrive_threshold {
            self.set_state(FogEnemyState::Idle);
            self.steering.reset(pos);
            self.set_pose(ctx, Pose::Stand, true);
            self.stop(ctx);
            return;
        }

        let dir = ground_direction(pos, target);
        let move_dir = self.steering.steer(dt, pos, dir, &self.steer_cfg);
        if let Some(body) = self.base.body {
            ctx.physics.set_horizontal_velocity(body, move_dir, self.cfg.speed);
        }
        if move_dir != Vec3::ZERO {
            self.yaw = forward_to_yaw(move_dir);
        }
    }

    fn update_grenade(&mut self, dt: f32, ctx: &mut Ctx) {
        let Some(grenade) = self.grenade.as_mut() else {
            return;
        };
        let detonated = grenade.step(dt, &self.cfg);
        if let Some(node) = grenade.node {
            ctx.renderer.set_position(node, grenade.position);
        }
        if !detonated {
            return;
        }

        if let Some(node) = self.grenade.take().and_then(|g| g.node) {
            ctx.renderer.remove_node(node);
        }
        let fog = self.fog.activate(&self.cfg);
        ctx.renderer.set_fog(fog);
        ctx.play(SoundEffect::FogBurst);
        log::info!("Fog grenade detonated");
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

    fn set_state(&mut self, next: FogEnemyState) {
        if next != self.state {
            log::debug!("fog enemy: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    pub fn take_damage(&mut self, amount: u32, ctx: &mut Ctx) -> Hit {
        if self.state == FogEnemyState::Dead {
            return Hit::Ignored;
        }

        let hit = self.vitals.apply(amount);
        match hit {
            Hit::Killed => {
                self.set_state(FogEnemyState::Dead);
                self.base.alive = false;
                self.death_timer = self.cfg.death_duration;
                self.pain_timer = 0.0;
                self.set_pose(ctx, Pose::DeathFallback, false);
                self.base.destroy_body(&mut *ctx.physics);
                ctx.play(SoundEffect::EnemyDeath);
            }
            Hit::Hurt => {
                self.pain_timer = self.cfg.pain_duration;
                self.set_pose(ctx, Pose::PainB, false);
                ctx.play(SoundEffect::EnemyPain);
            }
            Hit::Ignored => {}
        }
        hit
    }
}

impl Actor for FogEnemy {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn sync(&mut self, dt: f32, ctx: &mut Ctx) {
        self.base.sync_node(ctx);
        if let Some(node) = self.base.node {
            ctx.renderer
                .set_rotation(node, Vec3::new(0.0, self.yaw + MD2_ROTATION_OFFSET, 0.0));
        }
        self.update_grenade(dt, ctx);
        if let Some(fog) = self.fog.update(dt, &self.cfg) {
            ctx.renderer.set_fog(fog);
        }
    }

    fn release(&mut self, ctx: &mut Ctx) {
        if let Some(node) = self.grenade.take().and_then(|g| g.node) {
            ctx.renderer.remove_node(node);
        }
        if self.fog.is_active() {
            self.fog = FogEffect::clear(&self.cfg);
            ctx.renderer.set_fog(self.fog.params(&self.cfg));
        }
        self.base.release(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsWorld;
    use crate::sim::test_support::{Headless, weightless};

    const DT: f32 = 0.125;

    fn quick_cfg() -> FogEnemyTuning {
        FogEnemyTuning {
            spawn_walk_distance: 0.0,
            fallback_duration: 0.5,
            throw_duration: 0.5,
            ..Default::default()
        }
    }

    fn spawn(sys: &mut Headless, cfg: &FogEnemyTuning) -> FogEnemy {
        FogEnemy::spawn(Vec3::ZERO, Vec3::Z, cfg, &SteeringTuning::default(), &mut sys.ctx())
    }

    /// AI, physics step, sync: one director frame for a lone fog enemy
    fn frames(sys: &mut Headless, fog: &mut FogEnemy, n: usize, player: Vec3) {
        for _ in 0..n {
            fog.update_ai(DT, player, &mut sys.ctx());
            sys.physics.step_simulation(DT, 10);
            fog.sync(DT, &mut sys.ctx());
        }
    }

    #[test]
    fn test_grenade_arc_detonates_at_ground() {
        let cfg = FogEnemyTuning::default();
        let mut g = Grenade::launch(Vec3::new(0.0, 30.0, 0.0), 0.0, &cfg);
        assert!((g.velocity - Vec3::new(0.0, 100.0, 300.0)).length() < 1e-3);
        let mut t = 0.0;
        while !g.step(0.01, &cfg) {
            t += 0.01;
            assert!(t < 5.0);
        }
        // y(t) = 30 + 100t - 100t^2 crosses zero near 1.24 s
        assert!((t - 1.24_f32).abs() < 0.05, "t = {t}");
        assert!(g.position.z > 350.0);
    }

    #[test]
    fn test_fog_plateau_then_linear_fade() {
        let cfg = FogEnemyTuning::default();
        let mut fog = FogEffect::clear(&cfg);
        assert!(fog.update(1.0, &cfg).is_none());

        let params = fog.activate(&cfg);
        assert!(params.enabled);
        assert_eq!((params.start, params.end), (250.0, 300.0));

        // Plateau: nothing to push
        for _ in 0..9 {
            assert!(fog.update(1.0, &cfg).is_none());
        }
        // Fade starts at the initial distances
        let p = fog.update(1.0, &cfg).unwrap();
        assert_eq!((p.start, p.end), (250.0, 300.0));

        let p = fog.update(5.0, &cfg).unwrap();
        assert!((p.start - (250.0 + (9999.0 - 250.0) * 0.5)).abs() < 0.5);
        assert!(p.enabled);

        let p = fog.update(5.0, &cfg).unwrap();
        assert!(!p.enabled);
        assert_eq!((p.start, p.end), (9999.0, 10000.0));
        assert!(!fog.is_active());
        assert!(fog.update(1.0, &cfg).is_none());
    }

    #[test]
    fn test_full_throw_cycle() {
        let mut sys = weightless();
        let cfg = quick_cfg();
        let mut fog = spawn(&mut sys, &cfg);
        let player = Vec3::new(0.0, 0.0, 500.0);

        frames(&mut sys, &mut fog, 1, player);
        assert_eq!(fog.state(), FogEnemyState::Fallback);
        assert!(fog.body().is_some());
        let node = fog.base().node.unwrap();
        assert_eq!(sys.renderer.node(node).unwrap().pose, Pose::Fallback);
        assert!(!sys.renderer.node(node).unwrap().looped);

        frames(&mut sys, &mut fog, 4, player);
        assert_eq!(fog.state(), FogEnemyState::Throwing);
        assert!(fog.grenade().is_some());
        assert_eq!(sys.sound.play_count(SoundEffect::GrenadeThrow), 1);

        frames(&mut sys, &mut fog, 4, player);
        assert_eq!(fog.state(), FogEnemyState::Reposition);
        assert_eq!(fog.target(), Some(cfg.waypoints[1]));

        // The grenade needs ten steps to come down from 30 units
        frames(&mut sys, &mut fog, 8, player);
        assert!(fog.grenade().is_none());
        assert!(fog.fog().is_active());
        let pushed = sys.renderer.fog().unwrap();
        assert!(pushed.enabled);
        assert_eq!(pushed.start, 250.0);
        assert_eq!(sys.sound.play_count(SoundEffect::FogBurst), 1);

        // Walking toward waypoint 1 at (-340, 0, 987)
        let v = sys.physics.linear_velocity(fog.body().unwrap()).unwrap();
        assert!(v.x < 0.0 && v.z > 0.0);
    }

    #[test]
    fn test_missing_waypoint_goes_idle() {
        let mut sys = weightless();
        let cfg = FogEnemyTuning {
            waypoints: Vec::new(),
            ..quick_cfg()
        };
        let mut fog = spawn(&mut sys, &cfg);
        frames(&mut sys, &mut fog, 12, Vec3::Z * 100.0);
        assert_eq!(fog.state(), FogEnemyState::Idle);
        assert_eq!(fog.target(), None);
    }

    #[test]
    fn test_reaches_waypoint_and_idles() {
        let mut sys = weightless();
        let cfg = FogEnemyTuning {
            waypoints: vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 10.0)],
            ..quick_cfg()
        };
        let mut fog = spawn(&mut sys, &cfg);
        frames(&mut sys, &mut fog, 12, Vec3::Z * 100.0);
        assert_eq!(fog.state(), FogEnemyState::Idle);
        assert_eq!(sys.renderer.node(fog.base().node.unwrap()).unwrap().pose, Pose::Stand);
    }

    #[test]
    fn test_pain_holds_position() {
        let mut sys = weightless();
        let mut fog = spawn(&mut sys, &quick_cfg());
        frames(&mut sys, &mut fog, 1, Vec3::Z * 100.0);
        assert_eq!(fog.take_damage(10, &mut sys.ctx()), Hit::Hurt);
        assert_eq!(fog.health(), 50);
        assert!(fog.is_in_pain());
        assert_eq!(sys.renderer.node(fog.base().node.unwrap()).unwrap().pose, Pose::PainB);
        frames(&mut sys, &mut fog, 2, Vec3::Z * 100.0);
        assert!(fog.is_in_pain());
        assert_eq!(fog.state(), FogEnemyState::Fallback);
    }

    #[test]
    fn test_death_waits_for_fog_to_clear() {
        let mut sys = weightless();
        let mut fog = spawn(&mut sys, &quick_cfg());
        // Through the throw and the detonation
        frames(&mut sys, &mut fog, 25, Vec3::Z * 100.0);
        assert!(fog.fog().is_active());

        assert_eq!(fog.take_damage(100, &mut sys.ctx()), Hit::Killed);
        assert!(fog.body().is_none());
        assert_eq!(fog.take_damage(100, &mut sys.ctx()), Hit::Ignored);

        // Death timer runs out but the fog is still up
        frames(&mut sys, &mut fog, 8, Vec3::ZERO);
        let node = fog.base().node.unwrap();
        assert!(!sys.renderer.node(node).unwrap().visible);
        assert!(!fog.is_removable());

        // Plateau and fade take 20 s from detonation
        frames(&mut sys, &mut fog, 160, Vec3::ZERO);
        assert!(!fog.fog().is_active());
        assert!(fog.is_removable());
        assert!(!sys.renderer.fog().unwrap().enabled);
    }

    #[test]
    fn test_release_clears_active_fog() {
        let mut sys = weightless();
        let mut fog = spawn(&mut sys, &quick_cfg());
        frames(&mut sys, &mut fog, 25, Vec3::Z * 100.0);
        assert!(fog.fog().is_active());
        fog.release(&mut sys.ctx());
        assert!(!sys.renderer.fog().unwrap().enabled);
        assert_eq!(sys.renderer.node_count(), 0);
        assert_eq!(sys.physics.body_count(), 0);
    }
}
