//! Game state and arena setup
//!
//! Everything a running round owns lives here: the collaborators, the actors,
//! the round timers and the seeded RNG that all spawning draws from.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::audio::{HeadlessSoundEngine, SaluteSoundPool, SoundEngine};
use crate::physics::{BodyHandle, PhysicsWorld, RapierWorld, Shape};
use crate::platform::{Ctx, Systems};
use crate::renderer::{Model, NodeHandle, RecordingRenderer, Renderer};
use crate::tuning::{ArenaTuning, Tuning, WaveTier};

use super::actor::Actor;
use super::enemy::{Enemy, EnemyKind};
use super::fog_enemy::FogEnemy;
use super::pickup::{Pickup, Powerup, PowerupKind};
use super::player::Player;
use super::waves::{Population, SpawnKind, choose_spawn, gate_at, pick_gate};

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Player died
    GameOver,
    /// Round timer ran out with the player alive
    Won,
}

/// Round bookkeeping reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    /// Enemies and fog enemies killed by the player
    pub kills: u32,
    /// Current wave (1-based, 0 before the first frame)
    pub wave: u32,
    pub enemies_spawned: u32,
    pub shots_hit: u32,
    pub damage_taken: u32,
    pub pickups_collected: u32,
    pub powerups_collected: u32,
}

/// Headless game: reference collaborators only
pub type HeadlessGame = GameState<RapierWorld, RecordingRenderer, HeadlessSoundEngine>;

/// Complete state of a running round
pub struct GameState<P, R, S> {
    /// Run seed for reproducibility
    pub seed: u64,
    pub systems: Systems<P, R, S>,
    pub tuning: Tuning,
    rng: Pcg32,
    pub player: Player,
    /// Container order is iteration order
    pub enemies: Vec<Enemy>,
    pub fog_enemies: Vec<FogEnemy>,
    pub pickups: Vec<Pickup>,
    pub powerups: Vec<Powerup>,
    pub salutes: SaluteSoundPool,
    /// Counts down from the round duration
    pub round_timer: f32,
    pub spawn_timer: f32,
    pub powerup_timer: f32,
    pub show_debug: bool,
    pub phase: GamePhase,
    pub stats: GameStats,
    arena_bodies: Vec<BodyHandle>,
    arena_nodes: Vec<NodeHandle>,
}

impl HeadlessGame {
    pub fn headless(seed: u64, tuning: Tuning) -> Self {
        Self::new(
            seed,
            tuning,
            Systems::new(
                RapierWorld::default(),
                RecordingRenderer::default(),
                HeadlessSoundEngine::default(),
            ),
        )
    }
}

impl<P: PhysicsWorld, R: Renderer, S: SoundEngine> GameState<P, R, S> {
    /// Build the arena, the player and the ammo crates
    pub fn new(seed: u64, tuning: Tuning, mut systems: Systems<P, R, S>) -> Self {
        let mut ctx = systems.ctx();
        let (arena_bodies, arena_nodes) = build_arena(&tuning.arena, &mut ctx);
        let player = Player::spawn(&tuning.player, Vec3::ZERO, &mut ctx);
        let pickups = tuning
            .pickups
            .positions
            .iter()
            .map(|&pos| Pickup::spawn(pos, &tuning.pickups, &mut ctx))
            .collect();

        log::info!(
            "New round: seed {seed}, {} pillars, {} s",
            tuning.arena.pillars.len(),
            tuning.waves.round_duration
        );

        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            player,
            enemies: Vec::new(),
            fog_enemies: Vec::new(),
            pickups,
            powerups: Vec::new(),
            salutes: SaluteSoundPool::new(tuning.enemy.max_concurrent_salutes),
            round_timer: tuning.waves.round_duration,
            spawn_timer: 0.0,
            powerup_timer: tuning.powerups.spawn_interval,
            show_debug: false,
            phase: GamePhase::Playing,
            stats: GameStats::default(),
            arena_bodies,
            arena_nodes,
            tuning,
            systems,
        }
    }

    pub fn player_position(&self) -> Vec3 {
        self.player.base().position(&self.systems.physics, &self.systems.renderer)
    }

    /// Enemies that are still fighting, per kind
    pub fn population(&self) -> Population {
        let mut pop = Population::default();
        for enemy in self.enemies.iter().filter(|e| !e.is_dead()) {
            match enemy.kind() {
                EnemyKind::Basic => pop.basic += 1,
                EnemyKind::Fast => pop.fast += 1,
            }
        }
        pop.fog = self.fog_enemies.iter().filter(|f| !f.is_dead()).count() as u32;
        pop
    }

    /// Static bodies making up the floor and pillars
    pub fn arena_bodies(&self) -> &[BodyHandle] {
        &self.arena_bodies
    }

    /// Spawn an enemy at an arbitrary spot; returns its index
    pub fn spawn_enemy_at(&mut self, kind: EnemyKind, position: Vec3, forward: Vec3) -> usize {
        let seed = self.rng.random::<u64>();
        let enemy = Enemy::spawn(
            kind,
            position,
            forward,
            &self.tuning.enemy,
            &self.tuning.steering,
            seed,
            &mut self.systems.ctx(),
        );
        self.enemies.push(enemy);
        self.stats.enemies_spawned += 1;
        log::info!("Spawned {kind:?} enemy at ({:.0}, {:.0})", position.x, position.z);
        self.enemies.len() - 1
    }

    pub fn spawn_fog_enemy_at(&mut self, position: Vec3, forward: Vec3) -> usize {
        let fog = FogEnemy::spawn(
            position,
            forward,
            &self.tuning.fog_enemy,
            &self.tuning.steering,
            &mut self.systems.ctx(),
        );
        self.fog_enemies.push(fog);
        self.stats.enemies_spawned += 1;
        log::info!("Spawned fog enemy at ({:.0}, {:.0})", position.x, position.z);
        self.fog_enemies.len() - 1
    }

    /// Spawn at a configured gate. Out-of-range gates spawn nothing.
    pub fn spawn_at_gate(&mut self, kind: SpawnKind, gate_index: usize) -> bool {
        let Some(gate) = gate_at(&self.tuning.waves.gates, gate_index).copied() else {
            log::warn!("No spawn gate {gate_index}");
            return false;
        };
        self.spawn_kind(kind, gate.position, gate.forward);
        true
    }

    /// Pick an eligible kind and a random gate for the given tier
    pub fn spawn_wave_enemy(&mut self, tier: &WaveTier) -> bool {
        let pop = self.population();
        let Some(kind) = choose_spawn(&mut self.rng, tier, &pop) else {
            return false;
        };
        let Some(gate) = pick_gate(&mut self.rng, &self.tuning.waves.gates).copied() else {
            return false;
        };
        self.spawn_kind(kind, gate.position, gate.forward);
        true
    }

    fn spawn_kind(&mut self, kind: SpawnKind, position: Vec3, forward: Vec3) {
        match kind {
            SpawnKind::Basic => {
                self.spawn_enemy_at(EnemyKind::Basic, position, forward);
            }
            SpawnKind::Fast => {
                self.spawn_enemy_at(EnemyKind::Fast, position, forward);
            }
            SpawnKind::Fog => {
                self.spawn_fog_enemy_at(position, forward);
            }
        }
    }

    pub fn spawn_powerup(&mut self, kind: PowerupKind, position: Vec3) {
        let powerup = Powerup::spawn(kind, position, &self.tuning.powerups, &mut self.systems.ctx());
        self.powerups.push(powerup);
    }

    /// Random kind at a random preset spot; nothing when no spots are configured
    pub fn spawn_random_powerup(&mut self) -> bool {
        let positions = &self.tuning.powerups.positions;
        if positions.is_empty() {
            return false;
        }
        let position = positions[self.rng.random_range(0..positions.len())];
        let kind = PowerupKind::ALL[self.rng.random_range(0..PowerupKind::ALL.len())];
        self.spawn_powerup(kind, position);
        true
    }

    /// Release every actor and the arena. The state is inert afterwards.
    pub fn teardown(&mut self) {
        let mut ctx = self.systems.ctx();
        for enemy in &mut self.enemies {
            enemy.release(&mut ctx);
        }
        for fog in &mut self.fog_enemies {
            fog.release(&mut ctx);
        }
        for pickup in &mut self.pickups {
            pickup.release(&mut ctx);
        }
        for powerup in &mut self.powerups {
            powerup.release(&mut ctx);
        }
        self.enemies.clear();
        self.fog_enemies.clear();
        self.pickups.clear();
        self.powerups.clear();
        self.player.release(&mut ctx);

        for body in self.arena_bodies.drain(..) {
            ctx.physics.remove_body(body);
        }
        for node in self.arena_nodes.drain(..) {
            ctx.renderer.remove_node(node);
        }
    }
}

fn build_arena(arena: &ArenaTuning, ctx: &mut Ctx) -> (Vec<BodyHandle>, Vec<NodeHandle>) {
    let mut bodies = Vec::with_capacity(arena.pillars.len() + 1);
    let mut nodes = Vec::with_capacity(arena.pillars.len() + 1);

    let ground_pos = Vec3::new(0.0, arena.ground_y, 0.0);
    bodies.push(ctx.physics.create_body(
        0.0,
        Shape::Box {
            half_extents: arena.ground_half_extents,
        },
        ground_pos,
    ));
    let ground = ctx.renderer.create_node(Model::Ground, None, ground_pos);
    ctx.renderer.set_scale(ground, arena.ground_half_extents * 2.0);
    nodes.push(ground);

    let size = arena.pillar_size;
    for &[x, z] in &arena.pillars {
        let pos = Vec3::new(x, arena.ground_y + size.y / 2.0, z);
        let node = ctx.renderer.create_node(Model::Pillar, None, pos);
        ctx.renderer.set_scale(node, size);
        nodes.push(node);
        bodies.push(ctx.physics.create_body(0.0, Shape::Box { half_extents: size * 0.5 }, pos));
    }
    (bodies, nodes)
}
