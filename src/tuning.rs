//! Data-driven game balance
//!
//! Every section carries `#[serde(default)]`, so a tuning file only needs the
//! values it overrides. Defaults reproduce the shipped game.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::TuningError;

/// Complete balance sheet for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub enemy: EnemyTuning,
    pub fog_enemy: FogEnemyTuning,
    pub steering: SteeringTuning,
    pub pickups: PickupTuning,
    pub powerups: PowerupTuning,
    pub waves: WaveTuning,
    pub arena: ArenaTuning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Run speed (units/s)
    pub speed: f32,
    /// Subtracted from speed while the aim input is held
    pub aim_speed_penalty: f32,
    /// Seconds between shots
    pub fire_rate: f32,
    /// Cooldown after a dry fire (empty gesture)
    pub empty_fire_cooldown: f32,
    pub attack_anim_duration: f32,
    pub shoot_range: f32,
    /// Ray origin height above the body center
    pub chest_height: f32,
    pub start_ammo: u32,
    pub max_health: u32,
    pub pain_duration: f32,
    pub capsule_radius: f32,
    pub capsule_height: f32,
    /// Hitscan damage per shot
    pub shot_damage: u32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 200.0,
            aim_speed_penalty: 70.0,
            fire_rate: 0.8,
            empty_fire_cooldown: 0.5,
            attack_anim_duration: 0.5,
            shoot_range: 1000.0,
            chest_height: 30.0,
            start_ammo: 115,
            max_health: 100,
            pain_duration: 0.4,
            capsule_radius: 15.0,
            capsule_height: 30.0,
            shot_damage: 25,
        }
    }
}

/// Per-type enemy stats
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnemyStats {
    pub speed: f32,
    pub health: u32,
    pub damage: u32,
    pub scale: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub basic: EnemyStats,
    pub fast: EnemyStats,
    pub attack_range: f32,
    pub chase_range: f32,
    pub attack_cooldown: f32,
    pub death_duration: f32,
    pub pain_duration: f32,
    pub salute_duration: f32,
    /// Chase salutes happen at a random interval in [min, max] seconds
    pub salute_cooldown_min: f32,
    pub salute_cooldown_max: f32,
    /// Process-wide cap on overlapping salute sounds
    pub max_concurrent_salutes: usize,
    pub spawn_walk_distance: f32,
    pub attack_trigger_offset: f32,
    pub attack_trigger_radius: f32,
    pub mass: f32,
    pub capsule_radius: f32,
    pub capsule_height: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            basic: EnemyStats {
                speed: 80.0,
                health: 50,
                damage: 10,
                scale: 1.0,
            },
            fast: EnemyStats {
                speed: 140.0,
                health: 30,
                damage: 5,
                scale: 0.8,
            },
            attack_range: 60.0,
            chase_range: 500.0,
            attack_cooldown: 1.0,
            death_duration: 1.5,
            pain_duration: 0.4,
            salute_duration: 2.0,
            salute_cooldown_min: 6.0,
            salute_cooldown_max: 14.0,
            max_concurrent_salutes: 2,
            spawn_walk_distance: 150.0,
            attack_trigger_offset: 30.0,
            attack_trigger_radius: 20.0,
            mass: 10.0,
            capsule_radius: 15.0,
            capsule_height: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FogEnemyTuning {
    pub speed: f32,
    pub health: u32,
    pub death_duration: f32,
    pub pain_duration: f32,
    pub fallback_duration: f32,
    pub throw_duration: f32,
    pub spawn_walk_distance: f32,
    /// Reposition ends when closer than this to the waypoint
    pub arrive_threshold: f32,
    pub grenade_speed: f32,
    /// Initial upward velocity of the grenade
    pub grenade_lift: f32,
    pub grenade_gravity: f32,
    pub grenade_spawn_height: f32,
    pub grenade_detonate_height: f32,
    /// Full-strength fog plateau
    pub fog_duration: f32,
    /// Linear fade back to clear distances
    pub fog_fade_duration: f32,
    pub fog_start_initial: f32,
    pub fog_end_initial: f32,
    pub fog_start_final: f32,
    pub fog_end_final: f32,
    pub fog_color: [u8; 4],
    pub waypoints: Vec<Vec3>,
    /// Waypoint picked after a throw
    pub reposition_index: usize,
    pub mass: f32,
    pub capsule_radius: f32,
    pub capsule_height: f32,
}

impl Default for FogEnemyTuning {
    fn default() -> Self {
        Self {
            speed: 160.0,
            health: 60,
            death_duration: 0.8,
            pain_duration: 0.4,
            fallback_duration: 2.0,
            throw_duration: 1.5,
            spawn_walk_distance: 150.0,
            arrive_threshold: 25.0,
            grenade_speed: 300.0,
            grenade_lift: 100.0,
            grenade_gravity: 200.0,
            grenade_spawn_height: 30.0,
            grenade_detonate_height: 0.0,
            fog_duration: 10.0,
            fog_fade_duration: 10.0,
            fog_start_initial: 250.0,
            fog_end_initial: 300.0,
            fog_start_final: 9999.0,
            fog_end_final: 10000.0,
            fog_color: [180, 180, 180, 255],
            waypoints: vec![
                Vec3::new(590.0, 0.0, -367.0),
                Vec3::new(-340.0, 0.0, 987.0),
                Vec3::new(-200.5, 0.0, 30.0),
                Vec3::new(400.0, 0.0, -120.0),
            ],
            reposition_index: 1,
            mass: 10.0,
            capsule_radius: 15.0,
            capsule_height: 30.0,
        }
    }
}

/// Stuck detection shared by every walking AI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringTuning {
    /// How long displacement must stay small before strafing
    pub stuck_time: f32,
    /// Displacement below this counts as not moving
    pub stuck_distance: f32,
    pub strafe_duration: f32,
}

impl Default for SteeringTuning {
    fn default() -> Self {
        Self {
            stuck_time: 1.0,
            stuck_distance: 5.0,
            strafe_duration: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    pub ammo_amount: u32,
    pub respawn_time: f32,
    pub trigger_radius: f32,
    /// Visual spin (degrees/s)
    pub rotate_speed: f32,
    pub hover_height: f32,
    pub positions: Vec<Vec3>,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self {
            ammo_amount: 30,
            respawn_time: 30.0,
            trigger_radius: 20.0,
            rotate_speed: 90.0,
            hover_height: 10.0,
            positions: vec![Vec3::new(-100.0, -25.0, -100.0)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerupTuning {
    pub trigger_radius: f32,
    /// Seconds an uncollected powerup stays on the field
    pub lifetime: f32,
    pub spawn_interval: f32,
    pub rotate_speed: f32,
    pub hover_height: f32,
    pub positions: Vec<Vec3>,
    pub speed_boost_duration: f32,
    pub speed_boost_multiplier: f32,
    pub damage_boost_duration: f32,
    pub damage_boost_multiplier: u32,
    pub god_mode_duration: f32,
}

impl Default for PowerupTuning {
    fn default() -> Self {
        Self {
            trigger_radius: 25.0,
            lifetime: 15.0,
            spawn_interval: 20.0,
            rotate_speed: 120.0,
            hover_height: 15.0,
            positions: vec![
                Vec3::new(250.0, -25.0, -250.0),
                Vec3::new(-300.0, -25.0, 300.0),
                Vec3::new(0.0, -25.0, 450.0),
            ],
            speed_boost_duration: 10.0,
            speed_boost_multiplier: 1.5,
            damage_boost_duration: 8.0,
            damage_boost_multiplier: 2,
            god_mode_duration: 5.0,
        }
    }
}

/// A difficulty tier, active while the round timer is above `above`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveTier {
    pub above: f32,
    pub max_basic: u32,
    pub max_fast: u32,
    pub max_fog: u32,
    pub spawn_interval: f32,
}

/// A spawn gate: enemies appear at `position` and walk along `forward`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub position: Vec3,
    pub forward: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    /// Round timer start; the round is won when it reaches zero
    pub round_duration: f32,
    /// Ordered from the first wave (highest threshold) to the last
    pub tiers: Vec<WaveTier>,
    pub gates: Vec<Gate>,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            round_duration: 180.0,
            tiers: vec![
                WaveTier {
                    above: 120.0,
                    max_basic: 3,
                    max_fast: 0,
                    max_fog: 0,
                    spawn_interval: 4.0,
                },
                WaveTier {
                    above: 60.0,
                    max_basic: 4,
                    max_fast: 2,
                    max_fog: 1,
                    spawn_interval: 3.0,
                },
                WaveTier {
                    above: 0.0,
                    max_basic: 4,
                    max_fast: 6,
                    max_fog: 1,
                    spawn_interval: 2.0,
                },
            ],
            gates: vec![
                Gate {
                    position: Vec3::new(0.0, 0.0, 700.0),
                    forward: Vec3::new(0.0, 0.0, -1.0),
                },
                Gate {
                    position: Vec3::new(700.0, 0.0, 0.0),
                    forward: Vec3::new(-1.0, 0.0, 0.0),
                },
                Gate {
                    position: Vec3::new(0.0, 0.0, -700.0),
                    forward: Vec3::new(0.0, 0.0, 1.0),
                },
                Gate {
                    position: Vec3::new(-700.0, 0.0, 0.0),
                    forward: Vec3::new(1.0, 0.0, 0.0),
                },
            ],
        }
    }
}

/// Static level geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    pub ground_y: f32,
    pub ground_half_extents: Vec3,
    /// Full size of every pillar box
    pub pillar_size: Vec3,
    /// Pillar footprints as (x, z)
    pub pillars: Vec<[f32; 2]>,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            ground_y: -25.0,
            ground_half_extents: Vec3::new(1500.0, 0.5, 1500.0),
            pillar_size: Vec3::new(80.0, 30.0, 60.0),
            pillars: vec![
                [100.0, 100.0],
                [300.0, 200.0],
                [500.0, 400.0],
                [700.0, 600.0],
                [900.0, 800.0],
                [1100.0, 300.0],
                [1300.0, 500.0],
                [200.0, 1000.0],
                [600.0, 1200.0],
                [1400.0, 1400.0],
            ],
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON tuning document and validate it
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load and validate a JSON tuning file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        let positive = [
            ("player.speed", self.player.speed),
            ("player.fire_rate", self.player.fire_rate),
            ("player.shoot_range", self.player.shoot_range),
            ("enemy.attack_range", self.enemy.attack_range),
            ("enemy.chase_range", self.enemy.chase_range),
            ("enemy.attack_cooldown", self.enemy.attack_cooldown),
            ("enemy.death_duration", self.enemy.death_duration),
            ("fog_enemy.fog_duration", self.fog_enemy.fog_duration),
            ("fog_enemy.fog_fade_duration", self.fog_enemy.fog_fade_duration),
            ("steering.stuck_time", self.steering.stuck_time),
            ("waves.round_duration", self.waves.round_duration),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(TuningError::invalid(field, format!("must be > 0, got {value}")));
            }
        }

        if self.enemy.salute_cooldown_min > self.enemy.salute_cooldown_max {
            return Err(TuningError::invalid(
                "enemy.salute_cooldown_min",
                "must not exceed salute_cooldown_max",
            ));
        }
        if self.enemy.max_concurrent_salutes == 0 {
            return Err(TuningError::invalid(
                "enemy.max_concurrent_salutes",
                "must allow at least one sound",
            ));
        }
        if self.waves.tiers.is_empty() {
            return Err(TuningError::invalid("waves.tiers", "at least one tier is required"));
        }
        if self.waves.tiers.iter().any(|t| !(t.spawn_interval > 0.0)) {
            return Err(TuningError::invalid("waves.tiers", "spawn_interval must be > 0"));
        }

        if self.waves.gates.is_empty() {
            log::warn!("No spawn gates configured; wave spawning is disabled");
        }
        if self.fog_enemy.reposition_index >= self.fog_enemy.waypoints.len() {
            log::warn!(
                "fog_enemy.reposition_index {} has no waypoint; fog enemies will idle after throwing",
                self.fog_enemy.reposition_index
            );
        }
        Ok(())
    }
}
