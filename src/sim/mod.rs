//! Simulation module
//!
//! All gameplay logic lives here. Collaborators are reached only through
//! `platform::Ctx`, and everything random draws from seeded PCG streams:
//! - Frame deltas are supplied by the caller (already clamped)
//! - Stable iteration order (container order)
//! - No rendering, audio or physics internals

pub mod actor;
pub mod enemy;
pub mod fog_enemy;
pub mod pickup;
pub mod player;
pub mod state;
pub mod steering;
pub mod tick;
pub mod waves;

pub use actor::{Actor, ActorBase, Hit, Vitals};
pub use enemy::{Enemy, EnemyKind, EnemyState, Ranges, Senses, next_state};
pub use fog_enemy::{FogEffect, FogEnemy, FogEnemyState, Grenade};
pub use pickup::{Pickup, Powerup, PowerupKind};
pub use player::{ActiveEffects, DebugRay, Player, PlayerInput};
pub use state::{GamePhase, GameState, GameStats, HeadlessGame};
pub use steering::{Steering, strafe_sign};
pub use tick::{AttackCandidate, TickInput, resolve_attack_permissions, tick};
pub use waves::{Population, SpawnKind, wave_for_time};

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Vec3;

    use crate::audio::HeadlessSoundEngine;
    use crate::physics::RapierWorld;
    use crate::platform::Systems;
    use crate::renderer::RecordingRenderer;

    pub type Headless = Systems<RapierWorld, RecordingRenderer, HeadlessSoundEngine>;

    /// Reference collaborators with no gravity and no ground
    pub fn weightless() -> Headless {
        Systems::new(
            RapierWorld::new(Vec3::ZERO),
            RecordingRenderer::default(),
            HeadlessSoundEngine::default(),
        )
    }
}
