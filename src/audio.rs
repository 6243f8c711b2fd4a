//! Sound collaborator contract and effect catalogue
//!
//! The simulation plays clips fire-and-forget, except the looped run sound and
//! the rate-limited enemy salutes, which keep their handle.

use std::collections::BTreeMap;

/// Playing sound handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub u32);

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Player fires the shotgun
    Shoot,
    /// Player footsteps (looped)
    Run,
    PlayerPain,
    PlayerDeath,
    AmmoPickup,
    PowerupPickup,
    /// Enemy salute taunt
    EnemySalute,
    /// Enemy melee swing
    EnemyAttack,
    EnemyPain,
    EnemyDeath,
    GrenadeThrow,
    /// Grenade bursts into fog
    FogBurst,
}

impl SoundEffect {
    pub fn clip(&self) -> &'static str {
        match self {
            SoundEffect::Shoot => "assets/audio/player/shotgun.mp3",
            SoundEffect::Run => "assets/audio/player/running.mp3",
            SoundEffect::PlayerPain => "assets/models/player/PAIN50_1.WAV",
            SoundEffect::PlayerDeath => "assets/models/player/death2.wav",
            SoundEffect::AmmoPickup => "assets/audio/player/ammo_pickup.mp3",
            SoundEffect::PowerupPickup => "assets/audio/player/powerup.mp3",
            SoundEffect::EnemySalute => "assets/audio/enemy/salute.wav",
            SoundEffect::EnemyAttack => "assets/audio/enemy/attack.wav",
            SoundEffect::EnemyPain => "assets/audio/enemy/pain.wav",
            SoundEffect::EnemyDeath => "assets/audio/enemy/death.wav",
            SoundEffect::GrenadeThrow => "assets/audio/fog_enemy/throw.wav",
            SoundEffect::FogBurst => "assets/audio/fog_enemy/fog_burst.wav",
        }
    }

    /// Per-effect volume before the mix is applied
    pub fn volume(&self) -> f32 {
        match self {
            SoundEffect::Shoot => 0.5,
            SoundEffect::Run => 0.3,
            SoundEffect::PlayerPain => 0.6,
            SoundEffect::PlayerDeath => 0.7,
            SoundEffect::AmmoPickup | SoundEffect::PowerupPickup => 0.5,
            SoundEffect::EnemySalute => 0.6,
            SoundEffect::EnemyAttack => 0.5,
            SoundEffect::EnemyPain | SoundEffect::EnemyDeath => 0.6,
            SoundEffect::GrenadeThrow => 0.5,
            SoundEffect::FogBurst => 0.7,
        }
    }

    pub fn looped(&self) -> bool {
        matches!(self, SoundEffect::Run)
    }
}

/// Volume settings applied on top of each effect's own volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioMix {
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub muted: bool,
}

impl Default for AudioMix {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }
}

impl AudioMix {
    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }
}

/// What the simulation needs from an audio engine
pub trait SoundEngine {
    fn play(&mut self, clip: &str, looped: bool, start_paused: bool) -> Option<SoundId>;
    fn set_volume(&mut self, sound: SoundId, volume: f32);
    fn set_paused(&mut self, sound: SoundId, paused: bool);
    fn is_finished(&self, sound: SoundId) -> bool;
    fn stop(&mut self, sound: SoundId);
    /// Give up the handle; the sound keeps playing
    fn release(&mut self, sound: SoundId);
}

/// Start an effect at its mixed volume and return its handle.
///
/// Returns `None` when muted or when the engine could not play the clip.
pub fn play_effect(engine: &mut dyn SoundEngine, mix: AudioMix, effect: SoundEffect) -> Option<SoundId> {
    let vol = mix.effective_volume() * effect.volume();
    if vol <= 0.0 {
        return None;
    }
    let id = engine.play(effect.clip(), effect.looped(), true)?;
    engine.set_volume(id, vol);
    engine.set_paused(id, false);
    Some(id)
}

/// Bounded set of concurrently playing salute sounds shared by all enemies
#[derive(Debug, Clone)]
pub struct SaluteSoundPool {
    cap: usize,
    active: Vec<SoundId>,
}

impl SaluteSoundPool {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            active: Vec::with_capacity(cap),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Play a salute if a slot is free, reclaiming finished slots first
    pub fn try_play(&mut self, engine: &mut dyn SoundEngine, mix: AudioMix) -> bool {
        self.active.retain(|&id| {
            if engine.is_finished(id) {
                engine.release(id);
                false
            } else {
                true
            }
        });
        if self.active.len() >= self.cap {
            return false;
        }
        match play_effect(engine, mix, SoundEffect::EnemySalute) {
            Some(id) => {
                self.active.push(id);
                true
            }
            None => false,
        }
    }
}

/// Clip length assumed by [`HeadlessSoundEngine`]
pub const HEADLESS_CLIP_SECONDS: f32 = 1.0;

#[derive(Debug, Clone)]
struct PlayingSound {
    looped: bool,
    paused: bool,
    volume: f32,
    elapsed: f32,
    stopped: bool,
}

/// Sound engine without output: tracks playback time and records every clip
#[derive(Debug, Clone, Default)]
pub struct HeadlessSoundEngine {
    sounds: BTreeMap<u32, PlayingSound>,
    next_id: u32,
    played: Vec<String>,
}

impl HeadlessSoundEngine {
    /// Advance playback of every unpaused sound
    pub fn advance(&mut self, dt: f32) {
        for sound in self.sounds.values_mut().filter(|s| !s.paused) {
            sound.elapsed += dt;
        }
    }

    /// Clip paths in play order
    pub fn played(&self) -> &[String] {
        &self.played
    }

    pub fn play_count(&self, effect: SoundEffect) -> usize {
        self.played.iter().filter(|c| *c == effect.clip()).count()
    }

    /// Handles still held and not finished
    pub fn playing_count(&self) -> usize {
        self.sounds
            .keys()
            .filter(|&&id| !self.is_finished(SoundId(id)))
            .count()
    }

    pub fn volume(&self, sound: SoundId) -> Option<f32> {
        self.sounds.get(&sound.0).map(|s| s.volume)
    }
}

impl SoundEngine for HeadlessSoundEngine {
    fn play(&mut self, clip: &str, looped: bool, start_paused: bool) -> Option<SoundId> {
        self.next_id += 1;
        self.sounds.insert(
            self.next_id,
            PlayingSound {
                looped,
                paused: start_paused,
                volume: 1.0,
                elapsed: 0.0,
                stopped: false,
            },
        );
        self.played.push(clip.to_string());
        Some(SoundId(self.next_id))
    }

    fn set_volume(&mut self, sound: SoundId, volume: f32) {
        if let Some(s) = self.sounds.get_mut(&sound.0) {
            s.volume = volume;
        }
    }

    fn set_paused(&mut self, sound: SoundId, paused: bool) {
        if let Some(s) = self.sounds.get_mut(&sound.0) {
            s.paused = paused;
        }
    }

    fn is_finished(&self, sound: SoundId) -> bool {
        match self.sounds.get(&sound.0) {
            Some(s) => s.stopped || (!s.looped && s.elapsed >= HEADLESS_CLIP_SECONDS),
            None => true,
        }
    }

    fn stop(&mut self, sound: SoundId) {
        if let Some(s) = self.sounds.get_mut(&sound.0) {
            s.stopped = true;
        }
    }

    fn release(&mut self, sound: SoundId) {
        self.sounds.remove(&sound.0);
    }
}
