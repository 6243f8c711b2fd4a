//! Platform abstraction layer
//!
//! Bundles the three collaborators the simulation talks to and pumps frame
//! time:
//! - `Systems`: owned physics world, renderer and sound engine
//! - `Ctx`: the borrowed view actors receive during a frame
//! - `FrameClock`: delta clamping so a stalled frame never explodes the sim

use crate::audio::{AudioMix, SoundEffect, SoundEngine, SoundId, play_effect};
use crate::consts::MAX_FRAME_DT;
use crate::physics::PhysicsWorld;
use crate::renderer::Renderer;

/// Collaborators owned by a running game
#[derive(Debug)]
pub struct Systems<P, R, S> {
    pub physics: P,
    pub renderer: R,
    pub sound: S,
    pub mix: AudioMix,
}

impl<P: PhysicsWorld, R: Renderer, S: SoundEngine> Systems<P, R, S> {
    pub fn new(physics: P, renderer: R, sound: S) -> Self {
        Self {
            physics,
            renderer,
            sound,
            mix: AudioMix::default(),
        }
    }

    /// Borrow every collaborator at once
    pub fn ctx(&mut self) -> Ctx<'_> {
        Ctx {
            physics: &mut self.physics,
            renderer: &mut self.renderer,
            sound: &mut self.sound,
            mix: self.mix,
        }
    }
}

/// Per-frame access to the collaborators
pub struct Ctx<'a> {
    pub physics: &'a mut dyn PhysicsWorld,
    pub renderer: &'a mut dyn Renderer,
    pub sound: &'a mut dyn SoundEngine,
    pub mix: AudioMix,
}

impl Ctx<'_> {
    /// Fire-and-forget sound
    pub fn play(&mut self, effect: SoundEffect) {
        if let Some(id) = play_effect(&mut *self.sound, self.mix, effect) {
            self.sound.release(id);
        }
    }

    /// Sound whose handle the caller keeps (and must stop or release)
    pub fn play_tracked(&mut self, effect: SoundEffect) -> Option<SoundId> {
        play_effect(&mut *self.sound, self.mix, effect)
    }
}

/// Frame delta pump
#[derive(Debug, Clone)]
pub struct FrameClock {
    max_dt: f32,
    elapsed: f64,
    frames: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(MAX_FRAME_DT)
    }
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self {
            max_dt,
            elapsed: 0.0,
            frames: 0,
        }
    }

    /// Clamp a raw frame delta into `[0, max_dt]` and account for it
    pub fn advance(&mut self, raw_dt: f32) -> f32 {
        let dt = if raw_dt.is_finite() {
            raw_dt.clamp(0.0, self.max_dt)
        } else {
            0.0
        };
        self.elapsed += dt as f64;
        self.frames += 1;
        dt
    }

    /// Simulated seconds so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
