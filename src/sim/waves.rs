//! Wave tiers and spawn selection
//!
//! The round timer counts down; the first tier whose threshold the timer is
//! still above is the active wave. Tiers are ordered from wave 1 onward.

use rand::Rng;

use crate::tuning::{Gate, WaveTier};

/// What the director may spawn next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnKind {
    Basic,
    Fast,
    Fog,
}

/// Live (non-removed) enemy counts per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Population {
    pub basic: u32,
    pub fast: u32,
    pub fog: u32,
}

/// Active wave (1-based) and its tier for a round timer value
pub fn wave_for_time(timer: f32, tiers: &[WaveTier]) -> Option<(u32, &WaveTier)> {
    let idx = tiers
        .iter()
        .position(|t| timer > t.above)
        .unwrap_or(tiers.len().checked_sub(1)?);
    tiers.get(idx).map(|t| (idx as u32 + 1, t))
}

/// Kinds still under their cap, in a fixed order
pub fn eligible_kinds(tier: &WaveTier, pop: &Population) -> Vec<SpawnKind> {
    let mut kinds = Vec::with_capacity(3);
    if pop.basic < tier.max_basic {
        kinds.push(SpawnKind::Basic);
    }
    if pop.fast < tier.max_fast {
        kinds.push(SpawnKind::Fast);
    }
    if pop.fog < tier.max_fog {
        kinds.push(SpawnKind::Fog);
    }
    kinds
}

/// Uniform pick among the eligible kinds; `None` when every cap is reached
pub fn choose_spawn<R: Rng + ?Sized>(rng: &mut R, tier: &WaveTier, pop: &Population) -> Option<SpawnKind> {
    let kinds = eligible_kinds(tier, pop);
    if kinds.is_empty() {
        return None;
    }
    Some(kinds[rng.random_range(0..kinds.len())])
}

/// Gate by index; out-of-range indices are rejected
pub fn gate_at(gates: &[Gate], index: usize) -> Option<&Gate> {
    gates.get(index)
}

/// Random gate, `None` when no gates are configured
pub fn pick_gate<'a, R: Rng + ?Sized>(rng: &mut R, gates: &'a [Gate]) -> Option<&'a Gate> {
    if gates.is_empty() {
        return None;
    }
    gate_at(gates, rng.random_range(0..gates.len()))
}
