//! Per-frame combat director
//!
//! Advances a round by one (already clamped) frame delta. The steps run in a
//! fixed order; later steps see the results of earlier ones in the same frame.

use crate::audio::SoundEngine;
use crate::consts::MAX_SUBSTEPS;
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::platform::Ctx;
use crate::renderer::Renderer;

use super::actor::{Actor, Hit};
use super::enemy::{Enemy, EnemyState};
use super::fog_enemy::FogEnemy;
use super::player::PlayerInput;
use super::state::{GamePhase, GameState};
use super::waves::wave_for_time;

/// Line color of the shot ray in the debug overlay (RGBA)
pub const DEBUG_RAY_COLOR: [u8; 4] = [0, 100, 255, 255];

/// Input commands for a single frame
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Movement, aim and fire
    pub player: PlayerInput,
    /// Flip the debug overlay
    pub toggle_debug: bool,
}

/// What attack arbitration needs to know about one enemy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackCandidate {
    pub state: EnemyState,
    pub dead: bool,
    /// Distance to the player
    pub distance: f32,
}

/// Decide who may attack this frame.
///
/// Every live enemy already attacking keeps permission. Otherwise the single
/// nearest live enemy that is chasing or waiting gets it; ties go to the
/// earlier one.
pub fn resolve_attack_permissions(candidates: &[AttackCandidate]) -> Vec<bool> {
    let mut grants: Vec<bool> = candidates
        .iter()
        .map(|c| !c.dead && c.state == EnemyState::Attack)
        .collect();
    if grants.iter().any(|&g| g) {
        return grants;
    }

    let mut nearest: Option<(usize, f32)> = None;
    for (i, c) in candidates.iter().enumerate() {
        if c.dead || !matches!(c.state, EnemyState::Chase | EnemyState::WaitAttack) {
            continue;
        }
        if nearest.is_none_or(|(_, best)| c.distance < best) {
            nearest = Some((i, c.distance));
        }
    }
    if let Some((i, _)) = nearest {
        grants[i] = true;
    }
    grants
}

/// Advance the round by one frame
pub fn tick<P, R, S>(state: &mut GameState<P, R, S>, input: &TickInput, dt: f32)
where
    P: PhysicsWorld,
    R: Renderer,
    S: SoundEngine,
{
    // Nothing moves once the round is decided
    if state.phase != GamePhase::Playing {
        return;
    }

    if input.toggle_debug {
        state.show_debug = !state.show_debug;
    }

    state.player.handle_input(dt, &input.player, &mut state.systems.ctx());
    let player_pos = state.player_position();

    // 1. Attack permission
    let candidates: Vec<AttackCandidate> = state
        .enemies
        .iter()
        .map(|e| AttackCandidate {
            state: e.state(),
            dead: e.is_dead(),
            distance: e
                .base()
                .position(&state.systems.physics, &state.systems.renderer)
                .distance(player_pos),
        })
        .collect();
    let grants = resolve_attack_permissions(&candidates);
    for (enemy, allowed) in state.enemies.iter_mut().zip(grants) {
        enemy.set_attack_allowed(allowed);
    }

    // 2. Salute permission
    for enemy in &mut state.enemies {
        enemy.set_salute_allowed(!enemy.is_dead() && enemy.state() == EnemyState::Chase);
    }

    // 3. AI
    {
        let mut ctx = state.systems.ctx();
        for enemy in &mut state.enemies {
            enemy.update_ai(dt, player_pos, &mut ctx, &mut state.salutes);
        }
        for fog in &mut state.fog_enemies {
            fog.update_ai(dt, player_pos, &mut ctx);
        }
    }

    // 4. Physics
    state.systems.physics.step_simulation(dt, MAX_SUBSTEPS);

    let mut ctx = state.systems.ctx();

    // 5. Visual sync
    state.player.sync(dt, &mut ctx);
    for enemy in &mut state.enemies {
        enemy.sync(dt, &mut ctx);
    }
    for fog in &mut state.fog_enemies {
        fog.sync(dt, &mut ctx);
    }
    for pickup in &mut state.pickups {
        pickup.sync(dt, &mut ctx);
    }
    for powerup in &mut state.powerups {
        powerup.sync(dt, &mut ctx);
    }

    // 6. Hitscan
    if let Some(hit) = state.player.last_hit() {
        let outcome = resolve_shot(
            hit,
            state.player.shot_damage(),
            &mut state.enemies,
            &mut state.fog_enemies,
            &mut ctx,
        );
        match outcome {
            Some(Hit::Killed) => {
                state.stats.shots_hit += 1;
                state.stats.kills += 1;
            }
            Some(Hit::Hurt) => state.stats.shots_hit += 1,
            Some(Hit::Ignored) | None => {}
        }
    }

    // 7. Attack triggers
    if let Some(player_body) = state.player.body() {
        for enemy in &mut state.enemies {
            let Some(trigger) = enemy.attack_trigger() else {
                continue;
            };
            if enemy.is_dead()
                || !ctx.physics.is_overlapping(trigger, player_body)
                || !enemy.wants_to_deal_damage()
            {
                continue;
            }
            let before = state.player.health();
            state.player.take_damage(enemy.damage(), &mut ctx);
            state.stats.damage_taken += before - state.player.health();
            enemy.reset_attack_cooldown(&mut ctx);
        }
    }
    // 8. Waves
    update_waves(state, dt);

    // 9. Pickups and powerups
    update_items(state, dt);

    // 10. Cleanup
    {
        let mut ctx = state.systems.ctx();
        purge(&mut state.enemies, &mut ctx);
        purge(&mut state.fog_enemies, &mut ctx);
        purge(&mut state.powerups, &mut ctx);
        purge(&mut state.pickups, &mut ctx);
    }

    if state.show_debug {
        let ray = state.player.debug_ray();
        if ray.active {
            state.systems.renderer.draw_debug_line(ray.start, ray.end, DEBUG_RAY_COLOR);
        }
    }

    if state.player.is_dead() {
        state.phase = GamePhase::GameOver;
        log::info!(
            "Game over in wave {} with {} kills",
            state.stats.wave,
            state.stats.kills
        );
    } else if state.round_timer <= 0.0 {
        state.phase = GamePhase::Won;
        log::info!("Round survived with {} kills", state.stats.kills);
    }
}

/// Map the body the player's ray hit back to a live actor and damage it
fn resolve_shot(
    hit: BodyHandle,
    damage: u32,
    enemies: &mut [Enemy],
    fog_enemies: &mut [FogEnemy],
    ctx: &mut Ctx,
) -> Option<Hit> {
    if let Some(enemy) = enemies
        .iter_mut()
        .find(|e| !e.is_dead() && e.body() == Some(hit))
    {
        return Some(enemy.take_damage(damage, ctx));
    }
    fog_enemies
        .iter_mut()
        .find(|f| !f.is_dead() && f.body() == Some(hit))
        .map(|fog| fog.take_damage(damage, ctx))
}

fn update_waves<P, R, S>(state: &mut GameState<P, R, S>, dt: f32)
where
    P: PhysicsWorld,
    R: Renderer,
    S: SoundEngine,
{
    state.round_timer = (state.round_timer - dt).max(0.0);

    let Some((wave, tier)) = wave_for_time(state.round_timer, &state.tuning.waves.tiers) else {
        return;
    };
    let tier = *tier;
    if wave != state.stats.wave {
        state.stats.wave = wave;
        log::info!(
            "Wave {wave}: up to {} basic, {} fast, {} fog every {} s",
            tier.max_basic,
            tier.max_fast,
            tier.max_fog,
            tier.spawn_interval
        );
    }

    state.spawn_timer = (state.spawn_timer - dt).max(0.0);
    if state.spawn_timer > 0.0 {
        return;
    }
    if state.spawn_wave_enemy(&tier) {
        state.spawn_timer = tier.spawn_interval;
    }
}

fn update_items<P, R, S>(state: &mut GameState<P, R, S>, dt: f32)
where
    P: PhysicsWorld,
    R: Renderer,
    S: SoundEngine,
{
    {
        let mut ctx = state.systems.ctx();
        let player_body = state.player.body().filter(|_| !state.player.is_dead());

        for pickup in &mut state.pickups {
            pickup.update(dt, &mut ctx);
            let (Some(trigger), Some(body)) = (pickup.trigger(), player_body) else {
                continue;
            };
            if !pickup.is_collected() && ctx.physics.is_overlapping(trigger, body) {
                state.player.add_ammo(pickup.amount(), &mut ctx);
                pickup.collect(&mut ctx);
                state.stats.pickups_collected += 1;
            }
        }

        for powerup in &mut state.powerups {
            powerup.update(dt);
            let (Some(trigger), Some(body)) = (powerup.trigger(), player_body) else {
                continue;
            };
            if !powerup.is_collected()
                && !powerup.is_removable()
                && ctx.physics.is_overlapping(trigger, body)
            {
                state
                    .player
                    .apply_powerup(powerup.kind(), &state.tuning.powerups, &mut ctx);
                powerup.collect(&mut ctx);
                state.stats.powerups_collected += 1;
            }
        }
    }

    state.powerup_timer -= dt;
    if state.powerup_timer <= 0.0 {
        state.powerup_timer = state.tuning.powerups.spawn_interval;
        // One on the field at a time
        if state.powerups.iter().all(|p| p.is_removable()) {
            state.spawn_random_powerup();
        }
    }
}

/// Release and drop every actor flagged for removal
fn purge<T: Actor>(actors: &mut Vec<T>, ctx: &mut Ctx) -> usize {
    let before = actors.len();
    actors.retain_mut(|actor| {
        if actor.is_removable() {
            actor.release(ctx);
            false
        } else {
            true
        }
    });
    before - actors.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::enemy::EnemyKind;
    use crate::sim::state::HeadlessGame;
    use crate::sim::waves::SpawnKind;
    use crate::tuning::Tuning;
    use glam::Vec3;
    use proptest::prelude::*;

    const DT: f32 = 0.0625;

    /// No wave spawns, quick enemy entrances
    fn quiet_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        tuning.waves.gates.clear();
        tuning.pickups.positions.clear();
        tuning.powerups.positions.clear();
        tuning.enemy.spawn_walk_distance = 0.0;
        tuning.enemy.salute_duration = 0.5;
        tuning
    }

    fn run(state: &mut HeadlessGame, frames: usize, input: &TickInput) {
        for _ in 0..frames {
            tick(state, input, DT);
        }
    }

    fn candidate(state: EnemyState, distance: f32) -> AttackCandidate {
        AttackCandidate {
            state,
            dead: false,
            distance,
        }
    }

    #[test]
    fn test_attackers_keep_permission() {
        let grants = resolve_attack_permissions(&[
            candidate(EnemyState::Chase, 10.0),
            candidate(EnemyState::Attack, 50.0),
            candidate(EnemyState::Attack, 40.0),
        ]);
        assert_eq!(grants, vec![false, true, true]);
    }

    #[test]
    fn test_nearest_waiting_enemy_wins() {
        let grants = resolve_attack_permissions(&[
            candidate(EnemyState::Chase, 80.0),
            candidate(EnemyState::WaitAttack, 30.0),
            candidate(EnemyState::Idle, 5.0),
            AttackCandidate {
                state: EnemyState::Chase,
                dead: true,
                distance: 1.0,
            },
        ]);
        assert_eq!(grants, vec![false, true, false, false]);
    }

    #[test]
    fn test_ties_go_to_first() {
        let grants = resolve_attack_permissions(&[
            candidate(EnemyState::Chase, 30.0),
            candidate(EnemyState::Chase, 30.0),
        ]);
        assert_eq!(grants, vec![true, false]);
        assert!(resolve_attack_permissions(&[]).is_empty());
    }

    fn arb_state() -> impl Strategy<Value = EnemyState> {
        prop_oneof![
            Just(EnemyState::Spawning),
            Just(EnemyState::Saluting),
            Just(EnemyState::Idle),
            Just(EnemyState::Chase),
            Just(EnemyState::WaitAttack),
            Just(EnemyState::Attack),
            Just(EnemyState::Dead),
        ]
    }

    proptest! {
        #[test]
        fn prop_single_attacker(
            raw in prop::collection::vec((arb_state(), any::<bool>(), 0.0f32..2000.0), 0..12)
        ) {
            let candidates: Vec<AttackCandidate> = raw
                .iter()
                .map(|&(state, dead, distance)| AttackCandidate { state, dead, distance })
                .collect();
            let grants = resolve_attack_permissions(&candidates);
            prop_assert_eq!(grants.len(), candidates.len());

            let attacking = candidates.iter().any(|c| !c.dead && c.state == EnemyState::Attack);
            for (c, &g) in candidates.iter().zip(&grants) {
                if c.dead {
                    prop_assert!(!g);
                }
                if attacking {
                    prop_assert_eq!(g, !c.dead && c.state == EnemyState::Attack);
                }
            }
            if !attacking {
                prop_assert!(grants.iter().filter(|&&g| g).count() <= 1);
                let eligible = candidates
                    .iter()
                    .filter(|c| !c.dead && matches!(c.state, EnemyState::Chase | EnemyState::WaitAttack));
                if let Some(min) = eligible.map(|c| c.distance).reduce(f32::min) {
                    let winner = grants.iter().position(|&g| g).unwrap();
                    prop_assert_eq!(candidates[winner].distance, min);
                }
            }
        }
    }

    #[test]
    fn test_wave_tiers_cap_spawns() {
        let mut tuning = Tuning::default();
        tuning.pickups.positions.clear();
        tuning.powerups.positions.clear();
        let mut state = HeadlessGame::headless(5, tuning);

        tick(&mut state, &TickInput::default(), DT);
        assert_eq!(state.stats.wave, 1);
        assert_eq!(state.enemies.len(), 1);

        // 16 s of wave 1: spawns every 4 s, capped at 3 basic enemies
        run(&mut state, 256, &TickInput::default());
        assert_eq!(state.stats.wave, 1);
        assert!(state.fog_enemies.is_empty());
        assert!(state.enemies.iter().all(|e| e.kind() == EnemyKind::Basic));
        assert_eq!(state.population().basic, 3);
        assert_eq!(state.stats.enemies_spawned, 3);
    }

    #[test]
    fn test_wave_number_follows_round_timer() {
        let mut state = HeadlessGame::headless(5, quiet_tuning());
        for (timer, wave) in [(150.0, 1), (90.0, 2), (30.0, 3)] {
            state.round_timer = timer;
            tick(&mut state, &TickInput::default(), DT);
            assert_eq!(state.stats.wave, wave);
        }
    }

    #[test]
    fn test_shooting_kills_enemy() {
        let mut state = HeadlessGame::headless(9, quiet_tuning());
        state.spawn_enemy_at(EnemyKind::Basic, Vec3::new(0.0, 0.0, 300.0), Vec3::NEG_Z);

        // Let it land and finish saluting
        run(&mut state, 16, &TickInput::default());
        assert_eq!(state.enemies[0].state(), EnemyState::Chase);

        let fire = TickInput {
            player: PlayerInput {
                fire: true,
                ..Default::default()
            },
            ..Default::default()
        };
        for _ in 0..100 {
            tick(&mut state, &fire, DT);
            if state.stats.kills == 1 {
                break;
            }
        }
        assert_eq!(state.stats.kills, 1);
        assert_eq!(state.stats.shots_hit, 2);
        assert!(state.enemies[0].is_dead());
        assert!(state.player.ammo() <= 113);

        // Purged after the death timer
        run(&mut state, 30, &TickInput::default());
        assert!(state.enemies.is_empty());
        assert_eq!(state.stats.kills, 1);
    }

    #[test]
    fn test_adjacent_enemy_damages_player() {
        let mut state = HeadlessGame::headless(2, quiet_tuning());
        state.spawn_enemy_at(EnemyKind::Basic, Vec3::new(0.0, 0.0, 45.0), Vec3::NEG_Z);

        run(&mut state, 64, &TickInput::default());
        assert_eq!(state.enemies[0].state(), EnemyState::Attack);
        let health = state.player.health();
        assert!(health < 100);
        assert_eq!(health % 10, 0);
        assert_eq!(state.stats.damage_taken, 100 - health);
    }

    #[test]
    fn test_player_death_ends_round() {
        let mut tuning = quiet_tuning();
        tuning.player.max_health = 10;
        let mut state = HeadlessGame::headless(2, tuning);
        state.spawn_enemy_at(EnemyKind::Basic, Vec3::new(0.0, 0.0, 45.0), Vec3::NEG_Z);

        run(&mut state, 64, &TickInput::default());
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.player.is_dead());

        // Terminal phase: frozen
        let timer = state.round_timer;
        run(&mut state, 10, &TickInput::default());
        assert_eq!(state.round_timer, timer);
    }

    #[test]
    fn test_surviving_the_timer_wins() {
        let mut tuning = quiet_tuning();
        tuning.waves.round_duration = 1.0;
        let mut state = HeadlessGame::headless(2, tuning);
        run(&mut state, 15, &TickInput::default());
        assert_eq!(state.phase, GamePhase::Playing);
        run(&mut state, 1, &TickInput::default());
        assert_eq!(state.phase, GamePhase::Won);
        assert_eq!(state.round_timer, 0.0);
    }

    #[test]
    fn test_ammo_crate_under_player() {
        let mut tuning = quiet_tuning();
        tuning.pickups.positions = vec![Vec3::new(0.0, -25.0, 0.0)];
        let mut state = HeadlessGame::headless(2, tuning);

        tick(&mut state, &TickInput::default(), DT);
        assert_eq!(state.player.ammo(), 145);
        assert!(state.pickups[0].is_collected());

        // Still collected: no second grant while standing on it
        run(&mut state, 16, &TickInput::default());
        assert_eq!(state.player.ammo(), 145);
        assert_eq!(state.stats.pickups_collected, 1);
    }

    #[test]
    fn test_powerup_spawns_and_is_collected() {
        let mut tuning = quiet_tuning();
        tuning.powerups.spawn_interval = 1.0;
        tuning.powerups.positions = vec![Vec3::new(0.0, -25.0, 0.0)];
        let mut state = HeadlessGame::headless(4, tuning);

        run(&mut state, 16, &TickInput::default());
        assert_eq!(state.powerups.len(), 1);
        tick(&mut state, &TickInput::default(), DT);
        assert_eq!(state.stats.powerups_collected, 1);
        assert!(state.powerups.is_empty());
        let fx = state.player.effects();
        assert!(fx.speed_boost > 0.0 || fx.damage_boost > 0.0 || fx.god_mode > 0.0);
    }

    #[test]
    fn test_uncollected_powerup_expires() {
        let mut tuning = quiet_tuning();
        tuning.powerups.spawn_interval = 1.0;
        tuning.powerups.lifetime = 1.5;
        tuning.powerups.positions = vec![Vec3::new(500.0, -25.0, 500.0)];
        let mut state = HeadlessGame::headless(4, tuning);

        run(&mut state, 16, &TickInput::default());
        assert_eq!(state.powerups.len(), 1);
        // Only one on the field even though the spawn timer fires again
        run(&mut state, 16, &TickInput::default());
        assert_eq!(state.powerups.len(), 1);
        run(&mut state, 8, &TickInput::default());
        assert!(state.powerups.is_empty());
        assert_eq!(state.systems.physics.trigger_count(), 0);
    }

    #[test]
    fn test_debug_overlay_draws_shot() {
        let mut state = HeadlessGame::headless(2, quiet_tuning());
        let input = TickInput {
            player: PlayerInput {
                fire: true,
                ..Default::default()
            },
            toggle_debug: true,
        };
        tick(&mut state, &input, DT);
        assert!(state.show_debug);
        let lines = state.systems.renderer.debug_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].2, DEBUG_RAY_COLOR);
    }

    #[test]
    fn test_fog_enemy_reachable_by_shots() {
        let mut tuning = quiet_tuning();
        tuning.fog_enemy.spawn_walk_distance = 0.0;
        tuning.fog_enemy.fallback_duration = 5.0;
        let mut state = HeadlessGame::headless(3, tuning);
        state.spawn_fog_enemy_at(Vec3::new(0.0, 0.0, 200.0), Vec3::NEG_Z);
        run(&mut state, 16, &TickInput::default());

        let fire = TickInput {
            player: PlayerInput {
                fire: true,
                ..Default::default()
            },
            ..Default::default()
        };
        tick(&mut state, &fire, DT);
        assert_eq!(state.stats.shots_hit, 1);
        assert_eq!(state.fog_enemies[0].health(), 35);
    }

    #[test]
    fn test_same_seed_replays() {
        let tuning = Tuning::default();
        let script = |frame: usize| TickInput {
            player: PlayerInput {
                fire: frame % 20 == 0,
                left: (frame / 50) % 2 == 0,
                camera_yaw: (frame as f32 * 3.0) % 360.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let play = || {
            let mut state = HeadlessGame::headless(77, tuning.clone());
            for frame in 0..400 {
                tick(&mut state, &script(frame), DT);
            }
            let positions: Vec<Vec3> = state
                .enemies
                .iter()
                .map(|e| e.base().position(&state.systems.physics, &state.systems.renderer))
                .collect();
            (state.stats, state.player.health(), positions)
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn test_gate_spawn_walks_in() {
        let mut state = HeadlessGame::headless(3, quiet_tuning());
        state.tuning.waves.gates = Tuning::default().waves.gates;
        assert!(state.spawn_at_gate(SpawnKind::Basic, 0));
        // No body until the walk-in completes
        assert!(state.enemies[0].body().is_none());
        run(&mut state, 2, &TickInput::default());
        assert!(state.enemies[0].body().is_some());
    }
}
