//! Survive headless driver
//!
//! Plays one round against the reference collaborators with a simple
//! aim-and-kite bot, then prints the round summary.
//!
//! Usage: `survive [TUNING.json | -] [SEED]`

use std::process::ExitCode;

use survive::Tuning;
use survive::platform::FrameClock;
use survive::sim::{Actor, GamePhase, HeadlessGame, PlayerInput, TickInput, tick};
use survive::{forward_to_yaw, ground_direction};

const DEFAULT_SEED: u64 = 0x5eed;
/// Simulated display refresh
const FRAME_DT: f32 = 1.0 / 60.0;
/// Safety net in case a tuning file makes the round endless
const MAX_FRAMES: u64 = 60 * 60 * 10;
/// The bot opens fire inside this distance
const ENGAGE_RANGE: f32 = 600.0;
/// The bot backs off inside this distance
const KITE_RANGE: f32 = 150.0;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let tuning = match args.next().as_deref() {
        None | Some("-") => Tuning::default(),
        Some(path) => match Tuning::load(path) {
            Ok(tuning) => tuning,
            Err(err) => {
                log::error!("{err}");
                return ExitCode::FAILURE;
            }
        },
    };
    let seed = match args.next() {
        Some(raw) => match raw.parse() {
            Ok(seed) => seed,
            Err(_) => {
                log::error!("Seed must be an unsigned integer, got {raw:?}");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_SEED,
    };

    log::info!("Survive (headless) starting, seed {seed}");
    let mut state = HeadlessGame::headless(seed, tuning);
    let mut clock = FrameClock::default();

    while state.phase == GamePhase::Playing && clock.frames() < MAX_FRAMES {
        state.systems.renderer.begin_frame();
        let dt = clock.advance(FRAME_DT);
        let input = bot_input(&state);
        tick(&mut state, &input, dt);
        state.systems.sound.advance(dt);
    }

    log::info!(
        "{:?} after {:.1} s: wave {}, {} kills, health {}, ammo {}",
        state.phase,
        clock.elapsed(),
        state.stats.wave,
        state.stats.kills,
        state.player.health(),
        state.player.ammo()
    );
    match serde_json::to_string_pretty(&state.stats) {
        Ok(json) => println!("{json}"),
        Err(err) => log::warn!("Could not serialize stats: {err}"),
    }
    state.teardown();
    ExitCode::SUCCESS
}

/// Face the nearest live enemy, shoot when in range, back off when close
fn bot_input(state: &HeadlessGame) -> TickInput {
    let player = state.player_position();
    let physics = &state.systems.physics;
    let renderer = &state.systems.renderer;

    let nearest = state
        .enemies
        .iter()
        .filter(|e| !e.is_dead())
        .map(|e| e.base().position(physics, renderer))
        .chain(
            state
                .fog_enemies
                .iter()
                .filter(|f| !f.is_dead())
                .map(|f| f.base().position(physics, renderer)),
        )
        .min_by(|a, b| a.distance(player).total_cmp(&b.distance(player)));

    let Some(target) = nearest else {
        return TickInput::default();
    };
    let distance = target.distance(player);
    let camera_yaw = forward_to_yaw(ground_direction(player, target));

    TickInput {
        player: PlayerInput {
            aim: true,
            fire: distance < ENGAGE_RANGE,
            back: distance < KITE_RANGE,
            camera_yaw,
            ..Default::default()
        },
        ..Default::default()
    }
}
