//! Moonhop entry point
//!
//! Headless demo: builds a small in-memory map, lets a scripted player
//! run it to the grand finale and prints the service transcript. The
//! simulation itself lives in the library; a rendering shell would drive
//! `Game` the same way this loop does.

use moonhop::consts::SIM_DT;
use moonhop::content::{
    ChallengeConfig, FleeConfig, LevelConfig, MapConfig, MemoryContent, PlanetConfig, PolarCoords,
    SpeedConfig,
};
use moonhop::services::Services;
use moonhop::settings::DetailPreset;
use moonhop::sim::pool::keys;
use moonhop::sim::{Game, PlayerPhase};

fn demo_content() -> MemoryContent {
    let map = MapConfig {
        level_config_list: vec![
            LevelConfig {
                level_debug_id: 1,
                polar_coords: PolarCoords { rho: 2.0, phi: 270.0 },
                challenge_filename_list: vec!["ring_easy".into(), "ring_easy".into()],
            },
            LevelConfig {
                level_debug_id: 2,
                polar_coords: PolarCoords { rho: 2.5, phi: 250.0 },
                challenge_filename_list: vec!["ring_guarded".into()],
            },
        ],
    };
    let mut content = MemoryContent::new(map);
    content.insert(
        "ring_easy",
        ChallengeConfig {
            polar_coords: PolarCoords { rho: 2.0, phi: 270.0 },
            flee_config: FleeConfig { flee_speed: 2.0, shrink_time: 0.5 },
            planet_config_list: Vec::new(),
        },
    );
    content.insert(
        "ring_guarded",
        ChallengeConfig {
            polar_coords: PolarCoords { rho: 2.5, phi: 290.0 },
            flee_config: FleeConfig { flee_speed: 2.0, shrink_time: 0.5 },
            planet_config_list: vec![PlanetConfig {
                radius: 0.6,
                moon_key_list: vec![keys::SMALL_BLUE.into()],
                speed_config: SpeedConfig {
                    initial_speed: 0.5,
                    clockwise: true,
                    ..Default::default()
                },
                ..Default::default()
            }],
        },
    );
    content
}

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(42);
    log::info!("moonhop headless demo, seed {seed}");

    let (services, log) = Services::recording(DetailPreset::High);
    let Some(mut game) = Game::new(Box::new(demo_content()), services, DetailPreset::High, seed)
    else {
        eprintln!("could not load the demo map");
        std::process::exit(1);
    };

    let mut frames = 0usize;
    while !game.is_grand_finale() && !game.is_game_over() && frames < 30_000 {
        if game.player().phase == PlayerPhase::Idle {
            game.jump();
        }
        game.update(SIM_DT);
        frames += 1;
    }
    // let the fireworks play for a moment
    for _ in 0..150 {
        game.update(SIM_DT);
    }

    println!("\n--- transcript ---");
    for entry in log.entries() {
        println!("{entry}");
    }
    println!("--- end ---\n");

    let outcome = if game.is_grand_finale() {
        "grand finale"
    } else if game.is_game_over() {
        "game over"
    } else {
        "timed out"
    };
    println!(
        "{outcome} after {:.1}s: level {}/{}, score {}",
        frames as f32 * SIM_DT,
        game.manager().level(),
        game.manager().level_count(),
        game.score()
    );
}
