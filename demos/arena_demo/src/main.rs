//! Headless skirmish between a scripted player and two mages.
//!
//! Usage: `arena_demo [config.json]`. Without an argument the default config is
//! used with two walls and a pillar in the middle of the arena.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use mirage2d::{Intent, ObstacleDef, ObstacleShape, Simulation, SimulationConfig, Vec2};

const FRAME: Duration = Duration::from_millis(16);
const FRAMES: usize = 900;

fn load_config() -> Result<SimulationConfig> {
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            log::info!("loading config from {}", path.display());
            SimulationConfig::load_from_file(&path)
        }
        None => Ok(SimulationConfig::new()
            .with_seed(7)
            .with_obstacle(ObstacleDef {
                shape: ObstacleShape::Box { hx: 1.5, hy: 0.1 },
                position: Vec2::new(-1.0, 1.8),
                rotation: 0.0,
            })
            .with_obstacle(ObstacleDef {
                shape: ObstacleShape::Box { hx: 1.5, hy: 0.1 },
                position: Vec2::new(1.0, -1.8),
                rotation: 0.0,
            })
            .with_obstacle(ObstacleDef {
                shape: ObstacleShape::Circle { radius: 0.4 },
                position: Vec2::ZERO,
                rotation: 0.0,
            })),
    }
}

// (frame, key, pressed)
const SCRIPT: &[(usize, &str, bool)] = &[
    (0, "D", true),
    (90, "D", false),
    (90, "W", true),
    (200, "J", true),
    (201, "J", false),
    (240, "W", false),
    (300, "K", true),
    (301, "K", false),
    (420, "A", true),
    (600, "A", false),
    (620, "J", true),
    (621, "J", false),
];

fn main() -> Result<()> {
    env_logger::init();

    let config = load_config()?;
    let mut sim = Simulation::new(config)?;
    let player = sim.spawn_player(Vec2::new(-2.0, 0.0))?;
    let mages = [
        sim.spawn_mage(Vec2::new(2.0, 0.5))?,
        sim.spawn_mage(Vec2::new(1.5, -2.5))?,
    ];

    for frame in 0..FRAMES {
        for &(_, key, pressed) in SCRIPT.iter().filter(|(at, _, _)| *at == frame) {
            sim.handle_key(key, pressed);
        }

        let report = sim.advance(FRAME)?;
        for tick in &report.ticks {
            for (id, intent) in &tick.intents {
                match intent {
                    Intent::Cast { direction } => {
                        log::info!("frame {frame}: {id:?} casts toward ({:.2}, {:.2})", direction.x, direction.y)
                    }
                    Intent::Melee { .. } => log::info!("frame {frame}: {id:?} swings"),
                    Intent::Pickup => log::info!("frame {frame}: {id:?} reaches for something"),
                }
            }
            for id in &tick.hits {
                log::info!("frame {frame}: {id:?} was hit");
            }
        }
        for id in &report.deaths {
            log::info!("frame {frame}: {id:?} died");
        }

        if frame % 60 == 0 {
            for id in std::iter::once(player).chain(mages) {
                if let Some(actor) = sim.actor(id) {
                    log::debug!(
                        "{id:?} at ({:.2}, {:.2}) hp {} mana {} state {} {:?}",
                        actor.position().x,
                        actor.position().y,
                        actor.health().current(),
                        actor.mana().current(),
                        actor.state().bit_string(),
                        actor.active_actions(),
                    );
                }
            }
        }
    }

    log::info!(
        "ran {} ticks over {:.2}s",
        sim.tick_count(),
        sim.elapsed_time().as_secs_f32()
    );
    Ok(())
}
