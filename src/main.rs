//! Grapple Swing headless arena
//!
//! Builds the demo arena, drives it with a fixed-step loop and logs what the
//! agents do. The player "taps" the grapple toggle on a fixed interval.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use grapple_swing::SwingConfig;
use grapple_swing::arena::{Arena, ArenaLayout};
use grapple_swing::sim::{FixedStepper, SwingEvent, SwingWorld, TickInput, tick};

/// Grapple Swing arena simulation
#[derive(Parser, Debug)]
#[command(version, about = "Runs the grapple swing arena headless and logs the outcome")]
struct Cli {
    /// JSON tuning file (defaults are used when absent)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run seed
    #[arg(short, long, default_value_t = 1)]
    seed: u64,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 30.0)]
    seconds: f32,

    /// Number of AI enemies
    #[arg(short, long, default_value_t = 4)]
    enemies: usize,

    /// Seconds between scripted player grapple taps (0 disables)
    #[arg(long, default_value_t = 1.5)]
    tap_every: f32,

    /// Frame time fed to the fixed stepper
    #[arg(long, default_value_t = 1.0 / 30.0)]
    frame_dt: f32,

    /// Write the final world snapshot as JSON
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.frame_dt <= 0.0 {
        return Err(format!("--frame-dt must be positive, got {}", cli.frame_dt).into());
    }
    let config = match &cli.config {
        Some(path) => SwingConfig::load(path)?,
        None => SwingConfig::default(),
    };
    log::info!("Grapple Swing starting (seed {})", cli.seed);

    let mut stepper = FixedStepper::from_config(&config.physics);
    let mut world = SwingWorld::new(config, cli.seed);
    let mut arena = Arena::build(&mut world, ArenaLayout::default(), cli.enemies);

    let mut elapsed = 0.0_f32;
    let mut since_tap = 0.0_f32;
    let mut releases = 0_u32;
    let mut attaches = 0_u32;

    while elapsed < cli.seconds {
        stepper.advance(cli.frame_dt, |dt| {
            let mut input = TickInput {
                game_ended: arena.game_ended(),
                ..TickInput::default()
            };
            since_tap += dt;
            if cli.tap_every > 0.0 && since_tap >= cli.tap_every {
                since_tap = 0.0;
                input = TickInput {
                    game_ended: input.game_ended,
                    ..TickInput::toggle(arena.player)
                };
            }

            tick(&mut world, &input, dt);

            for event in world.drain_events() {
                match event {
                    SwingEvent::Attached { .. } => attaches += 1,
                    SwingEvent::Released { .. } => releases += 1,
                    _ => {}
                }
            }
            let report = arena.check_lose_zone(&mut world);
            if let (true, Some(ended)) = (report.player_lost, arena.ended_at_tick()) {
                log::info!("Game over at {:.2}s (tick {})", ended as f32 * dt, ended);
            }
        });
        elapsed += cli.frame_dt;
    }

    log::info!(
        "Done after {:.1}s: {} attaches, {} releases, {} agents left",
        elapsed,
        attaches,
        releases,
        world.agents.len()
    );

    if let Some(path) = &cli.snapshot {
        let json = serde_json::to_string_pretty(&world.snapshot())?;
        fs::write(path, json)?;
        log::info!("Snapshot written to {}", path.display());
    }
    Ok(())
}
