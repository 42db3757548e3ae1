#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the virtual world without a display.
//!
//! The adapter loads a world file, drives the scheduler with a simulated
//! clock that ticks in fixed steps, and reports what is left standing.

mod report;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use virtual_world_core::{ImageCatalog, ImageStore};
use virtual_world_model::{self as model, query, Background, World};
use virtual_world_system_behavior::Simulation;
use virtual_world_system_scheduler::{Config, EventScheduler};

use crate::report::RunReport;

/// Runs a world file headlessly on a simulated clock.
#[derive(Debug, Parser)]
#[command(name = "virtual-world", version)]
struct Cli {
    /// World file describing backgrounds and entities, one record per line.
    world: PathBuf,
    /// Number of grid columns.
    #[arg(long, default_value_t = 40)]
    columns: u32,
    /// Number of grid rows.
    #[arg(long, default_value_t = 30)]
    rows: u32,
    /// Multiplier applied to every scheduled period.
    #[arg(long, default_value_t = 1.0, value_parser = parse_time_scale)]
    time_scale: f64,
    /// Simulated time at which the run stops.
    #[arg(long, default_value_t = 60_000)]
    duration: u64,
    /// Amount the simulated clock advances per step.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    step: u64,
    /// Seed for ore corruption and blob animation periods.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
    /// Image key used for every cell not named by a background record.
    #[arg(long, default_value = "grass")]
    background: String,
    /// Print the final world state as TOML.
    #[arg(long)]
    dump: bool,
}

/// Entry point for the virtual world command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(&cli)
}

fn parse_time_scale(raw: &str) -> Result<f64, String> {
    let time_scale: f64 = raw.parse().map_err(|error| format!("{error}"))?;
    if Config::is_valid_time_scale(time_scale) {
        Ok(time_scale)
    } else {
        Err(format!("time scale must be positive and finite, got {raw}"))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> Result<()> {
    let source = fs::read_to_string(&cli.world)
        .with_context(|| format!("failed to read world file {}", cli.world.display()))?;

    let images = ImageCatalog::new();
    let background = Background::new(cli.background.as_str(), images.image_list(&cli.background));
    let mut world = World::new(cli.columns, cli.rows, background);
    let report = model::load(&mut world, &source, &images);
    if !report.errors.is_empty() {
        warn!(rejected = report.errors.len(), "some world-file records were skipped");
    }
    info!(
        entities = report.entities,
        backgrounds = report.backgrounds,
        "world loaded"
    );

    let scheduler = EventScheduler::new(Config::new(cli.time_scale));
    let mut simulation = Simulation::new(world, scheduler, ChaCha8Rng::seed_from_u64(cli.seed), images);
    simulation.schedule_all_actions();

    let mut dispatched = 0;
    let mut now = 0;
    while now < cli.duration {
        now = now.saturating_add(cli.step).min(cli.duration);
        dispatched += simulation.advance(now);
    }

    let census = query::census(simulation.world());
    for (kind, count) in census.iter() {
        info!(?kind, count, "census");
    }
    info!(time = now, dispatched, total = census.total(), "simulation stopped");

    if cli.dump {
        let rendered = RunReport::capture(simulation.world(), now, dispatched)
            .to_toml()
            .context("failed to render run report")?;
        println!("{rendered}");
    }
    Ok(())
}
