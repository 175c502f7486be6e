use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kolkhoz::{
    buildings::BuildingRegistry,
    engine::{EngineBuilder, EngineSettings, GameSpeed},
    scenario::ScenarioLoader,
    snapshot::SaveGame,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless kolkhoz simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/tiny_kolkhoz.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Ticks per timer fire, 1 to 3
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    speed: u8,

    /// Override autosave interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for autosaves
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Resume from a save file instead of the scenario's starting state
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Write a save file once the run finishes
    #[arg(long)]
    save_to: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let ticks = scenario.ticks(cli.ticks);
    let speed = GameSpeed::from_multiplier(cli.speed).unwrap_or_default();
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: Some(scenario.seed),
        start: scenario.start_clock()?,
        doctrine: scenario.doctrine,
        snapshot_interval_ticks: cli
            .snapshot_interval
            .unwrap_or(scenario.snapshot_interval_ticks),
        snapshot_dir: cli
            .snapshot_dir
            .unwrap_or_else(|| PathBuf::from("snapshots")),
    };

    let builder = EngineBuilder::new(settings);
    let (mut engine, mut world) = match &cli.resume {
        Some(path) => {
            let save = SaveGame::load(path)
                .with_context(|| format!("Failed to load save {}", path.display()))?;
            builder
                .resume(save, BuildingRegistry::standard())
                .with_context(|| format!("Failed to resume from {}", path.display()))?
        }
        None => {
            let world = scenario.build_world(BuildingRegistry::standard())?;
            (builder.build(), world)
        }
    };

    let per_fire = speed.ticks_per_fire();
    for _ in 0..ticks / per_fire {
        engine.advance(&mut world, speed)?;
    }
    engine.run(&mut world, ticks % per_fire)?;

    if let Some(path) = &cli.save_to {
        engine
            .save(&world)
            .write_to(path)
            .with_context(|| format!("Failed to write save {}", path.display()))?;
    }

    let clock = engine.chronology().clock();
    println!(
        "Scenario '{}' reached {}-{:02}-{:02} after {} ticks. Population: {} in {} households, food {:.1}",
        engine.scenario_name(),
        clock.year,
        clock.month,
        clock.day,
        clock.total_ticks,
        world.total_population(),
        world.households().len(),
        world.resources().food
    );
    Ok(())
}
