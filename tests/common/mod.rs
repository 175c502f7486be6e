use std::path::Path;

use kolkhoz::{
    buildings::BuildingRegistry,
    engine::{Engine, EngineBuilder, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
    world::World,
};

pub fn tiny_kolkhoz() -> Scenario {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/tiny_kolkhoz.yaml")
        .expect("scenario should load")
}

pub fn settings(scenario: &Scenario, snapshot_dir: &Path, interval: u64) -> EngineSettings {
    EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: Some(scenario.seed),
        start: scenario.start_clock().expect("valid start"),
        doctrine: scenario.doctrine,
        snapshot_interval_ticks: interval,
        snapshot_dir: snapshot_dir.to_path_buf(),
    }
}

pub fn start(scenario: &Scenario, snapshot_dir: &Path, interval: u64) -> (Engine, World) {
    let world = scenario
        .build_world(BuildingRegistry::standard())
        .expect("world builds");
    let engine = EngineBuilder::new(settings(scenario, snapshot_dir, interval)).build();
    (engine, world)
}
