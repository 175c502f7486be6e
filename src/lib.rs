pub mod buildings;
pub mod engine;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, GameSpeed, SimTickResult};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::World;
