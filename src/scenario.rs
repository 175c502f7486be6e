use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    buildings::{BuildingFact, BuildingRegistry, GridPos},
    systems::{
        chronology::{Clock, DAYS_PER_MONTH, MONTHS_PER_YEAR},
        deliveries::Doctrine,
    },
    world::{CitizenClass, NewMember, ResourceStock, World},
};

fn default_snapshot_interval_ticks() -> u64 {
    90
}

fn default_doctrine() -> Doctrine {
    Doctrine::Revolutionary
}

fn default_true() -> bool {
    true
}

fn default_class() -> CitizenClass {
    CitizenClass::Kolkhoznik
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("start date {year}-{month:02}-{day:02} is outside the calendar")]
    BadStartDate { year: i32, month: u32, day: u32 },
    #[error("unknown building `{0}`")]
    UnknownBuilding(String),
    #[error("household `{0}` has no members")]
    EmptyHousehold(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    pub start: StartDate,
    #[serde(default = "default_doctrine")]
    pub doctrine: Doctrine,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub resources: ResourceInit,
    #[serde(default)]
    pub buildings: Vec<ScenarioBuilding>,
    #[serde(default)]
    pub households: Vec<ScenarioHousehold>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StartDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceInit {
    #[serde(default)]
    pub food: f64,
    #[serde(default)]
    pub money: f64,
    #[serde(default)]
    pub vodka: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioBuilding {
    pub def_id: String,
    #[serde(default = "default_true")]
    pub powered: bool,
    #[serde(default = "default_true")]
    pub operational: bool,
    #[serde(default)]
    pub at: GridPos,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioHousehold {
    pub surname: String,
    #[serde(default = "default_class")]
    pub class: CitizenClass,
    pub members: Vec<NewMember>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .start_clock()
            .with_context(|| format!("Invalid start date in {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn start_clock(&self) -> std::result::Result<Clock, ScenarioError> {
        let StartDate { year, month, day } = self.start;
        if !(1..=MONTHS_PER_YEAR).contains(&month) || !(1..=DAYS_PER_MONTH).contains(&day) {
            return Err(ScenarioError::BadStartDate { year, month, day });
        }
        Ok(Clock::start(year, month, day))
    }

    /// Places buildings and founds households against `registry`.
    pub fn build_world(
        &self,
        registry: BuildingRegistry,
    ) -> std::result::Result<World, ScenarioError> {
        let stock = ResourceStock {
            food: self.resources.food,
            money: self.resources.money,
            vodka: self.resources.vodka,
            ..ResourceStock::default()
        };
        let mut world = World::new(registry, stock);
        for building in &self.buildings {
            if world.registry().get(&building.def_id).is_none() {
                return Err(ScenarioError::UnknownBuilding(building.def_id.clone()));
            }
            let mut fact =
                BuildingFact::new(&building.def_id, building.powered, building.operational);
            fact.grid_pos = building.at;
            world.place_building(fact);
        }
        for household in &self.households {
            if household.members.is_empty() {
                return Err(ScenarioError::EmptyHousehold(household.surname.clone()));
            }
            world.found_dvor(
                household.surname.clone(),
                household.members.clone(),
                household.class,
            );
        }
        tracing::debug!(
            scenario = %self.name,
            households = world.households().len(),
            population = world.total_population(),
            "world built"
        );
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(360)
    }
}
