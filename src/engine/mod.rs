use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    buildings::BuildingRegistry,
    rng::GameRng,
    snapshot::{SaveError, SaveGame, SnapshotWriter, SAVE_GAME_VERSION},
    systems::{
        chronology::{ChronologyEngine, Clock, TickResult},
        deliveries::{DeliveryEngine, DeliveryResult, DeliveryTotals, Doctrine},
        demography::{DemographicTickResult, DemographyEngine},
        disease::{DiseaseEngine, DiseaseTickResult, OutbreakConditions},
        milestones::{MilestoneId, MilestoneTracker, ProgressSignals},
        production::{BuildingProduction, ProductionOutput, ProductionSource},
        storage::{StorageEngine, StorageResult},
    },
    world::{CitizenClass, DvorId, ResourceStock, World},
};

/// Years in one delivery plan period.
pub const PLAN_PERIOD_YEARS: u32 = 5;

pub struct EngineSettings {
    pub scenario_name: String,
    /// `None` falls back to an entropy seed; such a run cannot be replayed.
    pub seed: Option<u64>,
    pub start: Clock,
    pub doctrine: Doctrine,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

/// Timer multiplier: each fire runs this many ticks back to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameSpeed {
    #[default]
    Normal,
    Fast,
    Fastest,
}

impl GameSpeed {
    pub fn from_multiplier(multiplier: u8) -> Option<Self> {
        match multiplier {
            1 => Some(GameSpeed::Normal),
            2 => Some(GameSpeed::Fast),
            3 => Some(GameSpeed::Fastest),
            _ => None,
        }
    }

    pub fn ticks_per_fire(self) -> u64 {
        match self {
            GameSpeed::Normal => 1,
            GameSpeed::Fast => 2,
            GameSpeed::Fastest => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanReport {
    pub closing_year: i32,
    pub totals: DeliveryTotals,
}

/// Everything one tick did, plus the store as it stands afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SimTickResult {
    pub chronology: TickResult,
    pub production: ProductionOutput,
    pub deliveries: DeliveryResult,
    pub storage: StorageResult,
    pub demography: DemographicTickResult,
    pub disease: DiseaseTickResult,
    pub plan_closed: Option<PlanReport>,
    pub milestones: Vec<MilestoneId>,
    pub resources: ResourceStock,
    pub autosave: Option<PathBuf>,
}

impl SimTickResult {
    pub fn tick(&self) -> u64 {
        self.chronology.clock.total_ticks
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    production: Option<Box<dyn ProductionSource>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            production: None,
        }
    }

    pub fn with_production(mut self, source: impl ProductionSource + 'static) -> Self {
        self.production = Some(Box::new(source));
        self
    }

    pub fn build(self) -> Engine {
        let mut rng = match self.settings.seed {
            Some(seed) => GameRng::new(seed),
            None => GameRng::from_entropy(),
        };
        let chronology = ChronologyEngine::new(self.settings.start, &mut rng);
        let deliveries = DeliveryEngine::new(self.settings.doctrine, &mut rng);
        Engine {
            chronology,
            deliveries,
            storage: StorageEngine::new(),
            demography: DemographyEngine::new(),
            disease: DiseaseEngine::new(),
            milestones: MilestoneTracker::new(),
            plan_year: 0,
            rng,
            production: self
                .production
                .unwrap_or_else(|| Box::new(BuildingProduction::new())),
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }

    /// Rebuilds an engine and its world from a save, resuming the exact RNG stream.
    pub fn resume(
        self,
        save: SaveGame,
        registry: BuildingRegistry,
    ) -> std::result::Result<(Engine, World), SaveError> {
        let rng = GameRng::from_state(&save.rng)?;
        let chronology = ChronologyEngine::deserialize(save.chronology)?;
        let deliveries = DeliveryEngine::deserialize(save.deliveries)?;
        let disease = DiseaseEngine::deserialize(save.disease)?;
        let milestones = MilestoneTracker::deserialize(save.milestones)?;
        let world = World::deserialize(save.world, registry)?;
        if save.plan_year >= PLAN_PERIOD_YEARS {
            return Err(SaveError::Invalid {
                section: "save",
                reason: format!("plan year {} beyond the plan period", save.plan_year),
            });
        }
        let mut settings = self.settings;
        settings.scenario_name = save.scenario;
        settings.doctrine = deliveries.doctrine();
        settings.start = chronology.clock();
        tracing::info!(
            scenario = %settings.scenario_name,
            tick = chronology.total_ticks(),
            "resuming saved game"
        );
        let engine = Engine {
            chronology,
            deliveries,
            storage: StorageEngine::new(),
            demography: DemographyEngine::new(),
            disease,
            milestones,
            plan_year: save.plan_year,
            rng,
            production: self
                .production
                .unwrap_or_else(|| Box::new(BuildingProduction::new())),
            snapshot_writer: SnapshotWriter::new(
                &settings.snapshot_dir,
                settings.snapshot_interval_ticks,
            ),
            settings,
        };
        Ok((engine, world))
    }
}

pub struct Engine {
    rng: GameRng,
    chronology: ChronologyEngine,
    deliveries: DeliveryEngine,
    storage: StorageEngine,
    demography: DemographyEngine,
    disease: DiseaseEngine,
    milestones: MilestoneTracker,
    plan_year: u32,
    production: Box<dyn ProductionSource>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, world: &mut World, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&SimTickResult),
    {
        for _ in 0..ticks {
            let result = self.tick(world)?;
            hook(&result);
        }
        Ok(())
    }

    /// One timer fire: runs as many ticks as the speed asks for.
    pub fn advance(&mut self, world: &mut World, speed: GameSpeed) -> Result<Vec<SimTickResult>> {
        (0..speed.ticks_per_fire())
            .map(|_| self.tick(world))
            .collect()
    }

    pub fn tick(&mut self, world: &mut World) -> Result<SimTickResult> {
        let rng = &mut self.rng;
        let chronology = self.chronology.tick(rng);
        let clock = chronology.clock;
        let total_ticks = clock.total_ticks;

        let modifiers = self.chronology.production_modifiers();
        let production = self.production.produce(world, &modifiers);

        let deliveries =
            self.deliveries
                .apply_deliveries(rng, production.food, production.vodka, production.money);
        {
            let store = &mut world.resources;
            store.food += deliveries.total_food_remaining;
            store.vodka += deliveries.vodka_remaining(production.vodka);
            store.money += deliveries.money_remaining(production.money);
            store.power = production.power;
            store.power_used = production.power_used;
        }

        let storage = self.storage.storage_system(
            clock.month,
            &world.registry,
            &world.buildings,
            &mut world.resources,
        );

        let food_level = world.food_level();
        let demography =
            self.demography
                .demographic_tick(rng, total_ticks, food_level, &mut world.households);
        book_demography(world, &demography);

        let conditions = OutbreakConditions {
            population: world.total_population(),
            powered_housing: world.powered_housing(),
            food_ratio: world.food_level(),
        };
        let disease = self.disease.tick(
            rng,
            total_ticks,
            clock.month,
            &conditions,
            &world.buildings,
            &mut world.citizens,
        );
        for citizen in &disease.dead_entities {
            world.bury(*citizen);
        }

        world.sync_mirrors();
        world.resources.clamp_non_negative();

        let plan_closed = if chronology.new_year {
            self.close_plan_year(clock.year)
        } else {
            None
        };

        let milestones = self.milestones.advance(&ProgressSignals {
            delivered_food: deliveries.food_taken,
            winter: chronology.season.is_winter(),
            births: demography.births,
            population: world.total_population(),
            plan_closed: plan_closed.is_some(),
        });

        if chronology.new_month {
            tracing::info!(
                year = clock.year,
                month = clock.month,
                population = world.total_population(),
                food = world.resources.food,
                "new month"
            );
        }
        tracing::debug!(
            tick = total_ticks,
            births = demography.births,
            deaths = demography.deaths + disease.deaths,
            spoiled = storage.spoiled,
            "tick complete"
        );

        let autosave = if self.snapshot_writer.is_due(total_ticks) {
            let save = self.save(world);
            self.snapshot_writer
                .maybe_write(&save)
                .with_context(|| format!("Failed to autosave tick {total_ticks}"))?
        } else {
            None
        };

        Ok(SimTickResult {
            chronology,
            production,
            deliveries,
            storage,
            demography,
            disease,
            plan_closed,
            milestones,
            resources: world.resources.clone(),
            autosave,
        })
    }

    fn close_plan_year(&mut self, year: i32) -> Option<PlanReport> {
        self.plan_year += 1;
        tracing::info!(year, plan_year = self.plan_year, "new year");
        if self.plan_year < PLAN_PERIOD_YEARS {
            return None;
        }
        self.plan_year = 0;
        let report = PlanReport {
            closing_year: year,
            totals: self.deliveries.totals(),
        };
        self.deliveries.reset_totals();
        tracing::info!(
            year,
            food = report.totals.food,
            vodka = report.totals.vodka,
            money = report.totals.money,
            corruption = report.totals.corruption,
            "plan period closed"
        );
        Some(report)
    }

    pub fn set_doctrine(&mut self, doctrine: Doctrine) {
        tracing::info!(?doctrine, "doctrine changed");
        self.deliveries.set_doctrine(doctrine, &mut self.rng);
    }

    pub fn save(&self, world: &World) -> SaveGame {
        SaveGame {
            version: Some(SAVE_GAME_VERSION),
            saved_at: chrono::Utc::now(),
            scenario: self.settings.scenario_name.clone(),
            rng: self.rng.state(),
            plan_year: self.plan_year,
            chronology: self.chronology.serialize(),
            deliveries: self.deliveries.serialize(),
            disease: self.disease.serialize(),
            milestones: self.milestones.serialize(),
            world: world.serialize(),
        }
    }

    pub fn chronology(&self) -> &ChronologyEngine {
        &self.chronology
    }

    pub fn deliveries(&self) -> &DeliveryEngine {
        &self.deliveries
    }

    pub fn disease(&self) -> &DiseaseEngine {
        &self.disease
    }

    pub fn milestones(&self) -> &MilestoneTracker {
        &self.milestones
    }

    pub fn plan_year(&self) -> u32 {
        self.plan_year
    }

    pub fn production_name(&self) -> &str {
        self.production.name()
    }

    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }
}

/// Keeps citizen mirrors in step with births and deaths in the arena.
fn book_demography(world: &mut World, demography: &DemographicTickResult) {
    if demography.born.is_empty() && demography.died.is_empty() && demography.new_dvory == 0 {
        return;
    }
    world.sync_mirrors();
    for (_, member) in &demography.died {
        world.drop_mirror(*member);
    }
    for (dvor, member) in &demography.born {
        let class = household_class(world, *dvor);
        world.spawn_mirror(*dvor, *member, class);
    }
}

fn household_class(world: &World, dvor: DvorId) -> CitizenClass {
    world
        .citizens
        .iter()
        .find(|c| c.dvor == Some(dvor))
        .map(|c| c.class)
        .unwrap_or(CitizenClass::Kolkhoznik)
}
