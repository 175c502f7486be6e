//! Outbreaks and disease progression over citizens.
//!
//! Dead citizens are reported, not removed: the caller owns population and
//! household bookkeeping.

use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingFact, CLINIC, HOSPITAL, WATER_PUMP};
use crate::rng::GameRng;
use crate::snapshot::{check_version, SaveError};
use crate::systems::chronology::TICKS_PER_MONTH;
use crate::world::{CitizenId, Citizens};

pub const DISEASE_SAVE_VERSION: u32 = 1;

pub const BASE_OUTBREAK_CHANCE: f64 = 0.02;
const WINTER_MULTIPLIER: f64 = 1.5;
const OVERCROWDING_MULTIPLIER: f64 = 2.0;
const MALNUTRITION_MULTIPLIER: f64 = 3.0;
const WELL_FED_MULTIPLIER: f64 = 0.1;
const MALNUTRITION_THRESHOLD: f64 = 0.3;
const WELL_FED_THRESHOLD: f64 = 0.8;
const CLINIC_PREVENTION: f64 = 0.4;
const MIN_CLINIC_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseKind {
    Typhus,
    Cholera,
    Influenza,
    Scurvy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disease {
    pub kind: DiseaseKind,
    pub ticks_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiseaseDef {
    pub kind: DiseaseKind,
    pub spread_rate: f64,
    pub mortality_rate: f64,
    pub duration_ticks: u32,
    pub prevented_by: &'static [&'static str],
    pub winter_only: bool,
    pub nutritional: bool,
}

pub const DISEASES: [DiseaseDef; 4] = [
    DiseaseDef {
        kind: DiseaseKind::Typhus,
        spread_rate: 0.6,
        mortality_rate: 0.15,
        duration_ticks: 60,
        prevented_by: &[CLINIC, HOSPITAL],
        winter_only: false,
        nutritional: false,
    },
    DiseaseDef {
        kind: DiseaseKind::Cholera,
        spread_rate: 0.5,
        mortality_rate: 0.25,
        duration_ticks: 30,
        prevented_by: &[HOSPITAL, WATER_PUMP],
        winter_only: false,
        nutritional: false,
    },
    DiseaseDef {
        kind: DiseaseKind::Influenza,
        spread_rate: 0.8,
        mortality_rate: 0.05,
        duration_ticks: 21,
        prevented_by: &[CLINIC, HOSPITAL],
        winter_only: true,
        nutritional: false,
    },
    DiseaseDef {
        kind: DiseaseKind::Scurvy,
        spread_rate: 0.4,
        mortality_rate: 0.03,
        duration_ticks: 90,
        prevented_by: &[CLINIC],
        winter_only: false,
        nutritional: true,
    },
];

impl DiseaseKind {
    pub fn def(self) -> &'static DiseaseDef {
        match self {
            DiseaseKind::Typhus => &DISEASES[0],
            DiseaseKind::Cholera => &DISEASES[1],
            DiseaseKind::Influenza => &DISEASES[2],
            DiseaseKind::Scurvy => &DISEASES[3],
        }
    }
}

pub fn is_winter_month(month: u32) -> bool {
    matches!(month, 11 | 12 | 1..=3)
}

/// Settlement conditions an outbreak check reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutbreakConditions {
    pub population: u64,
    pub powered_housing: u64,
    pub food_ratio: f64,
}

impl OutbreakConditions {
    pub fn overcrowded(&self) -> bool {
        self.population > self.powered_housing
    }
}

pub fn environment_modifier(def: &DiseaseDef, month: u32, conditions: &OutbreakConditions) -> f64 {
    let winter = is_winter_month(month);
    if def.winter_only && !winter {
        return 0.0;
    }
    let mut modifier = 1.0;
    if winter && !def.nutritional {
        modifier *= WINTER_MULTIPLIER;
    }
    if conditions.overcrowded() {
        modifier *= OVERCROWDING_MULTIPLIER;
    }
    if def.nutritional {
        if conditions.food_ratio < MALNUTRITION_THRESHOLD {
            modifier *= MALNUTRITION_MULTIPLIER;
        } else if conditions.food_ratio >= WELL_FED_THRESHOLD {
            modifier *= WELL_FED_MULTIPLIER;
        }
    }
    modifier
}

pub fn clinic_factor(clinics: u32) -> f64 {
    let exponent = i32::try_from(clinics).unwrap_or(i32::MAX);
    CLINIC_PREVENTION.powi(exponent).max(MIN_CLINIC_FACTOR)
}

/// Powered, operational buildings that guard against `def`.
pub fn preventing_buildings(def: &DiseaseDef, buildings: &[BuildingFact]) -> u32 {
    let count = buildings
        .iter()
        .filter(|b| b.is_working() && def.prevented_by.iter().any(|id| *id == b.def_id))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

pub fn infection_chance(def: &DiseaseDef, environment: f64, clinics: u32) -> f64 {
    BASE_OUTBREAK_CHANCE * def.spread_rate * environment * clinic_factor(clinics)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiseaseTickResult {
    pub new_infections: u32,
    pub recoveries: u32,
    pub deaths: u32,
    pub dead_entities: Vec<CitizenId>,
    pub outbreak_types: Vec<DiseaseKind>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiseaseTotals {
    pub infections: u64,
    pub recoveries: u64,
    pub deaths: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseSave {
    #[serde(default)]
    pub version: Option<u32>,
    pub totals: DiseaseTotals,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiseaseEngine {
    totals: DiseaseTotals,
}

impl DiseaseEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self) -> DiseaseTotals {
        self.totals
    }

    /// Progression every tick, outbreak checks on month boundaries.
    pub fn tick(
        &mut self,
        rng: &mut GameRng,
        total_ticks: u64,
        month: u32,
        conditions: &OutbreakConditions,
        buildings: &[BuildingFact],
        citizens: &mut Citizens,
    ) -> DiseaseTickResult {
        let mut result = self.progress_diseases(rng, citizens);
        if total_ticks > 0 && total_ticks % TICKS_PER_MONTH == 0 {
            let outbreaks = self.check_outbreaks(rng, month, conditions, buildings, citizens);
            result.new_infections = outbreaks.new_infections;
            result.outbreak_types = outbreaks.outbreak_types;
        }
        result
    }

    pub fn progress_diseases(
        &mut self,
        rng: &mut GameRng,
        citizens: &mut Citizens,
    ) -> DiseaseTickResult {
        let mut result = DiseaseTickResult::default();
        for citizen in citizens.iter_mut() {
            let Some(disease) = citizen.disease.as_mut() else {
                continue;
            };
            disease.ticks_remaining = disease.ticks_remaining.saturating_sub(1);
            if disease.ticks_remaining > 0 {
                continue;
            }
            let def = disease.kind.def();
            citizen.disease = None;
            if rng.chance(def.mortality_rate) {
                result.deaths += 1;
                result.dead_entities.push(citizen.id);
            } else {
                result.recoveries += 1;
            }
        }
        self.totals.deaths += u64::from(result.deaths);
        self.totals.recoveries += u64::from(result.recoveries);
        result
    }

    pub fn check_outbreaks(
        &mut self,
        rng: &mut GameRng,
        month: u32,
        conditions: &OutbreakConditions,
        buildings: &[BuildingFact],
        citizens: &mut Citizens,
    ) -> DiseaseTickResult {
        let chances: Vec<(DiseaseKind, f64, u32)> = DISEASES
            .iter()
            .map(|def| {
                let environment = environment_modifier(def, month, conditions);
                let clinics = preventing_buildings(def, buildings);
                (
                    def.kind,
                    infection_chance(def, environment, clinics),
                    def.duration_ticks,
                )
            })
            .collect();

        let mut result = DiseaseTickResult::default();
        for citizen in citizens.iter_mut() {
            if citizen.disease.is_some() {
                continue;
            }
            for (kind, chance, duration) in &chances {
                if *chance <= 0.0 {
                    continue;
                }
                if rng.chance(*chance) {
                    citizen.disease = Some(Disease {
                        kind: *kind,
                        ticks_remaining: *duration,
                    });
                    result.new_infections += 1;
                    if !result.outbreak_types.contains(kind) {
                        result.outbreak_types.push(*kind);
                    }
                    break;
                }
            }
        }
        result.outbreak_types.sort();
        self.totals.infections += u64::from(result.new_infections);
        if !result.outbreak_types.is_empty() {
            tracing::info!(
                month,
                infections = result.new_infections,
                kinds = ?result.outbreak_types,
                "disease outbreak"
            );
        }
        result
    }

    pub fn serialize(&self) -> DiseaseSave {
        DiseaseSave {
            version: Some(DISEASE_SAVE_VERSION),
            totals: self.totals,
        }
    }

    pub fn deserialize(data: DiseaseSave) -> Result<Self, SaveError> {
        check_version("disease", data.version, DISEASE_SAVE_VERSION)?;
        Ok(Self {
            totals: data.totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingRegistry;
    use crate::world::{CitizenClass, Gender, NewMember, ResourceStock, World};

    fn calm() -> OutbreakConditions {
        OutbreakConditions {
            population: 10,
            powered_housing: 100,
            food_ratio: 0.5,
        }
    }

    fn village(size: usize) -> World {
        let mut world = World::new(BuildingRegistry::standard(), ResourceStock::default());
        for i in 0..size {
            world.found_dvor(
                format!("Family{i}"),
                vec![NewMember {
                    name: "Worker".into(),
                    gender: Gender::Male,
                    age: 30,
                    role: None,
                    pregnant: None,
                }],
                CitizenClass::Worker,
            );
        }
        world
    }

    #[test]
    fn clinic_factor_has_a_floor() {
        assert_eq!(clinic_factor(0), 1.0);
        assert!((clinic_factor(1) - 0.4).abs() < 1e-12);
        assert!((clinic_factor(2) - 0.16).abs() < 1e-12);
        assert_eq!(clinic_factor(3), 0.1);
        assert_eq!(clinic_factor(50), 0.1);
    }

    #[test]
    fn influenza_only_in_winter() {
        let flu = DiseaseKind::Influenza.def();
        assert_eq!(environment_modifier(flu, 7, &calm()), 0.0);
        assert_eq!(environment_modifier(flu, 1, &calm()), 1.5);
    }

    #[test]
    fn environment_stacks_winter_and_crowding() {
        let typhus = DiseaseKind::Typhus.def();
        let crowded = OutbreakConditions {
            population: 200,
            powered_housing: 100,
            food_ratio: 0.5,
        };
        assert_eq!(environment_modifier(typhus, 12, &crowded), 3.0);
        assert_eq!(environment_modifier(typhus, 5, &calm()), 1.0);
    }

    #[test]
    fn scurvy_follows_the_larder_not_the_winter() {
        let scurvy = DiseaseKind::Scurvy.def();
        let hungry = OutbreakConditions {
            food_ratio: 0.1,
            ..calm()
        };
        let fed = OutbreakConditions {
            food_ratio: 0.9,
            ..calm()
        };
        assert_eq!(environment_modifier(scurvy, 1, &hungry), 3.0);
        assert!((environment_modifier(scurvy, 1, &fed) - 0.1).abs() < 1e-12);
        assert_eq!(environment_modifier(scurvy, 1, &calm()), 1.0);
    }

    #[test]
    fn only_working_listed_buildings_prevent() {
        let typhus = DiseaseKind::Typhus.def();
        let buildings = vec![
            BuildingFact::new(CLINIC, true, true),
            BuildingFact::new(HOSPITAL, false, true),
            BuildingFact::new(CLINIC, true, false),
            BuildingFact::new(WATER_PUMP, true, true),
        ];
        assert_eq!(preventing_buildings(typhus, &buildings), 1);
        let cholera = DiseaseKind::Cholera.def();
        assert_eq!(preventing_buildings(cholera, &buildings), 1);
    }

    #[test]
    fn a_citizen_catches_at_most_one_disease() {
        let mut world = village(400);
        let mut rng = GameRng::new(3);
        let mut engine = DiseaseEngine::new();
        let crowded = OutbreakConditions {
            population: 400,
            powered_housing: 0,
            food_ratio: 0.0,
        };
        let result = engine.check_outbreaks(&mut rng, 1, &crowded, &[], world.citizens_mut());
        let infected = world.citizens().infected_count();
        assert_eq!(result.new_infections as usize, infected);
        assert!(infected > 0);
        let mut sorted = result.outbreak_types.clone();
        sorted.dedup();
        assert_eq!(sorted, result.outbreak_types);

        // A second check never stacks a disease on the already infected.
        let before: Vec<_> = world
            .citizens()
            .iter()
            .filter_map(|c| c.disease.map(|d| (c.id, d)))
            .collect();
        engine.check_outbreaks(&mut rng, 1, &crowded, &[], world.citizens_mut());
        for (id, disease) in before {
            assert_eq!(world.citizens().get(id).unwrap().disease, Some(disease));
        }
    }

    #[test]
    fn progression_resolves_to_exactly_one_outcome() {
        let mut world = village(200);
        for citizen in world.citizens_mut().iter_mut() {
            citizen.disease = Some(Disease {
                kind: DiseaseKind::Cholera,
                ticks_remaining: 3,
            });
        }
        let mut rng = GameRng::new(12);
        let mut engine = DiseaseEngine::new();
        let mut previous = 3;
        for _ in 0..2 {
            let result = engine.progress_diseases(&mut rng, world.citizens_mut());
            assert_eq!(result.deaths + result.recoveries, 0);
            for citizen in world.citizens().iter() {
                let remaining = citizen.disease.unwrap().ticks_remaining;
                assert!(remaining < previous);
            }
            previous -= 1;
        }
        let result = engine.progress_diseases(&mut rng, world.citizens_mut());
        assert_eq!(result.deaths + result.recoveries, 200);
        assert_eq!(result.dead_entities.len() as u32, result.deaths);
        assert!(world.citizens().iter().all(|c| c.disease.is_none()));
        // The engine reports the dead but leaves removal to the caller.
        assert_eq!(world.citizens().len(), 200);
        assert_eq!(engine.totals().deaths, u64::from(result.deaths));
    }

    #[test]
    fn outbreaks_only_on_month_boundaries() {
        let mut world = village(300);
        let mut rng = GameRng::new(4);
        let mut engine = DiseaseEngine::new();
        let crowded = OutbreakConditions {
            population: 300,
            powered_housing: 0,
            food_ratio: 0.0,
        };
        for tick in 1..TICKS_PER_MONTH {
            let result = engine.tick(&mut rng, tick, 1, &crowded, &[], world.citizens_mut());
            assert_eq!(result.new_infections, 0);
        }
        let result = engine.tick(
            &mut rng,
            TICKS_PER_MONTH,
            1,
            &crowded,
            &[],
            world.citizens_mut(),
        );
        assert!(result.new_infections > 0);
    }

    #[test]
    fn round_trip_preserves_totals() {
        let mut engine = DiseaseEngine::new();
        engine.totals = DiseaseTotals {
            infections: 12,
            recoveries: 9,
            deaths: 2,
        };
        let json = serde_json::to_string(&engine.serialize()).unwrap();
        let restored = DiseaseEngine::deserialize(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, engine);
        assert!(DiseaseEngine::deserialize(DiseaseSave {
            version: Some(99),
            totals: DiseaseTotals::default(),
        })
        .is_err());
    }
}
