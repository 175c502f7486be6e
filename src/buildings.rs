//! Read-only building facts supplied by the placement/ECS layer.
//!
//! The core never places or powers buildings itself. It only reads the
//! registry of definitions and the live instances to size storage, count
//! medical facilities and measure housing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const GRAIN_ELEVATOR: &str = "grain_elevator";
pub const WAREHOUSE: &str = "warehouse";
pub const COLD_STORAGE: &str = "cold_storage";
pub const CLINIC: &str = "clinic";
pub const HOSPITAL: &str = "hospital";
pub const WATER_PUMP: &str = "water_pump";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingRole {
    Agriculture,
    Industry,
    Housing,
    Storage,
    Medical,
    Power,
    Administration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducedResource {
    Food,
    Vodka,
    Money,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub resource: ProducedResource,
    pub per_tick: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDef {
    pub id: String,
    pub role: BuildingRole,
    #[serde(default)]
    pub power_req: f64,
    #[serde(default)]
    pub produces: Option<Output>,
    /// Structural decay per tick; consumed by the maintenance layer, not here.
    #[serde(default)]
    pub decay_rate: f64,
    /// Explicit storage contribution; `None` falls back to the role table.
    #[serde(default)]
    pub storage_contribution: Option<f64>,
    #[serde(default)]
    pub housing_capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

/// A placed building as reported by the placement layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingFact {
    pub def_id: String,
    pub powered: bool,
    pub operational: bool,
    #[serde(default)]
    pub grid_pos: GridPos,
}

impl BuildingFact {
    pub fn new(def_id: impl Into<String>, powered: bool, operational: bool) -> Self {
        Self {
            def_id: def_id.into(),
            powered,
            operational,
            grid_pos: GridPos::default(),
        }
    }

    pub fn is_working(&self) -> bool {
        self.powered && self.operational
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildingRegistry {
    defs: BTreeMap<String, BuildingDef>,
}

impl BuildingRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: BuildingDef) {
        self.defs.insert(def.id.clone(), def);
    }

    pub fn get(&self, def_id: &str) -> Option<&BuildingDef> {
        self.defs.get(def_id)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Building set shipped with the base game.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        let defs = [
            def("kolkhoz_farm", BuildingRole::Agriculture)
                .producing(ProducedResource::Food, 6.0)
                .power(0.0),
            def("potato_field", BuildingRole::Agriculture)
                .producing(ProducedResource::Food, 4.0),
            def("distillery", BuildingRole::Industry)
                .producing(ProducedResource::Vodka, 2.0)
                .power(10.0),
            def("factory", BuildingRole::Industry)
                .producing(ProducedResource::Money, 8.0)
                .power(20.0),
            def("power_station", BuildingRole::Power)
                .producing(ProducedResource::Power, 100.0),
            def("barracks", BuildingRole::Housing).housing(20).power(2.0),
            def("khrushchyovka", BuildingRole::Housing).housing(60).power(8.0),
            def(GRAIN_ELEVATOR, BuildingRole::Storage).storage(2000.0),
            def(WAREHOUSE, BuildingRole::Storage).storage(300.0),
            def(COLD_STORAGE, BuildingRole::Storage)
                .storage(400.0)
                .power(15.0),
            def(CLINIC, BuildingRole::Medical).power(5.0),
            def(HOSPITAL, BuildingRole::Medical).power(15.0),
            def(WATER_PUMP, BuildingRole::Medical).power(3.0),
            def("party_office", BuildingRole::Administration).power(2.0),
        ];
        for def in defs {
            registry.insert(def.0);
        }
        registry
    }
}

struct DefBuilder(BuildingDef);

fn def(id: &str, role: BuildingRole) -> DefBuilder {
    DefBuilder(BuildingDef {
        id: id.to_string(),
        role,
        power_req: 0.0,
        produces: None,
        decay_rate: 0.001,
        storage_contribution: None,
        housing_capacity: 0,
    })
}

impl DefBuilder {
    fn producing(mut self, resource: ProducedResource, per_tick: f64) -> Self {
        self.0.produces = Some(Output { resource, per_tick });
        self
    }

    fn power(mut self, power_req: f64) -> Self {
        self.0.power_req = power_req;
        self
    }

    fn housing(mut self, capacity: u32) -> Self {
        self.0.housing_capacity = capacity;
        self
    }

    fn storage(mut self, contribution: f64) -> Self {
        self.0.storage_contribution = Some(contribution);
        self
    }
}

/// Housing capacity of powered buildings; unknown ids count as zero.
pub fn powered_housing_capacity(registry: &BuildingRegistry, buildings: &[BuildingFact]) -> u64 {
    buildings
        .iter()
        .filter(|b| b.powered)
        .filter_map(|b| registry.get(&b.def_id))
        .map(|def| u64::from(def.housing_capacity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_carries_storage_overrides() {
        let registry = BuildingRegistry::standard();
        assert_eq!(
            registry.get(GRAIN_ELEVATOR).and_then(|d| d.storage_contribution),
            Some(2000.0)
        );
        assert_eq!(
            registry.get(COLD_STORAGE).and_then(|d| d.storage_contribution),
            Some(400.0)
        );
        assert!(registry.get("kolkhoz_farm").unwrap().storage_contribution.is_none());
    }

    #[test]
    fn unpowered_and_unknown_housing_is_ignored() {
        let registry = BuildingRegistry::standard();
        let buildings = vec![
            BuildingFact::new("barracks", true, true),
            BuildingFact::new("barracks", false, true),
            BuildingFact::new("dacha_of_the_general_secretary", true, true),
        ];
        assert_eq!(powered_housing_capacity(&registry, &buildings), 20);
    }
}
