//! The production step: what buildings yield this tick before the state's cut.

use serde::{Deserialize, Serialize};

use crate::buildings::ProducedResource;
use crate::systems::chronology::ProductionModifiers;
use crate::world::World;

/// New production for one tick. Power figures are capacities, not stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionOutput {
    pub food: f64,
    pub vodka: f64,
    pub money: f64,
    pub power: f64,
    pub power_used: f64,
}

/// Supplies each tick's new production to the orchestrator.
pub trait ProductionSource {
    fn name(&self) -> &str;
    fn produce(&mut self, world: &World, modifiers: &ProductionModifiers) -> ProductionOutput;
}

/// Yields the registry output of every working building.
///
/// Generators only need to be operational; every other building also needs
/// power. Food scales with the farm modifier, vodka and money with the
/// production modifier.
#[derive(Debug, Default)]
pub struct BuildingProduction;

impl BuildingProduction {
    pub fn new() -> Self {
        Self
    }
}

impl ProductionSource for BuildingProduction {
    fn name(&self) -> &str {
        "buildings"
    }

    fn produce(&mut self, world: &World, modifiers: &ProductionModifiers) -> ProductionOutput {
        let mut output = ProductionOutput::default();
        for building in world.buildings() {
            let Some(def) = world.registry().get(&building.def_id) else {
                continue;
            };
            if building.powered {
                output.power_used += def.power_req;
            }
            let Some(produced) = def.produces else {
                continue;
            };
            if !building.operational {
                continue;
            }
            match produced.resource {
                ProducedResource::Power => output.power += produced.per_tick,
                _ if !building.powered => {}
                ProducedResource::Food => output.food += produced.per_tick * modifiers.farm,
                ProducedResource::Vodka => {
                    output.vodka += produced.per_tick * modifiers.production
                }
                ProducedResource::Money => {
                    output.money += produced.per_tick * modifiers.production
                }
            }
        }
        output
    }
}
