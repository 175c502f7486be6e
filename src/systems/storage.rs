//! Storage capacity and food spoilage.
//!
//! Only food spoils here. Vodka and money keep indefinitely.

use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingFact, BuildingRegistry, BuildingRole, COLD_STORAGE, GRAIN_ELEVATOR};
use crate::world::ResourceStock;

pub const BASE_CAPACITY: f64 = 200.0;
pub const OVERFLOW_RATE: f64 = 0.05;
pub const STANDARD_RATE: f64 = 0.005;
pub const ELEVATOR_RATE: f64 = 0.001;
pub const COLD_STORAGE_RATE: f64 = 0.001;
pub const COLD_STORAGE_FLOOR: f64 = 0.0005;

fn role_contribution(role: BuildingRole) -> f64 {
    match role {
        BuildingRole::Agriculture => 50.0,
        BuildingRole::Industry => 30.0,
        _ => 0.0,
    }
}

/// Storage a single building adds; unknown ids add nothing.
pub fn building_contribution(registry: &BuildingRegistry, building: &BuildingFact) -> f64 {
    registry
        .get(&building.def_id)
        .map(|def| {
            def.storage_contribution
                .unwrap_or_else(|| role_contribution(def.role))
        })
        .unwrap_or(0.0)
}

pub fn storage_capacity(registry: &BuildingRegistry, buildings: &[BuildingFact]) -> f64 {
    BASE_CAPACITY
        + buildings
            .iter()
            .map(|b| building_contribution(registry, b))
            .sum::<f64>()
}

pub fn seasonal_multiplier(month: u32) -> f64 {
    match month {
        6..=8 => 2.0,
        11 | 12 | 1..=3 => 0.3,
        _ => 1.0,
    }
}

/// Per-tick rate with `count` working cold-storage buildings. Each building
/// past the first halves the remaining distance to the floor.
pub fn cold_storage_rate(count: u32) -> f64 {
    if count == 0 {
        return STANDARD_RATE;
    }
    let exponent = i32::try_from(count - 1).unwrap_or(i32::MAX);
    COLD_STORAGE_FLOOR + (COLD_STORAGE_RATE - COLD_STORAGE_FLOOR) * 0.5_f64.powi(exponent)
}

/// Capacity-weighted blend of the standard and grain-elevator rates.
pub fn blended_rate(capacity: f64, elevator_capacity: f64) -> f64 {
    if capacity <= 0.0 {
        return STANDARD_RATE;
    }
    let elevator = elevator_capacity.clamp(0.0, capacity);
    (STANDARD_RATE * (capacity - elevator) + ELEVATOR_RATE * elevator) / capacity
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageResult {
    pub capacity: f64,
    pub spoiled: f64,
    pub rate: f64,
    pub overflowing: bool,
}

pub struct StorageEngine;

impl StorageEngine {
    pub fn new() -> Self {
        Self
    }

    /// Recomputes capacity and applies this tick's spoilage to `stock`.
    pub fn storage_system(
        &self,
        month: u32,
        registry: &BuildingRegistry,
        buildings: &[BuildingFact],
        stock: &mut ResourceStock,
    ) -> StorageResult {
        let capacity = storage_capacity(registry, buildings);
        stock.storage_capacity = capacity;
        let seasonal = seasonal_multiplier(month);

        if stock.food > capacity {
            let overflow = stock.food - capacity;
            let rate = OVERFLOW_RATE * seasonal;
            let spoiled = overflow * rate;
            stock.food -= spoiled;
            return StorageResult {
                capacity,
                spoiled,
                rate,
                overflowing: true,
            };
        }

        let cold_storage = buildings
            .iter()
            .filter(|b| b.def_id == COLD_STORAGE && b.is_working())
            .count();
        let base = if cold_storage > 0 {
            cold_storage_rate(u32::try_from(cold_storage).unwrap_or(u32::MAX))
        } else {
            let elevator_capacity: f64 = buildings
                .iter()
                .filter(|b| b.def_id == GRAIN_ELEVATOR)
                .map(|b| building_contribution(registry, b))
                .sum();
            blended_rate(capacity, elevator_capacity)
        };
        let rate = base * seasonal;
        let spoiled = stock.food.max(0.0) * rate;
        stock.food -= spoiled;
        StorageResult {
            capacity,
            spoiled,
            rate,
            overflowing: false,
        }
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}
