//! Household aging, births and deaths.
//!
//! Aging runs on the year boundary, births and deaths on the month boundary,
//! all gated on the global tick counter. Every roll goes through the
//! injected generator so a seed replays the same family histories.

use serde::{Deserialize, Serialize};

use crate::rng::GameRng;
use crate::systems::chronology::{TICKS_PER_MONTH, TICKS_PER_YEAR};
use crate::world::{DvorId, Gender, Households, MemberId, MemberRole, NewMember};

/// Monthly birth chance for an eligible woman at adequate food.
pub const BASE_BIRTH_RATE: f64 = 1.0 / 12.0;
pub const FERTILE_AGES: std::ops::RangeInclusive<u32> = 16..=45;
/// Food level at and above which food no longer limits births or deaths.
pub const ADEQUATE_FOOD_LEVEL: f64 = 0.5;
pub const MAX_STARVATION_FACTOR: f64 = 9.0;
/// Households larger than this split on the year boundary.
pub const MAX_DVOR_SIZE: usize = 8;
pub const SPLIT_MIN_AGE: u32 = 18;

const MALE_NAMES: &[&str] = &[
    "Ivan", "Pyotr", "Nikolai", "Aleksei", "Mikhail", "Sergei", "Dmitri", "Fyodor", "Grigori",
    "Vasili", "Yakov", "Boris",
];
const FEMALE_NAMES: &[&str] = &[
    "Anna", "Maria", "Olga", "Tatiana", "Natalia", "Yelena", "Vera", "Nadezhda", "Lyudmila",
    "Galina", "Zoya", "Irina",
];

/// Annual mortality by age band.
pub fn annual_mortality(age: u32) -> f64 {
    match age {
        0 => 0.15,
        1..=11 => 0.01,
        12..=59 => 0.005,
        60..=69 => 0.04,
        _ => 0.10,
    }
}

pub fn monthly_mortality(age: u32) -> f64 {
    1.0 - (1.0 - annual_mortality(age)).powf(1.0 / 12.0)
}

/// Birth multiplier: 0.5 with an empty granary, 1.0 once food is adequate.
pub fn food_modifier(food_level: f64) -> f64 {
    let fed = (food_level / ADEQUATE_FOOD_LEVEL).clamp(0.0, 1.0);
    0.5 + 0.5 * fed
}

/// Death multiplier: 1.0 when fed, rising quadratically to 9.0 at zero food.
pub fn starvation_factor(food_level: f64) -> f64 {
    if food_level >= ADEQUATE_FOOD_LEVEL {
        return 1.0;
    }
    let hunger = ((ADEQUATE_FOOD_LEVEL - food_level.max(0.0)) / ADEQUATE_FOOD_LEVEL).min(1.0);
    1.0 + (MAX_STARVATION_FACTOR - 1.0) * hunger * hunger
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicTickResult {
    pub births: u32,
    pub deaths: u32,
    pub aged: u32,
    pub new_dvory: u32,
    pub born: Vec<(DvorId, MemberId)>,
    pub died: Vec<(DvorId, MemberId)>,
}

pub struct DemographyEngine;

impl DemographyEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn demographic_tick(
        &self,
        rng: &mut GameRng,
        total_ticks: u64,
        food_level: f64,
        households: &mut Households,
    ) -> DemographicTickResult {
        let mut result = DemographicTickResult::default();
        if total_ticks == 0 {
            return result;
        }
        if total_ticks % TICKS_PER_YEAR == 0 {
            result.aged = age_members(households);
            result.new_dvory = split_crowded(households);
        }
        if total_ticks % TICKS_PER_MONTH == 0 {
            run_births(rng, food_level, households, &mut result);
            run_deaths(rng, food_level, households, &mut result);
        }
        result
    }
}

impl Default for DemographyEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn age_members(households: &mut Households) -> u32 {
    let mut aged = 0;
    for dvor in households.iter_mut() {
        for member in &mut dvor.members {
            member.age += 1;
            member.refresh_role();
            aged += 1;
        }
    }
    aged
}

fn split_crowded(households: &mut Households) -> u32 {
    let mut created = 0;
    for id in households.ids() {
        let Some(dvor) = households.get(id) else {
            continue;
        };
        if dvor.members.len() <= MAX_DVOR_SIZE {
            continue;
        }
        let leaver = dvor
            .members
            .iter()
            .filter(|m| !m.role.is_designation() && m.age >= SPLIT_MIN_AGE)
            .max_by_key(|m| (m.age, std::cmp::Reverse(m.id)))
            .map(|m| m.id);
        if let Some(member) = leaver {
            if households.split_off(id, member).is_some() {
                created += 1;
            }
        }
    }
    created
}

fn run_births(
    rng: &mut GameRng,
    food_level: f64,
    households: &mut Households,
    result: &mut DemographicTickResult,
) {
    let chance = BASE_BIRTH_RATE * food_modifier(food_level);
    for id in households.ids() {
        let Some(dvor) = households.get_mut(id) else {
            continue;
        };
        let mut deliveries = 0_u32;
        let mut delivered = Vec::new();
        for member in &mut dvor.members {
            if let Some(remaining) = member.pregnant {
                let remaining = remaining.saturating_sub(TICKS_PER_MONTH as u32);
                if remaining == 0 {
                    member.pregnant = None;
                    deliveries += 1;
                    delivered.push(member.id);
                } else {
                    member.pregnant = Some(remaining);
                }
            }
        }

        let has_father = dvor.has_adult_male();
        let mothers = dvor
            .members
            .iter()
            .filter(|m| {
                has_father
                    && m.gender == Gender::Female
                    && FERTILE_AGES.contains(&m.age)
                    && m.pregnant.is_none()
                    && !delivered.contains(&m.id)
            })
            .count();
        for _ in 0..mothers {
            if rng.chance(chance) {
                deliveries += 1;
            }
        }

        for _ in 0..deliveries {
            let infant = newborn(rng);
            if let Some(member) = households.add_member(id, infant) {
                result.births += 1;
                result.born.push((id, member));
            }
        }
    }
}

fn newborn(rng: &mut GameRng) -> NewMember {
    let gender = if rng.chance(0.5) {
        Gender::Male
    } else {
        Gender::Female
    };
    let names = match gender {
        Gender::Male => MALE_NAMES,
        Gender::Female => FEMALE_NAMES,
    };
    let name = rng.pick(names).copied().unwrap_or("Nameless").to_string();
    NewMember {
        name,
        gender,
        age: 0,
        role: Some(MemberRole::Infant),
        pregnant: None,
    }
}

fn run_deaths(
    rng: &mut GameRng,
    food_level: f64,
    households: &mut Households,
    result: &mut DemographicTickResult,
) {
    let starvation = starvation_factor(food_level);
    let mut doomed = Vec::new();
    for dvor in households.iter() {
        for member in &dvor.members {
            let chance = (monthly_mortality(member.age) * starvation).min(1.0);
            if rng.chance(chance) {
                doomed.push((dvor.id, member.id));
            }
        }
    }
    for (dvor, member) in doomed {
        if households.remove_member(dvor, member).is_some() {
            result.deaths += 1;
            result.died.push((dvor, member));
        }
    }
}
