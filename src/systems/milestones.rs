//! Ordered settlement milestones.
//!
//! Only the next uncompleted milestone is checked. Several can complete in
//! one tick when their guards hold one after another.

use serde::{Deserialize, Serialize};

use crate::snapshot::{check_version, SaveError};

pub const MILESTONES_SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneId {
    FirstDelivery,
    FirstWinter,
    FirstBirth,
    HundredSouls,
    FirstPlanClosed,
}

/// What the tick just did, as far as milestones care.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSignals {
    pub delivered_food: f64,
    pub winter: bool,
    pub births: u32,
    pub population: u64,
    pub plan_closed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MilestoneDef {
    pub id: MilestoneId,
    pub display: &'static str,
    pub guard: fn(&ProgressSignals) -> bool,
}

const MILESTONES: &[MilestoneDef] = &[
    MilestoneDef {
        id: MilestoneId::FirstDelivery,
        display: "First Delivery to the State",
        guard: |s| s.delivered_food > 0.0,
    },
    MilestoneDef {
        id: MilestoneId::FirstWinter,
        display: "First Winter",
        guard: |s| s.winter,
    },
    MilestoneDef {
        id: MilestoneId::FirstBirth,
        display: "First Child of the Kolkhoz",
        guard: |s| s.births > 0,
    },
    MilestoneDef {
        id: MilestoneId::HundredSouls,
        display: "A Hundred Souls",
        guard: |s| s.population >= 100,
    },
    MilestoneDef {
        id: MilestoneId::FirstPlanClosed,
        display: "First Five-Year Plan Closed",
        guard: |s| s.plan_closed,
    },
];

pub fn definition(id: MilestoneId) -> Option<&'static MilestoneDef> {
    MILESTONES.iter().find(|def| def.id == id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestonesSave {
    #[serde(default)]
    pub version: Option<u32>,
    pub completed: Vec<MilestoneId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MilestoneTracker {
    completed: Vec<MilestoneId>,
}

impl MilestoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> &[MilestoneId] {
        &self.completed
    }

    pub fn next(&self) -> Option<&'static MilestoneDef> {
        MILESTONES.get(self.completed.len())
    }

    /// Completes milestones in order while their guards hold.
    pub fn advance(&mut self, signals: &ProgressSignals) -> Vec<MilestoneId> {
        let mut reached = Vec::new();
        while let Some(def) = self.next() {
            if !(def.guard)(signals) {
                break;
            }
            tracing::info!(milestone = def.display, "milestone reached");
            self.completed.push(def.id);
            reached.push(def.id);
        }
        reached
    }

    pub fn serialize(&self) -> MilestonesSave {
        MilestonesSave {
            version: Some(MILESTONES_SAVE_VERSION),
            completed: self.completed.clone(),
        }
    }

    pub fn deserialize(data: MilestonesSave) -> Result<Self, SaveError> {
        check_version("milestones", data.version, MILESTONES_SAVE_VERSION)?;
        let in_order = data.completed.len() <= MILESTONES.len()
            && data
                .completed
                .iter()
                .zip(MILESTONES)
                .all(|(id, def)| *id == def.id);
        if !in_order {
            return Err(SaveError::Invalid {
                section: "milestones",
                reason: format!("completed list {:?} is out of order", data.completed),
            });
        }
        Ok(Self {
            completed: data.completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_next_step_is_checked() {
        let mut tracker = MilestoneTracker::new();
        // A birth before any delivery does not complete the birth milestone.
        let reached = tracker.advance(&ProgressSignals {
            births: 1,
            ..ProgressSignals::default()
        });
        assert!(reached.is_empty());
        assert_eq!(tracker.next().unwrap().id, MilestoneId::FirstDelivery);
    }

    #[test]
    fn several_steps_can_chain_in_one_tick() {
        let mut tracker = MilestoneTracker::new();
        let reached = tracker.advance(&ProgressSignals {
            delivered_food: 4.0,
            winter: true,
            births: 2,
            population: 12,
            plan_closed: false,
        });
        assert_eq!(
            reached,
            vec![
                MilestoneId::FirstDelivery,
                MilestoneId::FirstWinter,
                MilestoneId::FirstBirth
            ]
        );
        assert_eq!(tracker.next().unwrap().id, MilestoneId::HundredSouls);
    }

    #[test]
    fn completed_steps_stay_completed() {
        let mut tracker = MilestoneTracker::new();
        tracker.advance(&ProgressSignals {
            delivered_food: 1.0,
            ..ProgressSignals::default()
        });
        tracker.advance(&ProgressSignals::default());
        assert_eq!(tracker.completed(), &[MilestoneId::FirstDelivery]);
    }

    #[test]
    fn round_trip_and_order_check() {
        let mut tracker = MilestoneTracker::new();
        tracker.advance(&ProgressSignals {
            delivered_food: 1.0,
            winter: true,
            ..ProgressSignals::default()
        });
        let json = serde_json::to_string(&tracker.serialize()).unwrap();
        let restored = MilestoneTracker::deserialize(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, tracker);

        let shuffled = MilestonesSave {
            version: Some(MILESTONES_SAVE_VERSION),
            completed: vec![MilestoneId::FirstBirth],
        };
        assert!(MilestoneTracker::deserialize(shuffled).is_err());
        assert_eq!(
            definition(MilestoneId::HundredSouls).unwrap().display,
            "A Hundred Souls"
        );
    }
}
