//! Compulsory deliveries: the state's cut of each tick's new production.
//!
//! The engine never touches the resource store. It reports what was taken
//! and the caller books the remainder.

use serde::{Deserialize, Serialize};

use crate::rng::GameRng;
use crate::snapshot::{check_version, SaveError};

pub const DELIVERIES_SAVE_VERSION: u32 = 1;

const CORRUPTION_MIN: f64 = 0.05;
const CORRUPTION_MAX: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Doctrine {
    Revolutionary,
    Industrialization,
    Wartime,
    Reconstruction,
    Thaw,
    Freeze,
    Stagnation,
    Eternal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRates {
    pub food: f64,
    pub vodka: f64,
    pub money: f64,
}

impl Doctrine {
    pub const ALL: [Doctrine; 8] = [
        Doctrine::Revolutionary,
        Doctrine::Industrialization,
        Doctrine::Wartime,
        Doctrine::Reconstruction,
        Doctrine::Thaw,
        Doctrine::Freeze,
        Doctrine::Stagnation,
        Doctrine::Eternal,
    ];

    pub fn rates(self) -> DeliveryRates {
        let (food, vodka, money) = match self {
            Doctrine::Revolutionary => (0.4, 0.3, 0.2),
            Doctrine::Industrialization => (0.5, 0.4, 0.3),
            Doctrine::Wartime => (0.7, 0.5, 0.5),
            Doctrine::Reconstruction => (0.5, 0.35, 0.3),
            Doctrine::Thaw => (0.3, 0.25, 0.2),
            Doctrine::Freeze => (0.6, 0.45, 0.4),
            Doctrine::Stagnation => (0.35, 0.3, 0.25),
            Doctrine::Eternal => (0.45, 0.4, 0.35),
        };
        DeliveryRates { food, vodka, money }
    }

    pub fn is_corrupt(self) -> bool {
        self == Doctrine::Stagnation
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub food_taken: f64,
    pub vodka_taken: f64,
    pub money_taken: f64,
    pub corruption_loss: f64,
    pub total_food_remaining: f64,
    /// Split of `corruption_loss` per resource, for the caller's booking.
    pub food_lost: f64,
    pub vodka_lost: f64,
    pub money_lost: f64,
}

impl DeliveryResult {
    pub fn vodka_remaining(&self, new_vodka: f64) -> f64 {
        (new_vodka - self.vodka_taken - self.vodka_lost).max(0.0)
    }

    pub fn money_remaining(&self, new_money: f64) -> f64 {
        (new_money - self.money_taken - self.money_lost).max(0.0)
    }
}

/// Running totals for one plan period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTotals {
    pub food: f64,
    pub vodka: f64,
    pub money: f64,
    pub corruption: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveriesSave {
    #[serde(default)]
    pub version: Option<u32>,
    pub doctrine: Doctrine,
    pub corruption_rate: f64,
    pub totals: DeliveryTotals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryEngine {
    doctrine: Doctrine,
    rates: DeliveryRates,
    corruption_rate: f64,
    totals: DeliveryTotals,
}

impl DeliveryEngine {
    pub fn new(doctrine: Doctrine, rng: &mut GameRng) -> Self {
        let mut engine = Self {
            doctrine,
            rates: doctrine.rates(),
            corruption_rate: 0.0,
            totals: DeliveryTotals::default(),
        };
        engine.set_doctrine(doctrine, rng);
        engine
    }

    pub fn doctrine(&self) -> Doctrine {
        self.doctrine
    }

    pub fn rates(&self) -> DeliveryRates {
        self.rates
    }

    pub fn corruption_rate(&self) -> f64 {
        self.corruption_rate
    }

    pub fn totals(&self) -> DeliveryTotals {
        self.totals
    }

    pub fn set_doctrine(&mut self, doctrine: Doctrine, rng: &mut GameRng) {
        self.doctrine = doctrine;
        self.rates = doctrine.rates();
        self.corruption_rate = if doctrine.is_corrupt() {
            roll_corruption(rng)
        } else {
            0.0
        };
    }

    /// Computes the state's take of this tick's new production.
    ///
    /// Under stagnation the corruption rate is re-rolled on every call, so
    /// administrative losses swing from tick to tick.
    pub fn apply_deliveries(
        &mut self,
        rng: &mut GameRng,
        new_food: f64,
        new_vodka: f64,
        new_money: f64,
    ) -> DeliveryResult {
        if self.doctrine.is_corrupt() {
            self.corruption_rate = roll_corruption(rng);
        }
        let new_food = new_food.max(0.0);
        let new_vodka = new_vodka.max(0.0);
        let new_money = new_money.max(0.0);

        let food_taken = new_food * self.rates.food;
        let vodka_taken = new_vodka * self.rates.vodka;
        let money_taken = new_money * self.rates.money;
        let food_lost = food_taken * self.corruption_rate;
        let vodka_lost = vodka_taken * self.corruption_rate;
        let money_lost = money_taken * self.corruption_rate;
        let corruption_loss = food_lost + vodka_lost + money_lost;

        self.totals.food += food_taken;
        self.totals.vodka += vodka_taken;
        self.totals.money += money_taken;
        self.totals.corruption += corruption_loss;

        DeliveryResult {
            food_taken,
            vodka_taken,
            money_taken,
            corruption_loss,
            total_food_remaining: (new_food - food_taken - food_lost).max(0.0),
            food_lost,
            vodka_lost,
            money_lost,
        }
    }

    pub fn reset_totals(&mut self) {
        self.totals = DeliveryTotals::default();
    }

    pub fn serialize(&self) -> DeliveriesSave {
        DeliveriesSave {
            version: Some(DELIVERIES_SAVE_VERSION),
            doctrine: self.doctrine,
            corruption_rate: self.corruption_rate,
            totals: self.totals,
        }
    }

    pub fn deserialize(data: DeliveriesSave) -> Result<Self, SaveError> {
        check_version("deliveries", data.version, DELIVERIES_SAVE_VERSION)?;
        let expected = if data.doctrine.is_corrupt() {
            (CORRUPTION_MIN..=CORRUPTION_MAX).contains(&data.corruption_rate)
        } else {
            data.corruption_rate == 0.0
        };
        if !expected {
            return Err(SaveError::Invalid {
                section: "deliveries",
                reason: format!(
                    "corruption rate {} not valid under {:?}",
                    data.corruption_rate, data.doctrine
                ),
            });
        }
        Ok(Self {
            doctrine: data.doctrine,
            rates: data.doctrine.rates(),
            corruption_rate: data.corruption_rate,
            totals: data.totals,
        })
    }
}

fn roll_corruption(rng: &mut GameRng) -> f64 {
    CORRUPTION_MIN + rng.random() * (CORRUPTION_MAX - CORRUPTION_MIN)
}
