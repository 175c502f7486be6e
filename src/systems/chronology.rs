//! Calendar, seasons, day phase and weather.
//!
//! One tick is eight in-game hours: three ticks make a day, ten days a month
//! and twelve months a year. `total_ticks` is the only counter other
//! subsystems gate on; the calendar fields are derived bookkeeping that
//! happens to be stored because saves embed them.

use serde::{Deserialize, Serialize};

use crate::rng::GameRng;
use crate::snapshot::{check_version, SaveError};

pub const HOURS_PER_TICK: u32 = 8;
pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_MONTH: u32 = 10;
pub const MONTHS_PER_YEAR: u32 = 12;
pub const TICKS_PER_DAY: u64 = (HOURS_PER_DAY / HOURS_PER_TICK) as u64;
pub const TICKS_PER_MONTH: u64 = TICKS_PER_DAY * DAYS_PER_MONTH as u64;
pub const TICKS_PER_YEAR: u64 = TICKS_PER_MONTH * MONTHS_PER_YEAR as u64;

pub const CHRONOLOGY_SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub total_ticks: u64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl Clock {
    /// Midnight on the given date, before any tick has run.
    pub fn start(year: i32, month: u32, day: u32) -> Self {
        Self {
            total_ticks: 0,
            year,
            month: month.clamp(1, MONTHS_PER_YEAR),
            day: day.clamp(1, DAYS_PER_MONTH),
            hour: 0,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.hour >= HOURS_PER_DAY || self.hour % HOURS_PER_TICK != 0 {
            return Err(format!("hour {} is not a tick boundary", self.hour));
        }
        if !(1..=DAYS_PER_MONTH).contains(&self.day) {
            return Err(format!("day {} outside 1..={DAYS_PER_MONTH}", self.day));
        }
        if !(1..=MONTHS_PER_YEAR).contains(&self.month) {
            return Err(format!("month {} outside 1..={MONTHS_PER_YEAR}", self.month));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    Clear,
    Overcast,
    Rain,
    Snow,
    Blizzard,
    Fog,
    Heatwave,
    Frost,
    Mud,
}

impl WeatherType {
    pub fn farm_modifier(self) -> f64 {
        match self {
            WeatherType::Clear => 1.0,
            WeatherType::Overcast => 0.95,
            WeatherType::Rain => 1.1,
            WeatherType::Snow => 0.8,
            WeatherType::Blizzard => 0.5,
            WeatherType::Fog => 1.0,
            WeatherType::Heatwave => 0.7,
            WeatherType::Frost => 0.6,
            WeatherType::Mud => 0.85,
        }
    }

    pub fn production_modifier(self) -> f64 {
        match self {
            WeatherType::Clear | WeatherType::Overcast => 1.0,
            WeatherType::Rain | WeatherType::Snow | WeatherType::Frost => 0.9,
            WeatherType::Blizzard => 0.6,
            WeatherType::Fog | WeatherType::Heatwave => 0.85,
            WeatherType::Mud => 0.75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weather {
    pub current: WeatherType,
    pub days_remaining: u32,
}

/// Climate of a season: light, yield modifiers and which weather it rolls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonProfile {
    pub daylight_hours: f64,
    pub farm_modifier: f64,
    pub production_modifier: f64,
    pub weather: &'static [(WeatherType, f64)],
    pub min_weather_days: u32,
    pub max_weather_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Season {
    Winter,
    RasputitsaSpring,
    ShortSummer,
    GoldenWeek,
    StiflingHeat,
    EarlyFrost,
    RasputitsaAutumn,
}

const WINTER: SeasonProfile = SeasonProfile {
    daylight_hours: 7.0,
    farm_modifier: 0.1,
    production_modifier: 0.9,
    weather: &[
        (WeatherType::Snow, 4.0),
        (WeatherType::Frost, 3.0),
        (WeatherType::Blizzard, 2.0),
        (WeatherType::Clear, 2.0),
        (WeatherType::Overcast, 2.0),
    ],
    min_weather_days: 2,
    max_weather_days: 5,
};

const RASPUTITSA_SPRING: SeasonProfile = SeasonProfile {
    daylight_hours: 12.0,
    farm_modifier: 0.5,
    production_modifier: 0.8,
    weather: &[
        (WeatherType::Rain, 4.0),
        (WeatherType::Mud, 4.0),
        (WeatherType::Overcast, 2.0),
        (WeatherType::Clear, 1.0),
    ],
    min_weather_days: 2,
    max_weather_days: 4,
};

const SHORT_SUMMER: SeasonProfile = SeasonProfile {
    daylight_hours: 17.0,
    farm_modifier: 1.2,
    production_modifier: 1.0,
    weather: &[
        (WeatherType::Clear, 4.0),
        (WeatherType::Rain, 2.0),
        (WeatherType::Overcast, 2.0),
    ],
    min_weather_days: 2,
    max_weather_days: 4,
};

const GOLDEN_WEEK: SeasonProfile = SeasonProfile {
    daylight_hours: 18.0,
    farm_modifier: 1.5,
    production_modifier: 1.1,
    weather: &[
        (WeatherType::Clear, 6.0),
        (WeatherType::Overcast, 1.0),
        (WeatherType::Rain, 1.0),
    ],
    min_weather_days: 1,
    max_weather_days: 3,
};

const STIFLING_HEAT: SeasonProfile = SeasonProfile {
    daylight_hours: 16.0,
    farm_modifier: 1.0,
    production_modifier: 0.9,
    weather: &[
        (WeatherType::Clear, 4.0),
        (WeatherType::Heatwave, 3.0),
        (WeatherType::Rain, 1.0),
    ],
    min_weather_days: 2,
    max_weather_days: 5,
};

const EARLY_FROST: SeasonProfile = SeasonProfile {
    daylight_hours: 11.0,
    farm_modifier: 0.7,
    production_modifier: 1.0,
    weather: &[
        (WeatherType::Frost, 3.0),
        (WeatherType::Overcast, 3.0),
        (WeatherType::Fog, 2.0),
        (WeatherType::Clear, 2.0),
    ],
    min_weather_days: 2,
    max_weather_days: 4,
};

const RASPUTITSA_AUTUMN: SeasonProfile = SeasonProfile {
    daylight_hours: 9.0,
    farm_modifier: 0.4,
    production_modifier: 0.8,
    weather: &[
        (WeatherType::Rain, 4.0),
        (WeatherType::Mud, 4.0),
        (WeatherType::Fog, 2.0),
        (WeatherType::Overcast, 2.0),
    ],
    min_weather_days: 2,
    max_weather_days: 4,
};

impl Season {
    pub fn of(month: u32) -> Self {
        match month {
            4 => Season::RasputitsaSpring,
            5 => Season::ShortSummer,
            6 => Season::GoldenWeek,
            7 | 8 => Season::StiflingHeat,
            9 => Season::EarlyFrost,
            10 => Season::RasputitsaAutumn,
            _ => Season::Winter,
        }
    }

    pub fn profile(self) -> &'static SeasonProfile {
        match self {
            Season::Winter => &WINTER,
            Season::RasputitsaSpring => &RASPUTITSA_SPRING,
            Season::ShortSummer => &SHORT_SUMMER,
            Season::GoldenWeek => &GOLDEN_WEEK,
            Season::StiflingHeat => &STIFLING_HEAT,
            Season::EarlyFrost => &EARLY_FROST,
            Season::RasputitsaAutumn => &RASPUTITSA_AUTUMN,
        }
    }

    pub fn is_winter(self) -> bool {
        self == Season::Winter
    }

    fn roll_weather(self, rng: &mut GameRng) -> Weather {
        let profile = self.profile();
        let weights: Vec<f64> = profile.weather.iter().map(|(_, w)| *w).collect();
        let current = rng
            .weighted_index(&weights)
            .and_then(|index| profile.weather.get(index))
            .map(|(kind, _)| *kind)
            .unwrap_or(WeatherType::Clear);
        let days_remaining = rng.int(profile.min_weather_days, profile.max_weather_days);
        Weather {
            current,
            days_remaining: days_remaining.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPhase {
    Night,
    Dawn,
    Midday,
    Dusk,
}

pub fn day_phase(hour: f64, daylight_hours: f64) -> DayPhase {
    let sunrise = 12.0 - daylight_hours / 2.0;
    let sunset = 12.0 + daylight_hours / 2.0;
    if hour < sunrise - 1.0 {
        DayPhase::Night
    } else if hour < sunrise + 1.0 {
        DayPhase::Dawn
    } else if hour < sunset - 1.0 {
        DayPhase::Midday
    } else if hour < sunset + 1.0 {
        DayPhase::Dusk
    } else {
        DayPhase::Night
    }
}

/// Multipliers the production step applies this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionModifiers {
    pub farm: f64,
    pub production: f64,
}

impl Default for ProductionModifiers {
    fn default() -> Self {
        Self {
            farm: 1.0,
            production: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    pub new_day: bool,
    pub new_month: bool,
    pub new_year: bool,
    pub season: Season,
    pub weather: Weather,
    pub day_phase: DayPhase,
    pub day_progress: f64,
    pub clock: Clock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronologySave {
    #[serde(default)]
    pub version: Option<u32>,
    pub clock: Clock,
    pub weather: Weather,
    pub tick_within_day: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChronologyEngine {
    clock: Clock,
    weather: Weather,
    tick_within_day: u32,
}

impl ChronologyEngine {
    /// Starts the calendar and rolls the opening weather for its season.
    pub fn new(clock: Clock, rng: &mut GameRng) -> Self {
        let weather = Season::of(clock.month).roll_weather(rng);
        Self::with_weather(clock, weather)
    }

    pub fn with_weather(clock: Clock, weather: Weather) -> Self {
        Self {
            clock,
            weather: Weather {
                days_remaining: weather.days_remaining.max(1),
                ..weather
            },
            tick_within_day: clock.hour / HOURS_PER_TICK,
        }
    }

    pub fn tick(&mut self, rng: &mut GameRng) -> TickResult {
        let clock = &mut self.clock;
        clock.total_ticks += 1;
        clock.hour += HOURS_PER_TICK;
        self.tick_within_day += 1;

        let mut new_day = false;
        let mut new_month = false;
        let mut new_year = false;
        if clock.hour >= HOURS_PER_DAY {
            clock.hour -= HOURS_PER_DAY;
            clock.day += 1;
            self.tick_within_day = 0;
            new_day = true;
        }
        if clock.day > DAYS_PER_MONTH {
            clock.day = 1;
            clock.month += 1;
            new_month = true;
        }
        if clock.month > MONTHS_PER_YEAR {
            clock.month = 1;
            clock.year += 1;
            new_year = true;
        }

        let season = Season::of(clock.month);
        if new_day {
            self.weather.days_remaining = self.weather.days_remaining.saturating_sub(1);
            if self.weather.days_remaining == 0 {
                self.weather = season.roll_weather(rng);
                tracing::debug!(weather = ?self.weather.current, days = self.weather.days_remaining, "weather changed");
            }
        }

        TickResult {
            new_day,
            new_month,
            new_year,
            season,
            weather: self.weather,
            day_phase: self.day_phase(),
            day_progress: self.day_progress(),
            clock: self.clock,
        }
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn total_ticks(&self) -> u64 {
        self.clock.total_ticks
    }

    pub fn season(&self) -> Season {
        Season::of(self.clock.month)
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn day_progress(&self) -> f64 {
        f64::from(self.clock.hour) / f64::from(HOURS_PER_DAY)
    }

    pub fn day_phase(&self) -> DayPhase {
        day_phase(
            f64::from(self.clock.hour),
            self.season().profile().daylight_hours,
        )
    }

    pub fn production_modifiers(&self) -> ProductionModifiers {
        let profile = self.season().profile();
        ProductionModifiers {
            farm: profile.farm_modifier * self.weather.current.farm_modifier(),
            production: profile.production_modifier * self.weather.current.production_modifier(),
        }
    }

    pub fn serialize(&self) -> ChronologySave {
        ChronologySave {
            version: Some(CHRONOLOGY_SAVE_VERSION),
            clock: self.clock,
            weather: self.weather,
            tick_within_day: self.tick_within_day,
        }
    }

    pub fn deserialize(data: ChronologySave) -> Result<Self, SaveError> {
        check_version("chronology", data.version, CHRONOLOGY_SAVE_VERSION)?;
        let invalid = |reason: String| SaveError::Invalid {
            section: "chronology",
            reason,
        };
        data.clock.validate().map_err(invalid)?;
        if data.tick_within_day != data.clock.hour / HOURS_PER_TICK {
            return Err(invalid(format!(
                "tick_within_day {} disagrees with hour {}",
                data.tick_within_day, data.clock.hour
            )));
        }
        if data.weather.days_remaining == 0 {
            return Err(invalid("weather has no days remaining".into()));
        }
        Ok(Self {
            clock: data.clock,
            weather: data.weather,
            tick_within_day: data.tick_within_day,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_at(year: i32, month: u32, day: u32) -> ChronologyEngine {
        ChronologyEngine::with_weather(
            Clock::start(year, month, day),
            Weather {
                current: WeatherType::Clear,
                days_remaining: 3,
            },
        )
    }

    #[test]
    fn hour_tracks_total_ticks() {
        let mut rng = GameRng::new(1);
        let mut engine = engine_at(1922, 10, 1);
        for t in 1..=500_u64 {
            engine.tick(&mut rng);
            let clock = engine.clock();
            assert_eq!(clock.total_ticks, t);
            assert_eq!(u64::from(clock.hour), (t * 8) % 24);
        }
    }

    #[test]
    fn three_ticks_make_a_day() {
        let mut rng = GameRng::new(1);
        let mut engine = engine_at(1922, 10, 1);
        let results: Vec<_> = (0..3).map(|_| engine.tick(&mut rng)).collect();
        assert!(!results[0].new_day);
        assert!(!results[1].new_day);
        assert!(results[2].new_day);
        assert_eq!(engine.clock().hour, 0);
        assert_eq!(engine.clock().day, 2);
        assert_eq!(results[2].day_progress, 0.0);
    }

    #[test]
    fn thirty_ticks_make_a_month() {
        let mut rng = GameRng::new(1);
        let mut engine = engine_at(1922, 10, 1);
        let mut last = None;
        for _ in 0..30 {
            last = Some(engine.tick(&mut rng));
        }
        let last = last.unwrap();
        assert!(last.new_month);
        assert!(!last.new_year);
        assert_eq!(engine.clock().month, 11);
        assert_eq!(engine.clock().day, 1);
    }

    #[test]
    fn ninety_ticks_roll_the_year() {
        let mut rng = GameRng::new(1);
        let mut engine = engine_at(1922, 10, 1);
        let mut last = None;
        for _ in 0..90 {
            last = Some(engine.tick(&mut rng));
        }
        let last = last.unwrap();
        assert!(last.new_year);
        assert!(last.new_month);
        let clock = engine.clock();
        assert_eq!((clock.year, clock.month, clock.day), (1923, 1, 1));
    }

    #[test]
    fn season_table_is_exhaustive() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Winter),
            (4, Season::RasputitsaSpring),
            (5, Season::ShortSummer),
            (6, Season::GoldenWeek),
            (7, Season::StiflingHeat),
            (8, Season::StiflingHeat),
            (9, Season::EarlyFrost),
            (10, Season::RasputitsaAutumn),
            (11, Season::Winter),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::of(month), season, "month {month}");
        }
    }

    #[test]
    fn day_phase_bands() {
        // 12 hours of daylight: sunrise 6, sunset 18.
        assert_eq!(day_phase(0.0, 12.0), DayPhase::Night);
        assert_eq!(day_phase(4.99, 12.0), DayPhase::Night);
        assert_eq!(day_phase(5.0, 12.0), DayPhase::Dawn);
        assert_eq!(day_phase(7.0, 12.0), DayPhase::Midday);
        assert_eq!(day_phase(17.0, 12.0), DayPhase::Dusk);
        assert_eq!(day_phase(19.0, 12.0), DayPhase::Night);
    }

    #[test]
    fn day_progress_stays_in_unit_interval() {
        let mut rng = GameRng::new(5);
        let mut engine = engine_at(1930, 1, 1);
        for _ in 0..100 {
            let result = engine.tick(&mut rng);
            assert!((0.0..1.0).contains(&result.day_progress));
            assert_eq!(
                result.day_progress,
                f64::from(result.clock.hour) / 24.0
            );
        }
    }

    #[test]
    fn weather_rerolls_only_when_exhausted() {
        let mut rng = GameRng::new(11);
        let mut engine = ChronologyEngine::with_weather(
            Clock::start(1922, 1, 1),
            Weather {
                current: WeatherType::Heatwave,
                days_remaining: 2,
            },
        );
        for _ in 0..3 {
            engine.tick(&mut rng);
        }
        assert_eq!(engine.weather().current, WeatherType::Heatwave);
        assert_eq!(engine.weather().days_remaining, 1);
        for _ in 0..3 {
            engine.tick(&mut rng);
        }
        let weather = engine.weather();
        assert!(WINTER.weather.iter().any(|(kind, _)| *kind == weather.current));
        assert!((2..=5).contains(&weather.days_remaining));
    }

    #[test]
    fn accessors_hand_out_copies() {
        let engine = engine_at(1922, 10, 1);
        let mut weather = engine.weather();
        weather.days_remaining = 99;
        weather.current = WeatherType::Blizzard;
        assert_eq!(engine.weather().days_remaining, 3);
        assert_eq!(engine.weather().current, WeatherType::Clear);
    }

    #[test]
    fn serialize_round_trip_continues_identically() {
        let mut rng = GameRng::new(21);
        let mut engine = engine_at(1922, 10, 1);
        for _ in 0..47 {
            engine.tick(&mut rng);
        }
        let json = serde_json::to_string(&engine.serialize()).unwrap();
        let mut restored =
            ChronologyEngine::deserialize(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, engine);

        let mut rng_a = GameRng::new(77);
        let mut rng_b = GameRng::new(77);
        for _ in 0..200 {
            assert_eq!(engine.tick(&mut rng_a), restored.tick(&mut rng_b));
        }
    }

    #[test]
    fn deserialize_rejects_missing_version_and_bad_clock() {
        let engine = engine_at(1922, 10, 1);
        let mut data = engine.serialize();
        data.version = None;
        assert!(matches!(
            ChronologyEngine::deserialize(data),
            Err(SaveError::MissingVersion { .. })
        ));

        let mut data = engine.serialize();
        data.clock.day = 11;
        assert!(matches!(
            ChronologyEngine::deserialize(data),
            Err(SaveError::Invalid { .. })
        ));

        let mut data = engine.serialize();
        data.clock.hour = 5;
        assert!(ChronologyEngine::deserialize(data).is_err());
    }
}
