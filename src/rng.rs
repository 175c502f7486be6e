//! The single seeded generator every probabilistic call in a tick draws from.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::snapshot::SaveError;

/// Position of a [`GameRng`] inside its stream, enough to resume it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: [u8; 32],
    pub stream: u64,
    pub word_pos: u64,
}

pub struct GameRng {
    inner: ChaCha8Rng,
}

impl GameRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Non-deterministic generator for prototypes and tests that do not care
    /// about replay. Never use it in a save/replay session.
    pub fn from_entropy() -> Self {
        tracing::warn!("no seed supplied, falling back to an entropy-seeded generator");
        Self {
            inner: ChaCha8Rng::from_entropy(),
        }
    }

    /// Uniform float in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform integer in `[min, max]`, both inclusive.
    pub fn int(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.random() < probability
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.inner.gen_range(0..items.len());
        items.get(index)
    }

    /// Index drawn proportionally to `weights`. Negative weights count as zero;
    /// returns `None` when nothing carries weight.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.random() * total;
        let mut last_positive = None;
        for (index, weight) in weights.iter().enumerate() {
            let weight = weight.max(0.0);
            if weight <= 0.0 {
                continue;
            }
            if roll < weight {
                return Some(index);
            }
            roll -= weight;
            last_positive = Some(index);
        }
        last_positive
    }

    pub fn state(&self) -> RngState {
        RngState {
            seed: self.inner.get_seed(),
            stream: self.inner.get_stream(),
            word_pos: u64::try_from(self.inner.get_word_pos()).unwrap_or(u64::MAX),
        }
    }

    pub fn from_state(state: &RngState) -> Result<Self, SaveError> {
        if state.word_pos == u64::MAX {
            return Err(SaveError::Invalid {
                section: "rng",
                reason: "word position out of range".into(),
            });
        }
        let mut inner = ChaCha8Rng::from_seed(state.seed);
        inner.set_stream(state.stream);
        inner.set_word_pos(u128::from(state.word_pos));
        Ok(Self { inner })
    }
}
