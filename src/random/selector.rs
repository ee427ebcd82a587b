//! Weighted random draws and probability rolls
//!
//! The selector owns its RNG and is only ever used through `&mut self`, so a
//! single engine instance keeps its draws thread-confined. Seeding it makes
//! every roll, pick and sweep order reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Items paired with positive weights, ready for a cumulative draw
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    entries: Vec<(T, f64)>,
    total: f64,
}

impl<T> Default for WeightedTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            total: 0.0,
        }
    }
}

impl<T> WeightedTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item. Weights that are not strictly positive and finite are
    /// dropped here so they can never be drawn.
    pub fn push(&mut self, item: T, weight: f64) {
        if weight.is_finite() && weight > 0.0 {
            self.total += weight;
            self.entries.push((item, weight));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all accepted weights
    pub fn total_weight(&self) -> f64 {
        self.total
    }

    fn index_at(&self, point: f64) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let mut cumulative = 0.0;
        for (i, (_, weight)) in self.entries.iter().enumerate() {
            cumulative += weight;
            if point < cumulative {
                return Some(i);
            }
        }
        // Float drift can leave point == total
        Some(self.entries.len() - 1)
    }
}

impl<T> FromIterator<(T, f64)> for WeightedTable<T> {
    fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (item, weight) in iter {
            table.push(item, weight);
        }
        table
    }
}

/// Random source for every chance decision the engine makes
#[derive(Debug, Clone)]
pub struct WeightedSelector {
    rng: ChaCha8Rng,
}

impl WeightedSelector {
    /// Deterministic selector for simulations and tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Selector seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Returns true with probability `chance`.
    ///
    /// The chance is clamped into [0, 1] first: anything at or below 0 (and
    /// NaN) never succeeds, anything at or above 1 always does.
    pub fn roll(&mut self, chance: f64) -> bool {
        if chance.is_nan() || chance <= 0.0 {
            return false;
        }
        if chance >= 1.0 {
            return true;
        }
        self.rng.gen::<f64>() < chance
    }

    /// Draw one item proportionally to its weight. `None` when nothing
    /// carries a positive weight.
    pub fn select_weighted<T, I>(&mut self, items: I) -> Option<T>
    where
        I: IntoIterator<Item = (T, f64)>,
    {
        let table: WeightedTable<T> = items.into_iter().collect();
        let idx = self.pick_index(&table)?;
        table.entries.into_iter().nth(idx).map(|(item, _)| item)
    }

    /// Draw from a prepared table without consuming it
    pub fn pick<'a, T>(&mut self, table: &'a WeightedTable<T>) -> Option<&'a T> {
        let idx = self.pick_index(table)?;
        table.entries.get(idx).map(|(item, _)| item)
    }

    fn pick_index<T>(&mut self, table: &WeightedTable<T>) -> Option<usize> {
        if table.is_empty() {
            return None;
        }
        let point = self.rng.gen::<f64>() * table.total;
        table.index_at(point)
    }

    /// Uniform pick among a slice
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.rng.gen_range(0..items.len()))
    }

    /// Uniform integer in `[min, max]`. Returns `min` when `min >= max`.
    pub fn random_int(&mut self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Uniform float in `[min, max)`. Returns `min` when `min >= max`.
    pub fn random_double(&mut self, min: f64, max: f64) -> f64 {
        if !(min < max) {
            return min;
        }
        self.rng.gen_range(min..max)
    }
}

impl Default for WeightedSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}
