//! Synthetic draw histories with a known bias.
//!
//! Used to check that the optimizer recovers hot numbers it was never told
//! about, and by the `generate-history` command.

use lotofacil_core::{
    Draw, DrawHistory, InvalidEntityError, MAX_NUMBER, MIN_NUMBER, NumberSet, PICK_SIZE,
};
use rand::{SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SyntheticError {
    #[display("number weights must be finite and positive, got hot {hot} / cold {cold}")]
    Weights { hot: f32, cold: f32 },
    #[display("hot numbers must be drawn from 1..=25")]
    HotNumbers { source: InvalidEntityError },
    #[display("generated an invalid draw")]
    InvalidDraw { source: InvalidEntityError },
}

/// Parameters of a biased history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BiasedHistory {
    pub seed: u64,
    pub draws: u32,
    /// Numbers drawn with `hot_weight`; all others use `cold_weight`.
    pub hot_numbers: Vec<u8>,
    pub hot_weight: f32,
    pub cold_weight: f32,
}

impl Default for BiasedHistory {
    /// Fifty draws where `1..=15` are nine times as likely as `16..=25`.
    fn default() -> Self {
        Self {
            seed: 0,
            draws: 50,
            hot_numbers: (1..=15).collect(),
            hot_weight: 0.9,
            cold_weight: 0.1,
        }
    }
}

impl BiasedHistory {
    /// Draws the history.
    ///
    /// Each draw samples fifteen distinct numbers without replacement, every
    /// number weighted by whether it is hot. Draws are indexed from 1.
    ///
    /// ```
    /// use lotofacil_training::synthetic::BiasedHistory;
    ///
    /// let history = BiasedHistory { draws: 5, ..BiasedHistory::default() }.generate().unwrap();
    /// assert_eq!(history.len(), 5);
    /// assert_eq!(history.latest().unwrap().index(), 5);
    /// ```
    pub fn generate(&self) -> Result<DrawHistory, SyntheticError> {
        let weights_valid = |w: f32| w.is_finite() && w > 0.0;
        if !weights_valid(self.hot_weight) || !weights_valid(self.cold_weight) {
            return Err(SyntheticError::Weights {
                hot: self.hot_weight,
                cold: self.cold_weight,
            });
        }
        let hot = NumberSet::from_numbers(self.hot_numbers.iter().copied())
            .map_err(|source| SyntheticError::HotNumbers { source })?;

        let mut rng = Pcg32::seed_from_u64(self.seed);
        let universe = (MIN_NUMBER..=MAX_NUMBER).collect::<Vec<u8>>();
        let weight = |n: &u8| {
            if hot.contains(*n) {
                self.hot_weight
            } else {
                self.cold_weight
            }
        };
        let mut history = DrawHistory::new();
        for index in 1..=self.draws {
            let mut numbers = NumberSet::EMPTY;
            let chosen = universe
                .choose_multiple_weighted(&mut rng, PICK_SIZE, weight)
                .map_err(|_| SyntheticError::Weights {
                    hot: self.hot_weight,
                    cold: self.cold_weight,
                })?;
            for &n in chosen {
                numbers.insert(n);
            }
            let draw = Draw::new(index, None, numbers)
                .map_err(|source| SyntheticError::InvalidDraw { source })?;
            if history.append(draw).is_err() {
                unreachable!("indices are strictly increasing");
            }
        }
        tracing::debug!(draws = history.len(), "generated synthetic history");
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_is_visible() {
        let history = BiasedHistory {
            draws: 200,
            seed: 7,
            ..BiasedHistory::default()
        }
        .generate()
        .unwrap();
        let hot = NumberSet::pick(1_u8..=15).unwrap();
        let hot_share = history
            .draws()
            .iter()
            .map(|d| d.matches(hot))
            .sum::<usize>();
        assert!(history.draws().iter().all(|d| d.numbers().is_pick()));
        // 15 of every draw would be pure bias; uniform draws give 9.
        assert!(hot_share > 200 * 11);
    }

    #[test]
    fn test_same_seed_same_history() {
        let params = BiasedHistory {
            seed: 13,
            ..BiasedHistory::default()
        };
        assert_eq!(params.generate().unwrap(), params.generate().unwrap());
    }

    #[test]
    fn test_rejects_invalid_weights() {
        let params = BiasedHistory {
            cold_weight: 0.0,
            ..BiasedHistory::default()
        };
        assert!(matches!(
            params.generate().unwrap_err(),
            SyntheticError::Weights { .. }
        ));
    }

    #[test]
    fn test_rejects_out_of_range_hot_numbers() {
        let params = BiasedHistory {
            hot_numbers: vec![0, 1],
            ..BiasedHistory::default()
        };
        assert!(matches!(
            params.generate().unwrap_err(),
            SyntheticError::HotNumbers { .. }
        ));
    }
}
