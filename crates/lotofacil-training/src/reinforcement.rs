//! Reinforcement-learning adapter.
//!
//! A tabular Q-function over discretized feature states drives the choice of
//! the number inserted by mutation. The table and the fitness weights are
//! learned from two signals:
//!
//! - during a run, the fitness gain of a mutated child over its parents
//!   (applied once per generation)
//! - after a real draw, the match counts of the published predictions
//!   ([`RlAdapter::adjust_weights`])
//!
//! Both tables live in a caller-owned [`LearningState`].

use std::collections::BTreeMap;

use lotofacil_core::{Draw, NumberSet, PICK_SIZE};
use lotofacil_evaluator::{
    feature::{FeatureId, FeatureVector},
    weights::WeightVector,
};
use lotofacil_stats::descriptive::pearson_correlation;
use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::config::{AntiJumpConfig, RewardShaping, RlConfig};

/// Bin index of each state feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(pub Vec<u8>);

/// Number inserted by a mutation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Action(pub u8);

/// Maps feature vectors to [`StateKey`]s.
///
/// The bin of a feature is the number of edges at or below its normalized
/// value; NaN falls into bin 0. The mapping is total and deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDiscretizer {
    features: Vec<FeatureId>,
    edges: Vec<f32>,
}

impl StateDiscretizer {
    #[must_use]
    pub fn new(features: Vec<FeatureId>, edges: Vec<f32>) -> Self {
        Self { features, edges }
    }

    #[expect(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn state(&self, features: &FeatureVector) -> StateKey {
        StateKey(
            self.features
                .iter()
                .map(|&id| {
                    let value = features.normalized(id);
                    if value.is_nan() {
                        return 0;
                    }
                    self.edges.iter().filter(|&&edge| value >= edge).count() as u8
                })
                .collect(),
        )
    }
}

/// Action values per discretized state, with exploration metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QTableRecord", into = "QTableRecord")]
pub struct QTable {
    values: BTreeMap<StateKey, BTreeMap<Action, f32>>,
    epsilon: f32,
    episodes: u64,
}

impl QTable {
    #[must_use]
    pub fn new(epsilon: f32) -> Self {
        Self {
            values: BTreeMap::new(),
            epsilon,
            episodes: 0,
        }
    }

    /// Value of `(state, action)`; unseen pairs are 0.
    #[must_use]
    pub fn get(&self, state: &StateKey, action: Action) -> f32 {
        self.values
            .get(state)
            .and_then(|actions| actions.get(&action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Best action value of `state`; unseen states are 0.
    #[must_use]
    pub fn max_value(&self, state: &StateKey) -> f32 {
        self.values
            .get(state)
            .and_then(|actions| actions.values().copied().max_by(f32::total_cmp))
            .unwrap_or(0.0)
    }

    pub fn set(&mut self, state: StateKey, action: Action, value: f32) {
        self.values.entry(state).or_default().insert(action, value);
    }

    /// Number of stored `(state, action)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    #[must_use]
    pub fn episodes(&self) -> u64 {
        self.episodes
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct QTableRecord {
    epsilon: f32,
    episodes: u64,
    entries: Vec<QEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct QEntry {
    state: StateKey,
    action: Action,
    value: f32,
}

impl From<QTableRecord> for QTable {
    fn from(record: QTableRecord) -> Self {
        let mut table = Self::new(record.epsilon);
        table.episodes = record.episodes;
        for entry in record.entries {
            table.set(entry.state, entry.action, entry.value);
        }
        table
    }
}

impl From<QTable> for QTableRecord {
    fn from(table: QTable) -> Self {
        let entries = table
            .values
            .into_iter()
            .flat_map(|(state, actions)| {
                actions.into_iter().map(move |(action, value)| QEntry {
                    state: state.clone(),
                    action,
                    value,
                })
            })
            .collect();
        Self {
            epsilon: table.epsilon,
            episodes: table.episodes,
            entries,
        }
    }
}

/// Everything learned across runs, owned by the caller.
///
/// [`crate::optimizer::run_optimization`] snapshots `weights` at the start
/// and updates `qtable` at generation barriers. [`RlAdapter::adjust_weights`]
/// is the only writer of `weights`.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningState {
    pub weights: WeightVector,
    pub qtable: QTable,
}

impl LearningState {
    /// Default weights and an empty Q-table.
    #[must_use]
    pub fn new(config: &RlConfig) -> Self {
        Self {
            weights: WeightVector::default(),
            qtable: QTable::new(config.epsilon),
        }
    }
}

/// Provenance of a mutation, kept so that its outcome can be credited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    /// State of the child before mutation.
    pub state: StateKey,
    pub action: Action,
    /// Mean fitness of the child's parents.
    pub parent_fitness: f32,
}

/// A published selection and what is known about how it was produced.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub numbers: NumberSet,
    pub features: FeatureVector,
    pub mutation: Option<MutationRecord>,
}

/// A real draw together with the predictions made for it.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub draw: Draw,
    pub predictions: Vec<Prediction>,
}

/// Fewest matches that win a prize.
pub const PRIZE_MIN_MATCHES: usize = 11;

/// How a set of predictions fared against a draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitSummary {
    /// Number of predictions per match count, indexed by matches.
    pub distribution: [usize; PICK_SIZE + 1],
    /// Predictions with at least [`PRIZE_MIN_MATCHES`] matches.
    pub winning: usize,
    pub best: usize,
    pub mean: f32,
    /// Sum of the [`RewardShaping::Tiered`] rewards.
    pub prize_points: f32,
}

impl Outcome {
    /// ```
    /// use lotofacil_core::{Draw, NumberSet};
    /// use lotofacil_evaluator::feature::FeatureVector;
    /// use lotofacil_training::reinforcement::{Outcome, Prediction};
    ///
    /// let pick = |n: std::ops::RangeInclusive<u8>| NumberSet::pick(n).unwrap();
    /// let prediction = |numbers| Prediction {
    ///     numbers,
    ///     features: FeatureVector::from_fn(|_| 0.0),
    ///     mutation: None,
    /// };
    /// let outcome = Outcome {
    ///     draw: Draw::new(1, None, pick(1..=15)).unwrap(),
    ///     predictions: vec![prediction(pick(3..=17)), prediction(pick(11..=25))],
    /// };
    /// let hits = outcome.hits();
    /// assert_eq!(hits.distribution[13], 1);
    /// assert_eq!(hits.distribution[5], 1);
    /// assert_eq!((hits.winning, hits.best, hits.mean), (1, 13, 9.0));
    /// assert_eq!(hits.prize_points, 8.0);
    /// ```
    #[must_use]
    pub fn hits(&self) -> HitSummary {
        let mut distribution = [0; PICK_SIZE + 1];
        let mut total = 0;
        let mut prize_points = 0.0;
        for prediction in &self.predictions {
            let matches = self.draw.matches(prediction.numbers);
            distribution[matches.min(PICK_SIZE)] += 1;
            total += matches;
            prize_points += RewardShaping::Tiered.reward(matches);
        }
        #[expect(clippy::cast_precision_loss)]
        let mean = if self.predictions.is_empty() {
            0.0
        } else {
            total as f32 / self.predictions.len() as f32
        };
        HitSummary {
            distribution,
            winning: distribution[PRIZE_MIN_MATCHES..].iter().sum(),
            best: distribution.iter().rposition(|&n| n > 0).unwrap_or(0),
            mean,
            prize_points,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RlAdapter {
    config: RlConfig,
    discretizer: StateDiscretizer,
}

impl RlAdapter {
    #[must_use]
    pub fn new(config: &RlConfig) -> Self {
        Self {
            discretizer: StateDiscretizer::new(
                config.state_features.clone(),
                config.bin_edges.clone(),
            ),
            config: config.clone(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RlConfig {
        &self.config
    }

    #[must_use]
    pub fn discretizer(&self) -> &StateDiscretizer {
        &self.discretizer
    }

    /// Epsilon-greedy choice of a number outside `current`.
    ///
    /// Explores uniformly with probability `qtable.epsilon()`, otherwise picks
    /// the highest-valued action; ties are broken at random. Returns `None`
    /// only when `current` is the whole universe.
    pub fn select_action<R>(
        &self,
        qtable: &QTable,
        state: &StateKey,
        current: NumberSet,
        rng: &mut R,
    ) -> Option<Action>
    where
        R: Rng + ?Sized,
    {
        let outside = current.complement().to_array();
        if outside.is_empty() {
            return None;
        }
        let epsilon = f64::from(qtable.epsilon().clamp(0.0, 1.0));
        if rng.random_bool(epsilon) {
            return outside.choose(rng).copied().map(Action);
        }
        let best = outside
            .iter()
            .map(|&n| qtable.get(state, Action(n)))
            .max_by(f32::total_cmp)?;
        let greedy = outside
            .iter()
            .copied()
            .filter(|&n| qtable.get(state, Action(n)) == best)
            .collect::<Vec<_>>();
        greedy.choose(rng).copied().map(Action)
    }

    /// Temporal-difference update:
    /// `Q[s,a] += α (r + γ max Q[s'] − Q[s,a])`.
    ///
    /// Returns the new value.
    ///
    /// ```
    /// use lotofacil_training::{
    ///     config::RlConfig,
    ///     reinforcement::{Action, QTable, RlAdapter, StateKey},
    /// };
    ///
    /// let config = RlConfig { learning_rate: 0.5, discount: 0.9, ..RlConfig::default() };
    /// let adapter = RlAdapter::new(&config);
    /// let mut qtable = QTable::new(0.1);
    /// let (s, s_next) = (StateKey(vec![0]), StateKey(vec![1]));
    /// assert_eq!(adapter.update(&mut qtable, &s, Action(7), 15.0, &s_next), 7.5);
    /// ```
    pub fn update(
        &self,
        qtable: &mut QTable,
        state: &StateKey,
        action: Action,
        reward: f32,
        next_state: &StateKey,
    ) -> f32 {
        let current = qtable.get(state, action);
        let target = reward + self.config.discount * qtable.max_value(next_state);
        let value = current + self.config.learning_rate * (target - current);
        qtable.set(state.clone(), action, value);
        value
    }

    /// Learns from a real draw.
    ///
    /// Each weight moves by `weight_step` times the correlation between the
    /// feature's normalized value and the match count across predictions,
    /// and is clamped to `[min_weight, max_weight]`. Predictions carrying a
    /// mutation record credit their action with the shaped reward. Finally
    /// epsilon decays and the episode counter advances.
    ///
    /// The new weights are stored in `learning` and returned.
    pub fn adjust_weights(&self, learning: &mut LearningState, outcome: &Outcome) -> WeightVector {
        let matches = outcome
            .predictions
            .iter()
            .map(|p| outcome.draw.matches(p.numbers))
            .collect::<Vec<_>>();

        #[expect(clippy::cast_precision_loss)]
        let match_values = matches.iter().map(|&m| m as f32).collect::<Vec<_>>();
        for id in FeatureId::ALL {
            let Some(weight) = learning.weights.get(id) else {
                continue;
            };
            let scores = outcome
                .predictions
                .iter()
                .map(|p| p.features.normalized(id))
                .collect::<Vec<_>>();
            if let Some(corr) = pearson_correlation(&scores, &match_values) {
                let adjusted = (weight + self.config.weight_step * corr)
                    .clamp(self.config.min_weight, self.config.max_weight);
                learning.weights.set(id, adjusted);
            }
        }

        for (prediction, &m) in outcome.predictions.iter().zip(&matches) {
            let Some(record) = &prediction.mutation else {
                continue;
            };
            let next_state = self.discretizer.state(&prediction.features);
            let reward = self.config.reward.reward(m);
            self.update(
                &mut learning.qtable,
                &record.state,
                record.action,
                reward,
                &next_state,
            );
        }

        let qtable = &mut learning.qtable;
        qtable.epsilon = (qtable.epsilon * self.config.epsilon_decay).max(self.config.min_epsilon);
        qtable.episodes += 1;

        tracing::info!(
            draw = outcome.draw.index(),
            predictions = outcome.predictions.len(),
            best_matches = matches.iter().max().copied().unwrap_or(0),
            epsilon = qtable.epsilon,
            "learned from draw"
        );
        learning.weights.clone()
    }
}

/// Weight snapshot for a run that expects a jump: every weight listed in
/// `config.weight_factors` is multiplied by its factor.
///
/// ```
/// use lotofacil_evaluator::{feature::FeatureId, weights::WeightVector};
/// use lotofacil_training::{config::AntiJumpConfig, reinforcement::anti_jump_weights};
///
/// let weights = anti_jump_weights(&WeightVector::uniform(1.0), &AntiJumpConfig::default());
/// assert_eq!(weights.get(FeatureId::MaxRun), Some(0.6));
/// assert_eq!(weights.get(FeatureId::MaxGap), Some(1.5));
/// assert_eq!(weights.get(FeatureId::Sum), Some(1.0));
/// ```
#[must_use]
pub fn anti_jump_weights(weights: &WeightVector, config: &AntiJumpConfig) -> WeightVector {
    let mut adjusted = weights.clone();
    for (&id, &factor) in &config.weight_factors {
        if let Some(weight) = weights.get(id) {
            adjusted.set(id, weight * factor);
        }
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use lotofacil_core::{Draw, NumberSet};
    use lotofacil_evaluator::extractor::{NumberFrequencies, compute_features};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::*;

    fn adapter(learning_rate: f32, discount: f32) -> RlAdapter {
        RlAdapter::new(&RlConfig {
            learning_rate,
            discount,
            ..RlConfig::default()
        })
    }

    #[test]
    fn test_update_uses_next_state_max() {
        let adapter = adapter(0.5, 0.9);
        let mut qtable = QTable::new(0.1);
        let s = StateKey(vec![1, 2]);
        let next = StateKey(vec![3, 0]);
        qtable.set(next.clone(), Action(4), 2.0);
        qtable.set(next.clone(), Action(9), -1.0);
        let value = adapter.update(&mut qtable, &s, Action(20), 15.0, &next);
        assert!((value - (7.5 + 0.45 * 2.0)).abs() < 1e-6);
        assert_eq!(qtable.get(&s, Action(20)), value);
        assert_eq!(qtable.len(), 3);
    }

    #[test]
    fn test_discretizer_bins() {
        let discretizer = StateDiscretizer::new(
            vec![FeatureId::Frequency, FeatureId::PreviousOverlap, FeatureId::Sum],
            vec![0.25, 0.5, 0.75],
        );
        let features = FeatureVector::from_fn(|id| match id {
            FeatureId::Frequency => 0.5,
            FeatureId::PreviousOverlap => f32::NAN,
            FeatureId::Sum => 270.0,
            _ => 0.0,
        });
        assert_eq!(discretizer.state(&features), StateKey(vec![2, 0, 3]));
    }

    #[test]
    fn test_greedy_selection_picks_best_outside_number() {
        let adapter = adapter(0.1, 0.9);
        let mut qtable = QTable::new(0.0);
        let state = StateKey(vec![0]);
        let current = NumberSet::pick(1_u8..=15).unwrap();
        qtable.set(state.clone(), Action(3), 10.0);
        qtable.set(state.clone(), Action(22), 5.0);
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(
                adapter.select_action(&qtable, &state, current, &mut rng),
                Some(Action(22))
            );
        }
        assert_eq!(
            adapter.select_action(&qtable, &state, NumberSet::FULL, &mut rng),
            None
        );
    }

    #[test]
    fn test_exploration_stays_outside() {
        let adapter = adapter(0.1, 0.9);
        let qtable = QTable::new(1.0);
        let state = StateKey(vec![0]);
        let current = NumberSet::pick(1_u8..=15).unwrap();
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..50 {
            let Action(n) = adapter.select_action(&qtable, &state, current, &mut rng).unwrap();
            assert!(!current.contains(n));
        }
    }

    #[test]
    fn test_adjust_weights_follows_correlation() {
        let config = RlConfig {
            reward: RewardShaping::Tiered,
            ..RlConfig::default()
        };
        let adapter = RlAdapter::new(&config);
        let mut learning = LearningState::new(&config);
        let before = learning.weights.get(FeatureId::Sum).unwrap();

        let draw = Draw::new(10, None, NumberSet::pick(1_u8..=15).unwrap()).unwrap();
        let predictions = [1_u8, 4, 8, 11]
            .into_iter()
            .map(|start| {
                let numbers = NumberSet::pick(start..start + 15).unwrap();
                Prediction {
                    numbers,
                    features: compute_features(numbers, &NumberFrequencies::ZERO, None),
                    mutation: (start == 1).then(|| MutationRecord {
                        state: StateKey(vec![0]),
                        action: Action(15),
                        parent_fitness: 0.0,
                    }),
                }
            })
            .collect();
        let outcome = Outcome { draw, predictions };

        let weights = adapter.adjust_weights(&mut learning, &outcome);
        // higher sums matched worse
        assert!(weights.get(FeatureId::Sum).unwrap() < before);
        assert_eq!(weights, learning.weights);
        // the mutated prediction matched all fifteen numbers
        assert!(learning.qtable.get(&StateKey(vec![0]), Action(15)) > 0.0);
        assert_eq!(learning.qtable.episodes(), 1);
        assert!((learning.qtable.epsilon() - 0.15 * 0.995).abs() < 1e-6);
    }

    #[test]
    fn test_qtable_serde() {
        let mut qtable = QTable::new(0.2);
        qtable.set(StateKey(vec![1, 0]), Action(5), 1.5);
        let json = serde_json::to_string(&qtable).unwrap();
        let back: QTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, qtable);
    }
}
