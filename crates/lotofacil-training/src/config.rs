//! Optimizer configuration.
//!
//! [`OptimizerConfig`] is an explicit value: nothing is read from the
//! environment. JSON documents must name every field and may not carry
//! unknown ones.

use std::collections::BTreeMap;

use lotofacil_evaluator::{
    constraints::SelectionConstraints,
    detector::RareThreshold,
    feature::FeatureId,
    fitness::{FitnessPolicy, InvalidPolicyError},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("population size must be at least 2, got {size}")]
    PopulationTooSmall { size: usize },
    #[display("generation budget must be positive")]
    EmptyGenerationBudget,
    #[display("convergence patience must be positive")]
    NoPatience,
    #[display("`{name}` must lie within 0..=1, got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },
    #[display("`{name}` must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[display("tournament size {size} must be within 1..={population_size}")]
    TournamentSize { size: usize, population_size: usize },
    #[display("percentiles must satisfy 0 <= lower < upper <= 100, got {lower}/{upper}")]
    Percentiles { lower: f32, upper: f32 },
    #[display("bin edges must be strictly increasing within (0, 1)")]
    BinEdges,
    #[display("state features must not be empty")]
    NoStateFeatures,
    #[display("weight bounds must satisfy 0 <= min <= max, got {min}..{max}")]
    WeightBounds { min: f32, max: f32 },
    #[display("Hamming distance floor {distance} exceeds the maximum of 20")]
    HammingFloor { distance: usize },
    #[display("worker thread count must be positive")]
    NoWorkers,
    #[display("{_0}")]
    Fitness(InvalidPolicyError),
    #[display("constraint on `{feature}` must satisfy min <= max, got {min}..={max}")]
    ConstraintBounds { feature: FeatureId, min: f32, max: f32 },
    #[display("anti-jump factor for `{feature}` must be finite and non-negative, got {factor}")]
    AntiJumpFactor { feature: FeatureId, factor: f32 },
    #[display("malformed configuration: {_0}")]
    Parse(serde_json::Error),
}

/// Parent selection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Selection {
    /// Best of `size` individuals drawn without replacement.
    Tournament { size: usize },
    /// Fitness-proportionate selection over fitness shifted to be positive.
    Roulette,
}

/// How the first generation is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStrategy {
    /// Uniformly random selections.
    Uniform,
    /// Half of the population drawn mostly from hot numbers, 30% from warm
    /// and 20% from cold numbers, ranked by trailing frequency.
    Stratified,
}

/// How the history shapes a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display, derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[display("normal")]
    Normal,
    /// The history ends in a jump precursor streak.
    #[display("anti_jump")]
    AntiJump,
}

/// Response to a jump precursor at the end of the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AntiJumpConfig {
    pub enabled: bool,
    /// Multipliers applied to the run's weight snapshot. Unlisted features
    /// keep their weight.
    pub weight_factors: BTreeMap<FeatureId, f32>,
    /// Constraints on published predictions, replacing
    /// [`OptimizerConfig::constraints`].
    pub constraints: SelectionConstraints,
}

impl Default for AntiJumpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight_factors: BTreeMap::from([
                (FeatureId::MaxRun, 0.6),
                (FeatureId::RunGroups, 0.6),
                (FeatureId::PreviousOverlap, 0.7),
                (FeatureId::FrameCount, 1.2),
                (FeatureId::MaxGap, 1.5),
            ]),
            constraints: SelectionConstraints::anti_jump(),
        }
    }
}

/// Reward granted for the matches of a prediction against a real draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardShaping {
    /// The match count itself, 0 to 15.
    Matches,
    /// Prize tiers: 11 → 1, 12 → 3, 13 → 8, 14 → 20, 15 → 100, otherwise 0.
    Tiered,
}

impl RewardShaping {
    /// ```
    /// use lotofacil_training::config::RewardShaping;
    ///
    /// assert_eq!(RewardShaping::Matches.reward(9), 9.0);
    /// assert_eq!(RewardShaping::Tiered.reward(10), 0.0);
    /// assert_eq!(RewardShaping::Tiered.reward(13), 8.0);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn reward(self, matches: usize) -> f32 {
        match self {
            Self::Matches => matches as f32,
            Self::Tiered => match matches {
                11 => 1.0,
                12 => 3.0,
                13 => 8.0,
                14 => 20.0,
                15 => 100.0,
                _ => 0.0,
            },
        }
    }
}

/// Reinforcement-learning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RlConfig {
    /// When disabled, mutation picks outside numbers uniformly and no
    /// Q-values are updated during a run.
    pub enabled: bool,
    pub learning_rate: f32,
    pub discount: f32,
    /// Exploration rate of a fresh Q-table.
    pub epsilon: f32,
    pub epsilon_decay: f32,
    pub min_epsilon: f32,
    /// Features whose normalized values form the discretized state.
    pub state_features: Vec<FeatureId>,
    /// Interior bin edges in `(0, 1)`, strictly increasing.
    pub bin_edges: Vec<f32>,
    pub reward: RewardShaping,
    /// Largest weight change per learning episode.
    pub weight_step: f32,
    pub min_weight: f32,
    pub max_weight: f32,
}

impl Default for RlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            learning_rate: 0.1,
            discount: 0.95,
            epsilon: 0.15,
            epsilon_decay: 0.995,
            min_epsilon: 0.01,
            state_features: vec![
                FeatureId::Frequency,
                FeatureId::Sum,
                FeatureId::EvenCount,
                FeatureId::MaxRun,
                FeatureId::PreviousOverlap,
            ],
            bin_edges: vec![0.25, 0.5, 0.75],
            reward: RewardShaping::Matches,
            weight_step: 0.1,
            min_weight: 0.1,
            max_weight: 3.0,
        }
    }
}

/// Everything that parameterizes one optimization run.
///
/// Identical configuration, history and learning state reproduce the same
/// result and trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    pub seed: u64,
    pub population_size: usize,
    pub generation_budget: u32,
    /// Wall-clock budget; `None` runs until the generation budget or
    /// convergence.
    pub time_budget_ms: Option<u64>,
    pub mutation_rate: f32,
    /// Probability that a child is recombined rather than copied from its
    /// first parent.
    pub crossover_rate: f32,
    /// Share of the population copied unmodified, rounded up.
    pub elite_fraction: f32,
    pub selection: Selection,
    pub convergence_epsilon: f32,
    pub convergence_patience: u32,
    /// Minimum Hamming distance between members of the initial population.
    pub min_hamming_distance: usize,
    pub init_strategy: InitStrategy,
    pub rare_threshold: RareThreshold,
    /// Number of trailing draws used for frequencies.
    pub frequency_window: usize,
    pub fitness: FitnessPolicy,
    /// Constraints on published predictions in [`RunMode::Normal`].
    pub constraints: SelectionConstraints,
    pub anti_jump: AntiJumpConfig,
    pub rl: RlConfig,
    pub worker_threads: usize,
}

impl OptimizerConfig {
    /// Default configuration for `seed`.
    ///
    /// ```
    /// use lotofacil_training::config::OptimizerConfig;
    ///
    /// let config = OptimizerConfig::with_seed(42);
    /// assert_eq!(config.population_size, 200);
    /// assert!(config.validate().is_ok());
    /// ```
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            population_size: 200,
            generation_budget: 100,
            time_budget_ms: None,
            mutation_rate: 0.15,
            crossover_rate: 1.0,
            elite_fraction: 0.05,
            selection: Selection::Tournament { size: 5 },
            convergence_epsilon: 1e-4,
            convergence_patience: 15,
            min_hamming_distance: 4,
            init_strategy: InitStrategy::Uniform,
            rare_threshold: RareThreshold::default(),
            frequency_window: 50,
            fitness: FitnessPolicy::default(),
            constraints: SelectionConstraints::standard(),
            anti_jump: AntiJumpConfig::default(),
            rl: RlConfig::default(),
            worker_threads: 4,
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Constraints published predictions must satisfy in `mode`.
    #[must_use]
    pub fn constraints_for(&self, mode: RunMode) -> &SelectionConstraints {
        match mode {
            RunMode::Normal => &self.constraints,
            RunMode::AntiJump => &self.anti_jump.constraints,
        }
    }

    /// Number of elites copied into each generation.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn elite_count(&self) -> usize {
        let count = (self.elite_fraction * self.population_size as f32).ceil() as usize;
        count.min(self.population_size)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall {
                size: self.population_size,
            });
        }
        if self.generation_budget == 0 {
            return Err(ConfigError::EmptyGenerationBudget);
        }
        if self.convergence_patience == 0 {
            return Err(ConfigError::NoPatience);
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
            ("elite_fraction", self.elite_fraction),
            ("rl.learning_rate", self.rl.learning_rate),
            ("rl.discount", self.rl.discount),
            ("rl.epsilon", self.rl.epsilon),
            ("rl.epsilon_decay", self.rl.epsilon_decay),
            ("rl.min_epsilon", self.rl.min_epsilon),
        ] {
            unit_range(name, value)?;
        }
        for (name, value) in [
            ("convergence_epsilon", self.convergence_epsilon),
            ("rl.weight_step", self.rl.weight_step),
            ("fitness.deviation_cap", self.fitness.deviation_cap),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if let Selection::Tournament { size } = self.selection
            && !(1..=self.population_size).contains(&size)
        {
            return Err(ConfigError::TournamentSize {
                size,
                population_size: self.population_size,
            });
        }
        match self.rare_threshold {
            RareThreshold::Quantile {
                lower_percentile: lower,
                upper_percentile: upper,
            } => {
                if !(0.0 <= lower && lower < upper && upper <= 100.0) {
                    return Err(ConfigError::Percentiles { lower, upper });
                }
            }
            RareThreshold::StdDev { k } => {
                if !(k > 0.0) {
                    return Err(ConfigError::NotPositive {
                        name: "rare_threshold.k",
                        value: k,
                    });
                }
            }
        }
        let edges = &self.rl.bin_edges;
        if edges.iter().any(|e| !(*e > 0.0 && *e < 1.0)) || !edges.is_sorted_by(|a, b| a < b) {
            return Err(ConfigError::BinEdges);
        }
        if self.rl.state_features.is_empty() {
            return Err(ConfigError::NoStateFeatures);
        }
        let (min, max) = (self.rl.min_weight, self.rl.max_weight);
        if !(0.0 <= min && min <= max) {
            return Err(ConfigError::WeightBounds { min, max });
        }
        if self.min_hamming_distance > 20 {
            return Err(ConfigError::HammingFloor {
                distance: self.min_hamming_distance,
            });
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.fitness.validate().map_err(ConfigError::Fitness)?;
        for (feature, bounds) in self.constraints.iter().chain(self.anti_jump.constraints.iter()) {
            if !(bounds.min <= bounds.max) {
                return Err(ConfigError::ConstraintBounds {
                    feature,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        for (&feature, &factor) in &self.anti_jump.weight_factors {
            if !(factor.is_finite() && factor >= 0.0) {
                return Err(ConfigError::AntiJumpFactor { feature, factor });
            }
        }
        Ok(())
    }
}

fn unit_range(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}
