//! One optimization run: the genetic engine driven to termination.
//!
//! [`run_optimization`] borrows the history for the whole run and the
//! [`LearningState`] mutably. Weights are snapshotted at the start; Q-values
//! are updated only between generations, from the fitness gain of each
//! mutated child over its parents.
//!
//! When the history ends in a jump precursor streak the run switches to
//! [`RunMode::AntiJump`]: the snapshot is rescaled by
//! [`anti_jump_weights`] and [`OptimizerConfig::constraints_for`] hands the
//! anti-jump constraints to [`RunOutcome::publishable`].
//!
//! Progress is reported through a [`GenerationObserver`]. Any
//! `FnMut(&GenerationSummary)` is an observer, and [`summary_channel`] turns
//! the summaries into an iterator consumed on another thread.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    time::{Duration, Instant},
};

use lotofacil_core::DrawHistory;
use lotofacil_evaluator::{
    constraints::SelectionConstraints,
    detector::RareEventDetector,
    extractor::FeatureExtractor,
    feature::FEATURE_SET_VERSION,
    fitness::{EvaluateError, FitnessEvaluator},
    weights::{IncompleteWeightVectorError, WeightVector},
};
use lotofacil_stats::descriptive::DescriptiveStats;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    config::{ConfigError, OptimizerConfig, RunMode},
    genetic::{GenerationPhase, GeneticEngine, Individual, InvariantViolation},
    reinforcement::{LearningState, RlAdapter, anti_jump_weights},
};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RunError {
    #[display("invalid configuration: {_0}")]
    Config(ConfigError),
    #[display("{_0}")]
    IncompleteWeightVector(IncompleteWeightVectorError),
    #[display("weights were learned for feature set {found}, expected {expected}")]
    FeatureSetVersion { expected: u32, found: u32 },
    #[display("evaluation failed: {_0}")]
    Evaluate(EvaluateError),
    #[display("{_0}")]
    InvariantViolation(Box<InvariantViolation>),
}

impl From<InvariantViolation> for RunError {
    fn from(err: InvariantViolation) -> Self {
        Self::InvariantViolation(Box::new(err))
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Best fitness stagnated for `convergence_patience` generations.
    Converged,
    /// The generation budget was used up.
    Exhausted,
    /// The wall-clock budget ran out before the search finished.
    TimeBudgetExhausted,
    /// Cancelled through the [`CancellationToken`].
    Cancelled,
}

impl Termination {
    /// Whether the run was cut short.
    #[must_use]
    pub fn is_partial(self) -> bool {
        matches!(self, Self::TimeBudgetExhausted | Self::Cancelled)
    }
}

/// Statistics of one evaluated generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: u32,
    pub best: f32,
    pub mean: f32,
    pub min: f32,
    pub std_dev: f32,
    /// Best fitness seen in this run so far.
    pub best_ever: f32,
    /// Mean pairwise Hamming distance divided by its maximum of 20.
    pub diversity: f32,
    /// Number of distinct selections in the population.
    pub unique: usize,
    pub elapsed_ms: u64,
}

/// Receives a summary after every evaluated generation.
pub trait GenerationObserver {
    fn on_generation(&mut self, summary: &GenerationSummary);
}

impl<F> GenerationObserver for F
where
    F: FnMut(&GenerationSummary),
{
    fn on_generation(&mut self, summary: &GenerationSummary) {
        self(summary);
    }
}

/// Observer half of [`summary_channel`].
#[derive(Debug, Clone)]
pub struct SummarySender {
    tx: Sender<GenerationSummary>,
}

impl GenerationObserver for SummarySender {
    fn on_generation(&mut self, summary: &GenerationSummary) {
        // A dropped stream only means nobody is listening.
        let _ = self.tx.send(summary.clone());
    }
}

/// Lazy iterator over generation summaries. Ends when the run finishes and
/// its [`SummarySender`] is dropped.
#[derive(Debug)]
pub struct SummaryStream {
    rx: Receiver<GenerationSummary>,
}

impl Iterator for SummaryStream {
    type Item = GenerationSummary;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

/// Connects a run to a consumer on another thread.
///
/// Sending never blocks the run.
///
/// ```
/// use lotofacil_training::optimizer::{GenerationObserver, GenerationSummary, summary_channel};
///
/// let (mut tx, stream) = summary_channel();
/// let summary = GenerationSummary {
///     generation: 0,
///     best: 1.0,
///     mean: 0.5,
///     min: 0.0,
///     std_dev: 0.1,
///     best_ever: 1.0,
///     diversity: 0.6,
///     unique: 10,
///     elapsed_ms: 3,
/// };
/// tx.on_generation(&summary);
/// drop(tx);
/// assert_eq!(stream.collect::<Vec<_>>(), vec![summary]);
/// ```
#[must_use]
pub fn summary_channel() -> (SummarySender, SummaryStream) {
    let (tx, rx) = mpsc::channel();
    (SummarySender { tx }, SummaryStream { rx })
}

/// Cooperative cancellation flag, checked between generations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Best individual seen during the run.
    pub best: Individual,
    pub mode: RunMode,
    /// Weight snapshot the run scored with.
    pub weights: WeightVector,
    pub termination: Termination,
    /// Number of evaluated generations.
    pub generations: u32,
    pub trace: Vec<GenerationSummary>,
    /// Last evaluated population, best first.
    pub final_population: Vec<Individual>,
}

impl RunOutcome {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.termination.is_partial()
    }

    /// Up to `top` distinct selections that satisfy `constraints`, taken
    /// from the best individual and then the final population, best first.
    #[must_use]
    pub fn publishable(&self, constraints: &SelectionConstraints, top: usize) -> Vec<&Individual> {
        let mut seen = Vec::new();
        std::iter::once(&self.best)
            .chain(&self.final_population)
            .filter(|ind| {
                ind.features()
                    .is_some_and(|features| constraints.is_satisfied(features))
            })
            .filter(|ind| {
                let numbers = ind.candidate().numbers();
                let fresh = !seen.contains(&numbers);
                if fresh {
                    seen.push(numbers);
                }
                fresh
            })
            .take(top)
            .collect()
    }
}

/// Runs the genetic search to termination.
///
/// Fails before the first generation when the configuration is invalid or
/// the weights do not cover the current feature set. Cancellation and the
/// time budget end the run with a partial result, never an error.
pub fn run_optimization(
    config: &OptimizerConfig,
    history: &DrawHistory,
    learning: &mut LearningState,
    cancel: &CancellationToken,
    observer: &mut dyn GenerationObserver,
) -> Result<RunOutcome, RunError> {
    config.validate().map_err(RunError::Config)?;
    let found = learning.weights.feature_set_version();
    if found != FEATURE_SET_VERSION {
        return Err(RunError::FeatureSetVersion {
            expected: FEATURE_SET_VERSION,
            found,
        });
    }
    learning
        .weights
        .check_complete()
        .map_err(RunError::IncompleteWeightVector)?;

    let started = Instant::now();
    let deadline = config.time_budget_ms.map(Duration::from_millis);
    let detector =
        RareEventDetector::from_history(history, config.frequency_window, config.rare_threshold);
    let mode = if config.anti_jump.enabled && detector.jump_precursor(history) {
        RunMode::AntiJump
    } else {
        RunMode::Normal
    };
    let weights = match mode {
        RunMode::Normal => learning.weights.clone(),
        RunMode::AntiJump => {
            tracing::warn!("history ends in a jump precursor streak, running in anti-jump mode");
            anti_jump_weights(&learning.weights, &config.anti_jump)
        }
    };
    let evaluator = FitnessEvaluator::new(
        FeatureExtractor::new(history, config.frequency_window),
        detector,
        config.fitness.clone(),
    );
    let adapter = config.rl.enabled.then(|| RlAdapter::new(&config.rl));
    let mut rng = Pcg32::seed_from_u64(config.seed);

    tracing::info!(
        seed = config.seed,
        population = config.population_size,
        generations = config.generation_budget,
        draws = history.len(),
        rl = config.rl.enabled,
        %mode,
        "optimization started"
    );

    let mut engine = GeneticEngine::initialize(config, &evaluator, &weights, &mut rng)?;
    let mut trace = Vec::new();
    let mut best: Option<Individual> = None;
    let mut stale = 0;

    let termination = loop {
        engine.evaluate().map_err(RunError::Evaluate)?;

        if let Some(adapter) = &adapter {
            for (record, fitness, features) in engine.mutation_outcomes() {
                let reward = fitness - record.parent_fitness;
                if !reward.is_finite() {
                    continue;
                }
                let next_state = adapter.discretizer().state(features);
                adapter.update(
                    &mut learning.qtable,
                    &record.state,
                    record.action,
                    reward,
                    &next_state,
                );
            }
        }

        let Some(leader) = engine.best() else {
            unreachable!("population is never empty");
        };
        let best_ever = best.as_ref().map_or(f32::NEG_INFINITY, Individual::fitness);
        if leader.fitness() > best_ever + config.convergence_epsilon {
            stale = 0;
        } else {
            stale += 1;
        }
        if leader.fitness() > best_ever {
            best = Some(leader.clone());
        }

        if let Some(summary) = summarize(
            engine.generation(),
            engine.population(),
            best_ever.max(leader.fitness()),
            started.elapsed(),
        ) {
            tracing::debug!(
                generation = summary.generation,
                best = summary.best,
                mean = summary.mean,
                diversity = summary.diversity,
                unique = summary.unique,
                "generation evaluated"
            );
            observer.on_generation(&summary);
            trace.push(summary);
        }

        if stale >= config.convergence_patience {
            engine.finish(GenerationPhase::Converged);
            break Termination::Converged;
        }
        if engine.generation() + 1 >= config.generation_budget {
            engine.finish(GenerationPhase::Exhausted);
            break Termination::Exhausted;
        }
        if cancel.is_cancelled() {
            break Termination::Cancelled;
        }
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break Termination::TimeBudgetExhausted;
        }

        engine.select(&mut rng);
        engine.recombine(&mut rng)?;
        let policy = adapter.as_ref().map(|a| (a, &learning.qtable));
        engine.mutate(policy, &mut rng)?;
    };

    let Some(best) = best else {
        unreachable!("at least one generation is evaluated");
    };
    let generations = engine.generation() + 1;
    let final_population = engine.population().to_vec();
    tracing::info!(
        %termination,
        generations,
        best = best.fitness(),
        numbers = %best.candidate().numbers(),
        elapsed_ms = started.elapsed().as_millis(),
        "optimization finished"
    );

    Ok(RunOutcome {
        best,
        mode,
        weights,
        termination,
        generations,
        trace,
        final_population,
    })
}

#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn summarize(
    generation: u32,
    population: &[Individual],
    best_ever: f32,
    elapsed: Duration,
) -> Option<GenerationSummary> {
    let fitness = population
        .iter()
        .map(Individual::fitness)
        .collect::<Vec<_>>();
    let stats = DescriptiveStats::from_slice(&fitness)?;

    let numbers = population
        .iter()
        .map(|ind| ind.candidate().numbers())
        .collect::<Vec<_>>();
    let mut distance = 0;
    let mut pairs = 0;
    for (i, a) in numbers.iter().enumerate() {
        for b in &numbers[i + 1..] {
            distance += a.hamming_distance(*b);
            pairs += 1;
        }
    }
    let diversity = if pairs == 0 {
        0.0
    } else {
        distance as f32 / pairs as f32 / 20.0
    };
    let mut unique = numbers.clone();
    unique.sort_unstable();
    unique.dedup();

    Some(GenerationSummary {
        generation,
        best: stats.max,
        mean: stats.mean,
        min: stats.min,
        std_dev: stats.std_dev,
        best_ever,
        diversity,
        unique: unique.len(),
        elapsed_ms: elapsed.as_millis() as u64,
    })
}
