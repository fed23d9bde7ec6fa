use std::{path::PathBuf, thread};

use chrono::Utc;
use lotofacil_core::DrawHistory;
use lotofacil_evaluator::{
    detector::RareEventDetector, extractor::FeatureExtractor, fitness::FitnessEvaluator,
};
use lotofacil_training::{
    config::{InitStrategy, OptimizerConfig},
    optimizer::{CancellationToken, RunOutcome, run_optimization, summary_channel},
    persistence::LearningStore as _,
};

use crate::{
    command::StateArg,
    model::report::{Report, ReportedPrediction},
    util::Output,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct OptimizeArg {
    #[clap(flatten)]
    state: StateArg,
    /// Config file; defaults to config.json in the state directory
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Population size
    #[arg(long)]
    population: Option<usize>,
    /// Generation budget
    #[arg(long)]
    generations: Option<u32>,
    /// Wall-clock budget in milliseconds
    #[arg(long)]
    time_budget_ms: Option<u64>,
    /// Worker threads for fitness evaluation
    #[arg(long)]
    workers: Option<usize>,
    /// Seed the first generation from hot, warm and cold numbers
    #[arg(long)]
    stratified: bool,
    /// Mutate uniformly and leave the Q-table untouched
    #[arg(long)]
    no_rl: bool,
    /// Ignore a jump precursor at the end of the history
    #[arg(long)]
    no_anti_jump: bool,
    /// Number of predictions to publish
    #[arg(long, default_value_t = 5)]
    top: usize,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl OptimizeArg {
    fn resolve_config(&self) -> anyhow::Result<OptimizerConfig> {
        let mut config = self.state.load_config(self.config.as_deref())?;
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(population) = self.population {
            config.population_size = population;
        }
        if let Some(generations) = self.generations {
            config.generation_budget = generations;
        }
        if let Some(workers) = self.workers {
            config.worker_threads = workers;
        }
        if self.time_budget_ms.is_some() {
            config.time_budget_ms = self.time_budget_ms;
        }
        if self.stratified {
            config.init_strategy = InitStrategy::Stratified;
        }
        if self.no_rl {
            config.rl.enabled = false;
        }
        if self.no_anti_jump {
            config.anti_jump.enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn run(arg: &OptimizeArg) -> anyhow::Result<()> {
    let config = arg.resolve_config()?;
    let mut store = arg.state.open()?;
    let history = store.load_history()?.unwrap_or_default();
    if history.is_empty() {
        tracing::warn!("history is empty, frequencies and rare events carry no signal");
    }
    let mut learning = store.load_learning_state(&config.rl)?;

    let cancel = CancellationToken::new();
    let (mut tx, stream) = summary_channel();
    let outcome = thread::scope(|s| {
        s.spawn(move || {
            for summary in stream {
                tracing::info!(
                    generation = summary.generation,
                    best = format_args!("{:.3}", summary.best),
                    mean = format_args!("{:.3}", summary.mean),
                    best_ever = format_args!("{:.3}", summary.best_ever),
                    diversity = format_args!("{:.2}", summary.diversity),
                    unique = summary.unique,
                    "generation"
                );
            }
        });
        let outcome = run_optimization(&config, &history, &mut learning, &cancel, &mut tx);
        drop(tx);
        outcome
    })?;
    if outcome.is_partial() {
        tracing::warn!(termination = %outcome.termination, "run stopped early");
    }

    let report = build_report(&config, &history, &outcome, arg.top)?;
    store.save_qtable(&learning.qtable)?;
    Output::save_json(&report, arg.output.clone())?;

    for prediction in &report.predictions {
        tracing::info!(
            rank = prediction.rank,
            numbers = %prediction.numbers,
            fitness = format_args!("{:.3}", prediction.fitness),
            "prediction"
        );
    }
    Ok(())
}

fn build_report(
    config: &OptimizerConfig,
    history: &DrawHistory,
    outcome: &RunOutcome,
    top: usize,
) -> anyhow::Result<Report> {
    let evaluator = FitnessEvaluator::new(
        FeatureExtractor::new(history, config.frequency_window),
        RareEventDetector::from_history(history, config.frequency_window, config.rare_threshold),
        config.fitness.clone(),
    );
    let constraints = config.constraints_for(outcome.mode);
    let publishable = outcome.publishable(constraints, top);
    if publishable.len() < top {
        tracing::warn!(
            mode = %outcome.mode,
            published = publishable.len(),
            requested = top,
            "too few selections satisfy the constraints"
        );
    }
    let predictions = publishable
        .into_iter()
        .enumerate()
        .map(|(i, ind)| -> anyhow::Result<ReportedPrediction> {
            let candidate = ind.candidate();
            let features = evaluator.features(candidate)?;
            let events = evaluator.events(&features);
            let breakdown = evaluator.breakdown(&features, &outcome.weights, &events)?;
            Ok(ReportedPrediction {
                rank: i + 1,
                candidate: candidate.id(),
                numbers: candidate.numbers(),
                generation_born: candidate.generation_born(),
                fitness: ind.fitness(),
                breakdown,
                mutation: ind.mutation().cloned(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Report {
        generated_at: Utc::now(),
        seed: config.seed,
        target_draw: history.next_index(),
        history_len: history.len(),
        mode: outcome.mode,
        termination: outcome.termination,
        partial: outcome.is_partial(),
        generations: outcome.generations,
        predictions,
        trace: outcome.trace.clone(),
    })
}
