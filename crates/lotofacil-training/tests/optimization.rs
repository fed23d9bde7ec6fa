use lotofacil_core::{Draw, DrawHistory, NumberSet};
use lotofacil_evaluator::{
    constraints::{Bounds, SelectionConstraints},
    feature::FeatureId,
    weights::{IncompleteWeightVectorError, WeightVector},
};
use lotofacil_training::{
    config::{OptimizerConfig, RunMode, Selection},
    optimizer::{
        CancellationToken, GenerationSummary, RunError, RunOutcome, Termination,
        run_optimization, summary_channel,
    },
    reinforcement::LearningState,
    synthetic::BiasedHistory,
};

fn biased_history() -> DrawHistory {
    BiasedHistory {
        seed: 2024,
        ..BiasedHistory::default()
    }
    .generate()
    .unwrap()
}

fn config(seed: u64) -> OptimizerConfig {
    OptimizerConfig {
        population_size: 100,
        generation_budget: 50,
        ..OptimizerConfig::with_seed(seed)
    }
}

fn run(config: &OptimizerConfig, history: &DrawHistory) -> (RunOutcome, LearningState) {
    let mut learning = LearningState::new(&config.rl);
    let mut observer = |_: &GenerationSummary| {};
    let outcome = run_optimization(
        config,
        history,
        &mut learning,
        &CancellationToken::new(),
        &mut observer,
    )
    .unwrap();
    (outcome, learning)
}

fn without_timing(trace: &[GenerationSummary]) -> Vec<GenerationSummary> {
    trace
        .iter()
        .map(|s| GenerationSummary {
            elapsed_ms: 0,
            ..s.clone()
        })
        .collect()
}

#[test]
fn test_recovers_hot_numbers_of_biased_history() {
    let history = biased_history();
    let (outcome, _) = run(&config(42), &history);

    let hot = NumberSet::from_numbers(1_u8..=15).unwrap();
    let best = outcome.best.candidate().numbers();
    assert!(best.is_pick());
    assert!(
        best.overlap(hot) >= 10,
        "best candidate [{best}] shares only {} numbers with 1..=15",
        best.overlap(hot)
    );
    assert!(!outcome.is_partial());
}

#[test]
fn test_same_seed_same_result() {
    let history = biased_history();
    let config = OptimizerConfig {
        generation_budget: 15,
        ..config(7)
    };
    let (a, learning_a) = run(&config, &history);
    let (b, learning_b) = run(&config, &history);

    assert_eq!(a.best.candidate(), b.best.candidate());
    assert_eq!(a.termination, b.termination);
    assert_eq!(without_timing(&a.trace), without_timing(&b.trace));
    assert_eq!(learning_a, learning_b);
}

#[test]
fn test_every_generation_holds_valid_candidates() {
    let history = biased_history();
    let config = OptimizerConfig {
        population_size: 60,
        generation_budget: 20,
        mutation_rate: 0.8,
        ..OptimizerConfig::with_seed(5)
    };
    let (outcome, _) = run(&config, &history);
    assert!(
        outcome
            .final_population
            .iter()
            .all(|ind| ind.candidate().numbers().is_pick())
    );
    assert_eq!(outcome.final_population.len(), 60);
    assert_eq!(outcome.trace.len() as u32, outcome.generations);
    assert!(outcome.trace.iter().all(|s| s.unique >= 1 && s.diversity <= 1.0));
}

#[test]
fn test_best_never_decreases_without_variation() {
    let history = biased_history();
    let config = OptimizerConfig {
        population_size: 50,
        generation_budget: 30,
        mutation_rate: 0.0,
        crossover_rate: 0.0,
        elite_fraction: 0.1,
        selection: Selection::Tournament { size: 3 },
        convergence_patience: 100,
        ..OptimizerConfig::with_seed(11)
    };
    let (outcome, _) = run(&config, &history);
    assert_eq!(outcome.termination, Termination::Exhausted);
    assert!(outcome.trace.windows(2).all(|w| w[1].best >= w[0].best));
    assert_eq!(
        outcome.trace.last().unwrap().best_ever,
        outcome.best.fitness()
    );
}

#[test]
fn test_stagnation_converges() {
    let history = biased_history();
    let config = OptimizerConfig {
        population_size: 30,
        generation_budget: 500,
        mutation_rate: 0.0,
        crossover_rate: 0.0,
        convergence_patience: 5,
        ..OptimizerConfig::with_seed(3)
    };
    let (outcome, _) = run(&config, &history);
    assert_eq!(outcome.termination, Termination::Converged);
    assert!(outcome.generations < 500);
}

#[test]
fn test_cancellation_returns_partial_best() {
    let history = biased_history();
    let config = config(9);
    let cancel = CancellationToken::new();
    let mut learning = LearningState::new(&config.rl);
    let mut observer = |summary: &GenerationSummary| {
        if summary.generation == 2 {
            cancel.cancel();
        }
    };
    let outcome =
        run_optimization(&config, &history, &mut learning, &cancel, &mut observer).unwrap();

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert!(outcome.is_partial());
    assert_eq!(outcome.generations, 3);
    assert!(outcome.best.candidate().numbers().is_pick());
}

#[test]
fn test_time_budget_returns_partial_best() {
    let history = biased_history();
    let config = OptimizerConfig {
        time_budget_ms: Some(0),
        ..config(1)
    };
    let (outcome, _) = run(&config, &history);
    assert_eq!(outcome.termination, Termination::TimeBudgetExhausted);
    assert_eq!(outcome.generations, 1);
}

#[test]
fn test_incomplete_weights_fail_before_running() {
    let history = biased_history();
    let config = config(1);
    let mut learning = LearningState::new(&config.rl);
    learning.weights = WeightVector::from_entries(
        FeatureId::ALL
            .into_iter()
            .filter(|&id| id != FeatureId::Sum)
            .map(|id| (id, 1.0)),
    );
    let mut calls = 0;
    let mut observer = |_: &GenerationSummary| calls += 1;
    let err = run_optimization(
        &config,
        &history,
        &mut learning,
        &CancellationToken::new(),
        &mut observer,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RunError::IncompleteWeightVector(IncompleteWeightVectorError {
            missing: FeatureId::Sum
        })
    ));
    assert_eq!(calls, 0);
}

#[test]
fn test_rl_learns_during_run() {
    let history = biased_history();
    let config = OptimizerConfig {
        generation_budget: 10,
        mutation_rate: 0.5,
        ..config(21)
    };
    let (_, learning) = run(&config, &history);
    assert!(!learning.qtable.is_empty());

    let disabled = OptimizerConfig {
        rl: lotofacil_training::config::RlConfig {
            enabled: false,
            ..config.rl.clone()
        },
        ..config
    };
    let (_, learning) = run(&disabled, &history);
    assert!(learning.qtable.is_empty());
}

#[test]
fn test_summary_stream_on_another_thread() {
    let history = biased_history();
    let config = OptimizerConfig {
        generation_budget: 8,
        convergence_patience: 100,
        ..config(4)
    };
    let mut learning = LearningState::new(&config.rl);
    let (mut tx, stream) = summary_channel();
    let (outcome, received) = std::thread::scope(|s| {
        let consumer = s.spawn(move || stream.collect::<Vec<_>>());
        let outcome = run_optimization(
            &config,
            &history,
            &mut learning,
            &CancellationToken::new(),
            &mut tx,
        )
        .unwrap();
        drop(tx);
        (outcome, consumer.join().unwrap())
    });
    assert_eq!(received, outcome.trace);
    assert_eq!(received.len(), 8);
}

fn history_ending_in_jump_precursor() -> DrawHistory {
    // sum 221 with runs 1-2 / 14-17 / 19-21 / 23-25
    let jumpy = NumberSet::pick([1u8, 2, 5, 8, 11, 14, 15, 16, 17, 19, 20, 21, 23, 24, 25]).unwrap();
    let mut history = biased_history();
    for _ in 0..3 {
        let index = history.next_index();
        history.append(Draw::new(index, None, jumpy).unwrap()).unwrap();
    }
    history
}

#[test]
fn test_jump_precursor_switches_to_anti_jump_mode() {
    let history = history_ending_in_jump_precursor();
    let config = OptimizerConfig {
        population_size: 40,
        generation_budget: 5,
        ..OptimizerConfig::with_seed(8)
    };
    let (outcome, learning) = run(&config, &history);

    assert_eq!(outcome.mode, RunMode::AntiJump);
    for (feature, factor) in &config.anti_jump.weight_factors {
        let learned = learning.weights.get(*feature).unwrap();
        assert_eq!(outcome.weights.get(*feature), Some(learned * factor));
    }
    assert_eq!(
        outcome.weights.get(FeatureId::Sum),
        learning.weights.get(FeatureId::Sum)
    );

    let constraints = config.constraints_for(outcome.mode);
    for ind in outcome.publishable(constraints, 10) {
        assert!(ind.features().unwrap().get(FeatureId::MaxRun) <= 5.0);
    }

    let disabled = OptimizerConfig {
        anti_jump: lotofacil_training::config::AntiJumpConfig {
            enabled: false,
            ..config.anti_jump.clone()
        },
        ..config
    };
    let (outcome, learning) = run(&disabled, &history);
    assert_eq!(outcome.mode, RunMode::Normal);
    assert_eq!(outcome.weights, learning.weights);
}

#[test]
fn test_normal_history_runs_in_normal_mode() {
    let history = biased_history();
    let config = OptimizerConfig {
        generation_budget: 3,
        ..config(12)
    };
    let (outcome, _) = run(&config, &history);
    assert_eq!(outcome.mode, RunMode::Normal);
}

#[test]
fn test_publishable_selections_respect_constraints() {
    let history = biased_history();
    let config = OptimizerConfig {
        generation_budget: 10,
        ..config(6)
    };
    let (outcome, _) = run(&config, &history);

    let unconstrained = outcome.publishable(&SelectionConstraints::default(), 5);
    assert_eq!(unconstrained.len(), 5);
    assert_eq!(unconstrained[0].candidate(), outcome.best.candidate());
    let mut numbers = unconstrained
        .iter()
        .map(|ind| ind.candidate().numbers())
        .collect::<Vec<_>>();
    numbers.sort_unstable();
    numbers.dedup();
    assert_eq!(numbers.len(), 5);
    assert!(unconstrained.windows(2).all(|w| w[0].fitness() >= w[1].fitness()));

    let standard = SelectionConstraints::standard();
    for ind in outcome.publishable(&standard, 5) {
        assert!(standard.is_satisfied(ind.features().unwrap()));
    }

    let impossible = SelectionConstraints::default().with(FeatureId::Sum, Bounds::new(0.0, 0.0));
    assert!(outcome.publishable(&impossible, 5).is_empty());
}
