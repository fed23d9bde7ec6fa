//! Search for 15-of-25 selections that look like future draws.
//!
//! # How a Run Works
//!
//! 1. **Initialize** - sample a diverse population of selections
//! 2. **Evaluate** - score every selection with the fitness evaluator under
//!    the current weight snapshot
//! 3. **Select** - keep the elites and pick parents for the rest
//! 4. **Recombine** - cross parents over, keeping their common numbers
//! 5. **Mutate** - swap one number, chosen by the Q-table policy
//! 6. **Repeat** - until convergence, the generation budget, the time budget
//!    or cancellation
//!
//! # Architecture
//!
//! ```text
//! DrawHistory (lotofacil-core)
//!     ↓ borrowed by
//! FitnessEvaluator (lotofacil-evaluator)
//!     ↓ scores
//! GeneticEngine ◀── mutation policy ── RlAdapter + QTable
//!     ↓ best candidates
//! Predictions ──▶ real draw ──▶ adjust_weights ──▶ WeightVector + QTable
//! ```
//!
//! The learned state ([`reinforcement::LearningState`]) is owned by the
//! caller and passed explicitly; [`persistence::LearningStore`] moves it
//! between runs.
//!
//! # Example
//!
//! ```
//! use lotofacil_training::{
//!     config::OptimizerConfig,
//!     optimizer::{CancellationToken, GenerationSummary, run_optimization},
//!     reinforcement::LearningState,
//!     synthetic::BiasedHistory,
//! };
//!
//! let history = BiasedHistory::default().generate().unwrap();
//! let config = OptimizerConfig {
//!     population_size: 30,
//!     generation_budget: 5,
//!     ..OptimizerConfig::with_seed(7)
//! };
//! let mut learning = LearningState::new(&config.rl);
//! let mut observer = |_: &GenerationSummary| {};
//! let outcome = run_optimization(
//!     &config,
//!     &history,
//!     &mut learning,
//!     &CancellationToken::new(),
//!     &mut observer,
//! )
//! .unwrap();
//! assert!(outcome.best.candidate().numbers().is_pick());
//! assert!(outcome.generations <= 5);
//! ```

pub mod config;
pub mod genetic;
pub mod operators;
pub mod optimizer;
pub mod persistence;
pub mod reinforcement;
pub mod synthetic;
