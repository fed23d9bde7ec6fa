use chrono::{DateTime, Utc};
use lotofacil_core::{CandidateId, NumberSet};
use lotofacil_evaluator::{detector::EventRecord, fitness::FitnessBreakdown};
use lotofacil_training::{
    config::RunMode,
    optimizer::{GenerationSummary, Termination},
    reinforcement::{HitSummary, MutationRecord},
};
use serde::{Deserialize, Serialize};

/// Predictions published by `optimize` for the next draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    /// Index the next real draw is expected to carry.
    pub target_draw: u32,
    pub history_len: usize,
    /// Anti-jump runs rescale weights and publish under tighter constraints.
    pub mode: RunMode,
    pub termination: Termination,
    pub partial: bool,
    pub generations: u32,
    pub predictions: Vec<ReportedPrediction>,
    pub trace: Vec<GenerationSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedPrediction {
    pub rank: usize,
    pub candidate: CandidateId,
    pub numbers: NumberSet,
    pub generation_born: u32,
    pub fitness: f32,
    pub breakdown: FitnessBreakdown,
    /// Mutation that produced this candidate, kept so `learn` can credit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<MutationRecord>,
}

/// Rare events found by `detect`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub draws: usize,
    pub baseline_samples: usize,
    pub events: Vec<EventRecord>,
    pub jump_precursor: bool,
}

/// Result of `learn`: how the report's predictions fared against the draw.
#[derive(Debug, Clone, Serialize)]
pub struct LearnReport {
    pub draw: u32,
    pub numbers: NumberSet,
    pub predictions: Vec<ScoredPrediction>,
    pub hits: HitSummary,
    pub episodes: u64,
    pub epsilon: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredPrediction {
    pub rank: usize,
    pub numbers: NumberSet,
    pub matches: usize,
}
