//! Feature extraction, rare-event detection and fitness scoring for 15-of-25
//! selections.
//!
//! The pipeline, leaf first:
//!
//! ```text
//! DrawHistory ─▶ FeatureExtractor ─▶ RareEventDetector ─▶ FitnessEvaluator ◀─ WeightVector
//! ```
//!
//! - [`feature`]: the versioned feature set and [`FeatureVector`](feature::FeatureVector)
//! - [`extractor`]: computes feature vectors for draws and candidates
//! - [`detector`]: per-feature baselines and rare-event classification
//! - [`fitness`]: weighted scoring with capped rare-event adjustments
//! - [`weights`]: the [`WeightVector`](weights::WeightVector) tuned by the learning loop
//! - [`constraints`]: ranges a published selection must satisfy
//!
//! # Example
//!
//! ```
//! use lotofacil_core::{Candidate, CandidateId, Draw, DrawHistory, NumberSet};
//! use lotofacil_evaluator::{
//!     detector::{RareEventDetector, RareThreshold},
//!     extractor::FeatureExtractor,
//!     fitness::{FitnessEvaluator, FitnessPolicy},
//!     weights::WeightVector,
//! };
//!
//! let numbers = NumberSet::pick(1_u8..=15).unwrap();
//! let history = DrawHistory::from_draws(vec![Draw::new(1, None, numbers).unwrap()]).unwrap();
//! let evaluator = FitnessEvaluator::new(
//!     FeatureExtractor::new(&history, 50),
//!     RareEventDetector::from_history(&history, 50, RareThreshold::default()),
//!     FitnessPolicy::default(),
//! );
//!
//! let candidate = Candidate::new(CandidateId(0), numbers, 0, None).unwrap();
//! let features = evaluator.features(&candidate).unwrap();
//! let events = evaluator.events(&features);
//! let fitness = evaluator
//!     .evaluate(&candidate, &WeightVector::default(), &events)
//!     .unwrap();
//! assert!(fitness.is_finite());
//! ```

pub mod constraints;
pub mod detector;
pub mod extractor;
pub mod feature;
pub mod fitness;
pub mod weights;
