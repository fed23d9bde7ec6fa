//! Fitness of a candidate: a weighted sum of per-feature scores plus a capped
//! rare-event adjustment.
//!
//! ```text
//! fitness = Σ weight_f · score_f + clamp(Σ adjustment_e, -penalty_cap, bonus_cap)
//! ```
//!
//! Each feature is scored in `[0.0, 1.0]` according to its [`ScoreShape`]:
//!
//! - `ascending`: the normalized value, higher raw values score higher
//! - `descending`: one minus the normalized value
//! - `typical`: 1 at the historical mean, falling linearly to 0 at
//!   `tolerance_sd` standard deviations away
//!
//! Each rare record adds `rare_high` or `rare_low` (from the feature's
//! [`FeaturePolicy`]) times its deviation, with the deviation capped at
//! `deviation_cap`.
//!
//! # Default policy
//!
//! | feature | shape | rare high | rare low |
//! |---------|-------|-----------|----------|
//! | `frequency` | ascending | +0.5 | −0.5 |
//! | all others | typical, 2 sd | +0.1 | −0.1 |
//!
//! with `deviation_cap = 3`, `bonus_cap = 1` and `penalty_cap = 1`.
//!
//! Terms are summed in [`FeatureId::ALL`] order, so identical inputs produce
//! bitwise-identical fitness values.

use std::collections::BTreeMap;

use lotofacil_core::{Candidate, InvalidEntityError};
use serde::{Deserialize, Serialize};

use crate::{
    detector::{EventClass, EventRecord, RareEventDetector},
    extractor::{Entity, FeatureExtractor},
    feature::{FeatureId, FeatureVector},
    weights::{IncompleteWeightVectorError, WeightVector},
};

/// Floor of the spread used by `typical` scoring, as a share of the raw range.
const SPREAD_FLOOR: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum EvaluateError {
    #[display("incomplete weight vector: {_0}")]
    IncompleteWeightVector(IncompleteWeightVectorError),
    #[display("invalid entity: {_0}")]
    InvalidEntity(InvalidEntityError),
}

/// A [`FitnessPolicy`] parameter outside its domain.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("fitness policy `{name}` must be {requirement}, got {value}")]
pub struct InvalidPolicyError {
    pub name: &'static str,
    pub requirement: &'static str,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ScoreShape {
    Ascending,
    Descending,
    Typical { tolerance_sd: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeaturePolicy {
    pub shape: ScoreShape,
    /// Adjustment per unit of deviation for a rare-high value.
    pub rare_high: f32,
    /// Adjustment per unit of deviation for a rare-low value.
    pub rare_low: f32,
}

impl FeaturePolicy {
    /// Policy used for `id` when none is configured.
    #[must_use]
    pub fn default_for(id: FeatureId) -> Self {
        match id {
            FeatureId::Frequency => Self {
                shape: ScoreShape::Ascending,
                rare_high: 0.5,
                rare_low: -0.5,
            },
            _ => Self {
                shape: ScoreShape::Typical { tolerance_sd: 2.0 },
                rare_high: 0.1,
                rare_low: -0.1,
            },
        }
    }
}

/// Scoring rules of the fitness function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FitnessPolicy {
    /// Per-feature overrides; absent features use
    /// [`FeaturePolicy::default_for`].
    pub features: BTreeMap<FeatureId, FeaturePolicy>,
    pub deviation_cap: f32,
    pub bonus_cap: f32,
    pub penalty_cap: f32,
}

impl Default for FitnessPolicy {
    fn default() -> Self {
        Self {
            features: BTreeMap::new(),
            deviation_cap: 3.0,
            bonus_cap: 1.0,
            penalty_cap: 1.0,
        }
    }
}

impl FitnessPolicy {
    #[must_use]
    pub fn feature(&self, id: FeatureId) -> FeaturePolicy {
        self.features
            .get(&id)
            .copied()
            .unwrap_or_else(|| FeaturePolicy::default_for(id))
    }

    /// Checks that the caps are finite and non-negative, `deviation_cap` and
    /// every `tolerance_sd` positive, and every coefficient finite.
    ///
    /// ```
    /// use lotofacil_evaluator::fitness::FitnessPolicy;
    ///
    /// assert!(FitnessPolicy::default().validate().is_ok());
    /// let policy = FitnessPolicy { penalty_cap: -2.0, ..FitnessPolicy::default() };
    /// assert_eq!(policy.validate().unwrap_err().name, "penalty_cap");
    /// ```
    pub fn validate(&self) -> Result<(), InvalidPolicyError> {
        let check = |name, requirement, value: f32, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(InvalidPolicyError {
                    name,
                    requirement,
                    value,
                })
            }
        };
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;
        check(
            "deviation_cap",
            "positive",
            self.deviation_cap,
            positive(self.deviation_cap),
        )?;
        check(
            "bonus_cap",
            "non-negative",
            self.bonus_cap,
            non_negative(self.bonus_cap),
        )?;
        check(
            "penalty_cap",
            "non-negative",
            self.penalty_cap,
            non_negative(self.penalty_cap),
        )?;
        for policy in self.features.values() {
            if let ScoreShape::Typical { tolerance_sd } = policy.shape {
                check(
                    "tolerance_sd",
                    "positive",
                    tolerance_sd,
                    positive(tolerance_sd),
                )?;
            }
            check("rare_high", "finite", policy.rare_high, policy.rare_high.is_finite())?;
            check("rare_low", "finite", policy.rare_low, policy.rare_low.is_finite())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: FeatureId,
    pub value: f32,
    pub score: f32,
    pub weight: f32,
    pub contribution: f32,
}

/// Per-feature decomposition of a fitness value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessBreakdown {
    pub contributions: Vec<FeatureContribution>,
    pub event_adjustment: f32,
    pub total: f32,
}

/// Scores candidates against a fixed history context and baseline.
///
/// Holds no mutable state, so one evaluator can be shared by worker threads.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator<'h> {
    extractor: FeatureExtractor<'h>,
    detector: RareEventDetector,
    policy: FitnessPolicy,
}

impl<'h> FitnessEvaluator<'h> {
    #[must_use]
    pub fn new(
        extractor: FeatureExtractor<'h>,
        detector: RareEventDetector,
        policy: FitnessPolicy,
    ) -> Self {
        Self {
            extractor,
            detector,
            policy,
        }
    }

    #[must_use]
    pub fn extractor(&self) -> &FeatureExtractor<'h> {
        &self.extractor
    }

    #[must_use]
    pub fn detector(&self) -> &RareEventDetector {
        &self.detector
    }

    #[must_use]
    pub fn policy(&self) -> &FitnessPolicy {
        &self.policy
    }

    pub fn features(&self, candidate: &Candidate) -> Result<FeatureVector, InvalidEntityError> {
        self.extractor.extract(Entity::Candidate(candidate))
    }

    #[must_use]
    pub fn events(&self, features: &FeatureVector) -> Vec<EventRecord> {
        self.detector.classify(features)
    }

    /// Fitness of `candidate` under `weights` and the given rare-event
    /// records.
    pub fn evaluate(
        &self,
        candidate: &Candidate,
        weights: &WeightVector,
        events: &[EventRecord],
    ) -> Result<f32, EvaluateError> {
        let features = self.features(candidate)?;
        self.evaluate_features(&features, weights, events)
    }

    pub fn evaluate_features(
        &self,
        features: &FeatureVector,
        weights: &WeightVector,
        events: &[EventRecord],
    ) -> Result<f32, EvaluateError> {
        Ok(self.breakdown(features, weights, events)?.total)
    }

    pub fn breakdown(
        &self,
        features: &FeatureVector,
        weights: &WeightVector,
        events: &[EventRecord],
    ) -> Result<FitnessBreakdown, EvaluateError> {
        let mut contributions = Vec::with_capacity(FeatureId::LEN);
        let mut total = 0.0;
        for id in FeatureId::ALL {
            let weight = weights.require(id)?;
            let value = features.get(id);
            let score = self.score(id, value);
            let contribution = weight * score;
            total += contribution;
            contributions.push(FeatureContribution {
                feature: id,
                value,
                score,
                weight,
                contribution,
            });
        }
        let event_adjustment = self.event_adjustment(events);
        Ok(FitnessBreakdown {
            contributions,
            event_adjustment,
            total: total + event_adjustment,
        })
    }

    /// Score of a raw feature value in `[0.0, 1.0]`. NaN scores 0.
    #[must_use]
    pub fn score(&self, id: FeatureId, value: f32) -> f32 {
        let score = match self.policy.feature(id).shape {
            ScoreShape::Ascending => id.normalize(value),
            ScoreShape::Descending => 1.0 - id.normalize(value),
            ScoreShape::Typical { tolerance_sd } => {
                let (lo, hi) = id.range();
                let width = hi - lo;
                let (center, spread) = match self.detector.baseline() {
                    Some(baseline) => {
                        let b = baseline.get(id);
                        (b.mean, b.std_dev.max(width * SPREAD_FLOOR))
                    }
                    None => (f32::midpoint(lo, hi), width / 4.0),
                };
                1.0 - (value - center).abs() / (tolerance_sd * spread)
            }
        };
        if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
    }

    fn event_adjustment(&self, events: &[EventRecord]) -> f32 {
        let sum = events
            .iter()
            .map(|event| {
                let policy = self.policy.feature(event.feature);
                let coefficient = match event.class {
                    EventClass::RareHigh => policy.rare_high,
                    EventClass::RareLow => policy.rare_low,
                    EventClass::Normal => return 0.0,
                };
                coefficient * event.deviation.min(self.policy.deviation_cap)
            })
            .sum::<f32>();
        // `clamp` panics when an unvalidated policy has min > max.
        sum.max(-self.policy.penalty_cap).min(self.policy.bonus_cap)
    }
}

#[cfg(test)]
mod tests {
    use lotofacil_core::{CandidateId, Draw, DrawHistory, NumberSet};

    use super::*;
    use crate::detector::RareThreshold;

    fn history() -> DrawHistory {
        let hot = NumberSet::pick(1_u8..=15).unwrap();
        let mixed = NumberSet::pick((1_u8..=10).chain(16..=20)).unwrap();
        DrawHistory::from_draws(
            (1..=20)
                .map(|i| Draw::new(i, None, if i % 4 == 0 { mixed } else { hot }).unwrap())
                .collect(),
        )
        .unwrap()
    }

    fn candidate(numbers: NumberSet) -> Candidate {
        Candidate::new(CandidateId(0), numbers, 0, None).unwrap()
    }

    fn evaluator(history: &DrawHistory) -> FitnessEvaluator<'_> {
        FitnessEvaluator::new(
            FeatureExtractor::new(history, 10),
            RareEventDetector::from_history(history, 10, RareThreshold::default()),
            FitnessPolicy::default(),
        )
    }

    #[test]
    fn test_evaluate_is_pure() {
        let history = history();
        let evaluator = evaluator(&history);
        let weights = WeightVector::default();
        let c = candidate(NumberSet::pick(3_u8..=17).unwrap());
        let events = evaluator.events(&evaluator.features(&c).unwrap());
        let a = evaluator.evaluate(&c, &weights, &events).unwrap();
        let b = evaluator.evaluate(&c, &weights, &events).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_incomplete_weights() {
        let history = history();
        let evaluator = evaluator(&history);
        let weights = WeightVector::from_entries([(FeatureId::Frequency, 1.0)]);
        let c = candidate(NumberSet::pick(1_u8..=15).unwrap());
        assert_eq!(
            evaluator.evaluate(&c, &weights, &[]),
            Err(EvaluateError::IncompleteWeightVector(
                IncompleteWeightVectorError {
                    missing: FeatureId::Sum
                }
            ))
        );
    }

    #[test]
    fn test_hot_numbers_score_higher() {
        let history = history();
        let evaluator = evaluator(&history);
        let weights = WeightVector::from_entries(
            FeatureId::ALL.map(|id| (id, if id == FeatureId::Frequency { 1.0 } else { 0.1 })),
        );
        let hot = candidate(NumberSet::pick(1_u8..=15).unwrap());
        let cold = candidate(NumberSet::pick(11_u8..=25).unwrap());
        let score = |c: &Candidate| {
            let events = evaluator.events(&evaluator.features(c).unwrap());
            evaluator.evaluate(c, &weights, &events).unwrap()
        };
        assert!(score(&hot) > score(&cold));
    }

    #[test]
    fn test_event_adjustment_is_capped() {
        let history = history();
        let evaluator = evaluator(&history);
        let event = |class| EventRecord {
            draw_index: None,
            feature: FeatureId::Frequency,
            value: 0.0,
            deviation: 100.0,
            class,
        };
        let features = FeatureVector::from_fn(|_| 0.0);
        let weights = WeightVector::uniform(0.0);
        let high = evaluator
            .breakdown(&features, &weights, &[event(EventClass::RareHigh); 5])
            .unwrap();
        assert_eq!(high.event_adjustment, 1.0);
        let low = evaluator
            .breakdown(&features, &weights, &[event(EventClass::RareLow)])
            .unwrap();
        assert_eq!(low.event_adjustment, -1.0);
        let normal = evaluator
            .breakdown(&features, &weights, &[event(EventClass::Normal)])
            .unwrap();
        assert_eq!(normal.event_adjustment, 0.0);
    }

    #[test]
    fn test_typical_without_baseline_centers_on_range() {
        let history = DrawHistory::new();
        let evaluator = FitnessEvaluator::new(
            FeatureExtractor::new(&history, 10),
            RareEventDetector::new(10, RareThreshold::default()),
            FitnessPolicy::default(),
        );
        assert_eq!(evaluator.score(FeatureId::Sum, 195.0), 1.0);
        assert_eq!(evaluator.score(FeatureId::Sum, 157.5), 0.5);
        assert_eq!(evaluator.score(FeatureId::Sum, 120.0), 0.0);
        assert_eq!(evaluator.score(FeatureId::Frequency, f32::NAN), 0.0);
    }

    #[test]
    fn test_policy_validation() {
        let policy = FitnessPolicy {
            penalty_cap: -2.0,
            ..FitnessPolicy::default()
        };
        assert_eq!(
            policy.validate(),
            Err(InvalidPolicyError {
                name: "penalty_cap",
                requirement: "non-negative",
                value: -2.0
            })
        );

        let policy = FitnessPolicy {
            bonus_cap: f32::INFINITY,
            ..FitnessPolicy::default()
        };
        assert_eq!(policy.validate().unwrap_err().name, "bonus_cap");

        let mut policy = FitnessPolicy::default();
        policy.features.insert(
            FeatureId::Sum,
            FeaturePolicy {
                shape: ScoreShape::Typical { tolerance_sd: 0.0 },
                rare_high: 0.1,
                rare_low: -0.1,
            },
        );
        assert_eq!(policy.validate().unwrap_err().name, "tolerance_sd");
    }

    #[test]
    fn test_inverted_caps_do_not_panic() {
        let history = history();
        let evaluator = FitnessEvaluator::new(
            FeatureExtractor::new(&history, 10),
            RareEventDetector::from_history(&history, 10, RareThreshold::default()),
            FitnessPolicy {
                penalty_cap: -2.0,
                ..FitnessPolicy::default()
            },
        );
        let event = EventRecord {
            draw_index: None,
            feature: FeatureId::Frequency,
            value: 0.0,
            deviation: 1.0,
            class: EventClass::RareLow,
        };
        let breakdown = evaluator
            .breakdown(
                &FeatureVector::from_fn(|_| 0.0),
                &WeightVector::uniform(0.0),
                &[event],
            )
            .unwrap();
        assert!(breakdown.total.is_finite());
    }

    #[test]
    fn test_policy_requires_every_key() {
        let mut value = serde_json::to_value(FitnessPolicy::default()).unwrap();
        value.as_object_mut().unwrap().remove("bonus_cap");
        assert!(serde_json::from_value::<FitnessPolicy>(value).is_err());
    }
}
