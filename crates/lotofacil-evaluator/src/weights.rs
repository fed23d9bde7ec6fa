use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::feature::{FEATURE_SET_VERSION, FeatureId};

/// A weight key is missing for the current feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("weight vector has no entry for feature `{missing}`")]
pub struct IncompleteWeightVectorError {
    pub missing: FeatureId,
}

/// Per-feature weights of the fitness function.
///
/// Serialized as `{ "feature_set_version": 1, "weights": { "sum": 1.1, ... } }`.
/// Unknown feature names are rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightVector {
    feature_set_version: u32,
    weights: BTreeMap<FeatureId, f32>,
}

impl Default for WeightVector {
    /// Frequency dominates; the structural features start near 1 so the
    /// search favours selections that look like typical draws.
    fn default() -> Self {
        let weights = FeatureId::ALL
            .into_iter()
            .map(|id| {
                let w = match id {
                    FeatureId::Frequency => 1.5,
                    FeatureId::Sum => 1.1,
                    FeatureId::EvenCount | FeatureId::FrameCount => 1.0,
                    FeatureId::PrimeCount | FeatureId::PreviousOverlap => 0.9,
                    FeatureId::FibonacciCount | FeatureId::CenterCount => 0.8,
                    FeatureId::MultipleOfThreeCount => 0.7,
                    FeatureId::MaxRun | FeatureId::MaxGap | FeatureId::RunGroups => 0.5,
                    FeatureId::MinGap => 0.1,
                };
                (id, w)
            })
            .collect();
        Self {
            feature_set_version: FEATURE_SET_VERSION,
            weights,
        }
    }
}

impl WeightVector {
    /// Uniform weights for every feature.
    #[must_use]
    pub fn uniform(weight: f32) -> Self {
        Self {
            feature_set_version: FEATURE_SET_VERSION,
            weights: FeatureId::ALL.into_iter().map(|id| (id, weight)).collect(),
        }
    }

    /// Builds a vector from explicit entries. Completeness is checked at
    /// evaluation time.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (FeatureId, f32)>,
    {
        Self {
            feature_set_version: FEATURE_SET_VERSION,
            weights: entries.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn feature_set_version(&self) -> u32 {
        self.feature_set_version
    }

    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<f32> {
        self.weights.get(&id).copied()
    }

    pub fn require(&self, id: FeatureId) -> Result<f32, IncompleteWeightVectorError> {
        self.get(id)
            .ok_or(IncompleteWeightVectorError { missing: id })
    }

    /// Fails on the first feature, in evaluation order, without a weight.
    pub fn check_complete(&self) -> Result<(), IncompleteWeightVectorError> {
        FeatureId::ALL
            .into_iter()
            .try_for_each(|id| self.require(id).map(|_| ()))
    }

    pub fn set(&mut self, id: FeatureId, weight: f32) {
        self.weights.insert(id, weight);
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, f32)> + '_ {
        self.weights.iter().map(|(id, w)| (*id, *w))
    }
}
