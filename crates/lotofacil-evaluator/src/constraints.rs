//! Structural constraints on published selections.
//!
//! A [`SelectionConstraints`] maps features to inclusive ranges of their raw
//! values. Features without a range are unconstrained, so the empty set
//! accepts every selection.
//!
//! | feature | [`standard`](SelectionConstraints::standard) | [`anti_jump`](SelectionConstraints::anti_jump) |
//! |---------|----------|-----------|
//! | `sum` | 175–235 | 175–235 |
//! | `even_count` | 6–9 | 6–9 |
//! | `max_run` | 1–7 | 1–5 |
//! | `prime_count` | 4–7 | 4–7 |
//! | `fibonacci_count` | 3–5 | 3–5 |
//! | `frame_count` | 10–12 | 10–12 |
//! | `center_count` | 3–5 | 3–5 |
//! | `multiple_of_three_count` | 4–6 | 4–6 |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::feature::{FeatureId, FeatureVector};

/// Inclusive range of a raw feature value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// NaN is never contained.
    #[must_use]
    pub fn contains(self, value: f32) -> bool {
        self.min <= value && value <= self.max
    }
}

/// First feature of a selection found outside its range.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("{feature} = {value} lies outside {min}..={max}")]
pub struct ConstraintViolation {
    pub feature: FeatureId,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

/// Ranges a selection must satisfy to be published.
///
/// # Examples
///
/// ```
/// use lotofacil_core::NumberSet;
/// use lotofacil_evaluator::{
///     constraints::SelectionConstraints,
///     extractor::{NumberFrequencies, compute_features},
///     feature::FeatureId,
/// };
///
/// let constraints = SelectionConstraints::standard();
/// let features = |numbers| compute_features(numbers, &NumberFrequencies::ZERO, None);
///
/// let low = NumberSet::pick(1_u8..=15).unwrap();
/// let err = constraints.check(&features(low)).unwrap_err();
/// assert_eq!(err.feature, FeatureId::Sum);
///
/// let balanced = NumberSet::pick([2_u8, 4, 5, 6, 7, 8, 10, 13, 14, 15, 18, 20, 21, 23, 25]).unwrap();
/// assert!(constraints.check(&features(balanced)).is_ok());
/// assert!(SelectionConstraints::default().is_satisfied(&features(low)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionConstraints(BTreeMap<FeatureId, Bounds>);

impl SelectionConstraints {
    /// Ranges of a regular draw.
    #[must_use]
    pub fn standard() -> Self {
        Self::default()
            .with(FeatureId::Sum, Bounds::new(175.0, 235.0))
            .with(FeatureId::EvenCount, Bounds::new(6.0, 9.0))
            .with(FeatureId::MaxRun, Bounds::new(1.0, 7.0))
            .with(FeatureId::PrimeCount, Bounds::new(4.0, 7.0))
            .with(FeatureId::FibonacciCount, Bounds::new(3.0, 5.0))
            .with(FeatureId::FrameCount, Bounds::new(10.0, 12.0))
            .with(FeatureId::CenterCount, Bounds::new(3.0, 5.0))
            .with(FeatureId::MultipleOfThreeCount, Bounds::new(4.0, 6.0))
    }

    /// [`standard`](Self::standard) with shorter runs, used while a jump is
    /// expected.
    #[must_use]
    pub fn anti_jump() -> Self {
        Self::standard().with(FeatureId::MaxRun, Bounds::new(1.0, 5.0))
    }

    #[must_use]
    pub fn with(mut self, id: FeatureId, bounds: Bounds) -> Self {
        self.0.insert(id, bounds);
        self
    }

    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<Bounds> {
        self.0.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, Bounds)> + '_ {
        self.0.iter().map(|(&id, &bounds)| (id, bounds))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks ranges in [`FeatureId::ALL`] order and reports the first
    /// violation.
    pub fn check(&self, features: &FeatureVector) -> Result<(), ConstraintViolation> {
        for (feature, bounds) in self.iter() {
            let value = features.get(feature);
            if !bounds.contains(value) {
                return Err(ConstraintViolation {
                    feature,
                    value,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_satisfied(&self, features: &FeatureVector) -> bool {
        self.check(features).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use lotofacil_core::NumberSet;

    use super::*;
    use crate::extractor::{NumberFrequencies, compute_features};

    fn features(numbers: &[u8]) -> FeatureVector {
        compute_features(
            NumberSet::pick(numbers.iter().copied()).unwrap(),
            &NumberFrequencies::ZERO,
            None,
        )
    }

    #[test]
    fn test_anti_jump_rejects_long_runs() {
        // Run 3..=8 has length 6.
        let numbers = [1, 3, 4, 5, 6, 7, 8, 11, 13, 16, 17, 20, 22, 24, 25];
        let features = features(&numbers);
        assert_eq!(features.get(FeatureId::MaxRun), 6.0);

        let standard = SelectionConstraints::standard();
        assert!(standard.get(FeatureId::MaxRun).unwrap().contains(6.0));
        let err = SelectionConstraints::default()
            .with(FeatureId::MaxRun, Bounds::new(1.0, 5.0))
            .check(&features)
            .unwrap_err();
        assert_eq!(
            err,
            ConstraintViolation {
                feature: FeatureId::MaxRun,
                value: 6.0,
                min: 1.0,
                max: 5.0,
            }
        );
        assert_eq!(
            SelectionConstraints::anti_jump().get(FeatureId::MaxRun),
            Some(Bounds::new(1.0, 5.0))
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let bounds = Bounds::new(6.0, 9.0);
        assert!(bounds.contains(6.0));
        assert!(bounds.contains(9.0));
        assert!(!bounds.contains(9.5));
        assert!(!bounds.contains(f32::NAN));
    }

    #[test]
    fn test_serializes_as_feature_map() {
        let constraints =
            SelectionConstraints::default().with(FeatureId::Sum, Bounds::new(175.0, 235.0));
        let json = serde_json::to_string(&constraints).unwrap();
        assert_eq!(json, r#"{"sum":{"min":175.0,"max":235.0}}"#);
        assert_eq!(
            serde_json::from_str::<SelectionConstraints>(&json).unwrap(),
            constraints
        );
    }
}
