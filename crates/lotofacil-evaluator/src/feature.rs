//! The fixed, versioned feature set.
//!
//! Every feature has a raw value computed from a 15-number selection (and,
//! for the context features, the draw history) and a normalized value in
//! `[0.0, 1.0]` obtained by linear scaling of the raw range.
//!
//! | id | raw value | raw range |
//! |----|-----------|-----------|
//! | `frequency` | mean trailing-window frequency of the selected numbers | 0–1 |
//! | `sum` | sum of the numbers | 120–270 |
//! | `even_count` | count of even numbers | 2–12 |
//! | `max_run` | longest run of consecutive numbers | 1–15 |
//! | `min_gap` | smallest gap between adjacent sorted numbers | 1–11 |
//! | `previous_overlap` | share of numbers repeated from the preceding draw | 0–1 |
//! | `max_gap` | largest gap between adjacent sorted numbers | 1–11 |
//! | `run_groups` | runs of two or more consecutive numbers | 0–7 |
//! | `prime_count` | members of [`PRIMES`] | 0–9 |
//! | `fibonacci_count` | members of [`FIBONACCI`] | 0–7 |
//! | `frame_count` | members of [`FRAME`], the ticket border | 0–15 |
//! | `center_count` | members of [`CENTER`], the inner 3×3 block | 0–9 |
//! | `multiple_of_three_count` | members of [`MULTIPLES_OF_THREE`] | 0–8 |
//!
//! Fifteen numbers out of 25 cannot all be two apart, so `min_gap` is 1 for
//! every valid selection. It is kept for completeness of the set.

use std::fmt;

use lotofacil_core::NumberSet;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

/// Version of the feature set. Weight vectors record the version they were
/// built for.
pub const FEATURE_SET_VERSION: u32 = 1;

const fn mask(numbers: &[u8]) -> NumberSet {
    let mut bits = 0;
    let mut i = 0;
    while i < numbers.len() {
        bits |= 1 << (numbers[i] - 1);
        i += 1;
    }
    NumberSet::from_bits(bits)
}

/// Prime numbers of the universe.
pub const PRIMES: NumberSet = mask(&[2, 3, 5, 7, 11, 13, 17, 19, 23]);
/// Fibonacci numbers of the universe.
pub const FIBONACCI: NumberSet = mask(&[1, 2, 3, 5, 8, 13, 21]);
/// Border of the 5×5 ticket.
pub const FRAME: NumberSet = mask(&[1, 2, 3, 4, 5, 6, 10, 11, 15, 16, 20, 21, 22, 23, 24, 25]);
/// Inner 3×3 block of the ticket.
pub const CENTER: NumberSet = mask(&[7, 8, 9, 12, 13, 14, 17, 18, 19]);
/// Multiples of three.
pub const MULTIPLES_OF_THREE: NumberSet = mask(&[3, 6, 9, 12, 15, 18, 21, 24]);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FeatureId {
    Frequency,
    Sum,
    EvenCount,
    MaxRun,
    MinGap,
    PreviousOverlap,
    MaxGap,
    RunGroups,
    PrimeCount,
    FibonacciCount,
    FrameCount,
    CenterCount,
    MultipleOfThreeCount,
}

impl FeatureId {
    pub const LEN: usize = 13;

    /// All features in their fixed evaluation order.
    pub const ALL: [Self; Self::LEN] = [
        Self::Frequency,
        Self::Sum,
        Self::EvenCount,
        Self::MaxRun,
        Self::MinGap,
        Self::PreviousOverlap,
        Self::MaxGap,
        Self::RunGroups,
        Self::PrimeCount,
        Self::FibonacciCount,
        Self::FrameCount,
        Self::CenterCount,
        Self::MultipleOfThreeCount,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Frequency => "frequency",
            Self::Sum => "sum",
            Self::EvenCount => "even_count",
            Self::MaxRun => "max_run",
            Self::MinGap => "min_gap",
            Self::PreviousOverlap => "previous_overlap",
            Self::MaxGap => "max_gap",
            Self::RunGroups => "run_groups",
            Self::PrimeCount => "prime_count",
            Self::FibonacciCount => "fibonacci_count",
            Self::FrameCount => "frame_count",
            Self::CenterCount => "center_count",
            Self::MultipleOfThreeCount => "multiple_of_three_count",
        }
    }

    /// Inclusive raw range used for normalization.
    #[must_use]
    pub const fn range(self) -> (f32, f32) {
        match self {
            Self::Frequency | Self::PreviousOverlap => (0.0, 1.0),
            Self::Sum => (120.0, 270.0),
            Self::EvenCount => (2.0, 12.0),
            Self::MaxRun => (1.0, 15.0),
            Self::MinGap | Self::MaxGap => (1.0, 11.0),
            Self::RunGroups => (0.0, 7.0),
            Self::PrimeCount | Self::CenterCount => (0.0, 9.0),
            Self::FibonacciCount => (0.0, 7.0),
            Self::FrameCount => (0.0, 15.0),
            Self::MultipleOfThreeCount => (0.0, 8.0),
        }
    }

    /// Scales a raw value linearly into `[0.0, 1.0]`, clamping outliers.
    ///
    /// NaN passes through unchanged.
    ///
    /// ```
    /// use lotofacil_evaluator::feature::FeatureId;
    ///
    /// assert_eq!(FeatureId::Sum.normalize(195.0), 0.5);
    /// assert_eq!(FeatureId::Sum.normalize(300.0), 1.0);
    /// assert!(FeatureId::Sum.normalize(f32::NAN).is_nan());
    /// ```
    #[must_use]
    pub fn normalize(self, raw: f32) -> f32 {
        let (lo, hi) = self.range();
        ((raw - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw feature values of one selection, indexed by [`FeatureId`].
///
/// Built whole by the extractor; there is no way to patch a single entry.
/// Serialized as a map from feature id to raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f32; FeatureId::LEN],
}

impl FeatureVector {
    #[must_use]
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(FeatureId) -> f32,
    {
        Self {
            values: FeatureId::ALL.map(&mut f),
        }
    }

    #[must_use]
    pub fn get(&self, id: FeatureId) -> f32 {
        self.values[id.index()]
    }

    #[must_use]
    pub fn normalized(&self, id: FeatureId) -> f32 {
        id.normalize(self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, f32)> + '_ {
        FeatureId::ALL.into_iter().zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(FeatureId::LEN))?;
        for (id, value) in self.iter() {
            map.serialize_entry(id.as_str(), &value)?;
        }
        map.end()
    }
}
