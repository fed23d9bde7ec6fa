//! Rare-event detection against a per-feature historical baseline.
//!
//! The baseline summarizes every feature over the draws of a history (the
//! first draw is skipped when others exist, since it has no context). A
//! feature value strictly outside the baseline's `[lower, upper]` band is
//! rare; a value equal to a threshold is normal.
//!
//! The baseline is a snapshot. It only changes through
//! [`RareEventDetector::refresh`].

use lotofacil_core::{Draw, DrawHistory, InvalidEntityError};
use lotofacil_stats::{descriptive::DescriptiveStats, percentiles::QuantileBand};
use serde::{Deserialize, Serialize};

use crate::{
    extractor::{Entity, FeatureExtractor},
    feature::{FeatureId, FeatureVector},
};

/// Spread floor used when computing deviations of constant features.
pub const MIN_STD_DEV: f32 = 1e-6;

/// How the rare-event band of a feature is derived from its history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum RareThreshold {
    /// Nearest-rank percentiles of the historical values.
    Quantile {
        lower_percentile: f32,
        upper_percentile: f32,
    },
    /// `mean ± k` standard deviations.
    StdDev { k: f32 },
}

impl Default for RareThreshold {
    fn default() -> Self {
        Self::Quantile {
            lower_percentile: 2.5,
            upper_percentile: 97.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBaseline {
    pub mean: f32,
    pub std_dev: f32,
    pub lower: f32,
    pub upper: f32,
}

impl FeatureBaseline {
    fn from_values(values: &[f32], threshold: RareThreshold) -> Option<Self> {
        let stats = DescriptiveStats::from_slice(values)?;
        let (lower, upper) = match threshold {
            RareThreshold::Quantile {
                lower_percentile,
                upper_percentile,
            } => {
                let band = QuantileBand::new(values, lower_percentile, upper_percentile)?;
                (band.lower, band.upper)
            }
            RareThreshold::StdDev { k } => {
                (stats.mean - k * stats.std_dev, stats.mean + k * stats.std_dev)
            }
        };
        Some(Self {
            mean: stats.mean,
            std_dev: stats.std_dev,
            lower,
            upper,
        })
    }

    /// `|z|` of `value` against this baseline.
    #[must_use]
    pub fn deviation(&self, value: f32) -> f32 {
        ((value - self.mean) / self.std_dev.max(MIN_STD_DEV)).abs()
    }
}

/// Per-feature baselines computed from one history snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    sample_count: usize,
    threshold: RareThreshold,
    features: [FeatureBaseline; FeatureId::LEN],
}

impl Baseline {
    /// Builds a baseline from feature samples. Returns `None` for an empty
    /// sample.
    #[must_use]
    pub fn from_samples(samples: &[FeatureVector], threshold: RareThreshold) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut features = [FeatureBaseline {
            mean: 0.0,
            std_dev: 0.0,
            lower: 0.0,
            upper: 0.0,
        }; FeatureId::LEN];
        for id in FeatureId::ALL {
            let values = samples.iter().map(|s| s.get(id)).collect::<Vec<_>>();
            features[id.index()] = FeatureBaseline::from_values(&values, threshold)?;
        }
        Some(Self {
            sample_count: samples.len(),
            threshold,
            features,
        })
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[must_use]
    pub fn threshold(&self) -> RareThreshold {
        self.threshold
    }

    #[must_use]
    pub fn get(&self, id: FeatureId) -> &FeatureBaseline {
        &self.features[id.index()]
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    RareHigh,
    RareLow,
    Normal,
}

impl EventClass {
    #[must_use]
    pub fn is_rare(self) -> bool {
        !self.is_normal()
    }
}

/// Classification of one feature value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Index of the classified draw; `None` for candidates.
    pub draw_index: Option<u32>,
    pub feature: FeatureId,
    pub value: f32,
    /// `|z|` against the baseline mean, 0 without a baseline.
    pub deviation: f32,
    pub class: EventClass,
}

/// Thresholds of the "jump precursor" pattern: a streak of high-sum draws
/// with long runs clustered into a few groups.
pub const JUMP_PRECURSOR_DRAWS: usize = 3;
const JUMP_MIN_SUM: f32 = 180.0;
const JUMP_MIN_RUN: f32 = 4.0;
const JUMP_RUN_GROUPS: (f32, f32) = (3.0, 4.0);

#[derive(Debug, Clone)]
pub struct RareEventDetector {
    window: usize,
    threshold: RareThreshold,
    baseline: Option<Baseline>,
}

impl RareEventDetector {
    /// A detector without a baseline. Everything classifies as normal until
    /// [`Self::refresh`] is called.
    #[must_use]
    pub fn new(window: usize, threshold: RareThreshold) -> Self {
        Self {
            window,
            threshold,
            baseline: None,
        }
    }

    #[must_use]
    pub fn from_history(history: &DrawHistory, window: usize, threshold: RareThreshold) -> Self {
        let mut detector = Self::new(window, threshold);
        detector.refresh(history);
        detector
    }

    /// Uses a precomputed baseline.
    #[must_use]
    pub fn with_baseline(window: usize, baseline: Baseline) -> Self {
        Self {
            window,
            threshold: baseline.threshold(),
            baseline: Some(baseline),
        }
    }

    /// Recomputes the baseline from `history`.
    pub fn refresh(&mut self, history: &DrawHistory) {
        let extractor = FeatureExtractor::new(history, self.window);
        let samples = extractor
            .extract_history()
            .into_iter()
            .map(|(_, features)| features)
            .collect::<Vec<_>>();
        self.baseline = Baseline::from_samples(&samples, self.threshold);
        match &self.baseline {
            Some(baseline) => tracing::debug!(
                samples = baseline.sample_count(),
                "rare-event baseline refreshed"
            ),
            None => tracing::warn!("empty history, rare-event detection disabled"),
        }
    }

    #[must_use]
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// One record per feature, in feature order.
    #[must_use]
    pub fn classify(&self, features: &FeatureVector) -> Vec<EventRecord> {
        self.classify_indexed(None, features)
    }

    /// Classifies a draw in the context of `history`.
    pub fn classify_draw(
        &self,
        history: &DrawHistory,
        draw: &Draw,
    ) -> Result<Vec<EventRecord>, InvalidEntityError> {
        let features = FeatureExtractor::new(history, self.window).extract(Entity::Draw(draw))?;
        Ok(self.classify_indexed(Some(draw.index()), &features))
    }

    /// Every rare record of every draw of `history`.
    #[must_use]
    pub fn scan_history(&self, history: &DrawHistory) -> Vec<EventRecord> {
        FeatureExtractor::new(history, self.window)
            .extract_history()
            .into_iter()
            .flat_map(|(index, features)| self.classify_indexed(Some(index), &features))
            .filter(|record| record.class.is_rare())
            .collect()
    }

    /// Whether the history ends in a jump precursor streak, see
    /// [`jump_precursor`].
    #[must_use]
    pub fn jump_precursor(&self, history: &DrawHistory) -> bool {
        jump_precursor(history, self.window)
    }

    fn classify_indexed(&self, draw_index: Option<u32>, features: &FeatureVector) -> Vec<EventRecord> {
        features
            .iter()
            .map(|(feature, value)| {
                let (deviation, class) = match &self.baseline {
                    Some(baseline) => {
                        let b = baseline.get(feature);
                        (b.deviation(value), classify_value(b, value))
                    }
                    None => (0.0, EventClass::Normal),
                };
                EventRecord {
                    draw_index,
                    feature,
                    value,
                    deviation,
                    class,
                }
            })
            .collect()
    }
}

fn classify_value(baseline: &FeatureBaseline, value: f32) -> EventClass {
    if value > baseline.upper {
        EventClass::RareHigh
    } else if value < baseline.lower {
        EventClass::RareLow
    } else {
        EventClass::Normal
    }
}

/// Returns `true` when each of the last three draws has a sum above 180, a
/// run of at least four and three or four run groups.
#[must_use]
pub fn jump_precursor(history: &DrawHistory, window: usize) -> bool {
    let draws = history.draws();
    if draws.len() < JUMP_PRECURSOR_DRAWS {
        return false;
    }
    let extractor = FeatureExtractor::new(history, window);
    draws[draws.len() - JUMP_PRECURSOR_DRAWS..].iter().all(|draw| {
        extractor
            .extract(Entity::Draw(draw))
            .is_ok_and(|f| {
                f.get(FeatureId::Sum) > JUMP_MIN_SUM
                    && f.get(FeatureId::MaxRun) >= JUMP_MIN_RUN
                    && (JUMP_RUN_GROUPS.0..=JUMP_RUN_GROUPS.1).contains(&f.get(FeatureId::RunGroups))
            })
    })
}

#[cfg(test)]
mod tests {
    use lotofacil_core::NumberSet;

    use super::*;

    fn vector_with_sum(sum: f32) -> FeatureVector {
        FeatureVector::from_fn(|id| if id == FeatureId::Sum { sum } else { 0.0 })
    }

    fn history(picks: &[[u8; 15]]) -> DrawHistory {
        DrawHistory::from_draws(
            picks
                .iter()
                .zip(1..)
                .map(|(p, i)| Draw::new(i, None, NumberSet::pick(p.iter().copied()).unwrap()).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_threshold_boundary_is_normal() {
        let samples = (0..=40).map(|v| vector_with_sum(v as f32)).collect::<Vec<_>>();
        let baseline = Baseline::from_samples(&samples, RareThreshold::default()).unwrap();
        let detector = RareEventDetector::with_baseline(10, baseline);

        let class_of = |sum: f32| {
            detector
                .classify(&vector_with_sum(sum))
                .into_iter()
                .find(|r| r.feature == FeatureId::Sum)
                .unwrap()
                .class
        };
        assert_eq!(class_of(39.0), EventClass::Normal);
        assert_eq!(class_of(1.0), EventClass::Normal);
        assert_eq!(class_of(40.0), EventClass::RareHigh);
        assert_eq!(class_of(0.0), EventClass::RareLow);
    }

    #[test]
    fn test_std_dev_threshold() {
        let samples = [1.0, 3.0].map(vector_with_sum);
        let baseline = Baseline::from_samples(&samples, RareThreshold::StdDev { k: 2.0 }).unwrap();
        let sum = baseline.get(FeatureId::Sum);
        assert_eq!((sum.lower, sum.upper), (0.0, 4.0));
        assert_eq!(sum.deviation(4.0), 2.0);
    }

    #[test]
    fn test_no_baseline_is_all_normal() {
        let detector = RareEventDetector::new(10, RareThreshold::default());
        let records = detector.classify(&vector_with_sum(1000.0));
        assert_eq!(records.len(), FeatureId::LEN);
        assert!(records.iter().all(|r| r.class == EventClass::Normal && r.deviation == 0.0));

        let detector = RareEventDetector::from_history(&DrawHistory::new(), 10, RareThreshold::default());
        assert!(detector.baseline().is_none());
    }

    #[test]
    fn test_scan_history_reports_outlier_draw() {
        let low: [u8; 15] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
        let mid = [1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 2, 4];
        let high = [11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25];
        let mut picks = vec![mid; 40];
        picks.push(high);
        let history = history(&picks);
        let detector = RareEventDetector::from_history(&history, 10, RareThreshold::StdDev { k: 3.0 });
        let rare = detector.scan_history(&history);
        assert!(
            rare.iter()
                .any(|r| r.draw_index == Some(41) && r.feature == FeatureId::Sum && r.class == EventClass::RareHigh)
        );
        assert!(rare.iter().all(|r| r.class.is_rare()));

        let candidate = NumberSet::pick(low).unwrap();
        let features = FeatureExtractor::new(&history, 10).extract_numbers(candidate).unwrap();
        let sum = detector
            .classify(&features)
            .into_iter()
            .find(|r| r.feature == FeatureId::Sum)
            .unwrap();
        assert_eq!(sum.class, EventClass::RareLow);
        assert_eq!(sum.draw_index, None);
    }

    #[test]
    fn test_jump_precursor() {
        // sum 221, runs 1-2 / 14-17 / 19-21 / 23-25
        let jumpy = [1, 2, 5, 8, 11, 14, 15, 16, 17, 19, 20, 21, 23, 24, 25];
        let calm = [1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 2, 4];
        assert!(jump_precursor(&history(&[calm, jumpy, jumpy, jumpy]), 10));
        assert!(!jump_precursor(&history(&[jumpy, jumpy, calm]), 10));
        assert!(!jump_precursor(&history(&[jumpy, jumpy]), 10));
    }
}
