/// Value at `percentile` (0.0–100.0) of an ascending-sorted sample.
///
/// Nearest-rank method: the index is `floor(n * p / 100)`, clamped to the
/// last element. The result is always one of the sample values, which is what
/// lets callers reason about exact ties at a threshold.
///
/// Returns `f32::NAN` for an empty sample.
///
/// # Examples
///
/// ```
/// use lotofacil_stats::percentiles::compute_percentile;
///
/// let values = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(compute_percentile(&values, 50.0), 3.0);
/// assert_eq!(compute_percentile(&values, 25.0), 2.0);
/// assert_eq!(compute_percentile(&values, 100.0), 5.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_percentile(sorted_values: &[f32], percentile: f32) -> f32 {
    debug_assert!(
        sorted_values.is_sorted_by(|a, b| a <= b),
        "values must be sorted in ascending order"
    );
    if sorted_values.is_empty() {
        return f32::NAN;
    }
    let idx = ((sorted_values.len() as f32 * percentile) / 100.0) as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

/// Two-sided band between a lower and an upper percentile.
///
/// A value is *inside* the band when `lower <= value <= upper`; the
/// boundaries themselves belong to the band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileBand {
    /// Value at the lower percentile.
    pub lower: f32,
    /// Value at the upper percentile.
    pub upper: f32,
}

impl QuantileBand {
    /// Computes the band from an unsorted sample.
    ///
    /// Returns `None` when the sample is empty.
    #[must_use]
    pub fn new(values: &[f32], lower_percentile: f32, upper_percentile: f32) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f32::total_cmp);
        Self::from_sorted(&sorted, lower_percentile, upper_percentile)
    }

    /// Computes the band from an ascending-sorted sample.
    #[must_use]
    pub fn from_sorted(
        sorted_values: &[f32],
        lower_percentile: f32,
        upper_percentile: f32,
    ) -> Option<Self> {
        if sorted_values.is_empty() {
            return None;
        }
        Some(Self {
            lower: compute_percentile(sorted_values, lower_percentile),
            upper: compute_percentile(sorted_values, upper_percentile),
        })
    }

    /// Returns `true` if `value` lies in the closed band.
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        self.lower <= value && value <= self.upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample() {
        assert!(compute_percentile(&[], 50.0).is_nan());
        assert!(QuantileBand::new(&[], 2.5, 97.5).is_none());
    }

    #[test]
    fn test_band_boundaries_are_inside() {
        let values: Vec<f32> = (0..=40).rev().map(|v| v as f32).collect();
        let band = QuantileBand::new(&values, 2.5, 97.5).unwrap();
        assert!(band.contains(band.lower));
        assert!(band.contains(band.upper));
        assert!(!band.contains(0.0));
        assert!(!band.contains(40.0));
    }

    #[test]
    fn test_single_value_band() {
        let band = QuantileBand::new(&[7.0], 2.5, 97.5).unwrap();
        assert_eq!(band.lower, 7.0);
        assert_eq!(band.upper, 7.0);
    }
}
