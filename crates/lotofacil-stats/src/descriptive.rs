/// Summary of a sample of `f32` values.
///
/// Variance is the population variance (divided by `n`), matching how the
/// detector treats the draw history as the whole population it knows about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptiveStats {
    /// Number of values in the sample.
    pub count: usize,
    /// The smallest value.
    pub min: f32,
    /// The largest value.
    pub max: f32,
    /// Arithmetic mean.
    pub mean: f32,
    /// Population variance.
    pub variance: f32,
    /// Square root of [`Self::variance`].
    pub std_dev: f32,
}

impl DescriptiveStats {
    /// Computes statistics over `values`.
    ///
    /// Returns `None` for an empty sample. Values are summed in iteration
    /// order, so the same input sequence always yields bitwise-identical
    /// results.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lotofacil_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    /// assert_eq!(stats.count, 8);
    /// assert_eq!(stats.min, 2.0);
    /// assert_eq!(stats.max, 9.0);
    /// assert_eq!(stats.mean, 5.0);
    /// assert_eq!(stats.std_dev, 2.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        Self::from_slice(&values)
    }

    /// Like [`Self::new`], borrowing the sample.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let first = *values.first()?;
        let (min, max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        Some(Self {
            count: values.len(),
            min,
            max,
            mean,
            variance,
            std_dev: variance.sqrt(),
        })
    }

    /// Signed distance of `value` from the mean in standard deviations.
    ///
    /// `min_std_dev` floors the spread so that a constant sample does not
    /// divide by zero.
    ///
    /// ```
    /// # use lotofacil_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([1.0, 3.0]).unwrap();
    /// assert_eq!(stats.z_score(4.0, 1e-6), 2.0);
    /// ```
    #[must_use]
    pub fn z_score(&self, value: f32, min_std_dev: f32) -> f32 {
        (value - self.mean) / self.std_dev.max(min_std_dev)
    }
}

/// Pearson correlation coefficient of paired samples.
///
/// Returns `None` when the samples differ in length, hold fewer than two
/// pairs, or either side is constant.
///
/// ```
/// # use lotofacil_stats::descriptive::pearson_correlation;
/// let r = pearson_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
/// assert!((r - 1.0).abs() < 1e-6);
/// assert_eq!(pearson_correlation(&[1.0, 1.0], &[1.0, 2.0]), None);
/// ```
#[must_use]
pub fn pearson_correlation(xs: &[f32], ys: &[f32]) -> Option<f32> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let x = DescriptiveStats::from_slice(xs)?;
    let y = DescriptiveStats::from_slice(ys)?;
    if x.std_dev == 0.0 || y.std_dev == 0.0 {
        return None;
    }
    let covariance = xs
        .iter()
        .zip(ys)
        .map(|(a, b)| (a - x.mean) * (b - y.mean))
        .sum::<f32>();
    #[expect(clippy::cast_precision_loss)]
    let n = xs.len() as f32;
    Some((covariance / n / (x.std_dev * y.std_dev)).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample() {
        assert!(DescriptiveStats::new(std::iter::empty()).is_none());
    }

    #[test]
    fn test_constant_sample_has_zero_spread() {
        let stats = DescriptiveStats::new([3.0; 5]).unwrap();
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.z_score(3.0, 0.5), 0.0);
        assert_eq!(stats.z_score(4.0, 0.5), 2.0);
    }

    #[test]
    fn test_negative_correlation() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-6);
        assert_eq!(pearson_correlation(&[1.0], &[1.0]), None);
        assert_eq!(pearson_correlation(&[1.0, 2.0], &[1.0]), None);
    }
}
