//! Feature extraction for draws and candidates.
//!
//! Context features (`frequency`, `previous_overlap`) depend on where the
//! entity sits relative to the history:
//!
//! - A [`Candidate`] looks at the last `window` draws and the latest draw.
//! - A [`Draw`] found in the history looks only at draws strictly before it.
//! - A [`Draw`] not in the history is treated like a candidate.
//!
//! A draw with no predecessor has `frequency = 0` and `previous_overlap = 0`.

use lotofacil_core::{
    Candidate, Draw, DrawHistory, InvalidEntityError, MAX_NUMBER, MIN_NUMBER, NumberSet,
    PICK_SIZE, POOL_SIZE,
};
use serde::Serialize;

use crate::feature::{
    CENTER, FIBONACCI, FRAME, FeatureId, FeatureVector, MULTIPLES_OF_THREE, PRIMES,
};

/// Share of draws in a window that contained each number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberFrequencies([f32; POOL_SIZE]);

impl NumberFrequencies {
    /// All-zero table, used when there is no history to look at.
    pub const ZERO: Self = Self([0.0; POOL_SIZE]);

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_draws(draws: &[Draw]) -> Self {
        if draws.is_empty() {
            return Self::ZERO;
        }
        let mut counts = [0_u32; POOL_SIZE];
        for draw in draws {
            for n in draw.numbers() {
                counts[usize::from(n - 1)] += 1;
            }
        }
        let total = draws.len() as f32;
        Self(counts.map(|c| c as f32 / total))
    }

    /// Frequency of `number`, or 0 outside `1..=25`.
    #[must_use]
    pub fn get(&self, number: u8) -> f32 {
        if (MIN_NUMBER..=MAX_NUMBER).contains(&number) {
            self.0[usize::from(number - 1)]
        } else {
            0.0
        }
    }

    /// Mean frequency of the members of `numbers`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean_of(&self, numbers: NumberSet) -> f32 {
        if numbers.is_empty() {
            return 0.0;
        }
        numbers.iter().map(|n| self.get(n)).sum::<f32>() / numbers.len() as f32
    }

    /// Numbers from most to least frequent; ties keep ascending order.
    #[must_use]
    pub fn ranked(&self) -> Vec<u8> {
        let mut numbers = (MIN_NUMBER..=MAX_NUMBER).collect::<Vec<_>>();
        numbers.sort_by(|a, b| self.get(*b).total_cmp(&self.get(*a)));
        numbers
    }
}

/// Entity accepted by [`FeatureExtractor::extract`].
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Draw(&'a Draw),
    Candidate(&'a Candidate),
}

/// Computes [`FeatureVector`]s against a borrowed history.
///
/// The candidate context (window frequencies and latest draw) is computed
/// once at construction; extraction itself is pure.
#[derive(Debug, Clone)]
pub struct FeatureExtractor<'h> {
    history: &'h DrawHistory,
    window: usize,
    frequencies: NumberFrequencies,
    latest: Option<NumberSet>,
}

impl<'h> FeatureExtractor<'h> {
    #[must_use]
    pub fn new(history: &'h DrawHistory, window: usize) -> Self {
        let frequencies =
            NumberFrequencies::from_draws(history.trailing(history.len(), window));
        Self {
            history,
            window,
            frequencies,
            latest: history.latest().map(Draw::numbers),
        }
    }

    #[must_use]
    pub fn history(&self) -> &'h DrawHistory {
        self.history
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Frequencies over the trailing window used for candidates.
    #[must_use]
    pub fn frequencies(&self) -> &NumberFrequencies {
        &self.frequencies
    }

    pub fn extract(&self, entity: Entity<'_>) -> Result<FeatureVector, InvalidEntityError> {
        match entity {
            Entity::Candidate(candidate) => self.extract_numbers(candidate.numbers()),
            Entity::Draw(draw) => self.extract_draw(draw),
        }
    }

    /// Extracts features of a bare selection in candidate context.
    pub fn extract_numbers(&self, numbers: NumberSet) -> Result<FeatureVector, InvalidEntityError> {
        numbers.validate_pick()?;
        Ok(compute_features(numbers, &self.frequencies, self.latest))
    }

    fn extract_draw(&self, draw: &Draw) -> Result<FeatureVector, InvalidEntityError> {
        let numbers = draw.numbers();
        numbers.validate_pick()?;
        let Some(pos) = self
            .history
            .position_of(draw.index())
            .filter(|&pos| self.history.draws()[pos] == *draw)
        else {
            return Ok(compute_features(numbers, &self.frequencies, self.latest));
        };
        Ok(self.features_at(pos))
    }

    fn features_at(&self, pos: usize) -> FeatureVector {
        let draws = self.history.draws();
        let frequencies = NumberFrequencies::from_draws(self.history.trailing(pos, self.window));
        let previous = pos.checked_sub(1).map(|p| draws[p].numbers());
        compute_features(draws[pos].numbers(), &frequencies, previous)
    }

    /// Features of every draw that has a predecessor, paired with its index.
    ///
    /// A single-draw history yields that draw alone.
    #[must_use]
    pub fn extract_history(&self) -> Vec<(u32, FeatureVector)> {
        let draws = self.history.draws();
        let start = usize::from(draws.len() > 1);
        (start..draws.len())
            .map(|pos| (draws[pos].index(), self.features_at(pos)))
            .collect()
    }
}

/// Computes the feature vector of `numbers` given its context.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn compute_features(
    numbers: NumberSet,
    frequencies: &NumberFrequencies,
    previous: Option<NumberSet>,
) -> FeatureVector {
    let sorted = numbers.to_array();
    let gaps = sorted.windows(2).map(|w| w[1] - w[0]);
    let min_gap = gaps.clone().min().unwrap_or(0);
    let max_gap = gaps.max().unwrap_or(0);
    let (max_run, run_groups) = runs(&sorted);
    let sum = sorted.iter().map(|&n| u32::from(n)).sum::<u32>();
    let even = sorted.iter().filter(|&&n| n % 2 == 0).count();
    let previous_overlap =
        previous.map_or(0.0, |p| numbers.overlap(p) as f32 / PICK_SIZE as f32);
    let frequency = if previous.is_some() {
        frequencies.mean_of(numbers)
    } else {
        0.0
    };

    FeatureVector::from_fn(|id| match id {
        FeatureId::Frequency => frequency,
        FeatureId::Sum => sum as f32,
        FeatureId::EvenCount => even as f32,
        FeatureId::MaxRun => max_run as f32,
        FeatureId::MinGap => f32::from(min_gap),
        FeatureId::PreviousOverlap => previous_overlap,
        FeatureId::MaxGap => f32::from(max_gap),
        FeatureId::RunGroups => run_groups as f32,
        FeatureId::PrimeCount => numbers.overlap(PRIMES) as f32,
        FeatureId::FibonacciCount => numbers.overlap(FIBONACCI) as f32,
        FeatureId::FrameCount => numbers.overlap(FRAME) as f32,
        FeatureId::CenterCount => numbers.overlap(CENTER) as f32,
        FeatureId::MultipleOfThreeCount => numbers.overlap(MULTIPLES_OF_THREE) as f32,
    })
}

/// Longest consecutive run and number of runs of length two or more.
fn runs(sorted: &[u8]) -> (usize, usize) {
    let mut max_run = 0;
    let mut groups = 0;
    let mut current = 0;
    let mut last: Option<u8> = None;
    for &n in sorted {
        current = if last.is_some_and(|l| l + 1 == n) {
            current + 1
        } else {
            1
        };
        if current == 2 {
            groups += 1;
        }
        max_run = usize::max(max_run, current);
        last = Some(n);
    }
    (max_run, groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(numbers: &[u8]) -> NumberSet {
        NumberSet::pick(numbers.iter().copied()).unwrap()
    }

    fn history() -> DrawHistory {
        let draws = [
            pick(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]),
            pick(&[11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25]),
            pick(&[1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 2, 4]),
        ];
        DrawHistory::from_draws(
            draws
                .into_iter()
                .zip(1..)
                .map(|(numbers, index)| Draw::new(index, None, numbers).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_structural_features() {
        let f = compute_features(
            pick(&[1, 2, 3, 5, 8, 13, 14, 15, 16, 20, 21, 22, 23, 24, 25]),
            &NumberFrequencies::ZERO,
            None,
        );
        assert_eq!(f.get(FeatureId::Sum), 212.0);
        assert_eq!(f.get(FeatureId::EvenCount), 7.0);
        assert_eq!(f.get(FeatureId::MaxRun), 6.0);
        assert_eq!(f.get(FeatureId::RunGroups), 3.0);
        assert_eq!(f.get(FeatureId::MinGap), 1.0);
        assert_eq!(f.get(FeatureId::MaxGap), 5.0);
        assert_eq!(f.get(FeatureId::PrimeCount), 5.0);
        assert_eq!(f.get(FeatureId::FibonacciCount), 7.0);
        assert_eq!(f.get(FeatureId::CenterCount), 3.0);
        assert_eq!(f.get(FeatureId::FrameCount), 12.0);
        assert_eq!(f.get(FeatureId::MultipleOfThreeCount), 4.0);
        assert_eq!(f.get(FeatureId::Frequency), 0.0);
        assert_eq!(f.get(FeatureId::PreviousOverlap), 0.0);
    }

    #[test]
    fn test_first_draw_has_no_context() {
        let history = history();
        let extractor = FeatureExtractor::new(&history, 10);
        let first = &history.draws()[0];
        let f = extractor.extract(Entity::Draw(first)).unwrap();
        assert_eq!(f.get(FeatureId::Frequency), 0.0);
        assert_eq!(f.get(FeatureId::PreviousOverlap), 0.0);
    }

    #[test]
    fn test_draw_context_is_strictly_before() {
        let history = history();
        let extractor = FeatureExtractor::new(&history, 10);
        let second = &history.draws()[1];
        let f = extractor.extract(Entity::Draw(second)).unwrap();
        // only the first draw is visible: 11..=15 were drawn, 16..=25 were not
        assert!((f.get(FeatureId::Frequency) - 5.0 / 15.0).abs() < 1e-6);
        assert!((f.get(FeatureId::PreviousOverlap) - 5.0 / 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_candidate_uses_whole_window() {
        let history = history();
        let extractor = FeatureExtractor::new(&history, 2);
        let f = extractor
            .extract_numbers(pick(&[11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25]))
            .unwrap();
        assert_eq!(extractor.frequencies().get(1), 0.5);
        assert_eq!(extractor.frequencies().get(16), 0.5);
        assert_eq!(extractor.frequencies().get(10), 0.0);
        // last draw shares 11,13,15,17,19,21,23,25
        assert!((f.get(FeatureId::PreviousOverlap) - 8.0 / 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_extract_rejects_invalid_selection() {
        let history = history();
        let extractor = FeatureExtractor::new(&history, 10);
        let short = NumberSet::from_numbers([1_u8, 2, 3]).unwrap();
        assert_eq!(
            extractor.extract_numbers(short),
            Err(InvalidEntityError::WrongCount { count: 3 })
        );
    }

    #[test]
    fn test_extract_history_skips_first_draw() {
        let history = history();
        let extractor = FeatureExtractor::new(&history, 10);
        let rows = extractor.extract_history();
        assert_eq!(rows.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_ranked_breaks_ties_by_number() {
        let history = history();
        let extractor = FeatureExtractor::new(&history, 1);
        let ranked = extractor.frequencies().ranked();
        assert_eq!(ranked.len(), 25);
        assert_eq!(&ranked[..3], &[1, 2, 3]);
        assert_eq!(ranked[15], 6);
    }
}
