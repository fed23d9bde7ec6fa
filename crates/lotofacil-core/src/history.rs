use serde::{Deserialize, Serialize};

use crate::Draw;

/// Failure to build or extend a [`DrawHistory`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("draw index {index} does not follow previous index {previous}")]
pub struct NonMonotonicIndexError {
    pub previous: u32,
    pub index: u32,
}

/// Ordered, append-only sequence of past draws.
///
/// Indices strictly increase from front to back. Appending needs `&mut`, so
/// a history lent to a running optimization cannot change under it.
///
/// # Examples
///
/// ```
/// use lotofacil_core::{Draw, DrawHistory, NumberSet};
///
/// let mut history = DrawHistory::new();
/// let numbers = NumberSet::pick(1_u8..=15).unwrap();
/// history.append(Draw::new(1, None, numbers).unwrap()).unwrap();
/// assert!(history.append(Draw::new(1, None, numbers).unwrap()).is_err());
/// assert_eq!(history.next_index(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Draw>", into = "Vec<Draw>")]
pub struct DrawHistory {
    draws: Vec<Draw>,
}

impl DrawHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_draws(draws: Vec<Draw>) -> Result<Self, NonMonotonicIndexError> {
        for pair in draws.windows(2) {
            check_order(&pair[0], &pair[1])?;
        }
        Ok(Self { draws })
    }

    /// Appends a draw whose index is greater than the latest one.
    pub fn append(&mut self, draw: Draw) -> Result<(), NonMonotonicIndexError> {
        if let Some(latest) = self.draws.last() {
            check_order(latest, &draw)?;
        }
        self.draws.push(draw);
        Ok(())
    }

    #[must_use]
    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Draw> {
        self.draws.last()
    }

    /// Position of the draw carrying `index`.
    #[must_use]
    pub fn position_of(&self, index: u32) -> Option<usize> {
        self.draws.binary_search_by_key(&index, Draw::index).ok()
    }

    /// Up to `window` draws ending just before position `end`.
    #[must_use]
    pub fn trailing(&self, end: usize, window: usize) -> &[Draw] {
        let end = end.min(self.draws.len());
        &self.draws[end.saturating_sub(window)..end]
    }

    /// Index the next appended draw would naturally take.
    ///
    /// Saturates at `u32::MAX`; a history ending there accepts no more draws.
    #[must_use]
    pub fn next_index(&self) -> u32 {
        self.latest().map_or(1, |d| d.index().saturating_add(1))
    }
}

fn check_order(previous: &Draw, next: &Draw) -> Result<(), NonMonotonicIndexError> {
    if next.index() <= previous.index() {
        return Err(NonMonotonicIndexError {
            previous: previous.index(),
            index: next.index(),
        });
    }
    Ok(())
}

impl TryFrom<Vec<Draw>> for DrawHistory {
    type Error = NonMonotonicIndexError;

    fn try_from(draws: Vec<Draw>) -> Result<Self, Self::Error> {
        Self::from_draws(draws)
    }
}

impl From<DrawHistory> for Vec<Draw> {
    fn from(history: DrawHistory) -> Self {
        history.draws
    }
}
