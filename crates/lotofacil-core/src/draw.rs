use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{InvalidEntityError, NumberSet};

/// A recorded historical outcome.
///
/// Immutable once constructed: the numbers are validated by [`Draw::new`] and
/// no mutating accessors exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DrawRecord", into = "DrawRecord")]
pub struct Draw {
    index: u32,
    drawn_at: Option<DateTime<Utc>>,
    numbers: NumberSet,
}

impl Draw {
    pub fn new(
        index: u32,
        drawn_at: Option<DateTime<Utc>>,
        numbers: NumberSet,
    ) -> Result<Self, InvalidEntityError> {
        numbers.validate_pick()?;
        Ok(Self {
            index,
            drawn_at,
            numbers,
        })
    }

    /// Sequence index within its history.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn drawn_at(&self) -> Option<DateTime<Utc>> {
        self.drawn_at
    }

    #[must_use]
    pub fn numbers(&self) -> NumberSet {
        self.numbers
    }

    /// Count of numbers shared with `numbers`.
    #[must_use]
    pub fn matches(&self, numbers: NumberSet) -> usize {
        self.numbers.overlap(numbers)
    }
}

#[derive(Serialize, Deserialize)]
struct DrawRecord {
    index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    drawn_at: Option<DateTime<Utc>>,
    numbers: NumberSet,
}

impl TryFrom<DrawRecord> for Draw {
    type Error = InvalidEntityError;

    fn try_from(record: DrawRecord) -> Result<Self, Self::Error> {
        Self::new(record.index, record.drawn_at, record.numbers)
    }
}

impl From<Draw> for DrawRecord {
    fn from(draw: Draw) -> Self {
        Self {
            index: draw.index,
            drawn_at: draw.drawn_at,
            numbers: draw.numbers,
        }
    }
}
