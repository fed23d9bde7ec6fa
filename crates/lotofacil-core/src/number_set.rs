use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::InvalidEntityError;

/// Smallest number in the universe.
pub const MIN_NUMBER: u8 = 1;
/// Largest number in the universe.
pub const MAX_NUMBER: u8 = 25;
/// Size of the universe.
pub const POOL_SIZE: usize = 25;
/// Numbers per draw or candidate.
pub const PICK_SIZE: usize = 15;

const FULL_MASK: u32 = (1 << POOL_SIZE) - 1;

/// A subset of `1..=25` packed into the low 25 bits of a `u32`.
///
/// Bit `n - 1` is set when number `n` is a member. Set algebra is a handful
/// of bitwise operations, which keeps crossover, overlap counting and
/// diversity measures cheap.
///
/// A `NumberSet` may hold any number of members; [`Self::validate_pick`]
/// checks the 15-member invariant required of draws and candidates.
///
/// Serialized as an ascending array of numbers.
///
/// # Examples
///
/// ```
/// use lotofacil_core::NumberSet;
///
/// let a = NumberSet::from_numbers([1_u8, 2, 3]).unwrap();
/// let b = NumberSet::from_numbers([3_u8, 4]).unwrap();
/// assert_eq!(a.union(b).len(), 4);
/// assert_eq!(a.overlap(b), 1);
/// assert_eq!(a.hamming_distance(b), 3);
/// assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NumberSet(u32);

impl NumberSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);
    /// The whole universe `1..=25`.
    pub const FULL: Self = Self(FULL_MASK);

    /// Builds a set from raw bits without validation.
    ///
    /// Bits above position 24 are kept, so [`Self::validate_pick`] can detect
    /// them.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Builds a set from numbers, rejecting out-of-range values and
    /// duplicates. The member count is not checked.
    pub fn from_numbers<I>(numbers: I) -> Result<Self, InvalidEntityError>
    where
        I: IntoIterator,
        I::Item: Into<u32>,
    {
        let mut set = Self::EMPTY;
        for number in numbers {
            let number = number.into();
            let Ok(n) = u8::try_from(number) else {
                return Err(InvalidEntityError::OutOfRange { number });
            };
            if !(MIN_NUMBER..=MAX_NUMBER).contains(&n) {
                return Err(InvalidEntityError::OutOfRange { number });
            }
            if !set.insert(n) {
                return Err(InvalidEntityError::Duplicate { number: n });
            }
        }
        Ok(set)
    }

    /// Builds a validated 15-member selection.
    ///
    /// ```
    /// use lotofacil_core::{InvalidEntityError, NumberSet};
    ///
    /// assert!(NumberSet::pick(1_u8..=15).is_ok());
    /// assert_eq!(
    ///     NumberSet::pick(1_u8..=14),
    ///     Err(InvalidEntityError::WrongCount { count: 14 })
    /// );
    /// ```
    pub fn pick<I>(numbers: I) -> Result<Self, InvalidEntityError>
    where
        I: IntoIterator,
        I::Item: Into<u32>,
    {
        let set = Self::from_numbers(numbers)?;
        set.validate_pick()?;
        Ok(set)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn contains(self, number: u8) -> bool {
        (MIN_NUMBER..=MAX_NUMBER).contains(&number) && self.0 & bit(number) != 0
    }

    /// Adds `number`, returning `false` if it was already present.
    ///
    /// # Panics
    ///
    /// Panics if `number` is outside `1..=25`.
    pub fn insert(&mut self, number: u8) -> bool {
        assert!((MIN_NUMBER..=MAX_NUMBER).contains(&number));
        let present = self.0 & bit(number) != 0;
        self.0 |= bit(number);
        !present
    }

    /// Removes `number`, returning `false` if it was absent.
    pub fn remove(&mut self, number: u8) -> bool {
        if !self.contains(number) {
            return false;
        }
        self.0 &= !bit(number);
        true
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[must_use]
    pub const fn symmetric_difference(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    /// Numbers of the universe that are not members.
    #[must_use]
    pub const fn complement(self) -> Self {
        Self(!self.0 & FULL_MASK)
    }

    /// Count of shared members.
    #[must_use]
    pub const fn overlap(self, other: Self) -> usize {
        self.intersection(other).len()
    }

    /// Size of the symmetric difference.
    ///
    /// Two 15-member picks differ by an even distance between 0 and 20.
    #[must_use]
    pub const fn hamming_distance(self, other: Self) -> usize {
        self.symmetric_difference(other).len()
    }

    /// Members in ascending order.
    #[must_use]
    pub fn iter(self) -> Numbers {
        Numbers(self.0 & FULL_MASK)
    }

    /// Members in ascending order, collected on the stack.
    #[must_use]
    pub fn to_array(self) -> ArrayVec<u8, POOL_SIZE> {
        self.iter().collect()
    }

    /// Returns `true` if the set is a valid 15-of-25 selection.
    #[must_use]
    pub const fn is_pick(self) -> bool {
        self.0 & !FULL_MASK == 0 && self.len() == PICK_SIZE
    }

    /// Checks the 15-of-25 invariant.
    pub fn validate_pick(self) -> Result<(), InvalidEntityError> {
        let stray = self.0 & !FULL_MASK;
        if stray != 0 {
            return Err(InvalidEntityError::OutOfRange {
                number: stray.trailing_zeros() + 1,
            });
        }
        if self.len() != PICK_SIZE {
            return Err(InvalidEntityError::WrongCount { count: self.len() });
        }
        Ok(())
    }
}

const fn bit(number: u8) -> u32 {
    1 << (number - 1)
}

impl IntoIterator for NumberSet {
    type Item = u8;
    type IntoIter = Numbers;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the members of a [`NumberSet`].
#[derive(Debug, Clone)]
pub struct Numbers(u32);

impl Iterator for Numbers {
    type Item = u8;

    #[expect(clippy::cast_possible_truncation)]
    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let idx = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(idx as u8 + 1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Numbers {}

impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, n) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{n:02}")?;
        }
        Ok(())
    }
}

impl Serialize for NumberSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for NumberSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let numbers = Vec::<u32>::deserialize(deserializer)?;
        Self::from_numbers(numbers).map_err(serde::de::Error::custom)
    }
}
