//! Genetic operators on 15-of-25 selections.
//!
//! All operators preserve the pick invariant: every output holds exactly
//! fifteen distinct numbers from `1..=25`.

use lotofacil_core::{NumberSet, PICK_SIZE, POOL_SIZE};
use rand::{
    Rng,
    seq::{IndexedRandom, SliceRandom, index},
};

/// Uniformly random selection.
#[expect(clippy::cast_possible_truncation)]
pub fn random_pick<R>(rng: &mut R) -> NumberSet
where
    R: Rng + ?Sized,
{
    let mut set = NumberSet::EMPTY;
    for i in index::sample(rng, POOL_SIZE, PICK_SIZE) {
        set.insert(i as u8 + 1);
    }
    set
}

/// Selection with `hot_count` members drawn from `preferred` and the rest
/// from `others`.
///
/// The two slices must be disjoint, and `others` must hold enough numbers to
/// complete the selection.
pub fn biased_pick<R>(rng: &mut R, preferred: &[u8], others: &[u8], hot_count: usize) -> NumberSet
where
    R: Rng + ?Sized,
{
    let hot_count = hot_count.min(preferred.len()).min(PICK_SIZE);
    let cold_count = PICK_SIZE - hot_count;
    let mut set = NumberSet::EMPTY;
    for &n in preferred
        .choose_multiple(rng, hot_count)
        .chain(others.choose_multiple(rng, cold_count))
    {
        set.insert(n);
    }
    set
}

/// Child keeping every number common to both parents, filled up from their
/// symmetric difference at random.
///
/// ```
/// use lotofacil_core::NumberSet;
/// use lotofacil_training::operators::crossover;
/// use rand::SeedableRng;
/// use rand_pcg::Pcg32;
///
/// let mut rng = Pcg32::seed_from_u64(0);
/// let a = NumberSet::pick(1_u8..=15).unwrap();
/// let b = NumberSet::pick(6_u8..=20).unwrap();
/// let child = crossover(a, b, &mut rng);
/// assert!(child.is_pick());
/// assert_eq!(child.intersection(a.intersection(b)), a.intersection(b));
/// assert!(child.difference(a.union(b)).is_empty());
/// ```
pub fn crossover<R>(a: NumberSet, b: NumberSet, rng: &mut R) -> NumberSet
where
    R: Rng + ?Sized,
{
    let mut child = a.intersection(b);
    let mut pool = a.symmetric_difference(b).to_array();
    pool.shuffle(rng);
    for n in pool {
        if child.len() == PICK_SIZE {
            break;
        }
        child.insert(n);
    }
    child
}

/// Random member of `set`.
pub fn random_member<R>(set: NumberSet, rng: &mut R) -> Option<u8>
where
    R: Rng + ?Sized,
{
    set.to_array().choose(rng).copied()
}

/// Random number of the universe outside `set`.
pub fn random_outsider<R>(set: NumberSet, rng: &mut R) -> Option<u8>
where
    R: Rng + ?Sized,
{
    random_member(set.complement(), rng)
}

/// Replaces `removed` with `inserted`.
///
/// Returns `None` unless `removed` is a member and `inserted` is not.
#[must_use]
pub fn swap_member(set: NumberSet, removed: u8, inserted: u8) -> Option<NumberSet> {
    if !set.contains(removed) || set.contains(inserted) {
        return None;
    }
    let mut out = set;
    out.remove(removed);
    out.insert(inserted);
    Some(out)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_random_pick_is_valid() {
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..100 {
            assert!(random_pick(&mut rng).is_pick());
        }
    }

    #[test]
    fn test_crossover_of_identical_parents() {
        let mut rng = Pcg32::seed_from_u64(3);
        let a = NumberSet::pick(5_u8..=19).unwrap();
        assert_eq!(crossover(a, a, &mut rng), a);
    }

    #[test]
    fn test_crossover_keeps_common_numbers() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..50 {
            let a = random_pick(&mut rng);
            let b = random_pick(&mut rng);
            let child = crossover(a, b, &mut rng);
            assert!(child.is_pick());
            assert_eq!(child.overlap(a.intersection(b)), a.overlap(b));
            assert!(child.difference(a.union(b)).is_empty());
        }
    }

    #[test]
    fn test_swap_member() {
        let set = NumberSet::pick(1_u8..=15).unwrap();
        let swapped = swap_member(set, 1, 25).unwrap();
        assert!(swapped.is_pick());
        assert!(!swapped.contains(1) && swapped.contains(25));
        assert_eq!(swap_member(set, 16, 25), None);
        assert_eq!(swap_member(set, 1, 2), None);
        assert_eq!(set.hamming_distance(swapped), 2);
    }

    #[test]
    fn test_biased_pick() {
        let mut rng = Pcg32::seed_from_u64(5);
        let hot = (1..=10).collect::<Vec<u8>>();
        let cold = (11..=25).collect::<Vec<u8>>();
        let set = biased_pick(&mut rng, &hot, &cold, 10);
        assert!(set.is_pick());
        assert_eq!(set.overlap(NumberSet::from_numbers(hot).unwrap()), 10);
    }
}
