//! Deterministic train/validation split.

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

/// A disjoint partition of the input items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub validation: Vec<T>,
}

impl<T> Split<T> {
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.validation.is_empty()
    }
}

/// Shuffle `items` with a seeded RNG and hold out the first
/// `min(validation_count, len)` of them for validation.
///
/// The same seed and input order always produce the same split.
pub fn split_pairs<T>(mut items: Vec<T>, seed: u64, validation_count: usize) -> Split<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let held_out = validation_count.min(items.len());
    let train = items.split_off(held_out);

    Split {
        train,
        validation: items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn ten_items_with_eight_held_out() {
        let split = split_pairs((0..10).collect::<Vec<_>>(), 1337, 8);
        assert_eq!(split.validation.len(), 8);
        assert_eq!(split.train.len(), 2);

        let all: BTreeSet<_> = split.train.iter().chain(&split.validation).copied().collect();
        assert_eq!(all, (0..10).collect());
    }

    #[test]
    fn same_seed_same_split() {
        let a = split_pairs((0..50).collect::<Vec<_>>(), 42, 7);
        let b = split_pairs((0..50).collect::<Vec<_>>(), 42, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn validation_count_is_capped() {
        let split = split_pairs(vec!["a", "b", "c"], 1, 100);
        assert_eq!(split.validation.len(), 3);
        assert!(split.train.is_empty());
        assert_eq!(split.len(), 3);
    }

    #[test]
    fn zero_validation_keeps_everything_for_training() {
        let split = split_pairs(vec![1, 2, 3, 4], 9, 0);
        assert!(split.validation.is_empty());
        assert_eq!(split.train.len(), 4);
    }

    #[test]
    fn empty_input() {
        let split = split_pairs(Vec::<u8>::new(), 0, 8);
        assert!(split.is_empty());
    }
}
