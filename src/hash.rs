//! Identity sets for diffing observer lists.
//!
//! Observer keys are allocation addresses, so there is nothing an attacker
//! controls here and HashDoS resistance buys nothing. Sets are built with
//! foldhash under a fixed seed and keep insertion order, so the removal and
//! addition order of a reconciliation pass follows list order.

use std::hash::{BuildHasher, Hash};

use foldhash::fast::{FixedState, FoldHasher};
use indexmap::IndexSet;

/// Zero-sized foldhash builder with a fixed seed
#[derive(Clone, Copy, Debug, Default)]
pub struct FastHashBuilder;

impl BuildHasher for FastHashBuilder {
    type Hasher = FoldHasher<'static>;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        FixedState::with_seed(0x517cc1b727220a95).build_hasher()
    }
}

/// Insertion-ordered set using [`FastHashBuilder`]
pub type FastIndexSet<K> = IndexSet<K, FastHashBuilder>;

/// Keys of `items` in first-seen order
pub fn key_set<T, K, F>(items: &[T], key: F) -> FastIndexSet<K>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    items.iter().map(key).collect()
}

/// `items` in order, skipping any whose key was already seen
pub fn unique_by<T, K, F>(items: &[T], key: F) -> impl Iterator<Item = &T>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen = FastIndexSet::default();
    items.iter().filter(move |item| seen.insert(key(item)))
}

/// Same keys in the same order
pub fn same_keys<T, K, F>(a: &[T], b: &[T], key: F) -> bool
where
    K: Eq,
    F: Fn(&T) -> K,
{
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| key(x) == key(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_set_keeps_first_seen_order() {
        let set = key_set(&[30usize, 10, 30, 20], |&n| n);

        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![30, 10, 20]);
    }

    #[test]
    fn unique_by_drops_repeated_keys() {
        let items = [("a", 1), ("b", 2), ("a", 3)];
        let kept: Vec<_> = unique_by(&items, |(name, _)| *name).collect();

        assert_eq!(kept, vec![&("a", 1), &("b", 2)]);
    }

    #[test]
    fn same_keys_is_order_and_length_sensitive() {
        assert!(same_keys(&[1, 2], &[1, 2], |&n| n));
        assert!(!same_keys(&[1, 2], &[2, 1], |&n| n));
        assert!(!same_keys(&[1, 2], &[1, 2, 2], |&n| n));
    }
}
