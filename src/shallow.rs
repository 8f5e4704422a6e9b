//! Shallow equality for attribute mappings, and a settings mirror built on it.
//!
//! Shallow means one level deep: two mappings are equal when they have the
//! same keys and each key maps to `PartialEq`-equal values. Values are not
//! walked any further than their own `PartialEq` goes.

use indexmap::IndexMap;
use std::hash::{BuildHasher, Hash};
use tracing::debug;

/// Key-by-key equality of two attribute mappings, ignoring key order
pub fn is_shallow_equal<K, V, S1, S2>(a: &IndexMap<K, V, S1>, b: &IndexMap<K, V, S2>) -> bool
where
    K: Hash + Eq,
    V: PartialEq,
    S1: BuildHasher,
    S2: BuildHasher,
{
    a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
}

/// Element-by-element equality of two sequences
pub fn is_shallow_equal_slices<V: PartialEq>(a: &[V], b: &[V]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Mirrors a freshly built settings mapping into a stored copy.
///
/// Meant to be driven once per update cycle with settings derived from the
/// component's inputs; the store is only written when the new mapping is not
/// shallow-equal to what it already holds.
#[derive(Debug, Clone)]
pub struct SettingsSync<K, V> {
    stored: Option<IndexMap<K, V>>,
}

impl<K: Hash + Eq, V: PartialEq> SettingsSync<K, V> {
    /// Nothing stored yet
    pub fn new() -> Self {
        Self { stored: None }
    }

    /// The settings last written
    pub fn stored(&self) -> Option<&IndexMap<K, V>> {
        self.stored.as_ref()
    }

    /// Store `next` unless it is shallow-equal to the stored settings.
    ///
    /// Returns true if the store was written.
    pub fn sync(&mut self, next: IndexMap<K, V>) -> bool {
        if let Some(stored) = &self.stored
            && is_shallow_equal(stored, &next)
        {
            return false;
        }
        debug!(keys = next.len(), "settings changed, updating store");
        self.stored = Some(next);
        true
    }
}

impl<K: Hash + Eq, V: PartialEq> Default for SettingsSync<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert `value` under `key` only when it is defined.
///
/// Settings derived from optional inputs leave the key out entirely rather
/// than storing an empty value, so absent and unset compare equal.
pub fn insert_defined<K: Hash + Eq, V>(settings: &mut IndexMap<K, V>, key: K, value: Option<V>) {
    if let Some(value) = value {
        settings.insert(key, value);
    }
}
