#![forbid(unsafe_code)]

//! Flattening of ordered declaration layers.
//!
//! A component's declarations come from a chain of layers: its own, those of
//! the components it extends, and any behaviors mixed into it. [`flatten`]
//! merges that chain into a single map with a fixed priority rule instead of
//! walking a live inheritance chain.
//!
//! # Invariants
//!
//! 1. Layers are supplied least-derived first.
//! 2. On a name collision the most-derived layer wins.
//! 3. The result holds every name declared by any layer exactly once.
//! 4. Flattening is pure: inputs are only read.

use std::hash::Hash;

use indexmap::IndexMap;

/// Merge `layers` (least-derived first) into one map, most-derived wins.
///
/// Walks from the most-derived layer down and inserts only names that are
/// not already present.
///
/// ```
/// use indexmap::IndexMap;
/// use storelink_core::layers::flatten;
///
/// let base: IndexMap<&str, i32> = [("a", 1), ("b", 1)].into_iter().collect();
/// let derived: IndexMap<&str, i32> = [("b", 2)].into_iter().collect();
///
/// let merged = flatten([&base, &derived]);
/// assert_eq!(merged["a"], 1);
/// assert_eq!(merged["b"], 2);
/// ```
pub fn flatten<'a, K, V, I>(layers: I) -> IndexMap<K, V>
where
    I: IntoIterator<Item = &'a IndexMap<K, V>>,
    I::IntoIter: DoubleEndedIterator,
    K: Hash + Eq + Clone + 'a,
    V: Clone + 'a,
{
    let mut merged = IndexMap::new();
    for layer in layers.into_iter().rev() {
        for (name, value) in layer {
            if !merged.contains_key(name) {
                merged.insert(name.clone(), value.clone());
            }
        }
    }
    merged
}
