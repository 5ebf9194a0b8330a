#![forbid(unsafe_code)]

//! Index-based edit scripts between two sequences.
//!
//! When an array-typed property changes, list consumers want to patch their
//! rendering incrementally instead of rebuilding it. [`calculate_splices`]
//! produces the ordered inserts and removes that turn the previous sequence
//! into the next one.
//!
//! # Semantics
//!
//! Edits are applied in order to a working copy of the previous sequence.
//! Each edit's `index` refers to that working copy *at the moment the edit is
//! applied*, so [`apply_splices`] needs no offset bookkeeping.
//!
//! The script is derived from a longest common subsequence after trimming the
//! shared prefix and suffix, so unchanged runs never produce edits.
//!
//! # Invariants
//!
//! 1. `apply_splices(prev, &calculate_splices(prev, next)) == next`.
//! 2. Equal sequences produce an empty script.
//! 3. Within one index position, removes are emitted before inserts.

use serde_json::Value;

/// One edit in a splice script.
#[derive(Clone, Debug, PartialEq)]
pub enum Splice<T = Value> {
    /// Insert `value` so that it ends up at `index`.
    Insert { index: usize, value: T },
    /// Remove the element at `index`, which holds `value`.
    Remove { index: usize, value: T },
}

impl<T> Splice<T> {
    /// Index the edit applies at.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Insert { index, .. } | Self::Remove { index, .. } => *index,
        }
    }

    /// Value inserted or removed.
    #[must_use]
    pub fn value(&self) -> &T {
        match self {
            Self::Insert { value, .. } | Self::Remove { value, .. } => value,
        }
    }

    /// Whether this edit is an insert.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }
}

/// Compute the edits turning `previous` into `next`.
///
/// ```
/// use serde_json::json;
/// use storelink_core::splice::{Splice, calculate_splices};
///
/// let edits = calculate_splices(&[json!(1), json!(2), json!(3)], &[json!(1), json!(3)]);
/// assert_eq!(edits, vec![Splice::Remove { index: 1, value: json!(2) }]);
/// ```
#[must_use]
pub fn calculate_splices<T: PartialEq + Clone>(previous: &[T], next: &[T]) -> Vec<Splice<T>> {
    let prefix = previous
        .iter()
        .zip(next)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = previous[prefix..]
        .iter()
        .rev()
        .zip(next[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old = &previous[prefix..previous.len() - suffix];
    let new = &next[prefix..next.len() - suffix];

    let mut edits = Vec::new();
    if old.is_empty() && new.is_empty() {
        return edits;
    }

    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    let mut cursor = prefix;
    while i < old.len() || j < new.len() {
        if i < old.len() && j < new.len() && old[i] == new[j] {
            i += 1;
            j += 1;
            cursor += 1;
        } else if i < old.len() && (j == new.len() || lcs[i + 1][j] >= lcs[i][j + 1]) {
            edits.push(Splice::Remove {
                index: cursor,
                value: old[i].clone(),
            });
            i += 1;
        } else {
            edits.push(Splice::Insert {
                index: cursor,
                value: new[j].clone(),
            });
            j += 1;
            cursor += 1;
        }
    }
    edits
}

/// Apply `splices` to a copy of `previous`.
///
/// Edits whose index is out of range for the working copy are ignored.
#[must_use]
pub fn apply_splices<T: Clone>(previous: &[T], splices: &[Splice<T>]) -> Vec<T> {
    let mut working = previous.to_vec();
    for splice in splices {
        match splice {
            Splice::Insert { index, value } if *index <= working.len() => {
                working.insert(*index, value.clone());
            }
            Splice::Remove { index, .. } if *index < working.len() => {
                working.remove(*index);
            }
            _ => {}
        }
    }
    working
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn remove_from_middle() {
        let edits = calculate_splices(&[1, 2, 3], &[1, 3]);
        assert_eq!(edits, vec![Splice::Remove { index: 1, value: 2 }]);
    }

    #[test]
    fn insert_into_empty() {
        let edits = calculate_splices(&[], &[json!(1)]);
        assert_eq!(
            edits,
            vec![Splice::Insert {
                index: 0,
                value: json!(1)
            }]
        );
    }

    #[test]
    fn equal_sequences_have_no_edits() {
        assert!(calculate_splices(&[1, 2, 3], &[1, 2, 3]).is_empty());
        assert!(calculate_splices::<i32>(&[], &[]).is_empty());
    }

    #[test]
    fn replacement_is_remove_then_insert() {
        let edits = calculate_splices(&["a", "b", "c"], &["a", "x", "c"]);
        assert_eq!(
            edits,
            vec![
                Splice::Remove {
                    index: 1,
                    value: "b"
                },
                Splice::Insert {
                    index: 1,
                    value: "x"
                },
            ]
        );
    }

    #[test]
    fn append_and_clear() {
        let appended = calculate_splices(&[1], &[1, 2, 3]);
        assert_eq!(appended.len(), 2);
        assert!(appended.iter().all(Splice::is_insert));
        assert_eq!(appended[0].index(), 1);
        assert_eq!(appended[1].index(), 2);

        let cleared = calculate_splices(&[1, 2], &[]);
        assert_eq!(
            cleared,
            vec![
                Splice::Remove { index: 0, value: 1 },
                Splice::Remove { index: 0, value: 2 },
            ]
        );
    }

    #[test]
    fn apply_ignores_out_of_range() {
        let out = apply_splices(&[1, 2], &[Splice::Remove { index: 9, value: 0 }]);
        assert_eq!(out, vec![1, 2]);
    }

    proptest! {
        #[test]
        fn splices_transform_previous_into_next(
            previous in prop::collection::vec(0u8..5, 0..12),
            next in prop::collection::vec(0u8..5, 0..12),
        ) {
            let edits = calculate_splices(&previous, &next);
            prop_assert_eq!(apply_splices(&previous, &edits), next);
        }

        #[test]
        fn identical_sequences_are_quiet(items in prop::collection::vec(any::<i16>(), 0..16)) {
            prop_assert!(calculate_splices(&items, &items).is_empty());
        }
    }
}
