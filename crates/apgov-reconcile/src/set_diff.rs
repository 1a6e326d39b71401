//! Declared-versus-observed set difference.

use std::collections::HashSet;
use std::hash::Hash;

/// Operations needed to turn an observed set into a declared one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<K: Eq + Hash> {
    /// Declared but not observed.
    pub to_add: HashSet<K>,
    /// Observed but not declared.
    pub to_remove: HashSet<K>,
}

impl<K: Eq + Hash> SetDiff<K> {
    /// True when the observed set already matches the declared one.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl<K: Eq + Hash> Default for SetDiff<K> {
    fn default() -> Self {
        Self {
            to_add: HashSet::new(),
            to_remove: HashSet::new(),
        }
    }
}

/// Compute `declared \ observed` and `observed \ declared`.
pub fn diff<K>(declared: &HashSet<K>, observed: &HashSet<K>) -> SetDiff<K>
where
    K: Eq + Hash + Clone,
{
    SetDiff {
        to_add: declared.difference(observed).cloned().collect(),
        to_remove: observed.difference(declared).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_identical_sets_produce_no_operations() {
        let samples = [
            set(&[]),
            set(&["a"]),
            set(&["a", "b", "c"]),
            set(&["user:a@x.io", "group:analysts"]),
        ];
        for s in &samples {
            assert!(diff(s, s).is_empty(), "diff of {s:?} with itself");
        }
    }

    #[test]
    fn test_add_and_remove() {
        let result = diff(&set(&["a", "b"]), &set(&["b", "c"]));
        assert_eq!(result.to_add, set(&["a"]));
        assert_eq!(result.to_remove, set(&["c"]));
    }

    #[test]
    fn test_add_and_remove_never_overlap() {
        let declared = set(&["a", "b", "c", "d"]);
        let observed = set(&["c", "d", "e", "f"]);
        let result = diff(&declared, &observed);
        assert!(result.to_add.is_disjoint(&result.to_remove));
        assert_eq!(result.to_add, set(&["a", "b"]));
        assert_eq!(result.to_remove, set(&["e", "f"]));
    }

    #[test]
    fn test_empty_declared_removes_everything() {
        let result = diff(&set(&[]), &set(&["x", "y"]));
        assert!(result.to_add.is_empty());
        assert_eq!(result.to_remove.len(), 2);
    }

    #[test]
    fn test_empty_observed_adds_everything() {
        let result = diff(&set(&["a@x.io"]), &set(&[]));
        assert_eq!(result.to_add, set(&["a@x.io"]));
        assert!(result.to_remove.is_empty());
    }
}
