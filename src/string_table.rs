use std::collections::HashMap;

use crate::error::{CompressError, Result};
use crate::node::FieldValue;

/// Two-phase frequency table: collect strings during a first pass, then
/// `finalize` assigns ids by descending use-count, ties broken by insertion
/// order (spec.md §4.3).
pub struct StringTable {
    use_counts: HashMap<String, u32>,
    insertion_order: Vec<String>,
    finalized: Option<FinalizedTable>,
}

struct FinalizedTable {
    strings: Vec<String>,
    ranks: HashMap<String, u32>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        StringTable {
            use_counts: HashMap::new(),
            insertion_order: Vec::new(),
            finalized: None,
        }
    }

    /// Bump the use-count for `s`. Forbidden after `finalize`.
    pub fn add(&mut self, s: &str) {
        assert!(self.finalized.is_none(), "add() called after finalize()");
        if let Some(count) = self.use_counts.get_mut(s) {
            *count += 1;
        } else {
            self.use_counts.insert(s.to_string(), 1);
            self.insertion_order.push(s.to_string());
        }
    }

    /// Adds only if `s.len() >= 2`; single-character identifiers are inlined
    /// by the encoder and never enter the table (spec.md §4.3).
    pub fn add_identifier(&mut self, s: &str) {
        if s.chars().count() >= 2 {
            self.add(s);
        }
    }

    /// Recurses into arrays, adding every string leaf (spec.md §4.3).
    pub fn add_value_recursive(&mut self, v: &FieldValue) {
        match v {
            FieldValue::Str(s) => self.add(s),
            FieldValue::Array(items) => {
                for item in items {
                    self.add_value_recursive(item);
                }
            }
            _ => {}
        }
    }

    /// Snapshots the collected keys into a vector sorted by descending
    /// use-count (ties by insertion order), and assigns each key its vector
    /// index as id. No further `add` calls are permitted afterward.
    pub fn finalize(&mut self) {
        let mut ordered: Vec<String> = self.insertion_order.clone();
        let counts = &self.use_counts;
        ordered.sort_by(|a, b| {
            let ca = counts[a];
            let cb = counts[b];
            cb.cmp(&ca)
        });
        // sort_by is stable, so equal-count entries keep insertion order.

        let mut ranks = HashMap::with_capacity(ordered.len());
        for (idx, s) in ordered.iter().enumerate() {
            ranks.insert(s.clone(), idx as u32);
        }

        self.finalized = Some(FinalizedTable { strings: ordered, ranks });
    }

    /// Returns the assigned id for `s`. Fails with `UnknownString` if `s` was
    /// never added before `finalize`, or if `finalize` hasn't run yet.
    pub fn lookup(&self, s: &str) -> Result<u32> {
        let table = self
            .finalized
            .as_ref()
            .ok_or_else(|| CompressError::UnknownString(s.to_string()))?;
        table
            .ranks
            .get(s)
            .copied()
            .ok_or_else(|| CompressError::UnknownString(s.to_string()))
    }

    /// The finalized strings in rank order. Empty (and unusable with
    /// `lookup`) before `finalize` is called.
    pub fn entries(&self) -> &[String] {
        self.finalized.as_ref().map(|t| t.strings.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranks_by_descending_frequency_ties_by_insertion() {
        let mut table = StringTable::new();
        table.add("b");
        table.add("a");
        table.add("a");
        table.add("c");
        table.add("c");
        table.add("c");
        table.finalize();

        assert_eq!(table.entries(), &["c".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(table.lookup("c").unwrap(), 0);
        assert_eq!(table.lookup("a").unwrap(), 1);
        assert_eq!(table.lookup("b").unwrap(), 2);
    }

    #[test]
    fn ids_are_a_permutation_of_0_n() {
        let mut table = StringTable::new();
        for s in ["x", "y", "z", "y", "x", "x"] {
            table.add(s);
        }
        table.finalize();

        let mut ids: Vec<u32> = table.entries().iter().map(|s| table.lookup(s).unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn lookup_before_finalize_fails() {
        let mut table = StringTable::new();
        table.add("x");
        assert!(matches!(table.lookup("x"), Err(CompressError::UnknownString(_))));
    }

    #[test]
    fn lookup_of_never_added_string_fails() {
        let mut table = StringTable::new();
        table.add("x");
        table.finalize();
        assert!(matches!(table.lookup("never-seen"), Err(CompressError::UnknownString(_))));
    }

    #[test]
    fn single_char_identifiers_are_skipped() {
        let mut table = StringTable::new();
        table.add_identifier("x");
        table.add_identifier("ab");
        table.finalize();
        assert_eq!(table.entries(), &["ab".to_string()]);
    }
}
