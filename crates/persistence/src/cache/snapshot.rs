//! Immutable reference-data snapshots.
//!
//! A snapshot is built completely before it is published and is never modified
//! afterwards. Readers hold an `Arc` to the snapshot they started with.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::query::SqlParam;

/// Bidirectional label/code mapping for one coded entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMapping {
    by_label: HashMap<String, i64>,
    by_code: HashMap<i64, String>,
}

impl CodeMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from `(code, label)` pairs.
    ///
    /// The first pair wins for a repeated label or code, so feeding pairs in
    /// ascending code order keeps the lowest code. Both directions always
    /// contain the same pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, String)>) -> Self {
        let mut mapping = Self::new();
        for (code, label) in pairs {
            if mapping.by_label.contains_key(&label) || mapping.by_code.contains_key(&code) {
                tracing::debug!(code, label = %label, "Skipping duplicate reference pair");
                continue;
            }
            mapping.by_label.insert(label.clone(), code);
            mapping.by_code.insert(code, label);
        }
        mapping
    }

    /// Returns the code for a label.
    pub fn resolve(&self, label: &str) -> Option<i64> {
        self.by_label.get(label).copied()
    }

    /// Returns the label for a code.
    pub fn reverse_resolve(&self, code: i64) -> Option<&str> {
        self.by_code.get(&code).map(String::as_str)
    }

    /// Returns all labels, sorted.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.by_label.keys().cloned().collect();
        labels.sort();
        labels
    }

    /// Returns all codes, sorted.
    pub fn codes(&self) -> Vec<i64> {
        let mut codes: Vec<i64> = self.by_code.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// Sorted set of labels for an entity without codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: BTreeSet<String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<String> for LabelSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// The published state of one reference entity.
#[derive(Debug, Clone)]
pub enum Snapshot {
    /// Coded entity.
    Codes(Arc<CodeMapping>),
    /// Label-only entity.
    Labels(Arc<LabelSet>),
}

impl Snapshot {
    /// Returns the code for a label. Always `None` for label-only snapshots.
    pub fn resolve(&self, label: &str) -> Option<i64> {
        match self {
            Snapshot::Codes(mapping) => mapping.resolve(label),
            Snapshot::Labels(_) => None,
        }
    }

    /// Returns the label for a code.
    pub fn reverse_resolve(&self, code: i64) -> Option<&str> {
        match self {
            Snapshot::Codes(mapping) => mapping.reverse_resolve(code),
            Snapshot::Labels(_) => None,
        }
    }

    /// Returns true if the label is known.
    pub fn contains(&self, label: &str) -> bool {
        match self {
            Snapshot::Codes(mapping) => mapping.resolve(label).is_some(),
            Snapshot::Labels(set) => set.contains(label),
        }
    }

    /// Returns the sorted label list.
    pub fn labels(&self) -> Vec<String> {
        match self {
            Snapshot::Codes(mapping) => mapping.labels(),
            Snapshot::Labels(set) => set.labels(),
        }
    }

    /// Returns the value to bind for a label filter.
    ///
    /// Known labels bind their code (or the label itself for label-only
    /// entities); unknown labels bind NULL, which no equality predicate
    /// matches.
    pub fn bind(&self, label: &str) -> SqlParam {
        match self {
            Snapshot::Codes(mapping) => mapping
                .resolve(label)
                .map(SqlParam::integer)
                .unwrap_or(SqlParam::Null),
            Snapshot::Labels(set) if set.contains(label) => SqlParam::string(label),
            Snapshot::Labels(_) => SqlParam::Null,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Snapshot::Codes(mapping) => mapping.len(),
            Snapshot::Labels(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genders() -> CodeMapping {
        CodeMapping::from_pairs(vec![
            (8507, "MALE".to_string()),
            (8532, "FEMALE".to_string()),
        ])
    }

    #[test]
    fn test_round_trip_for_every_code() {
        let mapping = genders();
        for code in mapping.codes() {
            let label = mapping.reverse_resolve(code).unwrap();
            assert_eq!(mapping.resolve(label), Some(code));
        }
    }

    #[test]
    fn test_duplicate_label_keeps_first_code() {
        let mapping = CodeMapping::from_pairs(vec![
            (100, "Fever".to_string()),
            (200, "Fever".to_string()),
            (300, "Cough".to_string()),
        ]);

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.resolve("Fever"), Some(100));
        assert_eq!(mapping.reverse_resolve(200), None);
        assert_eq!(mapping.labels(), vec!["Cough", "Fever"]);
    }

    #[test]
    fn test_bind_unknown_label_is_null() {
        let snapshot = Snapshot::Codes(Arc::new(genders()));
        assert_eq!(snapshot.bind("MALE"), SqlParam::integer(8507));
        assert!(snapshot.bind("X").is_null());
    }

    #[test]
    fn test_label_set_bind() {
        let set: LabelSet = ["Hispanic", "Not Hispanic"]
            .into_iter()
            .map(String::from)
            .collect();
        let snapshot = Snapshot::Labels(Arc::new(set));

        assert_eq!(snapshot.bind("Hispanic"), SqlParam::string("Hispanic"));
        assert!(snapshot.bind("Unknown").is_null());
        assert_eq!(snapshot.resolve("Hispanic"), None);
        assert!(snapshot.contains("Not Hispanic"));
        assert_eq!(snapshot.labels(), vec!["Hispanic", "Not Hispanic"]);
    }
}
