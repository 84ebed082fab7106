use std::collections::BTreeMap;
use std::collections::btree_map;

/// Per-identifier metadata stored in a library.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentEntry {
    /// Seconds since the Unix epoch at which the identifier was added.
    /// Legacy rows may lack it until reconciliation backfills them.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub timestamp: Option<f64>,
}

impl DocumentEntry {
    pub fn at(timestamp: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
        }
    }

    pub fn legacy() -> Self {
        Self { timestamp: None }
    }
}

/// The identifier set of one library.
///
/// Keys are unique bibliographic identifiers. Iteration is lexicographic;
/// insertion order is carried by the timestamps, not by the map.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DocumentSet {
    entries: BTreeMap<String, DocumentEntry>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&DocumentEntry> {
        self.entries.get(identifier)
    }

    pub fn timestamp_of(&self, identifier: &str) -> Option<f64> {
        self.entries.get(identifier).and_then(|entry| entry.timestamp)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, DocumentEntry> {
        self.entries.iter()
    }

    /// All identifiers in lexicographic order.
    pub fn identifiers(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Insert `identifier` unless it is already present. Returns whether the
    /// set changed.
    pub fn insert_if_absent(
        &mut self,
        identifier: impl Into<String>,
        entry: DocumentEntry,
    ) -> bool {
        match self.entries.entry(identifier.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Add identifiers stamped with `at`. Identifiers already present keep
    /// their original timestamp. Returns the number actually inserted.
    pub fn add<I, S>(&mut self, identifiers: I, at: f64) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        identifiers
            .into_iter()
            .map(|identifier| {
                self.insert_if_absent(identifier, DocumentEntry::at(at))
            })
            .filter(|inserted| *inserted)
            .count()
    }

    /// Remove identifiers. Absent identifiers are ignored. Returns the number
    /// actually removed.
    pub fn remove<I, S>(&mut self, identifiers: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        identifiers
            .into_iter()
            .filter(|identifier| self.entries.remove(identifier.as_ref()).is_some())
            .count()
    }

    /// Identifiers ordered by timestamp. Entries without a timestamp use
    /// `default_timestamp`. Ties keep lexicographic order in both directions.
    pub fn ordered_by_time(
        &self,
        default_timestamp: f64,
        descending: bool,
    ) -> Vec<String> {
        let mut stamped: Vec<(&String, f64)> = self
            .entries
            .iter()
            .map(|(id, entry)| (id, entry.timestamp.unwrap_or(default_timestamp)))
            .collect();

        if descending {
            stamped.sort_by(|a, b| b.1.total_cmp(&a.1));
        } else {
            stamped.sort_by(|a, b| a.1.total_cmp(&b.1));
        }

        stamped.into_iter().map(|(id, _)| id.clone()).collect()
    }
}

impl FromIterator<(String, DocumentEntry)> for DocumentSet {
    fn from_iter<T: IntoIterator<Item = (String, DocumentEntry)>>(
        iter: T,
    ) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for DocumentSet {
    type Item = (String, DocumentEntry);
    type IntoIter = btree_map::IntoIter<String, DocumentEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = (&'a String, &'a DocumentEntry);
    type IntoIter = btree_map::Iter<'a, String, DocumentEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_existing_timestamps() {
        let mut documents = DocumentSet::new();
        assert_eq!(documents.add(["A", "B"], 10.0), 2);

        let added = documents.add(["A", "C"], 20.0);

        assert_eq!(added, 1);
        assert_eq!(documents.timestamp_of("A"), Some(10.0));
        assert_eq!(documents.timestamp_of("C"), Some(20.0));
    }

    #[test]
    fn remove_ignores_absent_identifiers() {
        let mut documents = DocumentSet::new();
        documents.add(["A", "B"], 1.0);

        assert_eq!(documents.remove(["B", "Z"]), 1);
        assert_eq!(documents.identifiers(), vec!["A".to_string()]);
        assert_eq!(documents.remove(["Z"]), 0);
    }

    #[test]
    fn time_ordering_is_stable_and_backfills_missing_timestamps() {
        let documents: DocumentSet = [
            ("A".to_string(), DocumentEntry::at(3.0)),
            ("B".to_string(), DocumentEntry::at(1.0)),
            ("C".to_string(), DocumentEntry::legacy()),
            ("D".to_string(), DocumentEntry::at(1.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(documents.ordered_by_time(2.0, false), ["B", "D", "C", "A"]);
        assert_eq!(documents.ordered_by_time(2.0, true), ["A", "C", "B", "D"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialises_as_identifier_map() {
        let mut documents = DocumentSet::new();
        documents.add(["2020ApJ...1..1A"], 5.5);
        documents.insert_if_absent("legacy", DocumentEntry::legacy());

        let value = serde_json::to_value(&documents).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "2020ApJ...1..1A": {"timestamp": 5.5},
                "legacy": {}
            })
        );

        let back: DocumentSet = serde_json::from_value(value).unwrap();
        assert_eq!(back, documents);
    }
}
