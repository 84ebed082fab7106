//! Rewrites stored identifiers to their canonical form.
//!
//! The index reports, for each document, its canonical identifier and any
//! alternates it has been known by. A library that still stores an alternate
//! has that entry renamed; when the canonical form is already present the
//! alternate is dropped as a duplicate.
//!
//! Entries are visited oldest first (ties by identifier), so the surviving
//! entry for a canonical id always carries the earliest timestamp among the
//! entries that collapse onto it.

use std::collections::{HashMap, HashSet};

use biblib_model::{DocumentEntry, DocumentSet};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::providers::index::IndexRecord;

/// One rename, serialized as `{"old": "new"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierUpdate {
    pub old: String,
    pub new: String,
}

impl Serialize for IdentifierUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.old, &self.new)?;
        map.end()
    }
}

/// Counters reported back to the client under `updates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub num_updated: usize,
    pub duplicates_removed: usize,
    pub update_list: Vec<IdentifierUpdate>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub documents: DocumentSet,
    /// Whether `documents` differs from what is stored and must be written.
    pub changed: bool,
    pub result: ReconciliationResult,
}

/// Canonical/alternate lookup built from one index response.
#[derive(Debug, Clone, Default)]
pub struct CanonicalReconciler {
    canonical: HashSet<String>,
    alternates: HashMap<String, String>,
}

impl CanonicalReconciler {
    /// An identifier reported as canonical is never treated as an alternate.
    /// When several records claim the same alternate, the lexicographically
    /// smallest canonical id takes it.
    pub fn from_records(records: &[IndexRecord]) -> Self {
        let canonical: HashSet<String> =
            records.iter().map(|r| r.bibcode.clone()).collect();

        let mut alternates: HashMap<String, String> = HashMap::new();
        for record in records {
            for alternate in &record.alternate_bibcode {
                if canonical.contains(alternate) {
                    continue;
                }
                alternates
                    .entry(alternate.clone())
                    .and_modify(|current| {
                        if record.bibcode < *current {
                            current.clone_from(&record.bibcode);
                        }
                    })
                    .or_insert_with(|| record.bibcode.clone());
            }
        }

        Self {
            canonical,
            alternates,
        }
    }

    pub fn canonical_for(&self, identifier: &str) -> Option<&str> {
        self.alternates.get(identifier).map(String::as_str)
    }

    /// Rebuild `documents` under canonical identifiers. Entries without a
    /// timestamp are stamped with `default_timestamp`, which counts as a
    /// change but not as an update.
    pub fn reconcile(
        &self,
        documents: &DocumentSet,
        default_timestamp: f64,
    ) -> Reconciliation {
        let mut changed = false;
        let mut stamped: Vec<(&String, f64)> = documents
            .iter()
            .map(|(identifier, entry)| {
                let timestamp = entry.timestamp.unwrap_or_else(|| {
                    changed = true;
                    default_timestamp
                });
                (identifier, timestamp)
            })
            .collect();
        stamped.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        let mut rebuilt = DocumentSet::new();
        let mut result = ReconciliationResult::default();

        for (identifier, timestamp) in stamped {
            let entry = DocumentEntry::at(timestamp);

            if self.canonical.contains(identifier.as_str()) {
                // Already taken by an older alternate of this same document.
                if !rebuilt.insert_if_absent(identifier.clone(), entry) {
                    changed = true;
                }
            } else if let Some(target) = self.alternates.get(identifier.as_str()) {
                changed = true;
                result.num_updated += 1;
                result.update_list.push(IdentifierUpdate {
                    old: identifier.clone(),
                    new: target.clone(),
                });
                if !rebuilt.insert_if_absent(target.clone(), entry) {
                    result.duplicates_removed += 1;
                }
            } else {
                rebuilt.insert_if_absent(identifier.clone(), entry);
            }
        }

        Reconciliation {
            documents: rebuilt,
            changed,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bibcode: &str, alternates: &[&str]) -> IndexRecord {
        IndexRecord {
            bibcode: bibcode.to_string(),
            alternate_bibcode: alternates.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn set(entries: &[(&str, Option<f64>)]) -> DocumentSet {
        entries
            .iter()
            .map(|(id, ts)| (id.to_string(), DocumentEntry { timestamp: *ts }))
            .collect()
    }

    #[test]
    fn alternate_is_renamed_to_canonical() {
        let reconciler = CanonicalReconciler::from_records(&[record("A", &["a1"])]);
        let outcome = reconciler.reconcile(&set(&[("a1", Some(3.0))]), 0.0);

        assert!(outcome.changed);
        assert_eq!(outcome.documents, set(&[("A", Some(3.0))]));
        assert_eq!(outcome.result.num_updated, 1);
        assert_eq!(outcome.result.duplicates_removed, 0);
        assert_eq!(
            outcome.result.update_list,
            vec![IdentifierUpdate {
                old: "a1".into(),
                new: "A".into()
            }]
        );
    }

    #[test]
    fn older_alternate_keeps_its_timestamp_over_newer_canonical() {
        let reconciler = CanonicalReconciler::from_records(&[record("B", &["A"])]);
        let outcome = reconciler
            .reconcile(&set(&[("A", Some(1.0)), ("B", Some(2.0))]), 0.0);

        assert_eq!(outcome.documents, set(&[("B", Some(1.0))]));
        assert_eq!(outcome.result.num_updated, 1);
        assert_eq!(outcome.result.duplicates_removed, 0);
        assert!(outcome.changed);
    }

    #[test]
    fn newer_alternate_is_dropped_as_duplicate() {
        let reconciler = CanonicalReconciler::from_records(&[record("B", &["A"])]);
        let outcome = reconciler
            .reconcile(&set(&[("B", Some(1.0)), ("A", Some(2.0))]), 0.0);

        assert_eq!(outcome.documents, set(&[("B", Some(1.0))]));
        assert_eq!(outcome.result.num_updated, 1);
        assert_eq!(outcome.result.duplicates_removed, 1);
    }

    #[test]
    fn unknown_identifiers_are_kept() {
        let reconciler = CanonicalReconciler::from_records(&[record("A", &[])]);
        let stored = set(&[("A", Some(1.0)), ("gone", Some(2.0))]);
        let outcome = reconciler.reconcile(&stored, 0.0);

        assert!(!outcome.changed);
        assert_eq!(outcome.documents, stored);
        assert_eq!(outcome.result, ReconciliationResult::default());
    }

    #[test]
    fn legacy_entries_are_backfilled() {
        let reconciler = CanonicalReconciler::from_records(&[record("A", &[])]);
        let outcome = reconciler.reconcile(&set(&[("A", None)]), 42.5);

        assert!(outcome.changed);
        assert_eq!(outcome.documents.timestamp_of("A"), Some(42.5));
        assert_eq!(outcome.result.num_updated, 0);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let reconciler = CanonicalReconciler::from_records(&[
            record("A", &["a1", "a2"]),
            record("B", &["b1"]),
        ]);
        let stored = set(&[
            ("a1", Some(1.0)),
            ("a2", Some(2.0)),
            ("b1", None),
            ("x", Some(4.0)),
        ]);

        let first = reconciler.reconcile(&stored, 0.5);
        assert!(first.changed);
        assert_eq!(first.result.num_updated, 3);
        assert_eq!(first.result.duplicates_removed, 1);
        assert!(first.documents.len() <= stored.len());

        let second = reconciler.reconcile(&first.documents, 0.5);
        assert!(!second.changed);
        assert_eq!(second.documents, first.documents);
        assert_eq!(second.result, ReconciliationResult::default());
    }

    #[test]
    fn contested_alternate_goes_to_smallest_canonical() {
        let reconciler = CanonicalReconciler::from_records(&[
            record("Z", &["shared"]),
            record("M", &["shared"]),
        ]);
        assert_eq!(reconciler.canonical_for("shared"), Some("M"));
    }

    #[test]
    fn canonical_id_is_never_an_alternate() {
        let reconciler = CanonicalReconciler::from_records(&[
            record("A", &["B"]),
            record("B", &[]),
        ]);
        assert_eq!(reconciler.canonical_for("B"), None);

        let stored = set(&[("A", Some(1.0)), ("B", Some(2.0))]);
        let outcome = reconciler.reconcile(&stored, 0.0);
        assert!(!outcome.changed);
        assert_eq!(outcome.documents, stored);
    }

    #[test]
    fn update_list_serializes_as_single_key_objects() {
        let result = ReconciliationResult {
            num_updated: 1,
            duplicates_removed: 0,
            update_list: vec![IdentifierUpdate {
                old: "a1".into(),
                new: "A".into(),
            }],
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "num_updated": 1,
                "duplicates_removed": 0,
                "update_list": [{"a1": "A"}]
            })
        );
    }
}
