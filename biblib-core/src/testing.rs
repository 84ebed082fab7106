//! In-process stand-ins for the index and identity services.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use biblib_model::AbsoluteUid;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use crate::providers::identity::{IdentityError, IdentityLookup};
use crate::providers::index::{
    IndexError, IndexQuery, IndexRecord, IndexResponse, IndexService,
};

/// Index double. Identifiers it has not been told about are echoed back as
/// canonical documents; registered records resolve their alternates. Like the
/// real index, only fields named in the query's `fl` are returned.
#[derive(Debug, Default)]
pub struct StubIndex {
    records: Vec<IndexRecord>,
    unknown: BTreeSet<String>,
    failing: bool,
    queries: Mutex<Vec<IndexQuery>>,
}

impl StubIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, bibcode: &str, alternates: &[&str]) -> Self {
        self.records.push(IndexRecord {
            bibcode: bibcode.to_string(),
            alternate_bibcode: alternates.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    /// Identifier the index does not return at all.
    pub fn without(mut self, identifier: &str) -> Self {
        self.unknown.insert(identifier.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<IndexQuery> {
        self.queries.lock().clone()
    }

    fn resolve(&self, identifier: &str) -> Option<IndexRecord> {
        if self.unknown.contains(identifier) {
            return None;
        }
        let known = self.records.iter().find(|record| {
            record.bibcode == identifier
                || record.alternate_bibcode.iter().any(|a| a == identifier)
        });
        Some(known.cloned().unwrap_or_else(|| IndexRecord {
            bibcode: identifier.to_string(),
            alternate_bibcode: Vec::new(),
        }))
    }
}

#[async_trait]
impl IndexService for StubIndex {
    async fn lookup(
        &self,
        identifiers: &[String],
        query: &IndexQuery,
    ) -> Result<IndexResponse, IndexError> {
        self.queries.lock().push(query.clone());
        if self.failing {
            return Err(IndexError::Status(503));
        }

        let fields: BTreeSet<&str> = query.fl.split(',').map(str::trim).collect();
        let mut seen = BTreeSet::new();
        let docs: Vec<Value> = identifiers
            .iter()
            .filter_map(|identifier| self.resolve(identifier))
            .filter(|record| seen.insert(record.bibcode.clone()))
            .skip(query.start)
            .take(query.rows)
            .map(|record| {
                let mut doc = Map::new();
                if fields.contains("bibcode") {
                    doc.insert("bibcode".into(), json!(record.bibcode));
                }
                if fields.contains("alternate_bibcode") {
                    doc.insert(
                        "alternate_bibcode".into(),
                        json!(record.alternate_bibcode),
                    );
                }
                Value::Object(doc)
            })
            .collect();

        IndexResponse::from_value(json!({
            "responseHeader": {"status": 0},
            "response": {"numFound": docs.len(), "start": query.start, "docs": docs},
        }))
    }
}

/// Identity double backed by a fixed uid/email table. Unknown keys answer
/// with a 404.
#[derive(Debug, Default, Clone)]
pub struct StubIdentity {
    emails: HashMap<AbsoluteUid, String>,
    unavailable: bool,
}

impl StubIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup fails with a 503.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, uid: i64, email: &str) -> Self {
        self.emails.insert(AbsoluteUid(uid), email.to_string());
        self
    }
}

#[async_trait]
impl IdentityLookup for StubIdentity {
    async fn email_for(&self, uid: AbsoluteUid) -> Result<String, IdentityError> {
        if self.unavailable {
            return Err(IdentityError::Status(503));
        }
        self.emails.get(&uid).cloned().ok_or(IdentityError::Status(404))
    }

    async fn uid_for_email(
        &self,
        email: &str,
    ) -> Result<AbsoluteUid, IdentityError> {
        if self.unavailable {
            return Err(IdentityError::Status(503));
        }
        self.emails
            .iter()
            .find(|(_, known)| known.as_str() == email)
            .map(|(uid, _)| *uid)
            .ok_or(IdentityError::Status(404))
    }
}
