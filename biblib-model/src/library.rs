use chrono::{DateTime, Utc};

use crate::documents::DocumentSet;
use crate::ids::{LibraryId, UserId};

/// A named, owned, permissioned collection of bibliographic identifiers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub description: String,
    pub public: bool,
    /// The user holding the single owner permission on this library.
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    pub documents: DocumentSet,
}

impl Library {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        public: bool,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LibraryId::new(),
            name: name.into(),
            description: description.into(),
            public,
            owner_id,
            created_at: now,
            last_modified_at: now,
            documents: DocumentSet::new(),
        }
    }

    /// Creation time as fractional epoch seconds, the unit document
    /// timestamps are stored in.
    pub fn created_timestamp(&self) -> f64 {
        epoch_seconds(&self.created_at)
    }

    /// Add identifiers at `now` and mark the library modified.
    pub fn add_documents<I, S>(&mut self, identifiers: I, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let added = self.documents.add(identifiers, epoch_seconds(&now));
        self.last_modified_at = now;
        added
    }

    /// Remove identifiers and mark the library modified.
    pub fn remove_documents<I, S>(
        &mut self,
        identifiers: I,
        now: DateTime<Utc>,
    ) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed = self.documents.remove(identifiers);
        self.last_modified_at = now;
        removed
    }
}

/// Fractional seconds since the Unix epoch.
pub fn epoch_seconds(at: &DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}
