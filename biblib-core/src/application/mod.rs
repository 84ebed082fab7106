//! Application services. Each call opens one store transaction and commits it
//! only when every check has passed.

pub mod documents;
pub mod libraries;
pub mod permissions;

use std::fmt;
use std::sync::Arc;

use biblib_model::{AbsoluteUid, Library, Role};
use serde::Serialize;

use crate::database::ports::store::LibraryStore;
use crate::error::{LibraryError, Result};
use crate::providers::identity::IdentityLookup;
use crate::providers::index::IndexService;
use crate::read_path::{LibraryReadPath, ReadPathConfig};

pub use documents::{DocumentService, DocumentsRequest, DocumentsResponse};
pub use libraries::{CreateLibraryRequest, LibraryService};
pub use permissions::{PermissionListing, PermissionService, PermissionUpdate};

/// Mutating calls need a caller.
pub(crate) fn require_identity(identity: Option<AbsoluteUid>) -> Result<AbsoluteUid> {
    identity.ok_or(LibraryError::MissingIdentity)
}

/// A library as listed to one of its users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibrarySummary {
    pub name: String,
    pub id: String,
    pub description: String,
    pub public: bool,
    pub num_documents: usize,
    pub date_created: String,
    pub date_last_modified: String,
    pub permission: Role,
}

impl LibrarySummary {
    pub fn new(library: &Library, permission: Role) -> Self {
        Self {
            name: library.name.clone(),
            id: library.id.to_slug(),
            description: library.description.clone(),
            public: library.public,
            num_documents: library.documents.len(),
            date_created: library.created_at.to_rfc3339(),
            date_last_modified: library.last_modified_at.to_rfc3339(),
            permission,
        }
    }
}

/// Every service the transport layer calls, wired to the same store.
#[derive(Clone)]
pub struct LibraryServices {
    pub libraries: LibraryService,
    pub documents: DocumentService,
    pub permissions: PermissionService,
    pub read_path: LibraryReadPath,
}

impl LibraryServices {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        index: Arc<dyn IndexService>,
        identity: Arc<dyn IdentityLookup>,
        config: ReadPathConfig,
    ) -> Self {
        Self {
            libraries: LibraryService::new(store.clone()),
            documents: DocumentService::new(store.clone()),
            permissions: PermissionService::new(store.clone(), identity.clone()),
            read_path: LibraryReadPath::new(store, index, identity, config),
        }
    }
}

impl fmt::Debug for LibraryServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryServices")
            .field("read_path", &self.read_path)
            .finish_non_exhaustive()
    }
}
