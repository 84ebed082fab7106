use std::fmt;
use std::sync::Arc;

use biblib_model::{AbsoluteUid, LibraryId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::require_identity;
use crate::access::effective_role;
use crate::database::ports::{
    libraries::LibraryRepository, store::LibraryStore, users::UserRepository,
};
use crate::error::{LibraryError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsRequest {
    pub action: String,
    #[serde(default)]
    pub bibcode: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentsResponse {
    NumberAdded(usize),
    NumberRemoved(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Remove,
}

impl Action {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "add" => Ok(Action::Add),
            "remove" => Ok(Action::Remove),
            other => Err(LibraryError::InvalidRequest(format!(
                "Unknown document action: {other}"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn LibraryStore>,
}

impl fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentService").finish_non_exhaustive()
    }
}

impl DocumentService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Add or remove identifiers. Needs write, admin or owner access.
    pub async fn update_documents(
        &self,
        identity: Option<AbsoluteUid>,
        slug: &str,
        request: DocumentsRequest,
    ) -> Result<DocumentsResponse> {
        let uid = require_identity(identity)?;
        let library_id = LibraryId::from_slug(slug)?;
        let action = Action::parse(&request.action)?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .user_by_absolute_uid(uid)
            .await?
            .ok_or(LibraryError::PermissionDenied)?;
        let mut library = tx
            .get_library(library_id)
            .await?
            .ok_or_else(|| LibraryError::LibraryNotFound(library_id.to_string()))?;

        let role = effective_role(tx.as_mut(), Some(user.id), library_id).await?;
        if !role.can_mutate_documents() {
            return Err(LibraryError::PermissionDenied);
        }

        let now = Utc::now();
        let response = match action {
            Action::Add => {
                DocumentsResponse::NumberAdded(library.add_documents(request.bibcode, now))
            }
            Action::Remove => DocumentsResponse::NumberRemoved(
                library.remove_documents(&request.bibcode, now),
            ),
        };

        tx.replace_documents(library_id, &library.documents, library.last_modified_at)
            .await?;
        tx.commit().await?;

        info!(library = %library_id, user = %uid, ?response, "Updated documents");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::infrastructure::memory::InMemoryLibraryStore;
    use crate::database::ports::permissions::PermissionStore;
    use biblib_model::{Library, RoleFlags};

    async fn setup(grant: RoleFlags) -> (DocumentService, InMemoryLibraryStore, LibraryId) {
        let store = InMemoryLibraryStore::new();
        let mut tx = store.begin().await.unwrap();
        let owner = tx.ensure_user(AbsoluteUid(1)).await.unwrap();
        let other = tx.ensure_user(AbsoluteUid(2)).await.unwrap();
        let mut library = Library::new("lib", "", false, owner.id, Utc::now());
        library.add_documents(["A"], Utc::now());
        tx.insert_library(&library).await.unwrap();
        tx.set_permission(owner.id, library.id, RoleFlags::owner())
            .await
            .unwrap();
        if !grant.is_empty() {
            tx.set_permission(other.id, library.id, grant).await.unwrap();
        }
        tx.commit().await.unwrap();
        (DocumentService::new(Arc::new(store.clone())), store, library.id)
    }

    fn request(action: &str, ids: &[&str]) -> DocumentsRequest {
        DocumentsRequest {
            action: action.to_string(),
            bibcode: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn add_counts_only_new_identifiers() {
        let (service, store, id) = setup(RoleFlags::default()).await;
        let before = store.library(id).unwrap();

        let response = service
            .update_documents(Some(AbsoluteUid(1)), &id.to_slug(), request("add", &["A", "B"]))
            .await
            .unwrap();
        assert_eq!(response, DocumentsResponse::NumberAdded(1));

        let after = store.library(id).unwrap();
        assert_eq!(after.documents.timestamp_of("A"), before.documents.timestamp_of("A"));
        assert!(after.last_modified_at >= before.last_modified_at);
    }

    #[tokio::test]
    async fn remove_ignores_absent_identifiers() {
        let (service, store, id) = setup(RoleFlags::default()).await;
        let response = service
            .update_documents(
                Some(AbsoluteUid(1)),
                &id.to_slug(),
                request("remove", &["A", "missing"]),
            )
            .await
            .unwrap();
        assert_eq!(response, DocumentsResponse::NumberRemoved(1));
        assert!(store.library(id).unwrap().documents.is_empty());
    }

    #[tokio::test]
    async fn writers_may_mutate_readers_may_not() {
        let write = RoleFlags {
            write: true,
            ..RoleFlags::default()
        };
        let (service, _, id) = setup(write).await;
        assert!(
            service
                .update_documents(Some(AbsoluteUid(2)), &id.to_slug(), request("add", &["C"]))
                .await
                .is_ok()
        );

        let read = RoleFlags {
            read: true,
            ..RoleFlags::default()
        };
        let (service, store, id) = setup(read).await;
        let err = service
            .update_documents(Some(AbsoluteUid(2)), &id.to_slug(), request("add", &["C"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::PermissionDenied));
        assert!(!store.library(id).unwrap().documents.contains("C"));
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let (service, _, id) = setup(RoleFlags::default()).await;
        assert!(matches!(
            service
                .update_documents(None, &id.to_slug(), request("add", &["C"]))
                .await,
            Err(LibraryError::MissingIdentity)
        ));
        assert!(matches!(
            service
                .update_documents(Some(AbsoluteUid(1)), &id.to_slug(), request("merge", &[]))
                .await,
            Err(LibraryError::InvalidRequest(_))
        ));
        assert!(matches!(
            service
                .update_documents(Some(AbsoluteUid(1)), "%%%", request("add", &[]))
                .await,
            Err(LibraryError::InvalidLibraryId(_))
        ));
        assert!(matches!(
            service
                .update_documents(
                    Some(AbsoluteUid(1)),
                    &LibraryId::new().to_slug(),
                    request("add", &[])
                )
                .await,
            Err(LibraryError::LibraryNotFound(_))
        ));
    }
}
