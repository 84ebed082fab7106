use std::fmt;
use std::sync::Arc;

use biblib_model::{AbsoluteUid, Library, Role, RoleFlags};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::{LibrarySummary, require_identity};
use crate::access::role_from_flags;
use crate::database::ports::{
    libraries::LibraryRepository, permissions::PermissionStore,
    store::LibraryStore, users::UserRepository,
};
use crate::error::{LibraryError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateLibraryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub public: bool,
    pub bibcode: Vec<String>,
}

#[derive(Clone)]
pub struct LibraryService {
    store: Arc<dyn LibraryStore>,
}

impl fmt::Debug for LibraryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryService").finish_non_exhaustive()
    }
}

impl LibraryService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Create a library owned by the caller, registering the caller on first
    /// contact.
    pub async fn create_library(
        &self,
        identity: Option<AbsoluteUid>,
        request: CreateLibraryRequest,
    ) -> Result<LibrarySummary> {
        let uid = require_identity(identity)?;
        let now = Utc::now();

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Untitled Library {}", now.to_rfc3339()));

        let mut tx = self.store.begin().await?;
        let user = tx.ensure_user(uid).await?;
        if tx.owner_has_library_named(user.id, &name).await? {
            return Err(LibraryError::InvalidRequest(format!(
                "Library name \"{name}\" already exists for this user"
            )));
        }

        let mut library = Library::new(
            name,
            request.description.unwrap_or_default(),
            request.public,
            user.id,
            now,
        );
        library.add_documents(request.bibcode, now);

        tx.insert_library(&library).await?;
        tx.set_permission(user.id, library.id, RoleFlags::owner())
            .await?;
        tx.commit().await?;

        info!(
            library = %library.id,
            user = %uid,
            num_documents = library.documents.len(),
            "Created library"
        );
        Ok(LibrarySummary::new(&library, Role::Owner))
    }

    /// Libraries the caller holds any permission on, ordered by name.
    pub async fn list_user_libraries(
        &self,
        identity: Option<AbsoluteUid>,
    ) -> Result<Vec<LibrarySummary>> {
        let uid = require_identity(identity)?;

        let mut tx = self.store.begin().await?;
        let Some(user) = tx.user_by_absolute_uid(uid).await? else {
            return Ok(Vec::new());
        };
        let libraries = tx.libraries_for_user(user.id).await?;
        tx.commit().await?;

        Ok(libraries
            .iter()
            .map(|(library, permission)| {
                LibrarySummary::new(library, role_from_flags(&permission.flags))
            })
            .collect())
    }
}
