use async_trait::async_trait;
use biblib_model::{DocumentSet, Library, LibraryId, Permission, UserId};
use chrono::{DateTime, Utc};

use crate::error::Result;

#[async_trait]
pub trait LibraryRepository: Send {
    /// Load a library with its owner resolved. `None` when absent.
    async fn get_library(&mut self, id: LibraryId) -> Result<Option<Library>>;

    /// Persist a new library row. The caller is responsible for granting the
    /// owner permission inside the same transaction.
    async fn insert_library(&mut self, library: &Library) -> Result<()>;

    /// Overwrite the identifier set and bump the modification time.
    async fn replace_documents(
        &mut self,
        id: LibraryId,
        documents: &DocumentSet,
        modified_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Every library the user holds any permission on, with that permission.
    async fn libraries_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<(Library, Permission)>>;

    /// Whether `owner` already owns a library named `name`.
    async fn owner_has_library_named(
        &mut self,
        owner: UserId,
        name: &str,
    ) -> Result<bool>;
}
