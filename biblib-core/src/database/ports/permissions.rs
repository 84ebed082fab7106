use async_trait::async_trait;
use biblib_model::{LibraryId, Permission, RoleFlags, UserId};

use crate::error::Result;

/// Grants keyed by (user, library). At most one row exists per pair.
#[async_trait]
pub trait PermissionStore: Send {
    async fn get_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
    ) -> Result<Option<Permission>>;

    /// Upsert the flags for one pair.
    async fn set_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
        flags: RoleFlags,
    ) -> Result<()>;

    async fn delete_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
    ) -> Result<()>;

    async fn permissions_for_library(
        &mut self,
        library_id: LibraryId,
    ) -> Result<Vec<Permission>>;
}
