use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use biblib_model::{AbsoluteUid, LibraryId, PermissionKind, Role, RoleFlags};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{info, warn};

use super::require_identity;
use crate::access::effective_role;
use crate::database::ports::{
    libraries::LibraryRepository, permissions::PermissionStore,
    store::LibraryStore, users::UserRepository,
};
use crate::error::{LibraryError, Result};
use crate::providers::identity::{IdentityLookup, OWNER_UNAVAILABLE};

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionUpdate {
    pub email: String,
    pub permission: String,
    pub value: bool,
}

/// One user's grants, serialized as `{"email": ["owner", ...]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionListing {
    pub email: String,
    pub granted: Vec<&'static str>,
}

impl Serialize for PermissionListing {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.email, &self.granted)?;
        map.end()
    }
}

#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn LibraryStore>,
    identity: Arc<dyn IdentityLookup>,
}

impl fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionService").finish_non_exhaustive()
    }
}

impl PermissionService {
    pub fn new(store: Arc<dyn LibraryStore>, identity: Arc<dyn IdentityLookup>) -> Self {
        Self { store, identity }
    }

    /// Set a single flag for the user behind `update.email`.
    ///
    /// Only the owner may grant or revoke admin; owners and admins manage
    /// read and write. Ownership itself is never changed here.
    pub async fn update(
        &self,
        identity: Option<AbsoluteUid>,
        slug: &str,
        update: PermissionUpdate,
    ) -> Result<PermissionListing> {
        let uid = require_identity(identity)?;
        let library_id = LibraryId::from_slug(slug)?;

        let kind = PermissionKind::from_str(&update.permission)?;
        if kind == PermissionKind::Owner {
            return Err(LibraryError::InvalidRequest(
                "The owner permission cannot be changed".into(),
            ));
        }

        let target_uid = self
            .identity
            .uid_for_email(&update.email)
            .await
            .map_err(|err| {
                warn!(email = %update.email, error = %err, "Permission target lookup failed");
                if err.is_unknown_user() {
                    LibraryError::InvalidRequest("User does not exist".into())
                } else {
                    LibraryError::UpstreamUnavailable(err.to_string())
                }
            })?;
        if target_uid == uid {
            return Err(LibraryError::InvalidRequest(
                "You cannot change your own permissions".into(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let requester = tx
            .user_by_absolute_uid(uid)
            .await?
            .ok_or(LibraryError::PermissionDenied)?;
        if tx.get_library(library_id).await?.is_none() {
            return Err(LibraryError::LibraryNotFound(library_id.to_string()));
        }

        let role = effective_role(tx.as_mut(), Some(requester.id), library_id).await?;
        let allowed = match kind {
            PermissionKind::Admin => role == Role::Owner,
            _ => role.can_manage_permissions(),
        };
        if !allowed {
            return Err(LibraryError::PermissionDenied);
        }

        let target = tx.ensure_user(target_uid).await?;
        let mut flags = tx
            .get_permission(target.id, library_id)
            .await?
            .map(|permission| permission.flags)
            .unwrap_or_default();
        flags.set(kind, update.value);

        if flags.is_empty() {
            tx.delete_permission(target.id, library_id).await?;
        } else {
            tx.set_permission(target.id, library_id, flags).await?;
        }
        tx.commit().await?;

        info!(
            library = %library_id,
            requester = %uid,
            target = %target_uid,
            permission = kind.as_str(),
            value = update.value,
            "Updated permission"
        );
        Ok(PermissionListing {
            email: update.email,
            granted: flags.granted(),
        })
    }

    /// Every grant on the library. Owner and admins only.
    pub async fn list(
        &self,
        identity: Option<AbsoluteUid>,
        slug: &str,
    ) -> Result<Vec<PermissionListing>> {
        let uid = require_identity(identity)?;
        let library_id = LibraryId::from_slug(slug)?;

        let mut tx = self.store.begin().await?;
        let requester = tx
            .user_by_absolute_uid(uid)
            .await?
            .ok_or(LibraryError::PermissionDenied)?;
        if tx.get_library(library_id).await?.is_none() {
            return Err(LibraryError::LibraryNotFound(library_id.to_string()));
        }
        let role = effective_role(tx.as_mut(), Some(requester.id), library_id).await?;
        if !role.can_manage_permissions() {
            return Err(LibraryError::PermissionDenied);
        }

        let mut grants: Vec<(Option<AbsoluteUid>, RoleFlags)> = Vec::new();
        for permission in tx.permissions_for_library(library_id).await? {
            let user = tx.user_by_id(permission.user_id).await?;
            grants.push((user.map(|u| u.absolute_uid), permission.flags));
        }
        tx.commit().await?;

        let mut listings = Vec::with_capacity(grants.len());
        for (absolute_uid, flags) in grants {
            let email = match absolute_uid {
                Some(absolute_uid) => match self.identity.email_for(absolute_uid).await {
                    Ok(email) => email,
                    Err(err) => {
                        warn!(user = %absolute_uid, error = %err, "Email lookup failed");
                        OWNER_UNAVAILABLE.to_string()
                    }
                },
                None => OWNER_UNAVAILABLE.to_string(),
            };
            listings.push(PermissionListing {
                email,
                granted: flags.granted(),
            });
        }
        Ok(listings)
    }
}
