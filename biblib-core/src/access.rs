//! Role resolution for a (user, library) pair.
//!
//! Flags are independent booleans; the effective role is the highest one set,
//! in the order owner, admin, write, read.

use biblib_model::{Library, LibraryId, Role, RoleFlags, UserId};

use crate::database::ports::permissions::PermissionStore;
use crate::error::Result;

pub fn role_from_flags(flags: &RoleFlags) -> Role {
    if flags.owner {
        Role::Owner
    } else if flags.admin {
        Role::Admin
    } else if flags.write {
        Role::Write
    } else if flags.read {
        Role::Read
    } else {
        Role::None
    }
}

/// Stored role of `user` on `library`. Anonymous callers and users without a
/// permission row resolve to [`Role::None`].
pub async fn effective_role<P>(
    permissions: &mut P,
    user: Option<UserId>,
    library: LibraryId,
) -> Result<Role>
where
    P: PermissionStore + ?Sized,
{
    let Some(user) = user else {
        return Ok(Role::None);
    };
    Ok(permissions
        .get_permission(user, library)
        .await?
        .map(|permission| role_from_flags(&permission.flags))
        .unwrap_or(Role::None))
}

/// Whether a caller holding `role` may read `library`. Public libraries are
/// readable by anyone, including anonymous callers.
pub fn can_read(role: Role, library: &Library) -> bool {
    library.public || role.can_read()
}

/// Whether the `Authorization` header carries the configured override
/// credential. An empty credential never matches.
pub fn is_override_credential(
    authorization: Option<&str>,
    credential: Option<&str>,
) -> bool {
    match (authorization, credential) {
        (Some(header), Some(credential)) if !credential.is_empty() => {
            header.ends_with(credential)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::infrastructure::memory::InMemoryLibraryStore;
    use crate::database::ports::{
        libraries::LibraryRepository, store::LibraryStore,
        users::UserRepository,
    };
    use biblib_model::AbsoluteUid;
    use chrono::Utc;

    #[test]
    fn highest_flag_wins() {
        let all = RoleFlags {
            read: true,
            write: true,
            admin: true,
            owner: true,
        };
        assert_eq!(role_from_flags(&all), Role::Owner);

        let write_only = RoleFlags {
            write: true,
            ..RoleFlags::default()
        };
        assert_eq!(role_from_flags(&write_only), Role::Write);
        assert!(role_from_flags(&write_only).can_read());

        let admin_and_read = RoleFlags {
            read: true,
            admin: true,
            ..RoleFlags::default()
        };
        assert_eq!(role_from_flags(&admin_and_read), Role::Admin);
        assert_eq!(role_from_flags(&RoleFlags::default()), Role::None);
    }

    #[tokio::test]
    async fn anonymous_and_unpermitted_users_have_no_role() {
        let store = InMemoryLibraryStore::new();
        let mut tx = store.begin().await.unwrap();
        let owner = tx.ensure_user(AbsoluteUid(1)).await.unwrap();
        let stranger = tx.ensure_user(AbsoluteUid(2)).await.unwrap();
        let library = Library::new("mine", "", false, owner.id, Utc::now());
        tx.insert_library(&library).await.unwrap();
        tx.set_permission(owner.id, library.id, RoleFlags::owner())
            .await
            .unwrap();

        assert_eq!(
            effective_role(tx.as_mut(), Some(owner.id), library.id)
                .await
                .unwrap(),
            Role::Owner
        );
        assert_eq!(
            effective_role(tx.as_mut(), Some(stranger.id), library.id)
                .await
                .unwrap(),
            Role::None
        );
        assert_eq!(
            effective_role(tx.as_mut(), None, library.id).await.unwrap(),
            Role::None
        );
    }

    #[test]
    fn public_libraries_are_readable_without_a_role() {
        let mut library = Library::new("lib", "", false, UserId(1), Utc::now());
        assert!(!can_read(Role::None, &library));
        assert!(can_read(Role::Read, &library));
        library.public = true;
        assert!(can_read(Role::None, &library));
    }

    #[test]
    fn override_credential_matches_header_suffix() {
        assert!(is_override_credential(Some("Bearer secret"), Some("secret")));
        assert!(!is_override_credential(Some("Bearer other"), Some("secret")));
        assert!(!is_override_credential(None, Some("secret")));
        assert!(!is_override_credential(Some("Bearer "), Some("")));
        assert!(!is_override_credential(Some("Bearer secret"), None));
    }
}
