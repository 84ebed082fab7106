//! Process-local store used by tests and the `--in-memory` server mode.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use biblib_model::{
    AbsoluteUid, DocumentSet, Library, LibraryId, Permission, RoleFlags, User,
    UserId,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::database::ports::{
    libraries::LibraryRepository, permissions::PermissionStore,
    store::{LibraryStore, StoreTransaction},
    users::UserRepository,
};
use crate::error::{LibraryError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    next_user_id: i64,
    libraries: HashMap<LibraryId, Library>,
    permissions: HashMap<(UserId, LibraryId), RoleFlags>,
    commits: usize,
}

/// Shared in-memory state. Clones observe the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibraryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed copy of a library, bypassing transactions.
    pub fn library(&self, id: LibraryId) -> Option<Library> {
        self.state.lock().libraries.get(&id).cloned()
    }

    /// Number of commits that carried at least one write.
    pub fn write_count(&self) -> usize {
        self.state.lock().commits
    }
}

#[async_trait]
impl LibraryStore for InMemoryLibraryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            users: HashMap::new(),
            libraries: HashMap::new(),
            permissions: HashMap::new(),
        }))
    }
}

/// Writes are staged locally and applied under one lock on commit.
struct InMemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    users: HashMap<UserId, User>,
    libraries: HashMap<LibraryId, Library>,
    // `None` marks a staged delete.
    permissions: HashMap<(UserId, LibraryId), Option<RoleFlags>>,
}

impl InMemoryTransaction {
    fn is_dirty(&self) -> bool {
        !(self.users.is_empty()
            && self.libraries.is_empty()
            && self.permissions.is_empty())
    }

    fn library_view(&self, id: LibraryId) -> Option<Library> {
        self.libraries
            .get(&id)
            .cloned()
            .or_else(|| self.state.lock().libraries.get(&id).cloned())
    }

    fn permission_view(&self) -> HashMap<(UserId, LibraryId), RoleFlags> {
        let mut merged = self.state.lock().permissions.clone();
        for (key, staged) in &self.permissions {
            match staged {
                Some(flags) => {
                    merged.insert(*key, *flags);
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged
    }
}

#[async_trait]
impl LibraryRepository for InMemoryTransaction {
    async fn get_library(&mut self, id: LibraryId) -> Result<Option<Library>> {
        Ok(self.library_view(id))
    }

    async fn insert_library(&mut self, library: &Library) -> Result<()> {
        if self.library_view(library.id).is_some() {
            return Err(LibraryError::Storage(format!(
                "library {} already exists",
                library.id
            )));
        }
        self.libraries.insert(library.id, library.clone());
        Ok(())
    }

    async fn replace_documents(
        &mut self,
        id: LibraryId,
        documents: &DocumentSet,
        modified_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut library = self
            .library_view(id)
            .ok_or_else(|| LibraryError::LibraryNotFound(id.to_string()))?;
        library.documents = documents.clone();
        library.last_modified_at = modified_at;
        self.libraries.insert(id, library);
        Ok(())
    }

    async fn libraries_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<(Library, Permission)>> {
        let mut found: Vec<(Library, Permission)> = self
            .permission_view()
            .into_iter()
            .filter(|((user, _), _)| *user == user_id)
            .filter_map(|((user, library_id), flags)| {
                self.library_view(library_id).map(|library| {
                    let permission = Permission {
                        user_id: user,
                        library_id,
                        flags,
                    };
                    (library, permission)
                })
            })
            .collect();
        found.sort_by(|a, b| a.0.name.cmp(&b.0.name).then(a.0.id.cmp(&b.0.id)));
        Ok(found)
    }

    async fn owner_has_library_named(
        &mut self,
        owner: UserId,
        name: &str,
    ) -> Result<bool> {
        let owned = self
            .permission_view()
            .into_iter()
            .filter(|((user, _), flags)| *user == owner && flags.owner)
            .map(|((_, library_id), _)| library_id)
            .collect::<Vec<_>>();
        Ok(owned.into_iter().any(|library_id| {
            self.library_view(library_id)
                .is_some_and(|library| library.name == name)
        }))
    }
}

#[async_trait]
impl PermissionStore for InMemoryTransaction {
    async fn get_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
    ) -> Result<Option<Permission>> {
        let flags = match self.permissions.get(&(user_id, library_id)) {
            Some(staged) => *staged,
            None => self
                .state
                .lock()
                .permissions
                .get(&(user_id, library_id))
                .copied(),
        };
        Ok(flags.map(|flags| Permission {
            user_id,
            library_id,
            flags,
        }))
    }

    async fn set_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
        flags: RoleFlags,
    ) -> Result<()> {
        if flags.owner {
            let other_owner = self.permission_view().into_iter().any(
                |((user, library), existing)| {
                    library == library_id && user != user_id && existing.owner
                },
            );
            if other_owner {
                return Err(LibraryError::Storage(format!(
                    "library {library_id} already has an owner"
                )));
            }
        }
        self.permissions.insert((user_id, library_id), Some(flags));
        Ok(())
    }

    async fn delete_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
    ) -> Result<()> {
        self.permissions.insert((user_id, library_id), None);
        Ok(())
    }

    async fn permissions_for_library(
        &mut self,
        library_id: LibraryId,
    ) -> Result<Vec<Permission>> {
        let mut permissions: Vec<Permission> = self
            .permission_view()
            .into_iter()
            .filter(|((_, library), _)| *library == library_id)
            .map(|((user_id, library_id), flags)| Permission {
                user_id,
                library_id,
                flags,
            })
            .collect();
        permissions.sort_by_key(|permission| permission.user_id);
        Ok(permissions)
    }
}

#[async_trait]
impl UserRepository for InMemoryTransaction {
    async fn user_by_absolute_uid(
        &mut self,
        absolute_uid: AbsoluteUid,
    ) -> Result<Option<User>> {
        if let Some(user) = self
            .users
            .values()
            .find(|user| user.absolute_uid == absolute_uid)
        {
            return Ok(Some(*user));
        }
        Ok(self
            .state
            .lock()
            .users
            .values()
            .find(|user| user.absolute_uid == absolute_uid)
            .copied())
    }

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>> {
        if let Some(user) = self.users.get(&id) {
            return Ok(Some(*user));
        }
        Ok(self.state.lock().users.get(&id).copied())
    }

    async fn create_user(&mut self, absolute_uid: AbsoluteUid) -> Result<User> {
        if self.user_by_absolute_uid(absolute_uid).await?.is_some() {
            return Err(LibraryError::Storage(format!(
                "user {absolute_uid} already exists"
            )));
        }
        // Ids are handed out like a database sequence: never reused, even
        // when the transaction rolls back.
        let id = {
            let mut state = self.state.lock();
            state.next_user_id += 1;
            UserId(state.next_user_id)
        };
        let user = User { id, absolute_uid };
        self.users.insert(id, user);
        Ok(user)
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        if !self.is_dirty() {
            return Ok(());
        }
        let InMemoryTransaction {
            state,
            users,
            libraries,
            permissions,
        } = *self;

        let mut state = state.lock();
        state.users.extend(users);
        state.libraries.extend(libraries);
        for (key, staged) in permissions {
            match staged {
                Some(flags) => {
                    state.permissions.insert(key, flags);
                }
                None => {
                    state.permissions.remove(&key);
                }
            }
        }
        state.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryLibraryStore::new();
        let library_id = {
            let mut tx = store.begin().await.unwrap();
            let user = tx.ensure_user(AbsoluteUid(7)).await.unwrap();
            let library = Library::new("draft", "", false, user.id, now());
            tx.insert_library(&library).await.unwrap();
            library.id
        };

        assert!(store.library(library_id).is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn commit_applies_staged_writes() {
        let store = InMemoryLibraryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.ensure_user(AbsoluteUid(7)).await.unwrap();
        let library = Library::new("kept", "", false, user.id, now());
        tx.insert_library(&library).await.unwrap();
        tx.set_permission(user.id, library.id, RoleFlags::owner())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let stored = tx.get_library(library.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "kept");
        let permission =
            tx.get_permission(user.id, library.id).await.unwrap().unwrap();
        assert!(permission.flags.owner);
        assert_eq!(
            tx.user_by_absolute_uid(AbsoluteUid(7)).await.unwrap(),
            Some(user)
        );
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn second_owner_is_rejected() {
        let store = InMemoryLibraryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = tx.ensure_user(AbsoluteUid(1)).await.unwrap();
        let second = tx.ensure_user(AbsoluteUid(2)).await.unwrap();
        let library = Library::new("shared", "", false, first.id, now());
        tx.insert_library(&library).await.unwrap();
        tx.set_permission(first.id, library.id, RoleFlags::owner())
            .await
            .unwrap();

        let err = tx
            .set_permission(second.id, library.id, RoleFlags::owner())
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Storage(_)));
    }

    #[tokio::test]
    async fn staged_delete_hides_committed_permission() {
        let store = InMemoryLibraryStore::new();
        let mut tx = store.begin().await.unwrap();
        let owner = tx.ensure_user(AbsoluteUid(1)).await.unwrap();
        let reader = tx.ensure_user(AbsoluteUid(2)).await.unwrap();
        let library = Library::new("lib", "", false, owner.id, now());
        tx.insert_library(&library).await.unwrap();
        tx.set_permission(owner.id, library.id, RoleFlags::owner())
            .await
            .unwrap();
        let read = RoleFlags {
            read: true,
            ..RoleFlags::default()
        };
        tx.set_permission(reader.id, library.id, read).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.delete_permission(reader.id, library.id).await.unwrap();
        assert_eq!(tx.permissions_for_library(library.id).await.unwrap().len(), 1);
        assert!(
            tx.get_permission(reader.id, library.id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
