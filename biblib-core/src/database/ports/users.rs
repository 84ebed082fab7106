use async_trait::async_trait;
use biblib_model::{AbsoluteUid, User, UserId};

use crate::error::Result;

#[async_trait]
pub trait UserRepository: Send {
    async fn user_by_absolute_uid(
        &mut self,
        absolute_uid: AbsoluteUid,
    ) -> Result<Option<User>>;

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>>;

    /// Register a user on first contact and return the stored row.
    async fn create_user(&mut self, absolute_uid: AbsoluteUid) -> Result<User>;

    /// Look up the user, creating it when unknown.
    async fn ensure_user(&mut self, absolute_uid: AbsoluteUid) -> Result<User> {
        match self.user_by_absolute_uid(absolute_uid).await? {
            Some(user) => Ok(user),
            None => self.create_user(absolute_uid).await,
        }
    }
}
