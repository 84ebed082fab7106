use async_trait::async_trait;

use super::libraries::LibraryRepository;
use super::permissions::PermissionStore;
use super::users::UserRepository;
use crate::error::Result;

/// Entry point to persistent library state.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Open a transaction. Dropping it without [`StoreTransaction::commit`]
    /// discards every staged write.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// A unit of work over users, libraries and permissions.
#[async_trait]
pub trait StoreTransaction:
    LibraryRepository + PermissionStore + UserRepository + Send
{
    async fn commit(self: Box<Self>) -> Result<()>;
}
