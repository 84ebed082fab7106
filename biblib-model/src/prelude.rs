//! Snapshot of the model surface for service and transport layers.
//! Prefer importing from this module instead of individual tree nodes.

pub use super::documents::{DocumentEntry, DocumentSet};
pub use super::ids::{AbsoluteUid, LibraryId, UserId};
pub use super::library::{Library, epoch_seconds};
pub use super::permission::{Permission, PermissionKind, Role, RoleFlags};
pub use super::user::User;
