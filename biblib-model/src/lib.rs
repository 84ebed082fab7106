//! Core data model definitions shared across biblib crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod documents;
pub mod error;
pub mod ids;
pub mod library;
pub mod permission;
pub mod prelude;
pub mod user;

// Intentionally curated re-exports for downstream consumers.
pub use documents::{DocumentEntry, DocumentSet};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{AbsoluteUid, LibraryId, UserId};
pub use library::{Library, epoch_seconds};
pub use permission::{Permission, PermissionKind, Role, RoleFlags};
pub use user::User;
