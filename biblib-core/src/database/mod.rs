//! Storage ports and the adapters that implement them.

pub mod infrastructure;
pub mod ports;

pub use infrastructure::memory::InMemoryLibraryStore;
#[cfg(feature = "database")]
pub use infrastructure::postgres::PostgresLibraryStore;
pub use ports::{
    libraries::LibraryRepository, permissions::PermissionStore,
    store::{LibraryStore, StoreTransaction},
    users::UserRepository,
};
