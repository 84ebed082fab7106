mod rows;
mod store;

pub use store::{PostgresLibraryStore, PostgresTransaction};
