//! Repository ports grouped by aggregate.
//!
//! Every port is scoped to a [`store::StoreTransaction`]; services open one
//! per operation so reads and the writes that depend on them stay atomic.

pub mod libraries;
pub mod permissions;
pub mod store;
pub mod users;
