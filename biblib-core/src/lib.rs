//! # biblib-core
//!
//! Permissioned libraries of bibliographic identifiers.
//!
//! - [`access`] resolves a caller's role on a library from stored flags.
//! - [`reconcile`] rewrites stored identifiers to the canonical ids reported
//!   by the search index, dropping duplicates.
//! - [`paginate`] parses paging parameters and orders results, including the
//!   "time added" sorts the index cannot do itself.
//! - [`read_path`] ties these together to serve one library.
//! - [`application`] holds the mutating services: library creation,
//!   document add/remove and permission management.
//!
//! Storage sits behind the ports in [`database::ports`]; PostgreSQL and
//! in-memory adapters are provided.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use biblib_core::application::LibraryServices;
//! use biblib_core::database::InMemoryLibraryStore;
//! use biblib_core::providers::{AdswsIdentityClient, BigQueryIndexClient};
//! use biblib_core::read_path::{ReadPathConfig, ReadRequest};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let timeout = Duration::from_secs(30);
//! let services = LibraryServices::new(
//!     Arc::new(InMemoryLibraryStore::new()),
//!     Arc::new(BigQueryIndexClient::new("http://localhost:8983/bigquery", None, timeout)?),
//!     Arc::new(AdswsIdentityClient::new("http://localhost:5000/user", None, timeout)?),
//!     ReadPathConfig::default(),
//! );
//!
//! let response = services
//!     .read_path
//!     .read(ReadRequest {
//!         library: "AAAAAAAAAAAAAAAAAAAAAA".into(),
//!         ..ReadRequest::default()
//!     })
//!     .await?;
//! println!("{} documents", response.documents.len());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod access;
pub mod application;
pub mod database;
pub mod error;
pub mod paginate;
pub mod providers;
pub mod read_path;
pub mod reconcile;

#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{LibraryError, Result};
