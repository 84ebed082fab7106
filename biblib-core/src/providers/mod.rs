//! Upstream services the read path depends on: the search index that knows
//! canonical identifiers, and the identity subsystem that knows emails.

pub mod adsws;
pub mod identity;
pub mod index;
pub mod solr;

pub use adsws::AdswsIdentityClient;
pub use identity::{IdentityError, IdentityLookup, owner_label};
pub use index::{IndexError, IndexQuery, IndexRecord, IndexResponse, IndexService};
pub use solr::BigQueryIndexClient;
