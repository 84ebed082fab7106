//! Serving one library: authorize, reconcile against the index, paginate.

use std::fmt;
use std::sync::Arc;

use biblib_model::{AbsoluteUid, Library, LibraryId, Role, User};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::access::{can_read, effective_role, is_override_credential};
use crate::database::ports::{
    libraries::LibraryRepository, permissions::PermissionStore,
    store::LibraryStore, users::UserRepository,
};
use crate::error::{LibraryError, Result};
use crate::paginate::{PageParams, PageRequest, ResultPaginator, effective_max_rows};
use crate::providers::identity::{IdentityLookup, OWNER_UNAVAILABLE, owner_label};
use crate::providers::index::{IndexRecord, IndexService};
use crate::reconcile::{CanonicalReconciler, Reconciliation, ReconciliationResult};

pub const RAW_ONLY_MESSAGE: &str = "Only the raw library was requested.";
pub const INDEX_UNAVAILABLE_MESSAGE: &str = "Could not parse solr data";

/// Tunables for the read path.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPathConfig {
    pub max_rows: usize,
    /// Used when the caller supplies no usable rate-limit level.
    pub rate_limit_multiplier: f64,
    /// Bearer credential that may read every library.
    pub override_credential: Option<String>,
    /// Check access before touching the index. Off by default so the index
    /// reconciliation still runs for callers that end up denied.
    pub authorize_before_fetch: bool,
}

impl Default for ReadPathConfig {
    fn default() -> Self {
        Self {
            max_rows: 100,
            rate_limit_multiplier: 1.0,
            override_credential: None,
            authorize_before_fetch: false,
        }
    }
}

/// One read request, already stripped of transport details.
#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    /// URL-safe library slug.
    pub library: String,
    pub identity: Option<AbsoluteUid>,
    pub params: PageParams,
    pub rate_limit_level: Option<f64>,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryMetadata {
    pub name: String,
    pub id: String,
    pub description: String,
    pub num_documents: usize,
    pub date_created: String,
    pub date_last_modified: String,
    pub permission: Role,
    pub public: bool,
    pub num_users: usize,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryReadResponse {
    pub documents: Vec<String>,
    pub solr: Value,
    pub metadata: LibraryMetadata,
    pub updates: ReconciliationResult,
}

/// State read in a single transaction before anything else happens.
struct LibrarySnapshot {
    library: Library,
    user: Option<User>,
    role: Role,
    num_users: usize,
    owner: Option<User>,
}

#[derive(Clone)]
pub struct LibraryReadPath {
    store: Arc<dyn LibraryStore>,
    index: Arc<dyn IndexService>,
    identity: Arc<dyn IdentityLookup>,
    config: ReadPathConfig,
}

impl fmt::Debug for LibraryReadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryReadPath")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LibraryReadPath {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        index: Arc<dyn IndexService>,
        identity: Arc<dyn IdentityLookup>,
        config: ReadPathConfig,
    ) -> Self {
        Self {
            store,
            index,
            identity,
            config,
        }
    }

    pub fn config(&self) -> &ReadPathConfig {
        &self.config
    }

    fn max_rows(&self, rate_limit_level: Option<f64>) -> usize {
        let multiplier = rate_limit_level
            .filter(|level| level.is_finite() && *level > 0.0)
            .unwrap_or(self.config.rate_limit_multiplier);
        effective_max_rows(self.config.max_rows, multiplier)
    }

    pub async fn read(&self, request: ReadRequest) -> Result<LibraryReadResponse> {
        let library_id = LibraryId::from_slug(&request.library)?;
        let page = PageRequest::from_params(
            &request.params,
            self.max_rows(request.rate_limit_level),
        );
        info!(
            library = %library_id,
            user = ?request.identity,
            start = page.start,
            rows = page.rows,
            raw = page.raw,
            "Reading library"
        );

        let snapshot = match self.snapshot(library_id, request.identity).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                return Err(LibraryError::LibraryNotFound(library_id.to_string()));
            }
            Err(err) => {
                warn!(library = %library_id, error = %err, "Failed to load library");
                return Err(LibraryError::LibraryNotFound(library_id.to_string()));
            }
        };

        if self.config.authorize_before_fetch {
            self.authorize(&snapshot, &request)?;
        }

        let owner = match snapshot.owner {
            Some(owner) => {
                let lookup = self.identity.email_for(owner.absolute_uid).await;
                if let Err(err) = &lookup {
                    error!(owner = %owner.absolute_uid, error = %err, "Owner email lookup failed");
                }
                owner_label(lookup)
            }
            None => {
                error!(library = %library_id, "Library owner has no user record");
                OWNER_UNAVAILABLE.to_string()
            }
        };
        let metadata = metadata(&snapshot, owner);
        let library = &snapshot.library;
        let default_timestamp = library.created_timestamp();

        let (documents, solr, updates) = if page.raw {
            info!(library = %library_id, "Only the raw library was requested");
            let documents = ResultPaginator::new(&library.documents, default_timestamp)
                .paginate_stored(&page);
            (documents, json!(RAW_ONLY_MESSAGE), ReconciliationResult::default())
        } else {
            let identifiers = library.documents.identifiers();
            let query = page.index_query(identifiers.len());
            match self.index.lookup(&identifiers, &query).await {
                Ok(mut response) => {
                    let reconciled = self
                        .reconcile(library_id, response.records())
                        .await
                        .map_err(|err| {
                            warn!(library = %library_id, error = %err, "Reconciliation failed");
                            LibraryError::LibraryNotFound(library_id.to_string())
                        })?;
                    let documents =
                        ResultPaginator::new(&reconciled.documents, default_timestamp)
                            .paginate_indexed(&page, &mut response);
                    (documents, response.into_raw(), reconciled.result)
                }
                Err(err) => {
                    warn!(library = %library_id, error = %err, "Index lookup failed");
                    let documents =
                        ResultPaginator::new(&library.documents, default_timestamp)
                            .paginate_stored(&page);
                    (
                        documents,
                        json!({ "error": INDEX_UNAVAILABLE_MESSAGE }),
                        ReconciliationResult::default(),
                    )
                }
            }
        };

        if !self.config.authorize_before_fetch {
            self.authorize(&snapshot, &request)?;
        }

        Ok(LibraryReadResponse {
            documents,
            solr,
            metadata,
            updates,
        })
    }

    async fn snapshot(
        &self,
        library_id: LibraryId,
        identity: Option<AbsoluteUid>,
    ) -> Result<Option<LibrarySnapshot>> {
        let mut tx = self.store.begin().await?;

        let user = match identity {
            Some(uid) => tx.user_by_absolute_uid(uid).await?,
            None => None,
        };
        let Some(library) = tx.get_library(library_id).await? else {
            return Ok(None);
        };
        let role =
            effective_role(tx.as_mut(), user.map(|u| u.id), library_id).await?;
        let num_users = if library.public || role.can_manage_permissions() {
            tx.permissions_for_library(library_id).await?.len()
        } else {
            0
        };
        let owner = tx.user_by_id(library.owner_id).await?;
        tx.commit().await?;

        Ok(Some(LibrarySnapshot {
            library,
            user,
            role,
            num_users,
            owner,
        }))
    }

    /// Rewrite stored identifiers against the index response, writing only
    /// when something changed.
    async fn reconcile(
        &self,
        library_id: LibraryId,
        records: &[IndexRecord],
    ) -> Result<Reconciliation> {
        let reconciler = CanonicalReconciler::from_records(records);

        let mut tx = self.store.begin().await?;
        let library = tx
            .get_library(library_id)
            .await?
            .ok_or_else(|| LibraryError::LibraryNotFound(library_id.to_string()))?;
        let outcome =
            reconciler.reconcile(&library.documents, library.created_timestamp());

        if outcome.changed {
            tx.replace_documents(library_id, &outcome.documents, Utc::now())
                .await?;
            tx.commit().await?;
            info!(
                library = %library_id,
                num_updated = outcome.result.num_updated,
                duplicates_removed = outcome.result.duplicates_removed,
                "Reconciled library identifiers"
            );
        } else {
            debug!(library = %library_id, "Library identifiers already canonical");
        }

        Ok(outcome)
    }

    fn authorize(&self, snapshot: &LibrarySnapshot, request: &ReadRequest) -> Result<()> {
        if snapshot.library.public {
            info!(library = %snapshot.library.id, "Library is public");
            return Ok(());
        }
        warn!(library = %snapshot.library.id, "Library is private");
        if is_override_credential(
            request.authorization.as_deref(),
            self.config.override_credential.as_deref(),
        ) {
            info!(library = %snapshot.library.id, "Read granted by override credential");
            return Ok(());
        }
        if snapshot.user.is_some() && can_read(snapshot.role, &snapshot.library) {
            info!(
                library = %snapshot.library.id,
                role = %snapshot.role,
                "Read allowed"
            );
            return Ok(());
        }
        error!(
            library = %snapshot.library.id,
            user = ?request.identity,
            "Read denied"
        );
        Err(LibraryError::PermissionDenied)
    }
}

fn metadata(snapshot: &LibrarySnapshot, owner: String) -> LibraryMetadata {
    let library = &snapshot.library;
    LibraryMetadata {
        name: library.name.clone(),
        id: library.id.to_slug(),
        description: library.description.clone(),
        num_documents: library.documents.len(),
        date_created: library.created_at.to_rfc3339(),
        date_last_modified: library.last_modified_at.to_rfc3339(),
        permission: snapshot.role,
        public: library.public,
        num_users: snapshot.num_users,
        owner,
    }
}
