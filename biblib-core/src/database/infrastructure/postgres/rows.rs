use biblib_model::{DocumentSet, Library, LibraryId, RoleFlags, UserId};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use crate::error::{LibraryError, Result};

pub(super) const LIBRARY_COLUMNS: &str = "l.id, l.name, l.description, l.public, l.bibcode, \
     l.date_created, l.date_last_modified, o.user_id AS owner_id";

pub(super) fn library_from_row(row: &PgRow) -> Result<Library> {
    let id: Uuid = row.try_get("id")?;
    let documents: Json<DocumentSet> = row.try_get("bibcode").map_err(|e| {
        LibraryError::Storage(format!("library {id} has unreadable documents: {e}"))
    })?;
    let created_at: DateTime<Utc> = row.try_get("date_created")?;
    let last_modified_at: DateTime<Utc> = row.try_get("date_last_modified")?;

    Ok(Library {
        id: LibraryId(id),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        public: row.try_get("public")?,
        owner_id: UserId(row.try_get("owner_id")?),
        created_at,
        last_modified_at,
        documents: documents.0,
    })
}

pub(super) fn flags_from_row(row: &PgRow) -> Result<RoleFlags> {
    Ok(RoleFlags {
        read: row.try_get("can_read")?,
        write: row.try_get("can_write")?,
        admin: row.try_get("is_admin")?,
        owner: row.try_get("is_owner")?,
    })
}
