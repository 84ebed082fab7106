use std::fmt;

use async_trait::async_trait;
use biblib_model::{
    AbsoluteUid, DocumentSet, Library, LibraryId, Permission, RoleFlags, User,
    UserId,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;

use super::rows::{LIBRARY_COLUMNS, flags_from_row, library_from_row};
use crate::database::ports::{
    libraries::LibraryRepository, permissions::PermissionStore,
    store::{LibraryStore, StoreTransaction},
    users::UserRepository,
};
use crate::error::{LibraryError, Result};

/// PostgreSQL-backed library store.
#[derive(Clone, Debug)]
pub struct PostgresLibraryStore {
    pool: PgPool,
}

impl PostgresLibraryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| {
                LibraryError::Storage(format!("Failed to connect to database: {e}"))
            })?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        crate::MIGRATOR
            .run(self.pool())
            .await
            .map_err(|e| LibraryError::Storage(format!("Migration failed: {e}")))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LibraryStore for PostgresLibraryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool().begin().await.map_err(|e| {
            LibraryError::Storage(format!("Failed to begin transaction: {e}"))
        })?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// One open database transaction. Rolled back on drop unless committed.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl fmt::Debug for PostgresTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl LibraryRepository for PostgresTransaction {
    async fn get_library(&mut self, id: LibraryId) -> Result<Option<Library>> {
        let query = format!(
            "SELECT {LIBRARY_COLUMNS}
             FROM libraries l
             JOIN permissions o ON o.library_id = l.id AND o.is_owner
             WHERE l.id = $1"
        );
        let row = sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| {
                LibraryError::Storage(format!("Failed to load library {id}: {e}"))
            })?;

        row.as_ref().map(library_from_row).transpose()
    }

    async fn insert_library(&mut self, library: &Library) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO libraries
                (id, name, description, public, bibcode, date_created, date_last_modified)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(library.id.to_uuid())
        .bind(&library.name)
        .bind(&library.description)
        .bind(library.public)
        .bind(Json(&library.documents))
        .bind(library.created_at)
        .bind(library.last_modified_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            LibraryError::Storage(format!("Failed to create library: {e}"))
        })?;
        Ok(())
    }

    async fn replace_documents(
        &mut self,
        id: LibraryId,
        documents: &DocumentSet,
        modified_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE libraries SET bibcode = $2, date_last_modified = $3 WHERE id = $1",
        )
        .bind(id.to_uuid())
        .bind(Json(documents))
        .bind(modified_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            LibraryError::Storage(format!("Failed to update documents: {e}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::LibraryNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn libraries_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<(Library, Permission)>> {
        let query = format!(
            "SELECT {LIBRARY_COLUMNS}, p.can_read, p.can_write, p.is_admin, p.is_owner
             FROM permissions p
             JOIN libraries l ON l.id = p.library_id
             JOIN permissions o ON o.library_id = l.id AND o.is_owner
             WHERE p.user_id = $1
             ORDER BY l.name, l.id"
        );
        let rows = sqlx::query(&query)
            .bind(user_id.0)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| {
                LibraryError::Storage(format!("Failed to list libraries: {e}"))
            })?;

        rows.iter()
            .map(|row| {
                let library = library_from_row(row)?;
                let permission = Permission {
                    user_id,
                    library_id: library.id,
                    flags: flags_from_row(row)?,
                };
                Ok((library, permission))
            })
            .collect()
    }

    async fn owner_has_library_named(
        &mut self,
        owner: UserId,
        name: &str,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM libraries l
                JOIN permissions o ON o.library_id = l.id AND o.is_owner
                WHERE o.user_id = $1 AND l.name = $2
            ) AS taken
            "#,
        )
        .bind(owner.0)
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.try_get("taken")?)
    }
}

#[async_trait]
impl PermissionStore for PostgresTransaction {
    async fn get_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
    ) -> Result<Option<Permission>> {
        let row = sqlx::query(
            r#"
            SELECT can_read, can_write, is_admin, is_owner
            FROM permissions
            WHERE user_id = $1 AND library_id = $2
            "#,
        )
        .bind(user_id.0)
        .bind(library_id.to_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|row| {
            Ok(Permission {
                user_id,
                library_id,
                flags: flags_from_row(&row)?,
            })
        })
        .transpose()
    }

    async fn set_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
        flags: RoleFlags,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO permissions
                (user_id, library_id, can_read, can_write, is_admin, is_owner)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, library_id) DO UPDATE SET
                can_read = EXCLUDED.can_read,
                can_write = EXCLUDED.can_write,
                is_admin = EXCLUDED.is_admin,
                is_owner = EXCLUDED.is_owner
            "#,
        )
        .bind(user_id.0)
        .bind(library_id.to_uuid())
        .bind(flags.read)
        .bind(flags.write)
        .bind(flags.admin)
        .bind(flags.owner)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            LibraryError::Storage(format!("Failed to store permission: {e}"))
        })?;
        Ok(())
    }

    async fn delete_permission(
        &mut self,
        user_id: UserId,
        library_id: LibraryId,
    ) -> Result<()> {
        sqlx::query("DELETE FROM permissions WHERE user_id = $1 AND library_id = $2")
            .bind(user_id.0)
            .bind(library_id.to_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn permissions_for_library(
        &mut self,
        library_id: LibraryId,
    ) -> Result<Vec<Permission>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, can_read, can_write, is_admin, is_owner
            FROM permissions
            WHERE library_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(library_id.to_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Permission {
                    user_id: UserId(row.try_get("user_id")?),
                    library_id,
                    flags: flags_from_row(row)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UserRepository for PostgresTransaction {
    async fn user_by_absolute_uid(
        &mut self,
        absolute_uid: AbsoluteUid,
    ) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id FROM users WHERE absolute_uid = $1")
            .bind(absolute_uid.0)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(|row| {
            Ok(User {
                id: UserId(row.try_get("id")?),
                absolute_uid,
            })
        })
        .transpose()
    }

    async fn user_by_id(&mut self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT absolute_uid FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(|row| {
            Ok(User {
                id,
                absolute_uid: AbsoluteUid(row.try_get("absolute_uid")?),
            })
        })
        .transpose()
    }

    async fn create_user(&mut self, absolute_uid: AbsoluteUid) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (absolute_uid) VALUES ($1) RETURNING id",
        )
        .bind(absolute_uid.0)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| LibraryError::Storage(format!("Failed to create user: {e}")))?;

        Ok(User {
            id: UserId(row.try_get("id")?),
            absolute_uid,
        })
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let PostgresTransaction { tx } = *self;
        tx.commit().await.map_err(|e| {
            LibraryError::Storage(format!("Failed to commit transaction: {e}"))
        })
    }
}
