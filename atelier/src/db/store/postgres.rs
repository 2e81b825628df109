//! PostgreSQL implementation of [`AtelierStore`] and [`DocumentStore`].
//!
//! Each entity kind lives in its own table (see `migrations/`), with the opaque body kept as
//! JSONB. Fan-out callers issue one statement per kind; every statement acquires its own
//! pooled connection, so the nine legs of a fan-out genuinely run concurrently.
//!
//! # Example
//! ```ignore
//! use atelier::db::store::PostgresStore;
//! use sqlx::PgPool;
//!
//! let pool = PgPool::connect("postgresql://localhost/atelier").await?;
//! atelier::migrator().run(&pool).await?;
//! let store = PostgresStore::new(pool);
//! ```

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use super::{AtelierStore, DocumentStore};
use crate::db::errors::{DbError, Result};
use crate::db::models::ateliers::{Atelier, AtelierCreateDBRequest, AtelierRow};
use crate::db::models::documents::{Document, DocumentInsert, EntityKind};
use crate::types::abbrev_id;

/// Rows per INSERT statement. Four binds per row keeps us well under the 65535 bind limit.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Document store backed by a Postgres pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AtelierStore for PostgresStore {
    #[instrument(skip(self, request), fields(manager_id = %abbrev_id(&request.manager_id)), err)]
    async fn create(&self, request: &AtelierCreateDBRequest) -> Result<Atelier> {
        let id = request.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let profile = &request.profile;

        let row = sqlx::query_as::<_, AtelierRow>(
            r#"
            INSERT INTO ateliers (
                storage_key, id, name, manager_id,
                subscription_status, subscription_plan, subscription_expires_at,
                manager_profile, manager_access_code, model_of_the_month_id, favorite_ids, is_new,
                legacy
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&id)
        .bind(&request.name)
        .bind(&request.manager_id)
        .bind(request.subscription.status.as_str())
        .bind(request.subscription.plan.as_str())
        .bind(request.subscription.expires_at)
        .bind(profile.manager_profile.as_ref().map(Json))
        .bind(profile.manager_access_code.as_deref())
        .bind(profile.model_of_the_month_id.as_ref().map(Json))
        .bind(profile.favorite_ids.as_ref().map(Json))
        .bind(profile.is_new.as_ref().map(Json))
        .bind(Json(&request.legacy))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[instrument(skip(self), fields(atelier_id = %abbrev_id(id)), err)]
    async fn find_by_external_id(&self, id: &str) -> Result<Option<Atelier>> {
        let row = sqlx::query_as::<_, AtelierRow>("SELECT * FROM ateliers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Atelier::try_from).transpose()
    }

    #[instrument(skip(self, atelier), fields(atelier_id = %abbrev_id(&atelier.id)), err)]
    async fn save(&self, atelier: &Atelier) -> Result<Atelier> {
        let profile = &atelier.profile;

        let row = sqlx::query_as::<_, AtelierRow>(
            r#"
            UPDATE ateliers
            SET
                name = $2,
                manager_id = $3,
                subscription_status = $4,
                subscription_plan = $5,
                subscription_expires_at = $6,
                manager_profile = $7,
                manager_access_code = $8,
                model_of_the_month_id = $9,
                favorite_ids = $10,
                is_new = $11,
                legacy = $12,
                updated_at = now()
            WHERE storage_key = $1
            RETURNING *
            "#,
        )
        .bind(atelier.storage_key)
        .bind(&atelier.name)
        .bind(&atelier.manager_id)
        .bind(atelier.subscription.status.as_str())
        .bind(atelier.subscription.plan.as_str())
        .bind(atelier.subscription.expires_at)
        .bind(profile.manager_profile.as_ref().map(Json))
        .bind(profile.manager_access_code.as_deref())
        .bind(profile.model_of_the_month_id.as_ref().map(Json))
        .bind(profile.favorite_ids.as_ref().map(Json))
        .bind(profile.is_new.as_ref().map(Json))
        .bind(Json(&atelier.legacy))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        row.try_into()
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    #[instrument(skip(self), fields(atelier_id = %abbrev_id(owner_id)), err)]
    async fn find_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<Vec<Document>> {
        let query = format!(
            "SELECT body FROM {} WHERE atelier_id = $1 ORDER BY created_at DESC, seq DESC",
            kind.table_name()
        );

        let bodies = sqlx::query_scalar::<_, Json<Document>>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(bodies.into_iter().map(|Json(body)| body).collect())
    }

    #[instrument(skip(self), fields(atelier_id = %abbrev_id(owner_id)), err)]
    async fn delete_by_owner(&self, kind: EntityKind, owner_id: &str) -> Result<u64> {
        let query = format!("DELETE FROM {} WHERE atelier_id = $1", kind.table_name());

        let result = sqlx::query(&query).bind(owner_id).execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    /// Inserts all chunks inside one transaction, so a kind is either fully written or
    /// left empty.
    #[instrument(skip(self, documents), fields(count = documents.len()), err)]
    async fn insert_many(&self, kind: EntityKind, documents: Vec<DocumentInsert>) -> Result<u64> {
        if documents.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in documents.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} (id, atelier_id, body, created_at) ", kind.table_name()));

            builder.push_values(chunk, |mut row, document| {
                row.push_bind(&document.id)
                    .push_bind(&document.owner_id)
                    .push_bind(Json(&document.body))
                    .push_bind(document.created_at);
            });

            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}
