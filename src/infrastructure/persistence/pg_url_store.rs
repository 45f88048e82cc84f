//! PostgreSQL implementation of the URL store.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entities::UrlRecord;
use crate::domain::repositories::{StoreError, UrlStore};
use crate::utils::db_error::{map_insert_error, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UrlRow {
    short_code: String,
    original_url: String,
    owner_id: String,
    is_deleted: bool,
}

impl From<UrlRow> for UrlRecord {
    fn from(row: UrlRow) -> Self {
        Self {
            short_code: row.short_code,
            original_url: row.original_url,
            owner_id: row.owner_id,
            deleted: row.is_deleted,
        }
    }
}

/// PostgreSQL repository for URL records.
///
/// Atomicity comes from the database: each `create_urls` / `delete_urls`
/// call runs in one transaction, and collisions surface as unique
/// violations on `urls_pkey` or `urls_original_url_live_idx`. Dropping a
/// call's future rolls its transaction back.
pub struct PgUrlStore {
    pool: Arc<PgPool>,
}

impl PgUrlStore {
    /// Creates a new store with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl UrlStore for PgUrlStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }

    async fn create_urls(&self, records: &[UrlRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO urls (short_code, original_url, owner_id)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&record.short_code)
            .bind(&record.original_url)
            .bind(&record.owner_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, record))?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_urls(&self, short_codes: &[String]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let deleted: Vec<String> = sqlx::query_scalar(
            r#"
            UPDATE urls
            SET is_deleted = TRUE
            WHERE short_code = ANY($1)
            RETURNING short_code
            "#,
        )
        .bind(short_codes)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        let deleted: HashSet<&str> = deleted.iter().map(String::as_str).collect();
        let missing: Vec<&str> = short_codes
            .iter()
            .map(String::as_str)
            .filter(|code| !deleted.contains(code))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::NotFound(missing.join(", ")))
        }
    }

    async fn find_by_id(&self, short_code: &str) -> Result<UrlRecord, StoreError> {
        sqlx::query_as::<_, UrlRow>(
            r#"
            SELECT short_code, original_url, owner_id, is_deleted
            FROM urls
            WHERE short_code = $1 AND NOT is_deleted
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?
        .map(UrlRecord::from)
        .ok_or_else(|| StoreError::NotFound(short_code.to_string()))
    }

    async fn find_by_url(&self, original_url: &str) -> Result<UrlRecord, StoreError> {
        sqlx::query_as::<_, UrlRow>(
            r#"
            SELECT short_code, original_url, owner_id, is_deleted
            FROM urls
            WHERE original_url = $1 AND NOT is_deleted
            "#,
        )
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?
        .map(UrlRecord::from)
        .ok_or_else(|| StoreError::NotFound(original_url.to_string()))
    }

    async fn find_by_user(&self, owner_id: &str) -> Result<Vec<UrlRecord>, StoreError> {
        let rows = sqlx::query_as::<_, UrlRow>(
            r#"
            SELECT short_code, original_url, owner_id, is_deleted
            FROM urls
            WHERE owner_id = $1 AND NOT is_deleted
            ORDER BY seq
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        if rows.is_empty() {
            return Err(StoreError::NotFound(owner_id.to_string()));
        }

        Ok(rows.into_iter().map(UrlRecord::from).collect())
    }

    async fn exists(&self, short_code: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM urls WHERE short_code = $1)")
            .bind(short_code)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(map_sqlx_error)
    }
}
