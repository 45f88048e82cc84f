//! Translation of sqlx errors into [`StoreError`] kinds.

use crate::domain::entities::UrlRecord;
use crate::domain::repositories::StoreError;

/// Primary key of the `urls` table.
pub const SHORT_CODE_CONSTRAINT: &str = "urls_pkey";

/// Partial unique index on `original_url` for live rows.
pub const LIVE_URL_CONSTRAINT: &str = "urls_original_url_live_idx";

/// Returns the violated constraint name if `e` is a unique violation.
pub fn unique_violation_constraint(e: &sqlx::Error) -> Option<&str> {
    let db_err = e.as_database_error()?;

    if !db_err.is_unique_violation() {
        return None;
    }

    db_err.constraint()
}

pub fn is_unique_violation_on_code(e: &sqlx::Error) -> bool {
    matches!(unique_violation_constraint(e), Some(SHORT_CODE_CONSTRAINT))
}

pub fn is_unique_violation_on_url(e: &sqlx::Error) -> bool {
    matches!(unique_violation_constraint(e), Some(LIVE_URL_CONSTRAINT))
}

/// Maps an error raised while inserting `record`.
pub fn map_insert_error(e: sqlx::Error, record: &UrlRecord) -> StoreError {
    if is_unique_violation_on_code(&e) {
        return StoreError::ShortIdConflict(record.short_code.clone());
    }

    if is_unique_violation_on_url(&e) {
        return StoreError::UrlConflict(record.original_url.clone());
    }

    map_sqlx_error(e)
}

/// Maps a generic sqlx error. Connection-level failures become
/// [`StoreError::Unavailable`].
pub fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
        other => {
            tracing::error!(error = %other, "Database error");
            StoreError::Database(other.to_string())
        }
    }
}
