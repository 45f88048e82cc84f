//! Storage contract for URL records.

use crate::domain::entities::UrlRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by [`UrlStore`] implementations.
///
/// Both backends translate their failures into these kinds so callers never
/// need to know which medium is behind the trait.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A short code in the batch is already taken. Retryable with a fresh code.
    #[error("short code already exists: {0}")]
    ShortIdConflict(String),

    /// A URL in the batch already has a live short code.
    #[error("url already exists: {0}")]
    UrlConflict(String),

    /// No live record matches the key. For batch deletes the payload lists
    /// every code that was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage medium cannot be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The snapshot file could not be read, parsed or written.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Repository interface for URL records.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryUrlStore`] - Lock-protected maps with optional JSON snapshot
/// - [`crate::infrastructure::persistence::PgUrlStore`] - PostgreSQL table
/// - Test mocks available with `cfg(test)`
///
/// # Invariants
///
/// Among live records both `short_code` and `original_url` are unique.
/// A deleted record is hidden from `find_*` but still counts for [`UrlStore::exists`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlStore: Send + Sync {
    /// Checks that the underlying medium is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when it is not.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Inserts a batch of records as one atomic unit.
    ///
    /// Either every record becomes visible or none does.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShortIdConflict`] if a code is already stored (live or deleted)
    ///   or repeats within the batch
    /// - [`StoreError::UrlConflict`] if a URL already has a live record or repeats
    ///   within the batch
    async fn create_urls(&self, records: &[UrlRecord]) -> Result<(), StoreError>;

    /// Soft-deletes every record whose code is listed.
    ///
    /// Unknown codes do not stop the rest of the batch from being applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] naming the unknown codes after the
    /// known ones have been deleted.
    async fn delete_urls(&self, short_codes: &[String]) -> Result<(), StoreError>;

    /// Finds the live record for a short code.
    async fn find_by_id(&self, short_code: &str) -> Result<UrlRecord, StoreError>;

    /// Finds the live record for an original URL.
    async fn find_by_url(&self, original_url: &str) -> Result<UrlRecord, StoreError>;

    /// Lists the live records of an owner.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the owner has no live records,
    /// including when all of them are deleted.
    async fn find_by_user(&self, owner_id: &str) -> Result<Vec<UrlRecord>, StoreError>;

    /// Returns true if the code was ever stored, deleted or not.
    async fn exists(&self, short_code: &str) -> Result<bool, StoreError>;
}
