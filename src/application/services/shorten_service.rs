//! Short URL allocation, resolution and deletion service.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::domain::deletion_queue::DeletionQueue;
use crate::domain::deletion_task::DeletionTask;
use crate::domain::entities::{UrlRecord, UserUrl};
use crate::domain::repositories::{StoreError, UrlStore};
use crate::error::AppError;
use crate::utils::code_generator::CodeProvider;
use crate::utils::short_url::{build_short_url, normalize_long_url};

/// Create attempts for one URL whose conflicting record keeps disappearing.
pub const URL_CONFLICT_ROUNDS: usize = 2;

/// Bounds of the collision retry loop.
///
/// The delay between attempts grows exponentially from `base_delay` and is
/// capped at `max_delay`, with jitter. No lock is held while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Retries without waiting between attempts.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delays applied before attempts 2..=max_attempts.
    fn backoff(&self) -> impl Iterator<Item = Duration> + use<> {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);

        ExponentialBackoff::from_millis(base_ms)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        }
    }
}

/// Construction parameters of [`ShortenService`].
#[derive(Debug, Clone)]
pub struct ShortenSettings {
    /// Prefix of every short URL, e.g. `https://s.example.com`.
    pub base_url: String,
    pub code_length: usize,
    pub retry: RetryPolicy,
}

impl ShortenSettings {
    pub fn new(base_url: impl Into<String>, code_length: usize) -> Self {
        Self {
            base_url: base_url.into(),
            code_length,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Outcome of shortening a single URL.
///
/// Both variants carry a usable short URL. `Existing` means the URL already
/// had a live code (possibly created by another user or a concurrent
/// request) and that code is returned instead of a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortened {
    Created(String),
    Existing(String),
}

impl Shortened {
    pub fn short_url(&self) -> &str {
        match self {
            Shortened::Created(url) | Shortened::Existing(url) => url,
        }
    }

    pub fn into_short_url(self) -> String {
        match self {
            Shortened::Created(url) | Shortened::Existing(url) => url,
        }
    }

    /// True when the URL was shortened before this call.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Shortened::Existing(_))
    }

    /// `201 Created` for fresh codes, `409 Conflict` for existing ones.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Shortened::Created(_) => StatusCode::CREATED,
            Shortened::Existing(_) => StatusCode::CONFLICT,
        }
    }
}

/// Service for creating, resolving, listing and deleting short URLs.
///
/// Codes come from a [`CodeProvider`]; when the store reports a code
/// collision the whole batch is retried with fresh codes, up to
/// [`RetryPolicy::max_attempts`] times. Deletions are handed to a
/// [`DeletionQueue`] and applied in the background.
pub struct ShortenService<S: UrlStore + ?Sized, P: CodeProvider> {
    store: Arc<S>,
    code_provider: P,
    deletion_queue: Arc<DeletionQueue>,
    settings: ShortenSettings,
}

impl<S: UrlStore + ?Sized, P: CodeProvider> ShortenService<S, P> {
    /// Creates a new shortening service.
    pub fn new(
        store: Arc<S>,
        code_provider: P,
        deletion_queue: Arc<DeletionQueue>,
        settings: ShortenSettings,
    ) -> Self {
        Self {
            store,
            code_provider,
            deletion_queue,
            settings,
        }
    }

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StorageUnavailable`] when it is not.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.store.ping().await.map_err(|e| match e {
            StoreError::Unavailable(reason) => AppError::StorageUnavailable { reason },
            other => AppError::StorageUnavailable {
                reason: other.to_string(),
            },
        })
    }

    /// Shortens one URL for `owner_id`.
    ///
    /// The URL is stored in its canonical form. If it already has a live
    /// code, that code's short URL is returned as [`Shortened::Existing`]
    /// instead of failing. When the conflicting record is deleted before it
    /// can be read back, allocation starts over.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidUrl`] if the URL is not an absolute http(s) URL
    /// - [`AppError::ShortIdConflict`] if every attempt collided
    /// - [`AppError::UrlConflict`] if the URL kept flipping between live and
    ///   deleted for [`URL_CONFLICT_ROUNDS`] rounds
    #[tracing::instrument(skip(self))]
    pub async fn get_short_url(&self, url: &str, owner_id: &str) -> Result<Shortened, AppError> {
        let normalized =
            normalize_long_url(url).map_err(|reason| AppError::invalid_url(url, reason))?;
        let urls = [normalized];

        for _ in 0..URL_CONFLICT_ROUNDS {
            match self.allocate(&urls, owner_id).await {
                Ok(records) => {
                    let record = records
                        .into_iter()
                        .next()
                        .ok_or_else(|| AppError::internal("store accepted an empty batch"))?;
                    return Ok(Shortened::Created(self.short_url(&record.short_code)));
                }
                Err(StoreError::UrlConflict(_)) => match self.store.find_by_url(&urls[0]).await {
                    Ok(existing) => {
                        tracing::debug!(short_code = %existing.short_code, "URL already shortened");
                        return Ok(Shortened::Existing(self.short_url(&existing.short_code)));
                    }
                    Err(StoreError::NotFound(_)) => {
                        tracing::debug!("Conflicting record deleted, allocating again");
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) => return Err(e.into()),
            }
        }

        let [url] = urls;
        Err(AppError::UrlConflict { url })
    }

    /// Shortens several URLs as one atomic batch.
    ///
    /// Short URLs are returned in input order. A collision on any element
    /// retries the whole batch with fresh codes.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidUrl`] if the batch is empty or any URL is invalid
    /// - [`AppError::UrlConflict`] if any URL already has a live code
    /// - [`AppError::ShortIdConflict`] if every attempt collided
    #[tracing::instrument(skip(self, urls), fields(count = urls.len()))]
    pub async fn get_short_url_batch(
        &self,
        urls: &[String],
        owner_id: &str,
    ) -> Result<Vec<String>, AppError> {
        if urls.is_empty() {
            return Err(AppError::invalid_url("", "batch is empty"));
        }
        let urls = urls
            .iter()
            .map(|url| normalize_long_url(url).map_err(|reason| AppError::invalid_url(url, reason)))
            .collect::<Result<Vec<_>, _>>()?;

        let records = self.allocate(&urls, owner_id).await?;

        Ok(records
            .iter()
            .map(|record| self.short_url(&record.short_code))
            .collect())
    }

    /// Resolves a short code to its original URL.
    ///
    /// # Errors
    ///
    /// - [`AppError::Gone`] if the code exists but was deleted
    /// - [`AppError::NotFound`] if the code never existed
    #[tracing::instrument(skip(self))]
    pub async fn get_original_url(&self, short_code: &str) -> Result<String, AppError> {
        match self.store.find_by_id(short_code).await {
            Ok(record) => Ok(record.original_url),
            Err(StoreError::NotFound(_)) => {
                if !self.store.exists(short_code).await? {
                    return Err(AppError::not_found(short_code));
                }
                // The code may have been created after the first lookup.
                match self.store.find_by_id(short_code).await {
                    Ok(record) => Ok(record.original_url),
                    Err(StoreError::NotFound(_)) => Err(AppError::Gone {
                        code: short_code.to_string(),
                    }),
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the live short URLs of a user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the user has no live URLs.
    pub async fn get_user_urls(&self, owner_id: &str) -> Result<Vec<UserUrl>, AppError> {
        let records = self.store.find_by_user(owner_id).await?;

        Ok(records
            .into_iter()
            .map(|record| UserUrl {
                short_url: self.short_url(&record.short_code),
                original_url: record.original_url,
            })
            .collect())
    }

    /// Schedules soft deletion of a user's codes and returns immediately.
    ///
    /// Success only means the task was queued.
    ///
    /// # Errors
    ///
    /// - [`AppError::QueueFull`] if the deletion queue is at capacity
    /// - [`AppError::QueueClosed`] after shutdown
    pub fn delete_user_urls(&self, owner_id: &str, short_codes: Vec<String>) -> Result<(), AppError> {
        if short_codes.is_empty() {
            return Ok(());
        }

        self.deletion_queue
            .enqueue(DeletionTask::new(owner_id, short_codes))?;

        Ok(())
    }

    pub fn settings(&self) -> &ShortenSettings {
        &self.settings
    }

    fn short_url(&self, short_code: &str) -> String {
        build_short_url(&self.settings.base_url, short_code)
    }

    /// Runs the collision retry loop and returns the stored records.
    ///
    /// Only [`StoreError::ShortIdConflict`] is retried; any other error, and
    /// the last collision once attempts run out, is returned as is.
    async fn allocate(&self, urls: &[String], owner_id: &str) -> Result<Vec<UrlRecord>, StoreError> {
        let mut attempt = 0usize;

        RetryIf::start(
            self.settings.retry.backoff(),
            move || {
                attempt += 1;
                self.create_batch(urls, owner_id, attempt)
            },
            |e: &StoreError| {
                let collided = matches!(e, StoreError::ShortIdConflict(_));
                if collided {
                    metrics::counter!("shortener_code_collisions_total").increment(1);
                }
                collided
            },
        )
        .await
    }

    async fn create_batch(
        &self,
        urls: &[String],
        owner_id: &str,
        attempt: usize,
    ) -> Result<Vec<UrlRecord>, StoreError> {
        let records: Vec<UrlRecord> = urls
            .iter()
            .map(|url| {
                UrlRecord::new(
                    self.code_provider.get(self.settings.code_length),
                    url.as_str(),
                    owner_id,
                )
            })
            .collect();

        match self.store.create_urls(&records).await {
            Ok(()) => {
                metrics::counter!("shortener_urls_created_total").increment(records.len() as u64);
                Ok(records)
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "Create attempt failed");
                Err(e)
            }
        }
    }
}
