//! Application wiring: store selection, deletion queue and service construction.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use crate::application::services::{ShortenService, ShortenSettings};
use crate::config::Config;
use crate::domain::deletion_queue::DeletionQueue;
use crate::domain::repositories::UrlStore;
use crate::infrastructure::persistence::{MemoryUrlStore, PgUrlStore};
use crate::utils::code_generator::RandomCodeProvider;

/// Service type used by the binary.
pub type DefaultShortenService = ShortenService<dyn UrlStore, RandomCodeProvider>;

/// Opens the store selected by the configuration.
///
/// - PostgreSQL when a database URL is configured; migrations are applied
/// - a snapshot-backed map when `FILE_STORAGE_PATH` is set
/// - a volatile map otherwise
///
/// # Errors
///
/// Returns an error if the database is unreachable, migrations fail or the
/// snapshot file cannot be read.
pub async fn open_store(config: &Config) -> Result<Arc<dyn UrlStore>> {
    if let Some(database_url) = &config.database_url {
        if let Some(path) = &config.file_storage_path {
            tracing::warn!(
                path = %path.display(),
                "FILE_STORAGE_PATH is ignored when a database is configured"
            );
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime))
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        tracing::info!("Connected to database");

        let store = PgUrlStore::new(Arc::new(pool));
        store.migrate().await.context("Failed to migrate")?;

        return Ok(Arc::new(store));
    }

    let store = MemoryUrlStore::with_snapshot(config.file_storage_path.clone())
        .await
        .context("Failed to open file storage")?;
    match store.snapshot_path() {
        Some(path) => tracing::info!(path = %path.display(), "Using file storage"),
        None => tracing::info!("Using volatile in-memory storage"),
    }

    Ok(Arc::new(store))
}

/// Running service plus the handle needed to shut it down.
pub struct AppContext {
    pub service: Arc<DefaultShortenService>,
    pub deletion_queue: Arc<DeletionQueue>,
}

impl AppContext {
    /// Opens the store, starts the deletion workers and builds the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub async fn build(config: &Config) -> Result<Self> {
        let store = open_store(config).await?;
        Ok(Self::with_store(config, store))
    }

    /// Same as [`Self::build`] over an already opened store.
    pub fn with_store(config: &Config, store: Arc<dyn UrlStore>) -> Self {
        let deletion_queue = Arc::new(DeletionQueue::start(
            Arc::clone(&store),
            config.delete_workers,
            config.delete_queue_capacity,
        ));

        let service = Arc::new(ShortenService::new(
            store,
            RandomCodeProvider,
            Arc::clone(&deletion_queue),
            ShortenSettings::new(config.base_url.clone(), config.short_code_length),
        ));

        Self {
            service,
            deletion_queue,
        }
    }

    /// Stops accepting deletions and waits for queued ones to be applied.
    pub async fn shutdown(&self) {
        self.deletion_queue.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deletion_queue::QueueState;

    #[tokio::test]
    async fn test_build_defaults_to_volatile_store() {
        let context = AppContext::build(&Config::default()).await.unwrap();

        context.service.ping().await.unwrap();
        assert_eq!(context.deletion_queue.capacity(), 1000);

        context.shutdown().await;
        assert_eq!(context.deletion_queue.state(), QueueState::Stopped);
    }

    #[tokio::test]
    async fn test_build_with_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.json");
        let config = Config {
            file_storage_path: Some(path.clone()),
            ..Config::default()
        };

        let context = AppContext::build(&config).await.unwrap();
        context.shutdown().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_shutdown_closes_deletions() {
        let context = AppContext::build(&Config::default()).await.unwrap();
        context.shutdown().await;

        assert!(
            context
                .service
                .delete_user_urls("u1", vec!["abc".to_string()])
                .is_err()
        );
    }
}
