#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use url_shortener_core::application::services::{RetryPolicy, ShortenService, ShortenSettings};
use url_shortener_core::domain::deletion_queue::DeletionQueue;
use url_shortener_core::domain::entities::UrlRecord;
use url_shortener_core::domain::repositories::{StoreError, UrlStore};
use url_shortener_core::infrastructure::persistence::MemoryUrlStore;
use url_shortener_core::utils::code_generator::{CodeProvider, RandomCodeProvider};

pub const BASE_URL: &str = "http://localhost:8080";

pub fn record(code: &str, url: &str, owner: &str) -> UrlRecord {
    UrlRecord::new(code, url, owner)
}

/// Hands out scripted codes first, then random ones.
pub struct ScriptedCodes {
    codes: Mutex<VecDeque<String>>,
}

impl ScriptedCodes {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
        }
    }
}

impl CodeProvider for ScriptedCodes {
    fn get(&self, length: usize) -> String {
        self.codes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomCodeProvider.get(length))
    }
}

/// Memory store whose deletes wait for a permit, for holding workers busy.
pub struct GatedStore {
    pub inner: MemoryUrlStore,
    pub gate: Semaphore,
}

impl GatedStore {
    pub fn closed() -> Self {
        Self {
            inner: MemoryUrlStore::new(),
            gate: Semaphore::new(0),
        }
    }

    pub fn open_gate(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

#[async_trait]
impl UrlStore for GatedStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn create_urls(&self, records: &[UrlRecord]) -> Result<(), StoreError> {
        self.inner.create_urls(records).await
    }

    async fn delete_urls(&self, short_codes: &[String]) -> Result<(), StoreError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        permit.forget();
        self.inner.delete_urls(short_codes).await
    }

    async fn find_by_id(&self, short_code: &str) -> Result<UrlRecord, StoreError> {
        self.inner.find_by_id(short_code).await
    }

    async fn find_by_url(&self, original_url: &str) -> Result<UrlRecord, StoreError> {
        self.inner.find_by_url(original_url).await
    }

    async fn find_by_user(&self, owner_id: &str) -> Result<Vec<UrlRecord>, StoreError> {
        self.inner.find_by_user(owner_id).await
    }

    async fn exists(&self, short_code: &str) -> Result<bool, StoreError> {
        self.inner.exists(short_code).await
    }
}

pub fn settings() -> ShortenSettings {
    ShortenSettings::new(BASE_URL, 8).with_retry(RetryPolicy::immediate(10))
}

/// Service over `store` with its own deletion queue.
pub fn create_service<S, P>(
    store: Arc<S>,
    codes: P,
) -> (ShortenService<S, P>, Arc<DeletionQueue>)
where
    S: UrlStore + 'static,
    P: CodeProvider,
{
    let queue = Arc::new(DeletionQueue::start(Arc::clone(&store), 2, 16));
    let service = ShortenService::new(store, codes, Arc::clone(&queue), settings());

    (service, queue)
}
