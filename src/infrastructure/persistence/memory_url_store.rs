//! In-process URL store with an optional JSON snapshot file.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entities::UrlRecord;
use crate::domain::repositories::{StoreError, UrlStore};

/// The three lookup structures kept in sync under one lock.
///
/// `by_code` owns every record, deleted or not. `by_url` only points at live
/// records so a deleted URL can be shortened again. `by_owner` keeps codes in
/// creation order.
#[derive(Debug, Default)]
struct Indices {
    by_code: HashMap<String, UrlRecord>,
    by_url: HashMap<String, String>,
    by_owner: HashMap<String, Vec<String>>,
}

impl Indices {
    fn from_records(records: Vec<UrlRecord>) -> Result<Self, StoreError> {
        let mut indices = Self::default();

        for record in records {
            if indices.by_code.contains_key(&record.short_code) {
                return Err(StoreError::Snapshot(format!(
                    "duplicate short code in snapshot: {}",
                    record.short_code
                )));
            }
            if record.is_live() && indices.by_url.contains_key(&record.original_url) {
                return Err(StoreError::Snapshot(format!(
                    "duplicate live url in snapshot: {}",
                    record.original_url
                )));
            }
            indices.insert(record);
        }

        Ok(indices)
    }

    fn insert(&mut self, record: UrlRecord) {
        if record.is_live() {
            self.by_url
                .insert(record.original_url.clone(), record.short_code.clone());
        }
        self.by_owner
            .entry(record.owner_id.clone())
            .or_default()
            .push(record.short_code.clone());
        self.by_code.insert(record.short_code.clone(), record);
    }

    /// Rejects the batch if any code is taken or any URL has a live record,
    /// including repeats inside the batch itself.
    fn check_batch(&self, records: &[UrlRecord]) -> Result<(), StoreError> {
        let mut codes = HashSet::with_capacity(records.len());
        let mut urls = HashSet::with_capacity(records.len());

        for record in records {
            if self.by_code.contains_key(&record.short_code)
                || !codes.insert(record.short_code.as_str())
            {
                return Err(StoreError::ShortIdConflict(record.short_code.clone()));
            }
            if self.by_url.contains_key(&record.original_url)
                || !urls.insert(record.original_url.as_str())
            {
                return Err(StoreError::UrlConflict(record.original_url.clone()));
            }
        }

        Ok(())
    }

    fn mark_deleted(&mut self, short_code: &str) {
        if let Some(record) = self.by_code.get_mut(short_code) {
            if record.deleted {
                return;
            }
            record.deleted = true;
            if self.by_url.get(&record.original_url).map(String::as_str) == Some(short_code) {
                self.by_url.remove(&record.original_url);
            }
        }
    }

    fn live(&self, short_code: &str) -> Option<&UrlRecord> {
        self.by_code.get(short_code).filter(|r| r.is_live())
    }

    /// Every record ordered by short code, so snapshots are stable.
    fn records(&self) -> Vec<UrlRecord> {
        let mut records: Vec<UrlRecord> = self.by_code.values().cloned().collect();
        records.sort_by(|a, b| a.short_code.cmp(&b.short_code));
        records
    }
}

/// Concurrent in-memory implementation of [`UrlStore`].
///
/// All three indices sit behind a single reader/writer lock. Mutations hold
/// the write lock across the conflict check, the snapshot write and the index
/// update, so readers never see a partially applied batch.
///
/// When a snapshot path is configured, every successful mutation rewrites the
/// whole file (temporary file + rename) before returning. The file is written
/// first; the in-memory indices change only if that succeeded.
///
/// Once the write lock is taken, the snapshot write and the index update run
/// on a spawned task. Dropping the caller's future does not stop it, so disk
/// and memory never disagree.
pub struct MemoryUrlStore {
    indices: Arc<RwLock<Indices>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryUrlStore {
    /// Creates a volatile store.
    pub fn new() -> Self {
        Self {
            indices: Arc::new(RwLock::new(Indices::default())),
            snapshot_path: None,
        }
    }

    /// Opens a store backed by a JSON snapshot.
    ///
    /// A missing file is created empty; an empty file is treated as no records.
    /// Deleted records are loaded too.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Snapshot`] if the file cannot be read, written or
    /// parsed, or if it breaks the uniqueness invariants.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = load_snapshot(&path).await?;
        let count = records.len();
        let indices = Indices::from_records(records)?;

        tracing::info!(path = %path.display(), records = count, "Snapshot loaded");

        Ok(Self {
            indices: Arc::new(RwLock::new(indices)),
            snapshot_path: Some(path),
        })
    }

    /// Opens a snapshot-backed store when a path is given, a volatile one otherwise.
    pub async fn with_snapshot(path: Option<PathBuf>) -> Result<Self, StoreError> {
        match path {
            Some(path) => Self::open(path).await,
            None => Ok(Self::new()),
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

impl Default for MemoryUrlStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlStore for MemoryUrlStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_urls(&self, records: &[UrlRecord]) -> Result<(), StoreError> {
        let mut indices = Arc::clone(&self.indices).write_owned().await;

        indices.check_batch(records)?;

        let records: Vec<UrlRecord> = records
            .iter()
            .cloned()
            .map(|mut r| {
                r.deleted = false;
                r
            })
            .collect();
        let snapshot_path = self.snapshot_path.clone();

        run_to_completion(async move {
            if let Some(path) = snapshot_path {
                let mut snapshot = indices.records();
                snapshot.extend(records.iter().cloned());
                write_snapshot(&path, &snapshot).await?;
            }

            let count = records.len();
            for record in records {
                indices.insert(record);
            }

            tracing::debug!(count, "Records created");
            Ok(())
        })
        .await
    }

    async fn delete_urls(&self, short_codes: &[String]) -> Result<(), StoreError> {
        let mut indices = Arc::clone(&self.indices).write_owned().await;

        let (found, missing): (Vec<String>, Vec<String>) = short_codes
            .iter()
            .cloned()
            .partition(|code| indices.by_code.contains_key(code.as_str()));
        let snapshot_path = self.snapshot_path.clone();

        run_to_completion(async move {
            if let Some(path) = snapshot_path
                && !found.is_empty()
            {
                let deleted: HashSet<&str> = found.iter().map(String::as_str).collect();
                let snapshot: Vec<UrlRecord> = indices
                    .records()
                    .into_iter()
                    .map(|mut r| {
                        if deleted.contains(r.short_code.as_str()) {
                            r.deleted = true;
                        }
                        r
                    })
                    .collect();
                write_snapshot(&path, &snapshot).await?;
            }

            for code in &found {
                indices.mark_deleted(code);
            }

            Ok(())
        })
        .await?;

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::NotFound(missing.join(", ")))
        }
    }

    async fn find_by_id(&self, short_code: &str) -> Result<UrlRecord, StoreError> {
        let indices = self.indices.read().await;

        indices
            .live(short_code)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(short_code.to_string()))
    }

    async fn find_by_url(&self, original_url: &str) -> Result<UrlRecord, StoreError> {
        let indices = self.indices.read().await;

        indices
            .by_url
            .get(original_url)
            .and_then(|code| indices.live(code))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(original_url.to_string()))
    }

    async fn find_by_user(&self, owner_id: &str) -> Result<Vec<UrlRecord>, StoreError> {
        let indices = self.indices.read().await;

        let records: Vec<UrlRecord> = indices
            .by_owner
            .get(owner_id)
            .into_iter()
            .flatten()
            .filter_map(|code| indices.live(code))
            .cloned()
            .collect();

        if records.is_empty() {
            return Err(StoreError::NotFound(owner_id.to_string()));
        }

        Ok(records)
    }

    async fn exists(&self, short_code: &str) -> Result<bool, StoreError> {
        Ok(self.indices.read().await.by_code.contains_key(short_code))
    }
}

/// Runs a mutation on its own task and waits for it.
async fn run_to_completion<F>(mutation: F) -> Result<(), StoreError>
where
    F: Future<Output = Result<(), StoreError>> + Send + 'static,
{
    tokio::spawn(mutation)
        .await
        .map_err(|e| StoreError::Snapshot(format!("store mutation aborted: {e}")))?
}

async fn load_snapshot(path: &Path) -> Result<Vec<UrlRecord>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Snapshot(format!("failed to parse {}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "Snapshot file not found, creating empty store");
            write_snapshot(path, &[]).await?;
            Ok(Vec::new())
        }
        Err(e) => Err(StoreError::Snapshot(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

async fn write_snapshot(path: &Path, records: &[UrlRecord]) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(records)
        .map_err(|e| StoreError::Snapshot(format!("failed to serialize snapshot: {e}")))?;

    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| StoreError::Snapshot(format!("failed to write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Snapshot(format!("failed to replace {}: {e}", path.display())))?;

    Ok(())
}
