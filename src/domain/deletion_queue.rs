//! Bounded deletion queue drained by a fixed pool of background workers.
//!
//! Enqueueing never waits: a full queue is rejected with
//! [`QueueError::Full`], which is the only backpressure signal of the
//! service. Workers apply each task with [`UrlStore::delete_urls`] and only
//! log failures.
//!
//! # Lifecycle
//!
//! `Running` → `Draining` (after [`DeletionQueue::stop`] closed the queue) →
//! `Stopped` (every worker has exited). Enqueueing outside `Running` fails
//! with [`QueueError::Closed`].

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::domain::deletion_task::DeletionTask;
use crate::domain::repositories::UrlStore;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("delete queue is full")]
    Full,
    #[error("delete queue is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Running,
    Draining,
    Stopped,
}

struct Inner {
    sender: Option<mpsc::Sender<DeletionTask>>,
    state: QueueState,
}

/// Bounded work queue plus worker pool for soft deletes.
pub struct DeletionQueue {
    inner: RwLock<Inner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
}

impl DeletionQueue {
    /// Creates the queue and spawns `worker_count` workers on the current
    /// Tokio runtime.
    ///
    /// `worker_count` and `queue_capacity` are clamped to at least 1.
    pub fn start<S>(store: Arc<S>, worker_count: usize, queue_capacity: usize) -> Self
    where
        S: UrlStore + ?Sized + 'static,
    {
        let worker_count = worker_count.max(1);
        let capacity = queue_capacity.max(1);

        let (tx, rx) = mpsc::channel(capacity);
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_deletion_worker(
                    worker_id,
                    Arc::clone(&rx),
                    Arc::clone(&store),
                ))
            })
            .collect();

        tracing::info!(worker_count, capacity, "Deletion queue started");

        Self {
            inner: RwLock::new(Inner {
                sender: Some(tx),
                state: QueueState::Running,
            }),
            workers: Mutex::new(workers),
            capacity,
        }
    }

    /// Hands a task to the workers without waiting.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Full`] if `queue_capacity` tasks are already waiting
    /// - [`QueueError::Closed`] once [`Self::stop`] has been called
    pub fn enqueue(&self, task: DeletionTask) -> Result<(), QueueError> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = inner.sender.as_ref() else {
            return Err(QueueError::Closed);
        };

        sender.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(task) => {
                metrics::counter!("shortener_delete_tasks_rejected_total").increment(1);
                tracing::error!(
                    owner_id = %task.owner_id,
                    codes = task.short_codes.len(),
                    "Delete queue is full"
                );
                QueueError::Full
            }
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Closes the queue and waits until every accepted task has been applied.
    ///
    /// Calling it again after the queue has stopped returns immediately.
    pub async fn stop(&self) {
        {
            let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
            if inner.state == QueueState::Running {
                inner.state = QueueState::Draining;
            }
            // Workers see the end of the channel once the buffer is drained.
            inner.sender.take();
        }

        // Held across the joins so a concurrent caller also waits for the drain.
        let mut workers = self.workers.lock().await;
        if !workers.is_empty() {
            tracing::info!(workers = workers.len(), "Draining deletion queue");
        }

        for handle in workers.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Deletion worker terminated abnormally");
            }
        }
        drop(workers);

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.state != QueueState::Stopped {
            inner.state = QueueState::Stopped;
            tracing::info!("Deletion queue stopped");
        }
    }

    pub fn state(&self) -> QueueState {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).state
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

async fn run_deletion_worker<S>(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<DeletionTask>>>,
    store: Arc<S>,
) where
    S: UrlStore + ?Sized,
{
    loop {
        // The receiver lock is released as soon as a task is taken, so the
        // other workers can pick up the next one while this one runs.
        let task = { rx.lock().await.recv().await };
        let Some(task) = task else {
            break;
        };

        match store.delete_urls(&task.short_codes).await {
            Ok(()) => {
                metrics::counter!("shortener_urls_deleted_total")
                    .increment(task.short_codes.len() as u64);
                tracing::debug!(
                    worker_id,
                    owner_id = %task.owner_id,
                    codes = task.short_codes.len(),
                    "Deletion task applied"
                );
            }
            Err(e) => {
                metrics::counter!("shortener_delete_tasks_failed_total").increment(1);
                tracing::warn!(
                    worker_id,
                    owner_id = %task.owner_id,
                    error = %e,
                    "Deletion task failed"
                );
            }
        }
    }

    tracing::debug!(worker_id, "Deletion worker exited");
}
