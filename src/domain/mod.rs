//! Domain layer containing business entities and logic.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`deletion_task`] - Deletion request model
//! - [`deletion_queue`] - Bounded queue and worker pool applying soft deletes
//!
//! # Deletion Flow
//!
//! 1. The service receives a delete request for a user
//! 2. A [`deletion_task::DeletionTask`] is pushed to the queue (non-blocking)
//! 3. A worker picks it up and calls [`repositories::UrlStore::delete_urls`]
//! 4. Failures are logged and dropped; the client may repeat the request

pub mod deletion_queue;
pub mod deletion_task;
pub mod entities;
pub mod repositories;
