//! URL store implementations.
//!
//! - [`MemoryUrlStore`] - Lock-protected maps, optionally snapshotted to a JSON file
//! - [`PgUrlStore`] - PostgreSQL table with transactional batches
//!
//! Both honor the same invariants and error kinds; the backend is picked once
//! at startup from configuration (see [`crate::app::open_store`]).

pub mod memory_url_store;
pub mod pg_url_store;

pub use memory_url_store::MemoryUrlStore;
pub use pg_url_store::PgUrlStore;
