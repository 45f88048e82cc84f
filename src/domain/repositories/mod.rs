//! Repository trait definitions for the domain layer.
//!
//! The traits are implemented by concrete stores in
//! `crate::infrastructure::persistence`; mocks are generated with `mockall`
//! for unit tests.
//!
//! # Available Repositories
//!
//! - [`UrlStore`] - Short code / URL / owner mapping with soft delete
//!
//! # Testing
//!
//! See integration tests in `tests/memory_store.rs` and `tests/repository_pg.rs`.

pub mod url_store;

pub use url_store::{StoreError, UrlStore};

#[cfg(test)]
pub use url_store::MockUrlStore;
