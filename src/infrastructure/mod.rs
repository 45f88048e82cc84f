//! Infrastructure layer for external integrations.
//!
//! # Modules
//!
//! - [`persistence`] - In-memory and PostgreSQL URL stores

pub mod persistence;
