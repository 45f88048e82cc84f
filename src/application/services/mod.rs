//! Business logic services for the application layer.

pub mod shorten_service;

pub use shorten_service::{RetryPolicy, ShortenService, ShortenSettings, Shortened};
