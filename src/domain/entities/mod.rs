//! Core domain entities.
//!
//! - [`UrlRecord`] - A short code to URL mapping with its owner and tombstone flag
//! - [`UserUrl`] - The externally visible short URL / original URL pair

pub mod url_record;

pub use url_record::{UrlRecord, UserUrl};
