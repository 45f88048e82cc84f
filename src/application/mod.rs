//! Application layer services implementing business logic.
//!
//! Services consume the [`UrlStore`](crate::domain::repositories::UrlStore)
//! trait and a [`CodeProvider`](crate::utils::code_generator::CodeProvider)
//! and expose the operations a transport layer needs.
//!
//! # Available Services
//!
//! - [`services::shorten_service::ShortenService`] - Short URL allocation, resolution and deletion

pub mod services;
