//! Utility functions for code generation, URL handling and database errors.
//!
//! - [`code_generator`] - Random short code provider
//! - [`short_url`] - Short URL building/parsing and long URL validation
//! - [`db_error`] - sqlx error classification

pub mod code_generator;
pub mod db_error;
pub mod short_url;
