use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::deletion_queue::QueueError;
use crate::domain::repositories::StoreError;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    details: Value,
}

/// Errors surfaced by the shortening service.
///
/// Each variant is a named kind so the transport layer can pick its own
/// status code; [`IntoResponse`] provides the HTTP mapping.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Every allocation attempt collided with an existing code.
    #[error("unable to allocate code: {code} already exists")]
    ShortIdConflict { code: String },

    #[error("url already shortened: {url}")]
    UrlConflict { url: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("short url has been deleted: {code}")]
    Gone { code: String },

    #[error("delete queue is full")]
    QueueFull,

    #[error("delete queue is closed")]
    QueueClosed,

    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            AppError::UrlConflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Gone { .. } => StatusCode::GONE,
            AppError::QueueFull | AppError::QueueClosed | AppError::StorageUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::ShortIdConflict { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidUrl { .. } => "validation_error",
            AppError::ShortIdConflict { .. } => "code_allocation_failed",
            AppError::UrlConflict { .. } => "conflict",
            AppError::NotFound { .. } => "not_found",
            AppError::Gone { .. } => "gone",
            AppError::QueueFull => "queue_full",
            AppError::QueueClosed => "queue_closed",
            AppError::StorageUnavailable { .. } => "storage_unavailable",
            AppError::Internal { .. } => "internal_error",
        }
    }

    fn details(&self) -> Value {
        match self {
            AppError::InvalidUrl { url, reason } => json!({ "url": url, "reason": reason }),
            AppError::UrlConflict { url } => json!({ "url": url }),
            AppError::NotFound { what } => json!({ "key": what }),
            AppError::Gone { code } => json!({ "code": code }),
            // Internal details stay in the logs.
            _ => json!({}),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ShortIdConflict(code) => AppError::ShortIdConflict { code },
            StoreError::UrlConflict(url) => AppError::UrlConflict { url },
            StoreError::NotFound(what) => AppError::NotFound { what },
            StoreError::Unavailable(reason) => AppError::StorageUnavailable { reason },
            StoreError::Snapshot(message) | StoreError::Database(message) => {
                AppError::Internal { message }
            }
        }
    }
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Full => AppError::QueueFull,
            QueueError::Closed => AppError::QueueClosed,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::ShortIdConflict { .. } => "unable to allocate code".to_string(),
            AppError::Internal { .. } => "internal error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorInfo {
                code: self.kind(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}
