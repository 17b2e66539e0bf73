//! # error
//!
//! Centralised error type for the ingestion / aggregation pipeline.
//!
//! [`StockwatchError`] แยกประเภทความผิดพลาดให้ orchestrator ตัดสินใจได้ว่า
//! จะข้าม ticker นั้นแล้วไปต่อ หรือหยุดทั้งรอบ:
//!
//! | Variant             | Policy                                           |
//! |---------------------|--------------------------------------------------|
//! | `SourceUnavailable` | per-ticker, skip and continue                    |
//! | `Storage`           | fatal for the operation, always reported         |
//! | `Notification`      | logged, never aborts ingestion                   |
//!
//! The dashboard API reuses the same type through its `IntoResponse` impl.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StockwatchError>;

#[derive(Debug, Error)]
pub enum StockwatchError {
    /// The price provider failed, timed out, or returned an unusable snapshot.
    #[error("source unavailable for {ticker}: {reason}")]
    SourceUnavailable { ticker: String, reason: String },

    /// Read or write against the SQLite ledger failed.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Alert delivery failed.
    #[error("notification failed: {0}")]
    Notification(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A setting that passed parsing but cannot be applied at run time.
    #[error("configuration error: {0}")]
    Config(String),

    /// Dashboard query parameters out of range.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl StockwatchError {
    pub fn source_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable label used in cycle reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::Storage(_)               => "storage",
            Self::Notification(_)          => "notification",
            Self::Json(_)                  => "json",
            Self::Config(_)                => "config",
            Self::BadRequest(_)            => "bad_request",
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl IntoResponse for StockwatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_)            => StatusCode::BAD_REQUEST,
            Self::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::Notification(_)          => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Json(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "ok":    false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
