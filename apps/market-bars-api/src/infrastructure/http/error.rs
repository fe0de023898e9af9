//! HTTP Error Responses
//!
//! Every failure is rendered as `{"detail": "<message>"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::application::services::QueryError;

/// API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing client input.
    #[error("{0}")]
    BadRequest(String),
    /// Data source failure, reported to the caller as a client error.
    #[error("{0}")]
    Upstream(String),
    /// Server-side failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Upstream(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Timeframe(e) => Self::BadRequest(e.to_string()),
            QueryError::Epoch(e) => Self::BadRequest(e.to_string()),
            QueryError::Upstream(e) => Self::Upstream(e.to_string()),
            QueryError::Normalize(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
