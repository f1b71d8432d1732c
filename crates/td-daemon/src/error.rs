use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use td_reconcile::ReconcileError;
use thiserror::Error;
use tracing::error;

use crate::api_types::ErrorResponse;

/// Error type returned by every fallible handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request: nothing was changed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// State changed in memory but could not be written out.
    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Persistence(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "MALFORMED_INPUT", msg),
            ApiError::Persistence(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILED", msg),
            ApiError::Internal(err) => {
                error!(error = %format!("{err:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
        });
        (status, body).into_response()
    }
}
