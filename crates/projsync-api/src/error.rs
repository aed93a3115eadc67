use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<projsync_core::Error> for AppError {
    fn from(error: projsync_core::Error) -> Self {
        if error.is_storage_outage() {
            tracing::error!(error = %error, "Sync store unavailable");
            return Self::ServiceUnavailable(error.to_string());
        }
        match error {
            projsync_core::Error::InvalidRequest(message) => Self::BadRequest(message),
            projsync_core::Error::UnknownTable(name) => {
                Self::BadRequest(format!("unknown table '{name}'"))
            }
            projsync_core::Error::NotFound(what) => Self::NotFound(what),
            other => {
                tracing::error!(error = %other, "Sync operation failed");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
