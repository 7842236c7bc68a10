//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` taxonomy that captures server-side errors
//! to Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>` and the `IntoResponse` impl maps each variant to
//! its HTTP status:
//!
//! - `Validation` - 400, malformed or missing input
//! - `NotFound` - 404, referenced entity absent
//! - `Conflict` - 409, business-rule violation (stock, uniqueness,
//!   referential block)
//! - `Asset` - 502, third-party asset host failure
//! - `Store` / `Internal` - 500, unexpected

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::assets::AssetError;
use crate::store::StoreError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Referenced entity absent.
    #[error("{0}")]
    NotFound(String),

    /// Business-rule violation.
    #[error("{0}")]
    Conflict(String),

    /// Document store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Remote asset host operation failed.
    #[error("Asset host error: {0}")]
    Asset(#[from] AssetError),

    /// Unauthorized admin request.
    #[error("{0}")]
    Unauthorized(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body shared by every endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Store(_) | Self::Asset(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Asset(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose store internals to clients; keep the raw message in
        // `details` only for 5xx responses, matching the original API shape.
        let (error, details) = match &self {
            Self::Store(_) | Self::Internal(_) => {
                ("Error interno del servidor".to_owned(), Some(self.to_string()))
            }
            Self::Asset(_) => ("Error del proveedor de imagenes".to_owned(), Some(self.to_string())),
            other => (other.to_string(), None),
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn app_error_display() {
        let err = AppError::NotFound("Producto no encontrado.".to_owned());
        assert_eq!(err.to_string(), "Producto no encontrado.");

        let err = AppError::Validation("La cantidad debe ser un entero mayor a 0.".to_owned());
        assert_eq!(
            err.to_string(),
            "La cantidad debe ser un entero mayor a 0."
        );
    }

    #[test]
    fn app_error_status_codes() {
        assert_eq!(
            status_of(AppError::Validation("x".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::NotFound("x".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Conflict("x".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Unauthorized("x".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Internal("x".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Asset(AssetError::Rejected("x".to_owned()))),
            StatusCode::BAD_GATEWAY
        );
    }
}
