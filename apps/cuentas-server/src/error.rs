//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cuentas de Cobro                       │
//! │                                                                         │
//! │  Browser form                Rust Backend                               │
//! │  ────────────                ────────────                               │
//! │                                                                         │
//! │  POST /generar-pdf                                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler: Result<Response, ApiError>                             │  │
//! │  │                                                                  │  │
//! │  │  ValidationError ─────────────────► VALIDATION_ERROR   400       │  │
//! │  │  InvoiceError::Render ────────────► RENDER_ERROR       500       │  │
//! │  │  InvoiceError::Store(Conflict) ───► CONFLICT           409       │  │
//! │  │  InvoiceError::Store(_) ──────────► STORAGE_ERROR      500       │  │
//! │  │  InvoiceError::Core ──────────────► INTERNAL           500       │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Body: { "code": "RENDER_ERROR", "message": "..." }                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their detail; the client gets a short
//! message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use cuentas_core::{InvoiceError, StoreError, ValidationError};

/// API error returned from handlers.
///
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "razon_social is required"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Form rejected (400)
    ValidationError,

    /// Document could not be produced (500)
    RenderError,

    /// Counter could not be read or written (500)
    StorageError,

    /// Counter moved under a concurrent writer (409)
    Conflict,

    /// Anything else (500)
    Internal,
}

impl ErrorCode {
    /// HTTP status for this code.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::RenderError | ErrorCode::StorageError | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => {
                tracing::warn!(error = %err, "Counter conflict could not be resolved");
                ApiError::new(
                    ErrorCode::Conflict,
                    "The invoice counter changed while generating, try again",
                )
            }
            other => {
                tracing::error!(error = %other, "Sequence store failure");
                ApiError::new(ErrorCode::StorageError, "Invoice counter unavailable")
            }
        }
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::Store(e) => e.into(),
            InvoiceError::Render(e) => {
                tracing::error!(error = %e, "Document rendering failed");
                ApiError::new(
                    ErrorCode::RenderError,
                    format!("Could not generate the PDF: {e}"),
                )
            }
            InvoiceError::Core(e) => {
                tracing::error!(error = %e, "Invoice issuance failed");
                ApiError::new(ErrorCode::Internal, e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuentas_core::RenderError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::from(ValidationError::Required {
                    field: "nit".to_string(),
                }),
                ErrorCode::ValidationError,
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(InvoiceError::Render(RenderError::EmptyOutput)),
                ErrorCode::RenderError,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(InvoiceError::Store(StoreError::Conflict {
                    expected: 1,
                    found: 2,
                })),
                ErrorCode::Conflict,
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(StoreError::Corrupt("bad".to_string())),
                ErrorCode::StorageError,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.code, code);
            assert_eq!(err.code.status(), status);
        }
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::validation("nit is required");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "code": "VALIDATION_ERROR", "message": "nit is required" })
        );
    }
}
