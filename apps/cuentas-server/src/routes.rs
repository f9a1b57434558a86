//! # HTTP Routes
//!
//! ```text
//! POST /generar-pdf     form → validate → InvoiceService::generate → PDF attachment
//! GET  /current-number  {"numero": "007"}
//! GET  /api/resumen     {"next_numero": "007", "fecha_hoy": "14 de Octubre de 2026"}
//! GET  /health          "OK"
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Serialize;
use tracing::info;

use cuentas_core::{validate_request, InvoiceForm, InvoiceService};

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InvoiceService>,
}

impl AppState {
    pub fn new(service: InvoiceService) -> Self {
        AppState {
            service: Arc::new(service),
        }
    }
}

/// Builds the router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/generar-pdf", post(generar_pdf))
        .route("/current-number", get(current_number))
        .route("/api/resumen", get(resumen))
        .route("/health", get(health_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct CurrentNumber {
    numero: String,
}

#[derive(Debug, Serialize)]
struct Resumen {
    next_numero: String,
    fecha_hoy: String,
}

/// Generates one invoice and returns it as an attachment.
async fn generar_pdf(
    State(state): State<AppState>,
    Form(form): Form<InvoiceForm>,
) -> Result<Response, ApiError> {
    let request = validate_request(&form)?;
    let document = state.service.generate(&request).await?;

    info!(
        numero = %document.numero,
        filename = %document.filename,
        bytes = document.bytes.len(),
        "Sending invoice"
    );

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, attachment(&document.filename)),
        ],
        document.bytes,
    )
        .into_response())
}

/// Number the next invoice will carry.
async fn current_number(State(state): State<AppState>) -> Result<Json<CurrentNumber>, ApiError> {
    let numero = state.service.next_number().await?;
    Ok(Json(CurrentNumber { numero }))
}

/// Data shown on the form page header.
async fn resumen(State(state): State<AppState>) -> Result<Json<Resumen>, ApiError> {
    let next_numero = state.service.next_number().await?;
    Ok(Json(Resumen {
        next_numero,
        fecha_hoy: state.service.fecha_hoy(),
    }))
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// `Content-Disposition` value. Header values are ASCII, so other
/// characters in the client slug become `_`.
fn attachment(filename: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// =============================================================================
// Unit Tests
// =============================================================================
