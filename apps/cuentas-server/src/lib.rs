//! # cuentas-server: HTTP Boundary
//!
//! Parses the invoice form, runs the issuance pipeline, and streams the PDF
//! back as an attachment.
//!
//! ## Module Organization
//!
//! - [`config`] - `ServerConfig` (defaults → TOML → environment)
//! - [`error`] - `ApiError` and its HTTP mapping
//! - [`routes`] - The axum router and handlers

pub mod config;
pub mod error;
pub mod routes;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ErrorCode};
pub use routes::{app, AppState};
