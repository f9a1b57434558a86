//! # Error Types
//!
//! Domain-specific error types for cuentas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cuentas-core errors (this file)                                       │
//! │  ├── ValidationError  - Raw form rejected at the boundary              │
//! │  ├── CoreError        - Domain rule failures (counter overflow)        │
//! │  ├── StoreError       - Sequence Store read/commit failures            │
//! │  ├── RenderError      - Template / PDF engine failures                 │
//! │  └── InvoiceError     - What the orchestrator returns                  │
//! │                                                                         │
//! │  cuentas-store errors (separate crate)                                 │
//! │  └── DbError          - sqlx failures, folded into StoreError          │
//! │                                                                         │
//! │  HTTP errors (in app)                                                  │
//! │  └── ApiError         - What the form sees (serialized)                │
//! │                                                                         │
//! │  Flow: StoreError / RenderError → InvoiceError → ApiError → Client     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Price formatting failures are deliberately absent: they are not errors but
//! the [`crate::money::PriceDisplay::RawFallback`] outcome.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The counter cannot be advanced any further.
    #[error("Invoice counter overflow at {value}")]
    CounterOverflow { value: u64 },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur before the pipeline runs, when the raw form doesn't
/// meet requirements.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Store Error
// =============================================================================

/// Sequence Store failures.
///
/// ## When These Occur
/// ```text
/// read()   ──► Io (permissions) / Corrupt (unparseable record) / Database
/// commit() ──► Io (disk full)   / InvalidValue (0)                / Database
/// compare_and_commit() ──► Conflict (another writer advanced the counter)
/// ```
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file operation failed.
    #[error("Counter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted record cannot be parsed.
    #[error("Counter record is corrupt: {0}")]
    Corrupt(String),

    /// The persisted value changed since it was read.
    #[error("Counter changed concurrently: expected {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    /// The counter never goes below its initial value.
    #[error("Invalid counter value: {0}")]
    InvalidValue(u64),

    /// Database-backed store failure.
    #[error("Counter database error: {0}")]
    Database(String),
}

/// Result type for Sequence Store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Render Error
// =============================================================================

/// Document Renderer failures. Any of these aborts the request with no bytes.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No template with this name exists.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The template exists but could not be read.
    #[error("Failed to read template {name}: {reason}")]
    TemplateRead { name: String, reason: String },

    /// A placeholder could not be substituted.
    #[error("Template placeholder cannot be filled: {0}")]
    MissingField(String),

    /// The PDF engine failed.
    #[error("PDF engine failed: {0}")]
    Engine(String),

    /// The PDF engine exited cleanly but produced nothing.
    #[error("PDF engine produced no output")]
    EmptyOutput,
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

// =============================================================================
// Invoice Error
// =============================================================================

/// Errors returned by the Invoice Orchestrator.
///
/// Every variant is fatal for the request; none carries a partial document.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Counter could not be read or committed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Document could not be produced.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Domain rule failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "razon_social".to_string(),
        };
        assert_eq!(err.to_string(), "razon_social is required");

        let err = ValidationError::TooLong {
            field: "nit".to_string(),
            max: 200,
        };
        assert_eq!(err.to_string(), "nit must be at most 200 characters");
    }

    #[test]
    fn test_conflict_message() {
        let err = StoreError::Conflict {
            expected: 4,
            found: 5,
        };
        assert_eq!(
            err.to_string(),
            "Counter changed concurrently: expected 4, found 5"
        );
    }

    #[test]
    fn test_invoice_error_is_transparent() {
        let err: InvoiceError = RenderError::EmptyOutput.into();
        assert_eq!(err.to_string(), "PDF engine produced no output");
        assert!(matches!(err, InvoiceError::Render(_)));
    }
}
