//! # cuentas-core: Pure Invoicing Logic for Cuentas de Cobro
//!
//! This crate is the **heart** of the invoice generator. It owns the numbering
//! rules, the locale formatting, and the pipeline that ties counter advancement
//! to document generation. It performs no I/O of its own: persistence,
//! rendering, and the clock are injected capabilities.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cuentas de Cobro Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 cuentas-server (HTTP boundary)                  │   │
//! │  │       POST /generar-pdf   GET /current-number   GET /health     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ InvoiceRequest                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cuentas-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  invoice  │  │   money   │  │   fecha   │  │ validation│  │   │
//! │  │   │ Invoice-  │  │  Money    │  │ MONTHS_ES │  │  form     │  │   │
//! │  │   │ Service   │  │ PriceDisp │  │  Clock    │  │  checks   │  │   │
//! │  │   └─────┬─────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │         │ traits: SequenceStore, DocumentRenderer              │   │
//! │  └─────────┼───────────────────────────────────────────────────────┘   │
//! │            │                                                            │
//! │  ┌─────────▼──────────────┐        ┌──────────────────────────────┐   │
//! │  │     cuentas-store      │        │       cuentas-render         │   │
//! │  │  counter.json / SQLite │        │  template + PDF engine       │   │
//! │  └────────────────────────┘        └──────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InvoiceRequest, InvoiceNumber, Currency, ...)
//! - [`money`] - Integer-cent amounts and locale price display
//! - [`fecha`] - Spanish date display and the injectable clock
//! - [`sequence`] - The Sequence Store contract and an in-memory store
//! - [`render`] - The Document Renderer contract
//! - [`invoice`] - The Invoice Orchestrator
//! - [`validation`] - Boundary validation of the raw form
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cuentas_core::money::format_price;
//! use cuentas_core::types::Currency;
//!
//! let price = format_price("2000000", Currency::Cop);
//! assert_eq!(price.as_str(), "$2.000.000");
//!
//! let price = format_price("2500000,50", Currency::Usd);
//! assert_eq!(price.as_str(), "USD 2,500,000.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fecha;
pub mod invoice;
pub mod money;
pub mod render;
pub mod sequence;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, InvoiceError, RenderError, StoreError, ValidationError};
pub use fecha::{format_fecha, Clock, FixedClock, SystemClock};
pub use invoice::{InvoiceService, InvoiceState};
pub use money::{format_price, Money, PriceDisplay};
pub use render::DocumentRenderer;
pub use sequence::{format_numero, MemorySequenceStore, SequenceStore};
pub use types::*;
pub use validation::{validate_request, InvoiceForm};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Counter value used when nothing has been persisted yet.
pub const INITIAL_COUNTER: u64 = 1;

/// Minimum width of a displayed invoice number ("007").
pub const NUMERO_MIN_WIDTH: usize = 3;

/// Name of the invoice template consumed by the renderer.
pub const DEFAULT_TEMPLATE: &str = "factura_template.html";

/// How many times the pipeline restarts after a lost compare-and-commit.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
