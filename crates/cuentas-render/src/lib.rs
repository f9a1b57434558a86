//! # cuentas-render: Document Renderer
//!
//! Produces the PDF for an invoice from an HTML template.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Rendering Flow                                  │
//! │                                                                         │
//! │  InvoiceService ── render(&InvoiceFields) ──┐                          │
//! │                                             ▼                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                cuentas-render (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   HtmlDocumentRenderer                                          │   │
//! │  │     ├── TemplateLibrary::load("factura_template.html")          │   │
//! │  │     ├── fill_template  ({{ numero }}, {{ precio }}, ...)        │   │
//! │  │     └── PdfEngine::render_pdf(markup, base_path)                │   │
//! │  │            └── CommandPdfEngine: weasyprint --base-url ... - -  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                             │                          │
//! │                         PDF bytes / RenderError                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cuentas_render::{CommandPdfEngine, HtmlDocumentRenderer, TemplateLibrary};
//!
//! let renderer = HtmlDocumentRenderer::new(
//!     TemplateLibrary::new("templates"),
//!     "/srv/cuentas",
//!     CommandPdfEngine::default(),
//! );
//! ```

pub mod engine;
pub mod renderer;
pub mod template;

pub use engine::{CommandPdfEngine, PdfEngine, DEFAULT_PDF_PROGRAM};
pub use renderer::HtmlDocumentRenderer;
pub use template::{escape_html, fill_template, TemplateLibrary};
