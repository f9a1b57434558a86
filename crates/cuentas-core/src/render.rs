//! # Document Renderer Contract
//!
//! The orchestrator hands a fully resolved [`InvoiceFields`] set to a
//! renderer and gets PDF bytes back. Which template and which engine are used
//! is the renderer's business (see `cuentas-render`).

use async_trait::async_trait;

use crate::error::RenderResult;
use crate::types::InvoiceFields;

/// Capability that turns invoice fields into a binary document.
///
/// ## Contract
/// - Either a complete byte stream or an error, never partial bytes
/// - No side effects on the Sequence Store
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Renders the document for these fields.
    async fn render(&self, fields: &InvoiceFields) -> RenderResult<Vec<u8>>;
}
