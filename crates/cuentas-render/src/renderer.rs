//! # HTML Document Renderer
//!
//! The [`DocumentRenderer`] used in production: template → markup → PDF.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use cuentas_core::error::RenderResult;
use cuentas_core::{DocumentRenderer, InvoiceFields, DEFAULT_TEMPLATE};

use crate::engine::PdfEngine;
use crate::template::{fill_template, TemplateLibrary};

/// Renders invoices from an HTML template through a [`PdfEngine`].
///
/// The template is read on every call, so edits take effect without a
/// restart.
#[derive(Debug, Clone)]
pub struct HtmlDocumentRenderer<E> {
    library: TemplateLibrary,
    template: String,
    base_path: PathBuf,
    engine: E,
}

impl<E: PdfEngine> HtmlDocumentRenderer<E> {
    /// Renderer using [`DEFAULT_TEMPLATE`] from `library`.
    ///
    /// `base_path` is where the engine resolves relative resource references.
    pub fn new(library: TemplateLibrary, base_path: impl Into<PathBuf>, engine: E) -> Self {
        HtmlDocumentRenderer {
            library,
            template: DEFAULT_TEMPLATE.to_string(),
            base_path: base_path.into(),
            engine,
        }
    }

    /// Uses another template from the same library.
    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template = name.into();
        self
    }

    /// Name of the template in use.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Filled markup without running the engine.
    pub async fn markup(&self, fields: &InvoiceFields) -> RenderResult<String> {
        let template = self.library.load(&self.template).await?;
        fill_template(&template, fields)
    }
}

#[async_trait]
impl<E: PdfEngine> DocumentRenderer for HtmlDocumentRenderer<E> {
    async fn render(&self, fields: &InvoiceFields) -> RenderResult<Vec<u8>> {
        let markup = self.markup(fields).await?;
        debug!(
            template = %self.template,
            numero = %fields.numero,
            markup_bytes = markup.len(),
            "Template filled"
        );
        self.engine.render_pdf(&markup, &self.base_path).await
    }
}
