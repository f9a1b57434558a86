//! # Invoice Orchestrator
//!
//! Composes the Sequence Store, the Value Formatter and the Document Renderer
//! into the issuance pipeline.
//!
//! ## Request State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       One generate() call                               │
//! │                                                                         │
//! │  ┌──────────── issue lock held for the whole pipeline ───────────────┐ │
//! │  │                                                                    │ │
//! │  │  START                                                             │ │
//! │  │    │ store.read() = N                                              │ │
//! │  │    ▼                                                               │ │
//! │  │  NUMBER_RESOLVED  numero = format_numero(N)                        │ │
//! │  │    │ resolve_price + format_price                                  │ │
//! │  │    ▼                                                               │ │
//! │  │  PRICE_RESOLVED   + format_fecha(clock.today())                    │ │
//! │  │    │ renderer.render(fields)                                       │ │
//! │  │    ▼                                                               │ │
//! │  │  RENDERED                                                          │ │
//! │  │    │ store.compare_and_commit(N, N+1)                              │ │
//! │  │    ▼                                                               │ │
//! │  │  COMMITTED ──► GeneratedDocument { bytes, filename }               │ │
//! │  │                                                                    │ │
//! │  │  Any error before COMMITTED ──► FAILED, counter untouched          │ │
//! │  │  Conflict on commit ──► restart from START (bounded attempts)      │ │
//! │  └────────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Within one process, the issue lock strictly orders requests, so two
//! requests can never render with the same number. Across processes sharing a
//! store, the compare-and-commit turns a stale read into a `Conflict` instead
//! of a silent overwrite; the pipeline is then re-run with a fresh number.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{InvoiceError, StoreError, StoreResult};
use crate::fecha::{format_fecha, Clock, SystemClock};
use crate::money::{format_price, resolve_price};
use crate::render::DocumentRenderer;
use crate::sequence::{format_numero, SequenceStore};
use crate::types::{FormattedInvoice, GeneratedDocument, InvoiceNumber, InvoiceRequest};
use crate::DEFAULT_MAX_ATTEMPTS;

// =============================================================================
// Pipeline States
// =============================================================================

/// States of a single issuance, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceState {
    Start,
    NumberResolved,
    PriceResolved,
    Rendered,
    Committed,
    Failed,
}

impl fmt::Display for InvoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvoiceState::Start => "START",
            InvoiceState::NumberResolved => "NUMBER_RESOLVED",
            InvoiceState::PriceResolved => "PRICE_RESOLVED",
            InvoiceState::Rendered => "RENDERED",
            InvoiceState::Committed => "COMMITTED",
            InvoiceState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Invoice Service
// =============================================================================

/// The invoice issuance pipeline.
///
/// ## Usage
/// ```rust,ignore
/// let service = InvoiceService::new(store, renderer)
///     .with_assets_path("/srv/cuentas/assets");
///
/// let doc = service.generate(&request).await?;
/// // doc.filename == "cuenta-de-cobro-001-acme.pdf"
/// ```
pub struct InvoiceService {
    store: Arc<dyn SequenceStore>,
    renderer: Arc<dyn DocumentRenderer>,
    clock: Arc<dyn Clock>,
    assets_path: String,
    max_attempts: u32,
    issue_lock: Mutex<()>,
}

impl InvoiceService {
    /// Creates a service using the local wall clock.
    pub fn new(store: Arc<dyn SequenceStore>, renderer: Arc<dyn DocumentRenderer>) -> Self {
        InvoiceService {
            store,
            renderer,
            clock: Arc::new(SystemClock),
            assets_path: String::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            issue_lock: Mutex::new(()),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the base path of static visuals passed to the template.
    pub fn with_assets_path(mut self, path: impl Into<String>) -> Self {
        self.assets_path = path.into();
        self
    }

    /// Sets how many times a lost compare-and-commit restarts the pipeline.
    /// Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Status query: the number the next document would carry.
    ///
    /// No side effects.
    pub async fn next_number(&self) -> StoreResult<String> {
        Ok(format_numero(self.store.read().await?))
    }

    /// Today's date as printed on documents.
    pub fn fecha_hoy(&self) -> String {
        format_fecha(self.clock.today())
    }

    /// Generates one numbered document.
    ///
    /// ## Guarantees
    /// - The counter is committed only after the renderer returned bytes
    /// - On any error, the counter keeps its pre-request value
    /// - Concurrent calls on the same service never share a number
    pub async fn generate(&self, request: &InvoiceRequest) -> Result<GeneratedDocument, InvoiceError> {
        let _issuing = self.issue_lock.lock().await;

        let mut attempt = 1;
        loop {
            match self.issue_once(request).await {
                Ok(document) => return Ok(document),
                Err(InvoiceError::Store(StoreError::Conflict { expected, found }))
                    if attempt < self.max_attempts =>
                {
                    warn!(
                        expected,
                        found,
                        attempt,
                        "Counter advanced by another writer, restarting pipeline"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    warn!(state = %InvoiceState::Failed, error = %err, "Invoice generation failed");
                    return Err(err);
                }
            }
        }
    }

    /// One pass through the state machine.
    async fn issue_once(&self, request: &InvoiceRequest) -> Result<GeneratedDocument, InvoiceError> {
        debug!(state = %InvoiceState::Start, razon_social = %request.razon_social);

        let counter = self.store.read().await?;
        let numero = InvoiceNumber::new(counter);
        let next = numero.next()?;
        debug!(state = %InvoiceState::NumberResolved, %numero);

        let invoice = self.format(request, numero);
        if invoice.precio.is_fallback() {
            warn!(
                raw = %invoice.precio,
                moneda = %request.moneda,
                "Price could not be parsed, printing raw input"
            );
        }
        debug!(state = %InvoiceState::PriceResolved, precio = %invoice.precio, fecha = %invoice.fecha);

        let fields = invoice.to_fields(&self.assets_path);
        let bytes = self.renderer.render(&fields).await?;
        debug!(state = %InvoiceState::Rendered, bytes = bytes.len());

        self.store.compare_and_commit(counter, next.value()).await?;

        let filename = invoice.filename();
        info!(
            state = %InvoiceState::Committed,
            %numero,
            next = next.value(),
            filename = %filename,
            "Invoice issued"
        );

        Ok(GeneratedDocument {
            numero,
            filename,
            bytes,
        })
    }

    fn format(&self, request: &InvoiceRequest, numero: InvoiceNumber) -> FormattedInvoice {
        let raw_price = resolve_price(&request.precio);
        FormattedInvoice {
            numero,
            fecha: format_fecha(self.clock.today()),
            precio: format_price(&raw_price, request.moneda),
            request: request.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RenderError, RenderResult};
    use crate::fecha::FixedClock;
    use crate::sequence::MemorySequenceStore;
    use crate::types::{Currency, InvoiceFields, PresetPrice, PriceSelection};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex as StdMutex;

    /// Records the fields it was asked to render.
    #[derive(Default)]
    struct RecordingRenderer {
        seen: StdMutex<Vec<InvoiceFields>>,
    }

    #[async_trait]
    impl DocumentRenderer for RecordingRenderer {
        async fn render(&self, fields: &InvoiceFields) -> RenderResult<Vec<u8>> {
            self.seen.lock().unwrap().push(fields.clone());
            Ok(format!("%PDF-{}", fields.numero).into_bytes())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl DocumentRenderer for FailingRenderer {
        async fn render(&self, _fields: &InvoiceFields) -> RenderResult<Vec<u8>> {
            Err(RenderError::Engine("boom".to_string()))
        }
    }

    fn request() -> InvoiceRequest {
        InvoiceRequest {
            razon_social: "Acme S.A.S".to_string(),
            nit: "900123456-7".to_string(),
            servicio: "Desarrollo de software".to_string(),
            precio: PriceSelection::Preset(PresetPrice::lookup("2000000").unwrap()),
            moneda: Currency::Cop,
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()))
    }

    #[tokio::test]
    async fn test_generate_fills_fields_and_commits() {
        let store = Arc::new(MemorySequenceStore::new());
        let renderer = Arc::new(RecordingRenderer::default());
        let service = InvoiceService::new(store.clone(), renderer.clone())
            .with_clock(clock())
            .with_assets_path(r"C:\cuentas\assets");

        let doc = service.generate(&request()).await.unwrap();

        assert_eq!(doc.numero.value(), 1);
        assert_eq!(doc.filename, "cuenta-de-cobro-001-acme-sas.pdf");
        assert_eq!(doc.bytes, b"%PDF-001".to_vec());
        assert_eq!(store.read().await.unwrap(), 2);

        let seen = renderer.seen.lock().unwrap();
        let fields = &seen[0];
        assert_eq!(fields.numero, "001");
        assert_eq!(fields.fecha, "14 de Octubre de 2026");
        assert_eq!(fields.precio, "$2.000.000");
        assert_eq!(fields.moneda, "COP");
        assert_eq!(fields.nit, "900123456-7");
        assert_eq!(fields.assets_path, "C:/cuentas/assets");
    }

    #[tokio::test]
    async fn test_render_failure_leaves_counter_untouched() {
        let store = Arc::new(MemorySequenceStore::starting_at(7));
        let service = InvoiceService::new(store.clone(), Arc::new(FailingRenderer));

        let err = service.generate(&request()).await.unwrap_err();

        assert!(matches!(err, InvoiceError::Render(RenderError::Engine(_))));
        assert_eq!(service.next_number().await.unwrap(), "007");
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        let store = Arc::new(MemorySequenceStore::new());
        store.fail_reads(true);
        let renderer = Arc::new(RecordingRenderer::default());
        let service = InvoiceService::new(store, renderer.clone());

        let err = service.generate(&request()).await.unwrap_err();
        assert!(matches!(err, InvoiceError::Store(StoreError::Io(_))));
        assert!(renderer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_returns_no_document() {
        let store = Arc::new(MemorySequenceStore::starting_at(3));
        store.fail_commits(true);
        let service = InvoiceService::new(store.clone(), Arc::new(RecordingRenderer::default()));

        assert!(service.generate(&request()).await.is_err());
        store.fail_commits(false);
        assert_eq!(store.read().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unparsable_custom_price_still_issues() {
        let store = Arc::new(MemorySequenceStore::new());
        let renderer = Arc::new(RecordingRenderer::default());
        let service = InvoiceService::new(store.clone(), renderer.clone());

        let mut req = request();
        req.precio = PriceSelection::Custom("abc".to_string());
        service.generate(&req).await.unwrap();

        assert_eq!(renderer.seen.lock().unwrap()[0].precio, "abc");
        assert_eq!(store.read().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_status_queries_have_no_side_effects() {
        let store = Arc::new(MemorySequenceStore::starting_at(12));
        let renderer = Arc::new(RecordingRenderer::default());
        let service = InvoiceService::new(store.clone(), renderer.clone()).with_clock(clock());

        assert_eq!(service.next_number().await.unwrap(), "012");
        assert_eq!(service.fecha_hoy(), "14 de Octubre de 2026");
        assert_eq!(store.commit_count(), 0);
        assert!(renderer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counter_overflow_is_rejected_before_render() {
        let store = Arc::new(MemorySequenceStore::starting_at(u64::MAX));
        let renderer = Arc::new(RecordingRenderer::default());
        let service = InvoiceService::new(store, renderer.clone());

        let err = service.generate(&request()).await.unwrap_err();
        assert!(matches!(err, InvoiceError::Core(_)));
        assert!(renderer.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(InvoiceState::NumberResolved.to_string(), "NUMBER_RESOLVED");
        assert_eq!(InvoiceState::Committed.to_string(), "COMMITTED");
    }
}
