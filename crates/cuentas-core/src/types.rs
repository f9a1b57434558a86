//! # Domain Types
//!
//! Core domain types used throughout the invoice pipeline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InvoiceRequest  │   │ FormattedInvoice│   │GeneratedDocument│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  razon_social   │──►│  numero "007"   │──►│  bytes (PDF)    │       │
//! │  │  nit            │   │  fecha          │   │  filename       │       │
//! │  │  servicio       │   │  precio display │   │  numero         │       │
//! │  │  precio, moneda │   │  + request      │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InvoiceNumber   │   │ PriceSelection  │   │    Currency     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  u64 counter    │   │  Preset(id)     │   │  Cop (default)  │       │
//! │  │  7 → "007"      │   │  Custom(raw)    │   │  Usd            │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the counter is persisted. Everything here is request-scoped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::PriceDisplay;
use crate::sequence::format_numero;

// =============================================================================
// Currency
// =============================================================================

/// Currency of an invoice. Only controls how the price is displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Colombian peso: `$2.000.000`
    #[default]
    Cop,

    /// US dollar: `USD 2,500,000.50`
    Usd,
}

impl Currency {
    /// Wire code as sent by the form and passed to the template.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Cop => "COP",
            Currency::Usd => "USD",
        }
    }

    /// All accepted wire codes.
    pub fn allowed_codes() -> Vec<String> {
        vec!["COP".to_string(), "USD".to_string()]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COP" => Ok(Currency::Cop),
            "USD" => Ok(Currency::Usd),
            _ => Err(ValidationError::NotAllowed {
                field: "moneda".to_string(),
                allowed: Currency::allowed_codes(),
            }),
        }
    }
}

// =============================================================================
// Price Selection
// =============================================================================

/// Form value that selects the free-form price.
pub const CUSTOM_PRICE_MARKER: &str = "libre";

/// A preset amount selectable without free-form entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresetPrice {
    /// Identifier sent by the form.
    pub id: &'static str,

    /// Literal amount handed to the price formatter.
    pub amount: &'static str,
}

/// Fixed lookup table of preset prices.
///
/// The form shows the first two on the COP cards and the last two on the USD
/// cards, but any preset can be combined with any currency.
pub const PRESET_PRICES: [PresetPrice; 4] = [
    PresetPrice { id: "2000000", amount: "2000000" },
    PresetPrice { id: "2500000", amount: "2500000" },
    PresetPrice { id: "500", amount: "500" },
    PresetPrice { id: "625", amount: "625" },
];

impl PresetPrice {
    /// Looks up a preset by its form identifier.
    pub fn lookup(id: &str) -> Option<PresetPrice> {
        PRESET_PRICES.iter().copied().find(|p| p.id == id)
    }

    /// Identifiers accepted for `precio_opcion`, custom marker included.
    pub fn allowed_options() -> Vec<String> {
        PRESET_PRICES
            .iter()
            .map(|p| p.id.to_string())
            .chain(std::iter::once(CUSTOM_PRICE_MARKER.to_string()))
            .collect()
    }
}

/// How the price of an invoice was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceSelection {
    /// One of [`PRESET_PRICES`].
    Preset(PresetPrice),

    /// Free-form amount typed by the operator (untrimmed).
    Custom(String),
}

impl PriceSelection {
    /// Builds a selection from the `precio_opcion` / `precio_libre` pair.
    pub fn from_form(option: &str, free_value: Option<&str>) -> Result<Self, ValidationError> {
        let option = option.trim();
        if option == CUSTOM_PRICE_MARKER {
            return Ok(PriceSelection::Custom(
                free_value.unwrap_or_default().to_string(),
            ));
        }

        PresetPrice::lookup(option)
            .map(PriceSelection::Preset)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "precio_opcion".to_string(),
                allowed: PresetPrice::allowed_options(),
            })
    }
}

// =============================================================================
// Invoice Request
// =============================================================================

/// Issuer-supplied fields of one billing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRequest {
    /// Client legal name.
    pub razon_social: String,

    /// Client tax ID.
    pub nit: String,

    /// Description of the billed service.
    pub servicio: String,

    /// Preset or free-form price.
    pub precio: PriceSelection,

    /// Display currency.
    pub moneda: Currency,
}

// =============================================================================
// Invoice Number
// =============================================================================

/// A counter value viewed as the number printed on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(u64);

impl InvoiceNumber {
    /// Wraps a raw counter value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        InvoiceNumber(value)
    }

    /// Raw counter value.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The number the next document will carry once this one is committed.
    pub fn next(&self) -> CoreResult<InvoiceNumber> {
        self.0
            .checked_add(1)
            .map(InvoiceNumber)
            .ok_or(CoreError::CounterOverflow { value: self.0 })
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_numero(self.0))
    }
}

// =============================================================================
// Template Fields
// =============================================================================

/// Fully resolved field set handed to the Document Renderer.
///
/// Field names are the placeholder names used by the invoice template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceFields {
    pub numero: String,
    pub fecha: String,
    pub razon_social: String,
    pub nit: String,
    pub servicio: String,
    pub precio: String,
    pub moneda: String,
    pub assets_path: String,
    /// `file://` URL of `assets_path`, for `src` attributes.
    pub assets_url: String,
}

impl InvoiceFields {
    /// Value of a placeholder by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "numero" => &self.numero,
            "fecha" => &self.fecha,
            "razon_social" => &self.razon_social,
            "nit" => &self.nit,
            "servicio" => &self.servicio,
            "precio" => &self.precio,
            "moneda" => &self.moneda,
            "assets_path" => &self.assets_path,
            "assets_url" => &self.assets_url,
            _ => return None,
        };
        Some(value.as_str())
    }
}

// =============================================================================
// Formatted Invoice
// =============================================================================

/// Display strings resolved for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedInvoice {
    pub numero: InvoiceNumber,
    pub fecha: String,
    pub precio: PriceDisplay,
    pub request: InvoiceRequest,
}

impl FormattedInvoice {
    /// Builds the template field set.
    ///
    /// Backslashes in the asset path are turned into forward slashes so
    /// Windows paths resolve inside markup.
    pub fn to_fields(&self, assets_path: &str) -> InvoiceFields {
        let assets_path = assets_path.replace('\\', "/");
        InvoiceFields {
            numero: self.numero.to_string(),
            fecha: self.fecha.clone(),
            razon_social: self.request.razon_social.clone(),
            nit: self.request.nit.clone(),
            servicio: self.request.servicio.clone(),
            precio: self.precio.as_str().to_string(),
            moneda: self.request.moneda.code().to_string(),
            assets_url: file_url(&assets_path),
            assets_path,
        }
    }

    /// Suggested attachment filename.
    pub fn filename(&self) -> String {
        document_filename(self.numero, &self.request.razon_social)
    }
}

// =============================================================================
// Generated Document
// =============================================================================

/// The rendered PDF returned to the caller. Not retained by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub numero: InvoiceNumber,
    pub filename: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// Filenames
// =============================================================================

/// Slug of a client name: lowercased, spaces become hyphens, periods dropped.
///
/// ## Example
/// ```rust
/// use cuentas_core::types::client_slug;
///
/// assert_eq!(client_slug("Acme Corp S.A.S."), "acme-corp-sas");
/// ```
pub fn client_slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace('.', "")
}

/// `file://` URL for an absolute, forward-slash path.
///
/// POSIX paths already start with the root slash; drive paths get one so the
/// drive letter is not read as a host.
///
/// ```rust
/// use cuentas_core::types::file_url;
///
/// assert_eq!(file_url("/srv/assets"), "file:///srv/assets");
/// assert_eq!(file_url("C:/app/assets"), "file:///C:/app/assets");
/// ```
pub fn file_url(path: &str) -> String {
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

/// `cuenta-de-cobro-{numero}-{slug}.pdf`
pub fn document_filename(numero: InvoiceNumber, razon_social: &str) -> String {
    format!("cuenta-de-cobro-{}-{}.pdf", numero, client_slug(razon_social))
}

// =============================================================================
// Unit Tests
// =============================================================================
