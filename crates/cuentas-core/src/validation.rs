//! # Form Validation
//!
//! Boundary checks on the raw invoice form. Everything here runs before the
//! orchestrator is called, so a rejected form never touches the counter.
//!
//! ## Field Rules
//! ```text
//! ┌────────────────┬──────────┬────────────────────────────────────────────┐
//! │ Field          │ Required │ Rule                                       │
//! ├────────────────┼──────────┼────────────────────────────────────────────┤
//! │ razon_social   │   yes    │ trimmed, at most 200 characters            │
//! │ nit            │   yes    │ trimmed, at most 200 characters            │
//! │ servicio       │   yes    │ trimmed, at most 2000 characters           │
//! │ precio_opcion  │   yes    │ a preset identifier or "libre"             │
//! │ precio_libre   │   no     │ only read when precio_opcion == "libre"    │
//! │ moneda         │   no     │ COP | USD, blank means COP                 │
//! └────────────────┴──────────┴────────────────────────────────────────────┘
//! ```
//!
//! `precio_libre` is not checked for being a number: an unparsable value is
//! printed as typed.

use serde::Deserialize;

use crate::error::ValidationError;
use crate::types::{Currency, InvoiceRequest, PriceSelection};

/// Maximum length of names and identifiers.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of the service description.
pub const MAX_SERVICIO_LEN: usize = 2000;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// The invoice form exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceForm {
    #[serde(default)]
    pub razon_social: String,
    #[serde(default)]
    pub nit: String,
    #[serde(default)]
    pub servicio: String,
    #[serde(default)]
    pub precio_opcion: String,
    pub precio_libre: Option<String>,
    pub moneda: Option<String>,
}

/// Rejects blank values and returns the trimmed value.
pub fn validate_required<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = validate_required(field, value)?;
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value.to_string())
}

/// Validates the currency code. Blank or absent means COP.
pub fn validate_moneda(moneda: Option<&str>) -> ValidationResult<Currency> {
    match moneda.map(str::trim) {
        None | Some("") => Ok(Currency::default()),
        Some(code) => code.parse(),
    }
}

/// Turns a raw form into a request the orchestrator accepts.
///
/// ## Example
/// ```rust
/// use cuentas_core::validation::{validate_request, InvoiceForm};
/// use cuentas_core::types::Currency;
///
/// let form = InvoiceForm {
///     razon_social: "Acme".into(),
///     nit: "900123456".into(),
///     servicio: "Soporte".into(),
///     precio_opcion: "500".into(),
///     moneda: Some("usd".into()),
///     ..Default::default()
/// };
/// let request = validate_request(&form).unwrap();
/// assert_eq!(request.moneda, Currency::Usd);
/// ```
pub fn validate_request(form: &InvoiceForm) -> ValidationResult<InvoiceRequest> {
    let razon_social = validate_text("razon_social", &form.razon_social, MAX_NAME_LEN)?;
    let nit = validate_text("nit", &form.nit, MAX_NAME_LEN)?;
    let servicio = validate_text("servicio", &form.servicio, MAX_SERVICIO_LEN)?;

    let option = validate_required("precio_opcion", &form.precio_opcion)?;
    let precio = PriceSelection::from_form(option, form.precio_libre.as_deref())?;
    let moneda = validate_moneda(form.moneda.as_deref())?;

    Ok(InvoiceRequest {
        razon_social,
        nit,
        servicio,
        precio,
        moneda,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PresetPrice;

    fn form() -> InvoiceForm {
        InvoiceForm {
            razon_social: "  Empresa Uno  ".to_string(),
            nit: "900123456-7".to_string(),
            servicio: "Consultoría".to_string(),
            precio_opcion: "2500000".to_string(),
            precio_libre: None,
            moneda: None,
        }
    }

    #[test]
    fn test_valid_form() {
        let request = validate_request(&form()).unwrap();
        assert_eq!(request.razon_social, "Empresa Uno");
        assert_eq!(request.moneda, Currency::Cop);
        assert_eq!(
            request.precio,
            PriceSelection::Preset(PresetPrice::lookup("2500000").unwrap())
        );
    }

    #[test]
    fn test_required_fields() {
        for field in ["razon_social", "nit", "servicio", "precio_opcion"] {
            let mut f = form();
            match field {
                "razon_social" => f.razon_social = "   ".to_string(),
                "nit" => f.nit.clear(),
                "servicio" => f.servicio.clear(),
                _ => f.precio_opcion.clear(),
            }
            match validate_request(&f) {
                Err(ValidationError::Required { field: got }) => assert_eq!(got, field),
                other => panic!("expected Required for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_length_limits() {
        let mut f = form();
        f.nit = "9".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            validate_request(&f),
            Err(ValidationError::TooLong { max: MAX_NAME_LEN, .. })
        ));

        let mut f = form();
        f.servicio = "ñ".repeat(MAX_SERVICIO_LEN);
        assert!(validate_request(&f).is_ok());
    }

    #[test]
    fn test_unknown_price_option() {
        let mut f = form();
        f.precio_opcion = "1".to_string();
        assert!(matches!(
            validate_request(&f),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_custom_price_is_not_checked() {
        let mut f = form();
        f.precio_opcion = "libre".to_string();
        f.precio_libre = Some("abc".to_string());
        let request = validate_request(&f).unwrap();
        assert_eq!(request.precio, PriceSelection::Custom("abc".to_string()));
    }

    #[test]
    fn test_moneda() {
        assert_eq!(validate_moneda(None).unwrap(), Currency::Cop);
        assert_eq!(validate_moneda(Some(" ")).unwrap(), Currency::Cop);
        assert_eq!(validate_moneda(Some("USD")).unwrap(), Currency::Usd);
        assert!(validate_moneda(Some("EUR")).is_err());
    }
}
