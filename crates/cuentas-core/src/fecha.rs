//! # Date Display
//!
//! Spanish long-form dates for the invoice header, and the clock the
//! orchestrator reads "today" from.

use chrono::{Datelike, Local, NaiveDate};

/// Month names, January first.
pub const MONTHS_ES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Formats a date as `"<day> de <Mes> de <year>"`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use cuentas_core::fecha::format_fecha;
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 4).unwrap();
/// assert_eq!(format_fecha(date), "4 de Octubre de 2026");
/// ```
pub fn format_fecha(date: NaiveDate) -> String {
    // month0() is always 0..=11
    let month = MONTHS_ES[date.month0() as usize];
    format!("{} de {} de {}", date.day(), month, date.year())
}

// =============================================================================
// Clock
// =============================================================================

/// Source of the current date.
pub trait Clock: Send + Sync {
    /// Today's date.
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date. No timezone negotiation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same date (tests, reprints).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_fecha_every_month() {
        for (i, name) in MONTHS_ES.iter().enumerate() {
            let date = NaiveDate::from_ymd_opt(2025, i as u32 + 1, 15).unwrap();
            assert_eq!(format_fecha(date), format!("15 de {} de 2025", name));
        }
    }

    #[test]
    fn test_day_is_not_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(format_fecha(date), "1 de Enero de 2026");
    }

    #[test]
    fn test_fixed_clock() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(FixedClock(date).today(), date);
    }
}
