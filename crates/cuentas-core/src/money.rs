//! # Money Module
//!
//! Turns the raw price typed (or preset) on the form into the string printed
//! on the invoice.
//!
//! ## Parsing and Rounding
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "2500000,50" → "2500000.50" → f64  (comma as decimal separator,        │
//! │                                      exponents and 1_000 accepted)      │
//! │                                                                         │
//! │  COP  truncate toward zero → i64 pesos                                  │
//! │  USD  round the exact f64 value to cents, ties to even → i64 cents     │
//! │         0.125 is exactly 1/8, a tie → 12 cents                          │
//! │         2.675 is stored as 2.67499999... → 267 cents                   │
//! │                                                                         │
//! │  Grouping and separators are applied to integers only                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Display Rules
//! ```text
//! COP  2000000      → $2.000.000        (fraction truncated, '.' grouping)
//! USD  2500000,50   → USD 2,500,000.50  (two decimals, ',' grouping)
//! any  abc          → abc               (RawFallback, shown unchanged)
//! ```
//!
//! ## Usage
//! ```rust
//! use cuentas_core::money::{format_price, PriceDisplay};
//! use cuentas_core::types::Currency;
//!
//! assert_eq!(
//!     format_price("abc", Currency::Cop),
//!     PriceDisplay::RawFallback("abc".to_string())
//! );
//! ```

use std::fmt;

use crate::types::{Currency, PriceSelection};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: a typed-in negative amount is displayed, not rejected
/// - **Single field tuple struct**: Zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use cuentas_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    ///
    /// ## Example
    /// ```rust
    /// use cuentas_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).major(), 10);
    /// assert_eq!(Money::from_cents(-550).major(), -5);
    /// ```
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// `USD 1,234.50`
    pub fn format_usd(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!(
            "USD {}{}.{:02}",
            sign,
            group_thousands(self.major().unsigned_abs(), ','),
            self.cents_part()
        )
    }
}

// =============================================================================
// Amount Parsing
// =============================================================================

/// Largest magnitude (exclusive) an `i64` can hold, as `f64`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Parses a typed amount into a finite `f64`.
///
/// A comma is read as the decimal separator. Single underscores between
/// digits are allowed (`1_000`), as are exponents (`1e6`). `inf` and `nan`
/// are rejected.
fn parse_amount(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    let digits = strip_digit_separators(&normalized)?;
    digits.parse::<f64>().ok().filter(|amount| amount.is_finite())
}

fn strip_digit_separators(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'_' {
            continue;
        }
        let before = i.checked_sub(1).map(|j| bytes[j]);
        let after = bytes.get(i + 1).copied();
        match (before, after) {
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {}
            _ => return None,
        }
    }
    Some(text.replace('_', ""))
}

/// Whole units, truncated toward zero.
fn whole_truncated(amount: f64) -> Option<i64> {
    let whole = amount.trunc();
    (-I64_LIMIT..I64_LIMIT)
        .contains(&whole)
        .then_some(whole as i64)
}

/// Cents from the exact binary value of `amount`, ties to even.
fn cents_rounded(amount: f64) -> Option<i64> {
    let bits = amount.abs().to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };

    // |amount| * 100 == scaled * 2^exponent, scaled < 2^60
    let scaled = u128::from(mantissa) * 100;
    let cents = if exponent >= 0 {
        if exponent > 64 {
            return None;
        }
        scaled << exponent as u32
    } else {
        let shift = exponent.unsigned_abs();
        if shift >= 128 {
            0
        } else {
            let quotient = scaled >> shift;
            let remainder = scaled - (quotient << shift);
            let half = 1u128 << (shift - 1);
            if remainder > half || (remainder == half && quotient % 2 == 1) {
                quotient + 1
            } else {
                quotient
            }
        }
    };

    let cents = i64::try_from(cents).ok()?;
    Some(if amount.is_sign_negative() { -cents } else { cents })
}

// =============================================================================
// Price Display
// =============================================================================

/// Outcome of formatting a price.
///
/// The fallback is an explicit outcome, not a swallowed error: issuance is
/// never blocked by a cosmetic formatting failure, and the operator still sees
/// what they typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceDisplay {
    /// Parsed and rendered in the locale format.
    Formatted(String),

    /// Could not be parsed; the raw input, unchanged.
    RawFallback(String),
}

impl PriceDisplay {
    /// The string to print, whichever path produced it.
    pub fn as_str(&self) -> &str {
        match self {
            PriceDisplay::Formatted(s) | PriceDisplay::RawFallback(s) => s,
        }
    }

    /// True when the raw input is being shown unchanged.
    pub fn is_fallback(&self) -> bool {
        matches!(self, PriceDisplay::RawFallback(_))
    }
}

impl fmt::Display for PriceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Formatting Functions
// =============================================================================

/// Resolves the raw amount string to format for a price selection.
///
/// ## Rules
/// - Preset: its literal amount from the lookup table
/// - Custom: the trimmed free-form value, `"0"` when blank
pub fn resolve_price(selection: &PriceSelection) -> String {
    match selection {
        PriceSelection::Preset(preset) => preset.amount.to_string(),
        PriceSelection::Custom(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Formats a raw amount for display in the given currency.
///
/// ## User Workflow
/// ```text
/// precio_opcion=libre, precio_libre="2500000,50", moneda=USD
///      │
///      ▼
/// resolve_price() → "2500000,50"
///      │
///      ▼
/// format_price() ← THIS FUNCTION
///      │
///      ├── parses?  → Formatted("USD 2,500,000.50")
///      └── doesn't? → RawFallback("2500000,50")
/// ```
pub fn format_price(raw: &str, currency: Currency) -> PriceDisplay {
    let Some(amount) = parse_amount(raw) else {
        return PriceDisplay::RawFallback(raw.to_string());
    };

    let formatted = match currency {
        Currency::Cop => whole_truncated(amount).map(format_cop),
        Currency::Usd => cents_rounded(amount).map(|cents| Money::from_cents(cents).format_usd()),
    };

    match formatted {
        Some(s) => PriceDisplay::Formatted(s),
        None => PriceDisplay::RawFallback(raw.to_string()),
    }
}

/// `$2.000.000`; a negative amount keeps its sign after the symbol.
fn format_cop(whole: i64) -> String {
    let sign = if whole < 0 { "-" } else { "" };
    format!("${}{}", sign, group_thousands(whole.unsigned_abs(), '.'))
}

/// Groups digits in threes from the right.
fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
