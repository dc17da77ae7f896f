//! # Field Formatter
//!
//! Renders typed values into fixed-width character sequences.
//!
//! ## Field Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Kind          Picture     Align   Pad     Overflow                    │
//! │  ────────────  ──────────  ──────  ──────  ──────────────────────────  │
//! │  Numeric       9(n)        right   '0'     keep n low-order digits     │
//! │  Alphanumeric  X(n)        left    ' '     cut on the right            │
//! │  Decimal       9(i)v9(d)   right   '0'     keep i+d low-order digits   │
//! │                [+ sign]                    then append '+' / '-'       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Widths are counted in characters, not bytes. The encoder later maps each
//! character to exactly one byte of the legacy charset.
//!
//! ## Missing Values
//! A field with no value renders its neutral default: zeros for numeric and
//! decimal (plus `+` when signed), spaces for alphanumeric.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Field Specification
// =============================================================================

/// Whether a decimal field carries a sign character after its digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignMode {
    /// Magnitude only. Negative input renders as its absolute value.
    None,
    /// One trailing `+` or `-`.
    Trailing,
}

/// Closed set of field encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    Numeric {
        len: usize,
    },
    Alphanumeric {
        len: usize,
    },
    Decimal {
        int_len: usize,
        dec_len: usize,
        sign: SignMode,
    },
}

impl FieldKind {
    /// Number of characters the field occupies in a record.
    pub const fn width(&self) -> usize {
        match *self {
            FieldKind::Numeric { len } | FieldKind::Alphanumeric { len } => len,
            FieldKind::Decimal {
                int_len,
                dec_len,
                sign,
            } => {
                let sign_len = match sign {
                    SignMode::None => 0,
                    SignMode::Trailing => 1,
                };
                int_len + dec_len + sign_len
            }
        }
    }
}

/// Regulation-style picture: `9(9)`, `X(20)`, `9(12)v99+`.
impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FieldKind::Numeric { len } => write!(f, "9({len})"),
            FieldKind::Alphanumeric { len } => write!(f, "X({len})"),
            FieldKind::Decimal {
                int_len,
                dec_len,
                sign,
            } => {
                write!(f, "9({int_len})v{}", "9".repeat(dec_len))?;
                if sign == SignMode::Trailing {
                    write!(f, "+")?;
                }
                Ok(())
            }
        }
    }
}

/// A named slot in a record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn numeric(name: &'static str, len: usize) -> Self {
        FieldSpec {
            name,
            kind: FieldKind::Numeric { len },
        }
    }

    pub const fn alpha(name: &'static str, len: usize) -> Self {
        FieldSpec {
            name,
            kind: FieldKind::Alphanumeric { len },
        }
    }

    pub const fn decimal(name: &'static str, int_len: usize, dec_len: usize, sign: SignMode) -> Self {
        FieldSpec {
            name,
            kind: FieldKind::Decimal {
                int_len,
                dec_len,
                sign,
            },
        }
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.kind.width()
    }
}

// =============================================================================
// Field Values
// =============================================================================

/// A value handed to the builder for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Decimal(Decimal),
}

impl FieldValue {
    fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "integer",
            FieldValue::Text(_) => "text",
            FieldValue::Decimal(_) => "decimal",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<Money> for FieldValue {
    fn from(value: Money) -> Self {
        FieldValue::Decimal(value.to_decimal())
    }
}

/// Dates are written as `YYYYMMDD`.
impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Text(value.format("%Y%m%d").to_string())
    }
}

// =============================================================================
// Format Errors
// =============================================================================

/// A value that cannot be rendered into the kind of field it was given to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("'{0}' is not a digit string")]
    NotDigits(String),

    #[error("'{0}' is not a decimal number")]
    NotDecimal(String),

    #[error("{found} value cannot fill a {expected} field")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0} is too large to scale")]
    DecimalOverflow(Decimal),
}

// =============================================================================
// Formatting Functions
// =============================================================================

/// Largest fraction-digit count a decimal field may declare.
pub const MAX_DECIMAL_PLACES: usize = 18;

/// Keeps the `len` least-significant characters of an ASCII digit string,
/// zero-padding on the left when it is shorter.
fn fit_digits(digits: &str, len: usize) -> String {
    if digits.len() > len {
        digits[digits.len() - len..].to_string()
    } else {
        format!("{digits:0>len$}")
    }
}

/// Formats `|value|` as `len` zero-padded digits.
///
/// ```rust
/// use openfrmt_core::field::format_numeric;
///
/// assert_eq!(format_numeric(42, 5), "00042");
/// assert_eq!(format_numeric(1234567890, 9), "234567890");
/// ```
pub fn format_numeric(value: i64, len: usize) -> String {
    fit_digits(&value.unsigned_abs().to_string(), len)
}

/// Formats a digit string (a VAT number, a bank code) into a numeric field.
///
/// Surrounding whitespace is ignored and an empty string renders as zeros.
/// Leading zeros of the input are kept.
pub fn format_digits(value: &str, len: usize) -> Result<String, FormatError> {
    let trimmed = value.trim();
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(FormatError::NotDigits(value.to_string()));
    }
    Ok(fit_digits(trimmed, len))
}

/// Left-aligns text in `len` characters, space-padded or cut on the right.
pub fn format_alphanumeric(value: &str, len: usize) -> String {
    let mut out: String = value.chars().take(len).collect();
    let used = out.chars().count();
    out.extend(std::iter::repeat(' ').take(len - used));
    out
}

/// Formats a fixed-point value.
///
/// `|value| * 10^dec_len` is rounded half away from zero, then zero-padded
/// to `int_len + dec_len` digits. With [`SignMode::Trailing`] a `+` or `-`
/// follows; a value that rounds to zero is always `+`. A value too large to
/// scale, or more than [`MAX_DECIMAL_PLACES`] fraction digits, is
/// [`FormatError::DecimalOverflow`].
///
/// ```rust
/// use openfrmt_core::field::{format_decimal, SignMode};
/// use rust_decimal::Decimal;
///
/// let v = Decimal::new(-12345, 3); // -12.345
/// assert_eq!(format_decimal(v, 4, 2, SignMode::Trailing).unwrap(), "001235-");
/// assert_eq!(format_decimal(v, 4, 2, SignMode::None).unwrap(), "001235");
/// ```
pub fn format_decimal(
    value: Decimal,
    int_len: usize,
    dec_len: usize,
    sign: SignMode,
) -> Result<String, FormatError> {
    let factor = u32::try_from(dec_len)
        .ok()
        .filter(|_| dec_len <= MAX_DECIMAL_PLACES)
        .and_then(|exp| 10u64.checked_pow(exp))
        .map(Decimal::from)
        .ok_or(FormatError::DecimalOverflow(value))?;
    let mut scaled = value
        .abs()
        .checked_mul(factor)
        .ok_or(FormatError::DecimalOverflow(value))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    scaled.rescale(0);
    let magnitude = scaled.mantissa().unsigned_abs();

    let mut out = fit_digits(&magnitude.to_string(), int_len + dec_len);
    if sign == SignMode::Trailing {
        out.push(if value.is_sign_negative() && magnitude != 0 {
            '-'
        } else {
            '+'
        });
    }
    Ok(out)
}

/// Renders an optional value into a field of the given kind.
///
/// Text is accepted in numeric fields when it is all digits, and in decimal
/// fields when it parses as a number. Any value renders in an alphanumeric
/// field.
pub fn format_field(kind: &FieldKind, value: Option<&FieldValue>) -> Result<String, FormatError> {
    match (*kind, value) {
        (FieldKind::Numeric { len }, None) => Ok("0".repeat(len)),
        (FieldKind::Numeric { len }, Some(FieldValue::Int(v))) => Ok(format_numeric(*v, len)),
        (FieldKind::Numeric { len }, Some(FieldValue::Text(s))) => format_digits(s, len),
        (FieldKind::Numeric { .. }, Some(other)) => Err(FormatError::KindMismatch {
            expected: "numeric",
            found: other.kind_name(),
        }),

        (FieldKind::Alphanumeric { len }, None) => Ok(" ".repeat(len)),
        (FieldKind::Alphanumeric { len }, Some(FieldValue::Text(s))) => {
            Ok(format_alphanumeric(s, len))
        }
        (FieldKind::Alphanumeric { len }, Some(FieldValue::Int(v))) => {
            Ok(format_alphanumeric(&v.to_string(), len))
        }
        (FieldKind::Alphanumeric { len }, Some(FieldValue::Decimal(d))) => {
            Ok(format_alphanumeric(&d.to_string(), len))
        }

        (
            FieldKind::Decimal {
                int_len,
                dec_len,
                sign,
            },
            value,
        ) => {
            let decimal = match value {
                None => Decimal::ZERO,
                Some(FieldValue::Decimal(d)) => *d,
                Some(FieldValue::Int(v)) => Decimal::from(*v),
                Some(FieldValue::Text(s)) => Decimal::from_str(s.trim())
                    .map_err(|_| FormatError::NotDecimal(s.clone()))?,
            };
            format_decimal(decimal, int_len, dec_len, sign)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
