//! # Money Module
//!
//! Provides the `Money` type for monetary values carried into export records.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  0.1 + 0.2 = 0.30000000000000004                                       │
//! │                                                                         │
//! │  A v99 field renders 0.30000000000000004 as "000000000030" only if     │
//! │  the rounding step happens to win. Integer agorot never need it:       │
//! │    30 agorot → "000000000030"                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use openfrmt_core::money::Money;
//!
//! let price = Money::from_agorot(1099); // ₪10.99
//! let total = price + Money::from_agorot(500);
//! assert_eq!(total.agorot(), 1599);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in agorot (1/100 of a shekel).
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and discounts are negative
/// - **Single field tuple struct**: serializes as a bare integer in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Number of fraction digits of the minor unit.
    pub const SCALE: u32 = 2;

    /// Creates a Money value from agorot.
    #[inline]
    pub const fn from_agorot(agorot: i64) -> Self {
        Money(agorot)
    }

    /// Returns the value in agorot.
    #[inline]
    pub const fn agorot(&self) -> i64 {
        self.0
    }

    /// Returns the whole-shekel portion.
    #[inline]
    pub const fn shekels(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the agorot portion (always 0-99).
    #[inline]
    pub const fn agorot_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the value as an exact decimal in shekels.
    ///
    /// ## Example
    /// ```rust
    /// use openfrmt_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_agorot(1099).to_decimal(), Decimal::new(1099, 2));
    /// ```
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, Self::SCALE)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `₪12.34` for log lines.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₪{}.{:02}",
            sign,
            self.shekels().abs(),
            self.agorot_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_agorot() {
        let money = Money::from_agorot(1099);
        assert_eq!(money.agorot(), 1099);
        assert_eq!(money.shekels(), 10);
        assert_eq!(money.agorot_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_agorot(1099)), "₪10.99");
        assert_eq!(format!("{}", Money::from_agorot(-550)), "-₪5.50");
        assert_eq!(format!("{}", Money::zero()), "₪0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_agorot(1000);
        let b = Money::from_agorot(500);
        assert_eq!((a + b).agorot(), 1500);
        assert_eq!((a - b).agorot(), 500);
        assert_eq!((-a).agorot(), -1000);

        let lines = [a, b, Money::from_agorot(1)];
        let total: Money = lines.iter().sum();
        assert_eq!(total.agorot(), 1501);
    }

    #[test]
    fn test_to_decimal_keeps_scale() {
        assert_eq!(Money::from_agorot(-550).to_decimal().to_string(), "-5.50");
        assert_eq!(Money::zero().to_decimal().to_string(), "0.00");
    }

    #[test]
    fn test_serde_is_bare_integer() {
        let json = serde_json::to_string(&Money::from_agorot(1234)).unwrap();
        assert_eq!(json, "1234");
        let back: Money = serde_json::from_str("-15").unwrap();
        assert_eq!(back, Money::from_agorot(-15));
    }
}
