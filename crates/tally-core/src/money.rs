//! # Money Module
//!
//! Provides the `Money` type used for every price, tax amount and total.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  REPLAY MUST BE EXACT                                                   │
//! │                                                                         │
//! │  A restored cart re-adds every line and must land on the same total     │
//! │  as a cart built incrementally. With floats:                            │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │  and the order of additions changes the result.                         │
//! │                                                                         │
//! │  With integer cents, addition is associative and the replayed total     │
//! │  is identical bit for bit.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! let line = price * 2i64;
//! assert_eq!(line.cents(), 2198);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Basis points in 100%.
const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed, so that intermediate totals can go negative while a line is being
/// requantified (subtract old contribution, then add the new one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Tax charged on top of this (net) amount.
    ///
    /// Rounds half up: `(cents × bps + 5000) / 10000`, computed in i128.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::TaxRate;
    ///
    /// // 10.00 at 8.25% = 0.825 → 0.83
    /// let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + BPS_SCALE / 2) / BPS_SCALE;
        Money::from_cents(tax_cents as i64)
    }

    /// Tax already contained in this (gross) amount.
    ///
    /// `gross × bps / (10000 + bps)`, rounded half up.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::TaxRate;
    ///
    /// // 12.00 including 20% VAT contains 2.00 of tax
    /// let tax = Money::from_cents(1200).extract_included_tax(TaxRate::from_bps(2000));
    /// assert_eq!(tax.cents(), 200);
    /// ```
    pub fn extract_included_tax(&self, rate: TaxRate) -> Money {
        let divisor = BPS_SCALE + rate.bps() as i128;
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + divisor / 2) / divisor;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented rendering (`12.34`, `-5.50`). Currency symbols belong to the
/// display layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3i64).cents(), 3000);

        let mut running = Money::zero();
        running += a;
        running -= b;
        assert_eq!(running, b);
    }

    #[test]
    fn test_calculate_tax_rounds_half_up() {
        let amount = Money::from_cents(1000);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(1000)).cents(), 100);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(825)).cents(), 83);
        assert_eq!(amount.calculate_tax(TaxRate::zero()).cents(), 0);
    }

    #[test]
    fn test_extract_included_tax() {
        // 10.00 gross at 5%: 10.00 × 500 / 10500 = 0.476 → 0.48
        let gross = Money::from_cents(1000);
        assert_eq!(gross.extract_included_tax(TaxRate::from_bps(500)).cents(), 48);
        assert_eq!(gross.extract_included_tax(TaxRate::zero()).cents(), 0);
    }

    #[test]
    fn test_checked_multiply_quantity() {
        assert_eq!(
            Money::from_cents(299).checked_multiply_quantity(3),
            Some(Money::from_cents(897))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    }

    #[test]
    fn test_sum() {
        let amounts = [Money::from_cents(1), Money::from_cents(2), Money::from_cents(3)];
        let by_ref: Money = amounts.iter().sum();
        let by_value: Money = amounts.into_iter().sum();
        assert_eq!(by_ref, Money::from_cents(6));
        assert_eq!(by_value, by_ref);
    }

    #[test]
    fn test_serde_is_plain_integer() {
        let json = serde_json::to_string(&Money::from_cents(1250)).unwrap();
        assert_eq!(json, "1250");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cents(), 1250);
    }
}
