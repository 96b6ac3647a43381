//! # Money Module
//!
//! Provides the `Money` type for prices and sale totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product form: cost "7.10", sale "12.90"                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Money::parse → 710 cents, 1290 cents                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sale total = Σ quantity × price   (exact, no 0.1 + 0.2 drift)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vitrina_core::money::Money;
//!
//! let price = Money::parse("12.90").unwrap();
//! assert_eq!(price.cents(), 1290);
//! assert_eq!((price * 3).to_string(), "$38.70");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents (the shop prices in US dollars).
///
/// Signed so that differences (e.g. margin below cost) stay representable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a decimal amount typed into a form.
    ///
    /// Accepts `12`, `12.5`, `12.50` and the comma decimal separator
    /// (`12,50`) that Spanish keyboards produce. More than two fractional
    /// digits are rejected rather than silently rounded.
    ///
    /// ## Example
    /// ```rust
    /// use vitrina_core::money::Money;
    ///
    /// assert_eq!(Money::parse("12,5"), Some(Money::from_cents(1250)));
    /// assert_eq!(Money::parse(" 7 "), Some(Money::from_cents(700)));
    /// assert_eq!(Money::parse("abc"), None);
    /// assert_eq!(Money::parse("1.999"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Money> {
        let input = input.trim().replace(',', ".");
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.as_str()),
        };

        let (major, minor) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major.is_empty() && minor.is_empty() {
            return None;
        }
        if !major.chars().all(|c| c.is_ascii_digit()) || !minor.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if minor.len() > 2 {
            return None;
        }

        let major: i64 = if major.is_empty() { 0 } else { major.parse().ok()? };
        let minor: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().ok()? * 10,
            _ => minor.parse().ok()?,
        };

        let cents = major.checked_mul(100)?.checked_add(minor)?;
        Some(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
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

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, saturating at the `i64`
    /// bounds. Fine for reports over stored data.
    ///
    /// ## Example
    /// ```rust
    /// use vitrina_core::money::Money;
    ///
    /// let line_total = Money::from_cents(299).multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies a unit price by a quantity, or `None` on overflow.
    ///
    /// ```rust
    /// use vitrina_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_multiply_quantity(2), None);
    /// ```
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
//
// Operators saturate instead of panicking. Sale totals go through the
// checked methods so an overflow is reported, not clamped.

/// Debug-friendly display. The front end formats for the user's locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_parse_form_input() {
        assert_eq!(Money::parse("12.90"), Some(Money::from_cents(1290)));
        assert_eq!(Money::parse("12,9"), Some(Money::from_cents(1290)));
        assert_eq!(Money::parse("0.05"), Some(Money::from_cents(5)));
        assert_eq!(Money::parse(".5"), Some(Money::from_cents(50)));
        assert_eq!(Money::parse("15"), Some(Money::from_cents(1500)));
        assert_eq!(Money::parse("-3.5"), Some(Money::from_cents(-350)));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("   "), None);
        assert_eq!(Money::parse("."), None);
        assert_eq!(Money::parse("12a"), None);
        assert_eq!(Money::parse("1.2.3"), None);
        assert_eq!(Money::parse("3.141"), None);
        assert_eq!(Money::parse("+5"), None);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_overflow_saturates_or_reports() {
        let huge = Money::from_cents(i64::MAX);

        assert_eq!((huge + Money::from_cents(1)).cents(), i64::MAX);
        assert_eq!((huge * 2).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - Money::from_cents(1)).cents(), i64::MIN);

        assert_eq!(huge.checked_add(Money::from_cents(1)), None);
        assert_eq!(huge.checked_multiply_quantity(2), None);
        assert_eq!(
            Money::from_cents(1290).checked_multiply_quantity(2),
            Some(Money::from_cents(2580))
        );
    }
}
