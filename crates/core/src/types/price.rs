//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are never negative. The storefront API sends plain decimal numbers
//! (or numeric strings); the checkout API expects them as two-decimal strings.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
}

/// A non-negative price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    amount: Decimal,
    /// ISO 4217 currency code.
    #[serde(default)]
    currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price in the default currency.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        Self::with_currency(amount, CurrencyCode::default())
    }

    /// Create a new price with an explicit currency.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn with_currency(amount: Decimal, currency_code: CurrencyCode) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self {
            amount,
            currency_code,
        })
    }

    /// A zero price.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code: CurrencyCode::USD,
        }
    }

    /// Minor units (e.g. cents) to a price, as payment providers report totals.
    #[must_use]
    pub fn from_minor_units(minor: u64) -> Self {
        Self {
            amount: Decimal::from(minor) / Decimal::ONE_HUNDRED,
            currency_code: CurrencyCode::default(),
        }
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    #[must_use]
    pub const fn currency_code(&self) -> CurrencyCode {
        self.currency_code
    }

    /// Price of `quantity` units. Saturates at [`Decimal::MAX`].
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self {
            amount: self
                .amount
                .checked_mul(Decimal::from(quantity))
                .unwrap_or(Decimal::MAX),
            currency_code: self.currency_code,
        }
    }

    /// Sum a sequence of prices. The currency of the first price wins.
    /// Saturates at [`Decimal::MAX`].
    pub fn sum<I: IntoIterator<Item = Self>>(prices: I) -> Self {
        prices
            .into_iter()
            .reduce(|acc, p| Self {
                amount: acc.amount.checked_add(p.amount).unwrap_or(Decimal::MAX),
                currency_code: acc.currency_code,
            })
            .unwrap_or_else(Self::zero)
    }

    /// Two-decimal wire representation (e.g. `"19.90"`).
    #[must_use]
    pub fn to_fixed_2(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{rounded:.2}")
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{}", self.currency_code.symbol(), self.to_fixed_2())
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    INR,
}

impl CurrencyCode {
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::INR => "₹",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        let result = Price::new(Decimal::new(-1, 0));
        assert!(matches!(result, Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_zero_is_allowed() {
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_times_and_sum() {
        let a = Price::new(Decimal::new(1999, 2)).unwrap();
        let b = Price::new(Decimal::new(500, 2)).unwrap();
        let total = Price::sum([a.times(2), b]);
        assert_eq!(total.amount(), Decimal::new(4498, 2));
    }

    #[test]
    fn test_times_and_sum_saturate() {
        let huge = Price::new(Decimal::MAX).unwrap();
        assert_eq!(huge.times(2).amount(), Decimal::MAX);
        assert_eq!(Price::sum([huge, huge]).amount(), Decimal::MAX);
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        assert_eq!(Price::sum(Vec::new()), Price::zero());
    }

    #[test]
    fn test_fixed_2_formatting() {
        let p = Price::new(Decimal::new(199, 1)).unwrap();
        assert_eq!(p.to_fixed_2(), "19.90");
        assert_eq!(p.display(), "$19.90");

        let p = Price::new(Decimal::new(12345, 3)).unwrap();
        assert_eq!(p.to_fixed_2(), "12.35");
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(
            Price::from_minor_units(2599).amount(),
            Decimal::new(2599, 2)
        );
    }
}
