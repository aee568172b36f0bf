//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CURRENCY: &str = "NGN";

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn ngn(amount: Decimal) -> Self { Self::new(amount, DEFAULT_CURRENCY) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Applies a fractional rate (0.075 for 7.5%) without rounding.
    pub fn apply_rate(&self, rate: Decimal) -> Money { Money::new(self.amount * rate, &self.currency) }

    /// Rounds to the nearest whole currency unit, halves away from zero.
    pub fn round_whole(&self) -> Money {
        Money::new(round_whole(self.amount), &self.currency)
    }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency, self.amount)
    }
}

pub(crate) fn round_whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_money_add() {
        let a = Money::ngn(Decimal::new(100, 0));
        let b = Money::ngn(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
    }
    #[test]
    fn test_money_currency_mismatch() {
        let a = Money::ngn(Decimal::ONE);
        let b = Money::new(Decimal::ONE, "USD");
        assert_eq!(a.add(&b), Err(MoneyError::CurrencyMismatch));
    }
    #[test]
    fn test_rate_and_rounding() {
        let subtotal = Money::ngn(Decimal::new(300, 0));
        assert_eq!(subtotal.apply_rate(Decimal::new(75, 3)).amount(), Decimal::new(2250, 2));
        assert_eq!(Money::ngn(Decimal::new(2250, 2)).round_whole().amount(), Decimal::new(23, 0));
        assert_eq!(Money::ngn(Decimal::new(2249, 2)).round_whole().amount(), Decimal::new(22, 0));
    }
    #[test]
    fn test_display() {
        assert_eq!(Money::ngn(Decimal::new(34250, 2)).to_string(), "NGN 342.50");
    }
}
