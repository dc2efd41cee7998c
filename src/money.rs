//! Money conversions.
//!
//! Prices travel through the API as decimal USD amounts and are stored and
//! sent to the payment platform as integer cents.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount must have at most two decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
}

/// Convert a cent amount to dollars.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Convert a dollar amount to cents, rejecting sub-cent precision.
pub fn decimal_to_cents(amount: Decimal) -> Result<i64, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative);
    }

    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(MoneyError::Overflow)?;
    if !cents.fract().is_zero() {
        return Err(MoneyError::TooPrecise);
    }

    cents.to_i64().ok_or(MoneyError::Overflow)
}

/// Parse a price filter sent as a query string value.
///
/// Filters are bounds, not charges, so any precision is accepted.
pub fn parse_amount(raw: &str) -> Result<Decimal, MoneyError> {
    let amount =
        Decimal::from_str(raw.trim()).map_err(|_| MoneyError::Invalid(raw.to_string()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative);
    }
    Ok(amount)
}

/// Smallest cent price satisfying `price >= amount`
pub fn min_bound_cents(amount: Decimal) -> i64 {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.ceil().to_i64())
        .unwrap_or(i64::MAX)
}

/// Largest cent price satisfying `price <= amount`
pub fn max_bound_cents(amount: Decimal) -> i64 {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.floor().to_i64())
        .unwrap_or(i64::MAX)
}

/// Platform share of a checkout total, rounded half away from zero to whole cents.
pub fn platform_fee_cents(total_cents: i64, fee_percentage: u32) -> i64 {
    let fee = Decimal::from(total_cents) * Decimal::from(fee_percentage) / Decimal::ONE_HUNDRED;
    fee.round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn converts_between_cents_and_dollars() {
        assert_eq!(cents_to_decimal(1999), d("19.99"));
        assert_eq!(decimal_to_cents(d("19.99")), Ok(1999));
        assert_eq!(decimal_to_cents(d("5")), Ok(500));
        assert_eq!(decimal_to_cents(d("0")), Ok(0));
    }

    #[test]
    fn rejects_negative_and_sub_cent_amounts() {
        assert_eq!(decimal_to_cents(d("-1")), Err(MoneyError::Negative));
        assert_eq!(decimal_to_cents(d("1.005")), Err(MoneyError::TooPrecise));
    }

    #[test]
    fn parses_filter_amounts() {
        assert_eq!(parse_amount(" 12.5 "), Ok(d("12.5")));
        assert!(matches!(parse_amount("cheap"), Err(MoneyError::Invalid(_))));
        assert_eq!(parse_amount("-3"), Err(MoneyError::Negative));
    }

    #[test]
    fn platform_fee_rounds_to_whole_cents() {
        assert_eq!(platform_fee_cents(10_000, 10), 1_000);
        assert_eq!(platform_fee_cents(1_999, 10), 200);
        assert_eq!(platform_fee_cents(1_994, 10), 199);
        assert_eq!(platform_fee_cents(1_995, 10), 200);
        assert_eq!(platform_fee_cents(1_000, 0), 0);
    }

    #[test]
    fn filter_bounds_round_inwards() {
        assert_eq!(min_bound_cents(d("10.001")), 1001);
        assert_eq!(max_bound_cents(d("10.009")), 1000);
        assert_eq!(min_bound_cents(d("5")), 500);
        assert_eq!(max_bound_cents(d("5")), 500);
    }
}
