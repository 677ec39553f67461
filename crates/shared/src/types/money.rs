//! Money helpers for Brazilian reais.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` end to end.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

/// Tolerance used when comparing amounts that went through bank files.
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Error parsing a money string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount: {0:?}")]
pub struct MoneyParseError(pub String);

/// Rounds to two decimal places (half away from zero) and fixes the scale at 2.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

/// Parses an amount written either in Brazilian notation (`R$ 1.234,56`,
/// `-50,00`) or in plain notation (`1234.56`).
///
/// When a comma is present it is the decimal separator and dots are
/// thousands separators. Without a comma a single dot is the decimal
/// separator.
pub fn parse_brl(input: &str) -> Result<Decimal, MoneyParseError> {
    let err = || MoneyParseError(input.to_string());

    let mut text: String = input
        .trim()
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    let negative = if let Some(rest) = text.strip_prefix('-') {
        text = rest.to_string();
        true
    } else if let Some(rest) = text.strip_suffix('-') {
        text = rest.to_string();
        true
    } else if text.starts_with('(') && text.ends_with(')') && text.len() > 2 {
        text = text[1..text.len() - 1].to_string();
        true
    } else {
        false
    };
    let text = text.strip_prefix('+').unwrap_or(&text);

    if text.is_empty() {
        return Err(err());
    }

    let normalized = if text.contains(',') {
        text.replace('.', "").replace(',', ".")
    } else if text.matches('.').count() > 1 {
        text.replace('.', "")
    } else {
        text.to_string()
    };

    if !normalized.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(err());
    }

    let value = Decimal::from_str(&normalized).map_err(|_| err())?;
    Ok(if negative { -value } else { value })
}

/// Formats an amount as `R$ 1.234,56`.
#[must_use]
pub fn format_brl(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}R$ {grouped},{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("R$ 1.234,56", dec!(1234.56))]
    #[case("1.234,56", dec!(1234.56))]
    #[case("-50,00", dec!(-50.00))]
    #[case("1234.56", dec!(1234.56))]
    #[case("  42 ", dec!(42))]
    #[case("1.000.000", dec!(1000000))]
    #[case("(10,50)", dec!(-10.50))]
    #[case("150,00-", dec!(-150.00))]
    #[case("+7,5", dec!(7.5))]
    fn test_parse_brl(#[case] input: &str, #[case] expected: Decimal) {
        assert_eq!(parse_brl(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("R$")]
    #[case("abc")]
    #[case("12,34,56")]
    fn test_parse_brl_rejects(#[case] input: &str) {
        assert!(parse_brl(input).is_err());
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(dec!(10.005)).to_string(), "10.01");
        assert_eq!(round_cents(dec!(-10.005)).to_string(), "-10.01");
        assert_eq!(round_cents(dec!(0)).to_string(), "0.00");
        assert_eq!(round_cents(dec!(0.004)).to_string(), "0.00");
        assert_eq!(round_cents(dec!(-0.004)).to_string(), "0.00");
        assert_eq!(round_cents(dec!(7.1)).to_string(), "7.10");
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(dec!(1234.56)), "R$ 1.234,56");
        assert_eq!(format_brl(dec!(0)), "R$ 0,00");
        assert_eq!(format_brl(dec!(999)), "R$ 999,00");
        assert_eq!(format_brl(dec!(1000000.5)), "R$ 1.000.000,50");
        assert_eq!(format_brl(dec!(-80.1)), "-R$ 80,10");
    }

    #[test]
    fn test_cent_constant() {
        assert_eq!(CENT, dec!(0.01));
    }
}
