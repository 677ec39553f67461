//! Keys used to skip statement lines already imported.

use contta_shared::types::round_cents;

use super::StatementLine;
use crate::digest::sha256_hex;

/// The bank reference when the line has one, otherwise a SHA-256 of
/// `date|signed amount|description`.
#[must_use]
pub fn idempotency_key(line: &StatementLine) -> String {
    if let Some(reference) = line.reference.as_deref().map(str::trim) {
        if !reference.is_empty() {
            return reference.to_string();
        }
    }
    let material = format!(
        "{}|{}|{}",
        line.date,
        round_cents(line.signed_amount()),
        line.description.trim()
    );
    sha256_hex(material.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn line(amount: rust_decimal::Decimal, reference: Option<&str>) -> StatementLine {
        StatementLine::from_signed(
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            "PIX RECEBIDO - PADARIA",
            amount,
            reference.map(str::to_string),
        )
    }

    #[test]
    fn test_reference_wins() {
        assert_eq!(idempotency_key(&line(dec!(10), Some(" FIT123 "))), "FIT123");
    }

    #[test]
    fn test_hash_fallback_is_stable_across_scale() {
        let a = idempotency_key(&line(dec!(10), None));
        let b = idempotency_key(&line(dec!(10.00), Some("")));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_direction_changes_key() {
        assert_ne!(
            idempotency_key(&line(dec!(10), None)),
            idempotency_key(&line(dec!(-10), None))
        );
    }
}
